//! Interactive text REPL

use crate::llm::LlmService;
use crate::runtime::TurnEngine;
use crate::tools::ToolExecutor;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const HELP: &str = "Commands:
  /help     Show this help
  /clear    Forget the conversation
  /history  Show the messages in the conversation
  /summary  Show the conversation summary
  /quit     Exit (also /exit)
Anything else is sent to the robot.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    History,
    Summary,
    Quit,
    Unknown(String),
    Say(String),
}

impl Command {
    /// Parse one input line; `None` for blank lines
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(match line {
            "/help" => Command::Help,
            "/clear" => Command::Clear,
            "/history" => Command::History,
            "/summary" => Command::Summary,
            "/quit" | "/exit" => Command::Quit,
            other if other.starts_with('/') => Command::Unknown(other.to_string()),
            other => Command::Say(other.to_string()),
        })
    }
}

/// Read lines from `input` until EOF or `/quit`, running a turn per message
pub async fn run<L, T, R, W>(
    engine: &mut TurnEngine<L, T>,
    input: R,
    out: &mut W,
) -> std::io::Result<()>
where
    L: LlmService,
    T: ToolExecutor,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    writeln!(out, "{HELP}")?;

    loop {
        write!(out, "\nYou: ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Clear => {
                engine.reset();
                writeln!(out, "Conversation cleared.")?;
            }
            Command::History => {
                let messages = engine.history().snapshot();
                writeln!(out, "{} messages:", messages.len())?;
                for (i, message) in messages.iter().enumerate() {
                    writeln!(out, "  {i}: {}", message.role())?;
                }
            }
            Command::Summary => match engine.history().summary() {
                Some(summary) => writeln!(out, "{summary}")?,
                None => writeln!(out, "Nothing to summarize yet.")?,
            },
            Command::Unknown(command) => writeln!(out, "Unknown command {command}, try /help")?,
            Command::Say(text) => match engine.run_turn(text).await {
                Ok(reply) => writeln!(out, "\nRobot: {}", reply.text)?,
                Err(e) => writeln!(out, "\nError: {e}")?,
            },
        }
    }

    writeln!(out, "Goodbye!")
}
