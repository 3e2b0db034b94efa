//! Robot Dialogue command line
//!
//! `robot-dialogue [chat|listen|speak]`, configured from the environment.

use robot_dialogue::config::Config;
use robot_dialogue::conversation::ConversationHistory;
use robot_dialogue::llm::{LlmService, LoggingService, OpenAIService};
use robot_dialogue::repl;
use robot_dialogue::runtime::TurnEngine;
use robot_dialogue::speech::{
    self, LoggingSink, SpeechSession, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY,
};
use robot_dialogue::system_prompt::load_system_prompt;
use robot_dialogue::tools::{CatalogError, HttpToolExecutor, ToolCatalog};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "Usage: robot-dialogue [chat|listen|speak]
  chat    Interactive text conversation with tool use (default)
  listen  Run a turn whenever the hearing service reports finished speech
  speak   Interactive conversation with streamed speech and action output";

type Llm = Arc<dyn LlmService>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "robot_dialogue=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "chat".to_string());
    if matches!(mode.as_str(), "-h" | "--help" | "help") {
        println!("{USAGE}");
        return Ok(());
    }

    // Configuration
    let config = Config::from_env()?;
    let working_dir = std::env::current_dir()?;
    let system_prompt = load_system_prompt(config.system_prompt_path.as_deref(), &working_dir)?;

    let llm: Llm = Arc::new(LoggingService::new(Arc::new(OpenAIService::new(&config.llm)?)));
    tracing::info!(
        model = %llm.model_id(),
        base_url = %config.llm.base_url,
        max_iterations = config.engine.max_iterations,
        "LLM client initialized"
    );

    match mode.as_str() {
        "chat" => {
            let mut engine = build_engine(&config, system_prompt, llm).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            repl::run(&mut engine, stdin, &mut std::io::stdout()).await?;
        }
        "listen" => {
            let engine = build_engine(&config, system_prompt, llm).await?;
            run_listener(&config, engine).await?;
        }
        "speak" => {
            let history = ConversationHistory::new(system_prompt, config.engine.retention);
            let session = SpeechSession::new(history, llm).with_sampling(config.llm.sampling);
            run_speaker(session).await?;
        }
        other => {
            eprintln!("{USAGE}");
            return Err(format!("Unknown mode: {other}").into());
        }
    }

    Ok(())
}

async fn load_catalog(
    config: &Config,
    executor: &HttpToolExecutor,
) -> Result<ToolCatalog, CatalogError> {
    match &config.tools_repository {
        Some(path) => ToolCatalog::load_repository(path),
        None => executor.fetch_catalog().await,
    }
}

async fn build_engine(
    config: &Config,
    system_prompt: String,
    llm: Llm,
) -> Result<TurnEngine<Llm, HttpToolExecutor>, Box<dyn std::error::Error>> {
    let executor = HttpToolExecutor::new(&config.tool_server_url, config.tool_timeout)?;
    let catalog = load_catalog(config, &executor).await?;
    tracing::info!(
        tools = catalog.len(),
        names = ?catalog.names().collect::<Vec<_>>(),
        "Tool catalog loaded"
    );
    if catalog.is_empty() {
        tracing::warn!("No tools available, the robot can only talk");
    }

    Ok(TurnEngine::new(&config.engine, system_prompt, Arc::new(catalog), llm, executor)
        .with_sampling(config.llm.sampling))
}

async fn run_listener(
    config: &Config,
    engine: TurnEngine<Llm, HttpToolExecutor>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stream =
        speech::connect(&config.hearing_socket, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await?;
    let engine = Arc::new(tokio::sync::Mutex::new(engine));
    let stats = speech::serve_turns(stream, &engine).await;

    tracing::info!(
        events = stats.events,
        turns = stats.turns_started,
        dropped = stats.turns_dropped,
        invalid = stats.invalid_lines,
        "Listener stopped"
    );
    Ok(())
}

async fn run_speaker(mut session: SpeechSession<Llm>) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sink = LoggingSink;
    println!("Speak mode: replies are split into speech and actions. /quit to exit.");

    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => {}
            "/quit" | "/exit" => break,
            text => match session.respond(text, &mut sink).await {
                Ok(reply) => println!("\nRobot: {reply}"),
                Err(e) => println!("\nError: {e}"),
            },
        }
    }
    Ok(())
}
