//! Plain-text transcript of completed exchanges

use super::Message;

const SPEAKER_USER: &str = "User";
const SPEAKER_ASSISTANT: &str = "Robot";

/// Build a transcript of completed user/assistant exchanges.
///
/// An exchange is a user message followed by at least one assistant message
/// with text or tool calls. Tool calls are noted as `[Used tools: a, b]`.
/// Returns `None` when no exchange has completed yet.
pub fn conversation_summary(messages: &[Message]) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut user: Option<&str> = None;
    let mut reply: Option<String> = None;

    for message in messages {
        match message {
            Message::User { content } => {
                push_exchange(&mut lines, user, reply.take());
                user = Some(content);
            }
            Message::Assistant {
                content,
                tool_calls,
            } => {
                if let Some(text) = content.as_deref().filter(|t| !t.is_empty()) {
                    append_part(&mut reply, text);
                }
                if !tool_calls.is_empty() {
                    let names: Vec<&str> = tool_calls.iter().map(|c| c.name.as_str()).collect();
                    append_part(&mut reply, &format!("[Used tools: {}]", names.join(", ")));
                }
            }
            Message::System { .. } | Message::Tool { .. } => {}
        }
    }
    push_exchange(&mut lines, user, reply);

    if lines.is_empty() {
        return None;
    }
    // Drop the separator after the last exchange
    if lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }

    Some(format!(
        "\n=== Conversation Summary ===\n{}\n=== End Summary ===\n",
        lines.join("\n")
    ))
}

fn append_part(reply: &mut Option<String>, part: &str) {
    match reply {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(part);
        }
        None => *reply = Some(part.to_string()),
    }
}

fn push_exchange(lines: &mut Vec<String>, user: Option<&str>, reply: Option<String>) {
    if let (Some(user), Some(reply)) = (user.filter(|u| !u.is_empty()), reply) {
        lines.push(format!("{SPEAKER_USER}: {user}"));
        lines.push(format!("{SPEAKER_ASSISTANT}: {reply}"));
        lines.push(String::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ToolArguments, ToolCall};

    #[test]
    fn test_no_completed_exchange() {
        let messages = vec![Message::system("prompt"), Message::user("hello")];
        assert_eq!(conversation_summary(&messages), None);
    }

    #[test]
    fn test_exchanges_with_tool_note() {
        let call = ToolCall::native("c1", "nod_head", ToolArguments::Raw("{}".into()));
        let messages = vec![
            Message::system("prompt"),
            Message::user("hello"),
            Message::assistant("Hi there!"),
            Message::user("nod please"),
            Message::assistant_with_calls(None, vec![call]),
            Message::tool("c1", "nod_head", "{}"),
            Message::assistant("Done."),
            Message::user("in progress"),
        ];

        let summary = conversation_summary(&messages).unwrap();
        assert_eq!(
            summary,
            "\n=== Conversation Summary ===\n\
             User: hello\n\
             Robot: Hi there!\n\
             \n\
             User: nod please\n\
             Robot: [Used tools: nod_head] Done.\n\
             === End Summary ===\n"
        );
    }
}
