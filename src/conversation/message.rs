//! Message and tool call types

use serde_json::{Map, Value};
use std::fmt;

/// One unit of conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        /// May be absent when the assistant only issues tool calls
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// Result of a single tool call, answering `tool_call_id`
    Tool {
        tool_call_id: String,
        name: String,
        content: String,
    },
}

/// Message role as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    /// Plain assistant reply without tool calls
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_with_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content,
            tool_calls,
        }
    }

    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Message::Tool {
            tool_call_id: tool_call_id.into(),
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Message::System { .. } => Role::System,
            Message::User { .. } => Role::User,
            Message::Assistant { .. } => Role::Assistant,
            Message::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Tool { content, .. } => Some(content),
            Message::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls carried by an assistant message (empty for other roles)
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

/// Where a tool call came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOrigin {
    /// Emitted in the structured `tool_calls` field
    Native,
    /// Reconstructed from a JSON object in free-text content
    Recovered,
}

impl fmt::Display for CallOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOrigin::Native => f.write_str("native"),
            CallOrigin::Recovered => f.write_str("recovered"),
        }
    }
}

/// Tool call arguments as received from the model.
///
/// Backends disagree on whether `arguments` is a JSON object or a JSON
/// string holding one. Both forms are kept until [`ToolArguments::resolve`]
/// turns them into a map.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArguments {
    Structured(Map<String, Value>),
    Raw(String),
}

impl ToolArguments {
    /// Resolve to an argument map.
    ///
    /// A raw string that is not a JSON object resolves to an empty map.
    pub fn resolve(&self) -> Map<String, Value> {
        match self {
            ToolArguments::Structured(map) => map.clone(),
            ToolArguments::Raw(raw) => {
                if raw.trim().is_empty() {
                    return Map::new();
                }
                match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(map)) => map,
                    Ok(other) => {
                        tracing::warn!(arguments = %other, "Tool arguments are not a JSON object");
                        Map::new()
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            arguments = %raw,
                            "Failed to parse tool arguments"
                        );
                        Map::new()
                    }
                }
            }
        }
    }

    /// Serialized form sent back to the model (always a JSON string)
    pub fn to_wire_string(&self) -> String {
        match self {
            ToolArguments::Structured(map) => Value::Object(map.clone()).to_string(),
            ToolArguments::Raw(raw) => raw.clone(),
        }
    }
}

impl From<Map<String, Value>> for ToolArguments {
    fn from(map: Map<String, Value>) -> Self {
        ToolArguments::Structured(map)
    }
}

/// A tool call as recorded on an assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: ToolArguments,
    pub origin: CallOrigin,
}

impl ToolCall {
    pub fn native(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: ToolArguments,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            origin: CallOrigin::Native,
        }
    }

    pub fn recovered(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: ToolArguments::Structured(arguments),
            origin: CallOrigin::Recovered,
        }
    }
}
