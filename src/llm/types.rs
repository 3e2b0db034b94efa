//! Common types for LLM interactions

use crate::conversation::{Message, ToolCall};
use crate::tools::ToolDefinition;
use std::fmt;

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Full message list, system prompt first
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            max_tokens: None,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.max_tokens = sampling.max_tokens;
        self.temperature = sampling.temperature;
        self
    }
}

/// Sampling parameters applied to every request of a session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sampling {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Why the backend stopped generating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    Other(String),
}

impl FinishReason {
    pub fn parse(reason: Option<&str>) -> Self {
        match reason {
            Some("stop" | "end_turn" | "eos") => FinishReason::Stop,
            Some("tool_calls" | "function_call") => FinishReason::ToolCalls,
            Some("length") => FinishReason::Length,
            Some(other) => FinishReason::Other(other.to_string()),
            None => FinishReason::Other(String::new()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => f.write_str("stop"),
            FinishReason::ToolCalls => f.write_str("tool_calls"),
            FinishReason::Length => f.write_str("length"),
            FinishReason::Other(reason) if reason.is_empty() => f.write_str("none"),
            FinishReason::Other(reason) => f.write_str(reason),
        }
    }
}

/// LLM response: the first choice's assistant message and finish reason
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>, finish_reason: FinishReason) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            finish_reason,
            usage: Usage::default(),
        }
    }

    pub fn with_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content,
            tool_calls,
            finish_reason: FinishReason::ToolCalls,
            usage: Usage::default(),
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
