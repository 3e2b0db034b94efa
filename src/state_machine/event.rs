//! Events that drive a turn

use crate::llm::LlmResponse;
use crate::tools::ToolInvocationResult;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum TurnEvent {
    // User events
    UserMessage { text: String },

    // LLM events
    CompletionReceived { response: LlmResponse },

    // Tool events
    ToolFinished {
        call_id: String,
        result: ToolInvocationResult,
    },
}
