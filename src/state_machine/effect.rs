//! Effects produced by state transitions

use super::TurnOutcome;
use crate::conversation::Message;
use crate::extract::ResolvedCall;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation history
    AppendMessage { message: Message },

    /// Apply the history retention policy, once per turn
    PrepareHistory,

    /// Request a completion over the sanitized history
    RequestCompletion,

    /// Execute one tool call
    ExecuteTool { call: ResolvedCall },

    /// End the turn with a reply
    FinishTurn { reply: String, outcome: TurnOutcome },
}

impl Effect {
    pub fn append(message: Message) -> Self {
        Effect::AppendMessage { message }
    }

    pub fn finish(reply: impl Into<String>, outcome: TurnOutcome) -> Self {
        Effect::FinishTurn {
            reply: reply.into(),
            outcome,
        }
    }
}
