//! Conversation model and history management
//!
//! Messages are typed so that a malformed message (a tool result without a
//! call id, tool calls on a user message) cannot be constructed at all.

mod history;
mod message;
mod summary;

#[cfg(test)]
mod proptests;

pub use history::{ConversationHistory, RetentionPolicy, DEFAULT_MAX_HISTORY_MESSAGES};
pub use message::{CallOrigin, Message, Role, ToolArguments, ToolCall};
pub use summary::conversation_summary;
