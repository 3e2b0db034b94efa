//! Robot Dialogue - LLM tool-call orchestration for robot control
//!
//! Drives conversations between a user, a chat-completions model and a
//! robot's tool server: model output is parsed into tool calls (structured
//! or written as JSON in the text), the calls are validated and executed in
//! order, and the loop repeats until the model produces a reply.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod config;
pub mod conversation;
pub mod extract;
pub mod llm;
pub mod normalize;
pub mod repl;
pub mod runtime;
pub mod speech;
pub mod state_machine;
pub mod system_prompt;
pub mod tools;
