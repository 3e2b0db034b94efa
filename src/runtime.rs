//! Runtime for executing turns
//!
//! Drives the pure state machine: each effect it returns is performed here
//! and may produce the next event.

mod engine;
mod guard;

#[cfg(test)]
pub mod testing;

pub use engine::{TurnEngine, TurnError, TurnReply};
pub use guard::{TurnGuard, TurnPermit};
