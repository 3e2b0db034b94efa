//! Turn loop state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` decides, the runtime performs the resulting effects and feeds
//! their outcomes back in as events.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::TurnEvent;
pub use state::{TurnContext, TurnOutcome, TurnState};
pub use transition::{
    transition, TransitionError, TransitionResult, EXHAUSTED_PLACEHOLDER, NO_RESPONSE_PLACEHOLDER,
    TRUNCATED_PLACEHOLDER,
};
