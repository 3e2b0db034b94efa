//! Speech-driven conversation
//!
//! The hearing-event listener that triggers turns, and the streaming session
//! that turns replies into speech and action segments.

mod events;
mod parser;
mod session;

pub use events::{
    connect, listen, serve_turns, EventError, HearingEvent, ListenStats, SpeechStarted,
    SpeechStopped, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY,
};
pub use parser::{Segment, SegmentParser};
pub use session::{LoggingSink, SegmentSink, SpeechSession};
