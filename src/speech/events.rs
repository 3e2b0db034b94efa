//! Hearing service event feed
//!
//! The hearing service writes newline-delimited JSON objects
//! `{"type": ..., "data": {...}}` to a Unix socket.

use crate::llm::LlmService;
use crate::runtime::{TurnEngine, TurnGuard, TurnPermit};
use crate::tools::ToolExecutor;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinSet};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};

const MAX_EVENT_LINE: usize = 64 * 1024;
pub const CONNECT_ATTEMPTS: u32 = 10;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechStarted {
    #[serde(default)]
    pub event_number: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechStopped {
    #[serde(default)]
    pub event_number: Option<u64>,
    /// Utterance length in seconds
    pub duration: f64,
    #[serde(default)]
    pub timestamp: Option<Value>,
}

impl SpeechStopped {
    /// User message standing in for the utterance until transcription exists
    pub fn to_user_message(&self) -> String {
        match self.event_number {
            Some(n) => format!(
                "[User spoke for {:.1} seconds in speech event #{n}]",
                self.duration
            ),
            None => format!("[User spoke for {:.1} seconds]", self.duration),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum HearingEvent {
    SpeechStarted(SpeechStarted),
    SpeechStopped(SpeechStopped),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unknown event type: {0}")]
    UnknownType(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

impl HearingEvent {
    pub fn parse(line: &str) -> Result<Self, EventError> {
        let raw: RawEvent = serde_json::from_str(line)?;
        let data = if raw.data.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            raw.data
        };
        match raw.kind.as_str() {
            "speech_started" => Ok(HearingEvent::SpeechStarted(serde_json::from_value(data)?)),
            "speech_stopped" => Ok(HearingEvent::SpeechStopped(serde_json::from_value(data)?)),
            _ => Err(EventError::UnknownType(raw.kind)),
        }
    }
}

/// Connect to the hearing socket, retrying while the service starts up
pub async fn connect(path: &Path, attempts: u32, delay: Duration) -> std::io::Result<UnixStream> {
    let mut attempt = 1;
    loop {
        tracing::info!(path = %path.display(), attempt, attempts, "Connecting to hearing service");
        match UnixStream::connect(path).await {
            Ok(stream) => {
                tracing::info!(path = %path.display(), "Connected to hearing service");
                return Ok(stream);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    error = %e,
                    retry_in_secs = delay.as_secs(),
                    "Hearing service connection failed"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// What a listener saw before the feed ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenStats {
    pub events: u64,
    pub turns_started: u64,
    pub turns_dropped: u64,
    pub invalid_lines: u64,
}

/// Read events until EOF, handing each `speech_stopped` to `on_utterance`
/// together with the turn permit. Utterances arriving while a turn holds the
/// guard are dropped.
pub async fn listen<R, F>(reader: R, guard: &TurnGuard, mut on_utterance: F) -> ListenStats
where
    R: AsyncRead + Unpin,
    F: FnMut(SpeechStopped, TurnPermit),
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_EVENT_LINE));
    let mut stats = ListenStats::default();

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                tracing::warn!(max = MAX_EVENT_LINE, "Skipping oversized event line");
                stats.invalid_lines += 1;
                continue;
            }
            Err(LinesCodecError::Io(e)) => {
                tracing::error!(error = %e, "Hearing socket read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match HearingEvent::parse(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, line = %line, "Skipping event");
                stats.invalid_lines += 1;
                continue;
            }
        };
        stats.events += 1;

        match event {
            HearingEvent::SpeechStarted(started) => {
                tracing::info!(
                    event_number = ?started.event_number,
                    timestamp = ?started.timestamp,
                    "Speech started"
                );
            }
            HearingEvent::SpeechStopped(stopped) => {
                tracing::info!(
                    event_number = ?stopped.event_number,
                    duration = stopped.duration,
                    "Speech stopped"
                );
                match guard.try_begin() {
                    Some(permit) => {
                        stats.turns_started += 1;
                        on_utterance(stopped, permit);
                    }
                    None => {
                        tracing::warn!(
                            event_number = ?stopped.event_number,
                            "Turn in progress, dropping utterance"
                        );
                        stats.turns_dropped += 1;
                    }
                }
            }
        }
    }

    tracing::info!(events = stats.events, "Hearing event feed ended");
    stats
}

/// Run a conversation turn for every utterance on the feed.
///
/// Turns run on their own tasks so the feed keeps being read (and overlapping
/// utterances dropped) while the robot is busy. Returns once the feed has
/// ended and every started turn has finished.
pub async fn serve_turns<R, L, T>(reader: R, engine: &Arc<Mutex<TurnEngine<L, T>>>) -> ListenStats
where
    R: AsyncRead + Unpin,
    L: LlmService + 'static,
    T: ToolExecutor + 'static,
{
    let guard = TurnGuard::new();
    let mut turns = JoinSet::new();

    let stats = listen(reader, &guard, |stopped, permit| {
        while let Some(joined) = turns.try_join_next() {
            log_join(&joined);
        }
        let engine = Arc::clone(engine);
        turns.spawn(async move {
            let _permit = permit;
            let mut engine = engine.lock().await;
            match engine.run_turn(stopped.to_user_message()).await {
                Ok(reply) => {
                    tracing::info!(reply = %reply.text, outcome = ?reply.outcome, "Robot replied");
                }
                Err(e) => tracing::error!(error = %e, "Speech turn failed"),
            }
        });
    })
    .await;

    if !turns.is_empty() {
        tracing::info!(pending = turns.len(), "Waiting for speech turns to finish");
    }
    while let Some(joined) = turns.join_next().await {
        log_join(&joined);
    }
    stats
}

fn log_join(joined: &Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Speech turn task failed");
    }
}
