//! Server-sent event decoding for streaming completions

use super::{FragmentStream, LlmError};
use eventsource_stream::Eventsource;
use futures::future;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, PartialEq)]
enum SseData {
    Fragment(String),
    Done,
    Skip,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    message: String,
}

/// Decode the `data` payload of one event
fn parse_sse_data(data: &str) -> Result<SseData, LlmError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!(error = %e, data = %data, "Skipping unparseable stream chunk");
            return Ok(SseData::Skip);
        }
    };
    if let Some(error) = chunk.error {
        return Err(LlmError::server_error(format!("Stream error: {}", error.message)));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|c| !c.is_empty())
        .map_or(SseData::Skip, SseData::Fragment))
}

/// Decode a streaming response body into text fragments.
///
/// The stream ends at `[DONE]`, or right after the first error.
pub(super) fn sse_fragments<S, B, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    body.eventsource()
        .map(|event| match event {
            Ok(event) => parse_sse_data(&event.data),
            Err(e) => Err(LlmError::network(format!("Stream interrupted: {e}"))),
        })
        .scan(false, |failed, item| {
            let next = if *failed {
                None
            } else {
                match item {
                    Ok(SseData::Fragment(fragment)) => Some(Some(Ok(fragment))),
                    Ok(SseData::Skip) => Some(None),
                    Ok(SseData::Done) => None,
                    Err(e) => {
                        *failed = true;
                        Some(Some(Err(e)))
                    }
                }
            };
            future::ready(next)
        })
        .filter_map(future::ready)
        .boxed()
}
