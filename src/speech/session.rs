//! Streaming speech session
//!
//! Tool-less conversation whose replies are streamed and split into speech
//! and action segments as they arrive.

use super::{Segment, SegmentParser};
use crate::conversation::{ConversationHistory, Message};
use crate::llm::{LlmError, LlmRequest, LlmService, Sampling};
use futures::StreamExt;

/// Receives segments as soon as they complete
pub trait SegmentSink: Send {
    fn deliver(&mut self, segment: Segment);
}

/// Sink that only logs; stands in for text-to-speech and motion playback
#[derive(Debug, Default)]
pub struct LoggingSink;

impl SegmentSink for LoggingSink {
    fn deliver(&mut self, segment: Segment) {
        match segment {
            Segment::Speech(text) => tracing::info!(speech = %text, "Speak"),
            Segment::Action(text) => tracing::info!(action = %text, "Perform"),
        }
    }
}

impl SegmentSink for Vec<Segment> {
    fn deliver(&mut self, segment: Segment) {
        self.push(segment);
    }
}

pub struct SpeechSession<L> {
    history: ConversationHistory,
    llm: L,
    parser: SegmentParser,
    sampling: Sampling,
}

impl<L: LlmService> SpeechSession<L> {
    pub fn new(history: ConversationHistory, llm: L) -> Self {
        Self {
            history,
            llm,
            parser: SegmentParser::new(),
            sampling: Sampling::default(),
        }
    }

    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Stream one reply, delivering segments to `sink` as they close.
    /// Returns the full reply text, which is also appended to the history.
    ///
    /// A failed request or broken stream leaves the user message in the
    /// history and nothing else.
    pub async fn respond(
        &mut self,
        text: impl Into<String>,
        sink: &mut dyn SegmentSink,
    ) -> Result<String, LlmError> {
        self.history.append(Message::user(text));
        self.history.prune_or_summarize();
        self.parser.reset();

        let request =
            LlmRequest::new(self.history.sanitize_for_transmission()).with_sampling(self.sampling);
        let mut fragments = self.llm.stream(&request).await?;

        let mut reply = String::new();
        let mut delivered = 0usize;
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            self.parser.feed(&fragment);
            reply.push_str(&fragment);
            for segment in self.parser.drain() {
                delivered += 1;
                sink.deliver(segment);
            }
        }

        if self.parser.has_partial() {
            tracing::debug!("Stream ended inside an open segment");
        }
        tracing::info!(segments = delivered, reply_len = reply.len(), "Streamed reply complete");

        self.history.append(Message::assistant(reply.clone()));
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{RetentionPolicy, Role};
    use crate::llm::{FinishReason, LlmResponse};
    use crate::runtime::testing::MockLlmClient;
    use std::sync::Arc;

    fn session() -> (SpeechSession<Arc<MockLlmClient>>, Arc<MockLlmClient>) {
        let llm = Arc::new(MockLlmClient::new("mock"));
        let history = ConversationHistory::new("You are a robot.", RetentionPolicy::default());
        (SpeechSession::new(history, Arc::clone(&llm)), llm)
    }

    #[tokio::test]
    async fn test_segments_delivered_in_order() {
        let (mut session, llm) = session();
        llm.queue_stream(&["**wa", "ves** \"Hel", "lo!\" I am ", "glad. *", "*nods**"]);

        let mut sink: Vec<Segment> = Vec::new();
        let reply = session.respond("Hi", &mut sink).await.unwrap();

        assert_eq!(reply, "**waves** \"Hello!\" I am glad. **nods**");
        assert_eq!(
            sink,
            vec![
                Segment::Action("waves".into()),
                Segment::Speech("Hello!".into()),
                Segment::Action("nods".into()),
            ]
        );

        let roles: Vec<Role> = session.history().snapshot().iter().map(Message::role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);

        let requests = llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_parser_reset_between_replies() {
        let (mut session, llm) = session();
        // First reply ends inside an open quote
        llm.queue_stream(&["\"never closed"]);
        llm.queue_stream(&["\"fresh\""]);

        let mut sink: Vec<Segment> = Vec::new();
        session.respond("one", &mut sink).await.unwrap();
        session.respond("two", &mut sink).await.unwrap();

        assert_eq!(sink, vec![Segment::Speech("fresh".into())]);
    }

    #[tokio::test]
    async fn test_falls_back_to_complete_when_not_streaming() {
        let (mut session, llm) = session();
        llm.queue_response(LlmResponse::text("\"Hi\"", FinishReason::Stop));

        let mut sink: Vec<Segment> = Vec::new();
        let reply = session.respond("Hello", &mut sink).await.unwrap();
        assert_eq!(reply, "\"Hi\"");
        assert_eq!(sink, vec![Segment::Speech("Hi".into())]);
    }

    #[tokio::test]
    async fn test_error_keeps_user_message_only() {
        let (mut session, llm) = session();
        llm.queue_error(LlmError::network("down"));

        let mut sink = LoggingSink;
        assert!(session.respond("Hello", &mut sink).await.is_err());
        assert_eq!(session.history().len(), 2);
    }
}
