//! Ordered message history and its sequencing rules

use super::summary::conversation_summary;
use super::Message;
use std::collections::HashSet;

/// Number of non-system messages kept by the default bounded policy
pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 15;

const CONTINUE_INSTRUCTION: &str =
    "Please continue the conversation naturally from where you left off.";

/// How history is kept within the model's context budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep the system message plus the last `max_messages` messages
    BoundedHistory { max_messages: usize },
    /// Keep everything and append a transcript of completed exchanges to
    /// the system prompt sent with each request
    SummaryAugmented,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::BoundedHistory {
            max_messages: DEFAULT_MAX_HISTORY_MESSAGES,
        }
    }
}

/// The conversation for one session.
///
/// The first stored message is always the system prompt.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    policy: RetentionPolicy,
    /// System prompt as sent to the model; differs from the stored one
    /// under the summary policy
    effective_prompt: String,
}

impl ConversationHistory {
    pub fn new(system_prompt: impl Into<String>, policy: RetentionPolicy) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            messages: vec![Message::system(system_prompt.clone())],
            policy,
            effective_prompt: system_prompt,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// The stored (base) system prompt
    pub fn base_prompt(&self) -> &str {
        self.messages[0].text().unwrap_or_default()
    }

    /// The system prompt that will accompany the next request
    pub fn effective_prompt(&self) -> &str {
        &self.effective_prompt
    }

    /// Append a message.
    ///
    /// A system message replaces the prompt instead of being appended, so the
    /// system prompt stays the first and only system message.
    pub fn append(&mut self, message: Message) {
        if let Message::System { content } = message {
            tracing::debug!("Replacing system prompt");
            self.effective_prompt.clone_from(&content);
            self.messages[0] = Message::System { content };
            return;
        }
        self.messages.push(message);
    }

    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    /// Drop everything except the system prompt
    pub fn clear(&mut self) {
        self.messages.truncate(1);
        let base = self.base_prompt().to_string();
        self.effective_prompt = base;
    }

    /// Transcript of completed exchanges, if any
    pub fn summary(&self) -> Option<String> {
        conversation_summary(&self.messages)
    }

    /// Apply the retention policy.
    ///
    /// Bounded: prunes the oldest messages so at most `max_messages` follow the
    /// system prompt. Summary: leaves stored history alone and rebuilds the
    /// effective system prompt from the transcript.
    pub fn prune_or_summarize(&mut self) {
        match self.policy {
            RetentionPolicy::BoundedHistory { max_messages } => {
                let excess = self.messages.len().saturating_sub(max_messages + 1);
                if excess > 0 {
                    tracing::debug!(
                        before = self.messages.len(),
                        dropped = excess,
                        "Pruning conversation history"
                    );
                    self.messages.drain(1..=excess);
                }
                let base = self.base_prompt().to_string();
                self.effective_prompt = base;
            }
            RetentionPolicy::SummaryAugmented => {
                let base = self.base_prompt();
                let prompt = match self.summary() {
                    Some(summary) => format!("{base}\n\n{summary}\n\n{CONTINUE_INSTRUCTION}"),
                    None => base.to_string(),
                };
                self.effective_prompt = prompt;
            }
        }
    }

    /// Copy of the history that the serving backend will accept.
    ///
    /// The system message carries the effective prompt. Tool messages survive
    /// only when they answer a call declared by the assistant message opening
    /// their group; anything else is an orphan and is dropped.
    pub fn sanitize_for_transmission(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len());
        out.push(Message::system(self.effective_prompt.clone()));

        let mut open_calls: HashSet<&str> = HashSet::new();
        for message in self.messages.iter().skip(1) {
            match message {
                Message::Tool { tool_call_id, .. } => {
                    if open_calls.contains(tool_call_id.as_str()) {
                        out.push(message.clone());
                    } else {
                        tracing::debug!(
                            tool_call_id = %tool_call_id,
                            "Dropping orphaned tool message"
                        );
                    }
                }
                Message::Assistant { tool_calls, .. } => {
                    open_calls = tool_calls.iter().map(|c| c.id.as_str()).collect();
                    out.push(message.clone());
                }
                Message::User { .. } | Message::System { .. } => {
                    open_calls.clear();
                    out.push(message.clone());
                }
            }
        }

        out
    }
}
