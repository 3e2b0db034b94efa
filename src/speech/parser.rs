//! Streaming segment parser
//!
//! Splits streamed assistant text into speech (`"..."`) and actions
//! (`**...**`). Everything outside those delimiters is narration and is
//! dropped. Fragments may be arbitrarily small, so a single `*` is held
//! until the next character decides whether it opens or closes a delimiter.

use std::collections::VecDeque;

/// A completed piece of the assistant's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text to be spoken
    Speech(String),
    /// Movement or gesture to be performed
    Action(String),
}

#[derive(Debug, Default)]
pub struct SegmentParser {
    in_quote: bool,
    in_action: bool,
    /// Consecutive `*` seen outside a quote, at most 1 between calls
    pending_stars: u8,
    quote: String,
    action: String,
    completed: VecDeque<Segment>,
}

impl SegmentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all partial state. Completed segments not yet drained are kept.
    pub fn reset(&mut self) {
        self.in_quote = false;
        self.in_action = false;
        self.pending_stars = 0;
        self.quote.clear();
        self.action.clear();
    }

    pub fn feed(&mut self, fragment: &str) {
        for c in fragment.chars() {
            self.push(c);
        }
    }

    /// Take the completed segments, in the order they closed
    pub fn drain(&mut self) -> Vec<Segment> {
        self.completed.drain(..).collect()
    }

    /// Whether a quote or action is open, or a `*` is pending
    pub fn has_partial(&self) -> bool {
        self.in_quote || self.in_action || self.pending_stars > 0
    }

    fn push(&mut self, c: char) {
        // Quotes take priority; inside one, `*` is literal
        if c == '"' {
            self.resolve_pending_star();
            if self.in_quote {
                let text = std::mem::take(&mut self.quote);
                if !text.is_empty() {
                    tracing::debug!(speech = %text, "Speech segment");
                    self.completed.push_back(Segment::Speech(text));
                }
                self.in_quote = false;
            } else {
                self.in_quote = true;
            }
            return;
        }

        if self.in_quote {
            self.quote.push(c);
            return;
        }

        if c == '*' {
            self.pending_stars += 1;
            if self.pending_stars == 2 {
                self.pending_stars = 0;
                if self.in_action {
                    let text = std::mem::take(&mut self.action);
                    if !text.is_empty() {
                        tracing::debug!(action = %text, "Action segment");
                        self.completed.push_back(Segment::Action(text));
                    }
                    self.in_action = false;
                } else {
                    self.in_action = true;
                }
            }
            return;
        }

        self.resolve_pending_star();
        if self.in_action {
            self.action.push(c);
        }
    }

    /// A lone `*` is literal text: kept inside an action, dropped outside
    fn resolve_pending_star(&mut self) {
        if self.pending_stars == 1 && self.in_action {
            self.action.push('*');
        }
        self.pending_stars = 0;
    }
}
