//! Pure state transition function
//!
//! Three signals decide where a completion leads, in fixed priority: native
//! tool calls, then a call recovered from the content, then the backend's
//! finish reason. Backends misreport the finish reason when their output
//! format is miscalibrated, so it is only consulted once no call was found.

use super::{Effect, TurnContext, TurnEvent, TurnOutcome, TurnState};
use crate::conversation::Message;
use crate::extract::extract_tool_calls;
use crate::llm::{FinishReason, LlmResponse};
use thiserror::Error;

/// Reply when the backend completed without ever producing text
pub const NO_RESPONSE_PLACEHOLDER: &str = "(No response)";
/// Reply when the backend hit its length limit without producing text
pub const TRUNCATED_PLACEHOLDER: &str = "(Response truncated due to length limit)";
/// Reply when the iteration budget ran out without producing text
pub const EXHAUSTED_PLACEHOLDER: &str = "(No response generated)";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A turn is already in progress")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs, it always produces the same outputs, with no I/O
/// side effects.
pub fn transition(
    state: &TurnState,
    context: &TurnContext,
    event: TurnEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Message Handling
        // ============================================================

        // Idle/Finished + UserMessage -> AwaitingCompletion
        (TurnState::Idle | TurnState::Finished { .. }, TurnEvent::UserMessage { text }) => {
            Ok(TransitionResult::new(TurnState::AwaitingCompletion {
                iteration: 1,
                candidate: None,
            })
            .with_effects([
                Effect::append(Message::user(text)),
                Effect::PrepareHistory,
                Effect::RequestCompletion,
            ]))
        }

        // Busy states + UserMessage -> Reject
        (
            TurnState::AwaitingCompletion { .. } | TurnState::ExecutingTools { .. },
            TurnEvent::UserMessage { .. },
        ) => Err(TransitionError::Busy),

        // ============================================================
        // Completion Processing
        // ============================================================
        (
            TurnState::AwaitingCompletion {
                iteration,
                candidate,
            },
            TurnEvent::CompletionReceived { response },
        ) => Ok(handle_completion(
            *iteration,
            candidate.clone(),
            context,
            response,
        )),

        // ============================================================
        // Tool Execution Coordination
        // ============================================================
        (
            TurnState::ExecutingTools {
                iteration,
                current,
                remaining,
                candidate,
            },
            TurnEvent::ToolFinished { call_id, result },
        ) => {
            if call_id != current.id {
                return Err(TransitionError::InvalidTransition(format!(
                    "Result for {call_id} while executing {}",
                    current.id
                )));
            }

            let tool_message = Message::tool(
                current.id.clone(),
                current.name.clone(),
                result.to_message_content(),
            );

            if let Some((next, rest)) = remaining.split_first() {
                return Ok(TransitionResult::new(TurnState::ExecutingTools {
                    iteration: *iteration,
                    current: next.clone(),
                    remaining: rest.to_vec(),
                    candidate: candidate.clone(),
                })
                .with_effect(Effect::append(tool_message))
                .with_effect(Effect::ExecuteTool { call: next.clone() }));
            }

            // All calls of this iteration are answered
            let result =
                TransitionResult::new(TurnState::Idle).with_effect(Effect::append(tool_message));
            Ok(next_iteration(result, *iteration, candidate.clone(), context))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} on {}",
            state_name(state),
            event_name(&event)
        ))),
    }
}

// ============================================================
// Helper Functions
// ============================================================

fn handle_completion(
    iteration: u32,
    previous_candidate: Option<String>,
    context: &TurnContext,
    response: LlmResponse,
) -> TransitionResult {
    let mut candidate = response
        .content
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
        .or(previous_candidate);

    let extraction = extract_tool_calls(
        response.content.as_deref(),
        &response.tool_calls,
        &context.catalog,
        context.precedence,
        iteration,
    );

    let mut tool_calls = response.tool_calls;
    if let Some(recovered) = extraction.recovered {
        // The content was a call, not a reply
        tool_calls.push(recovered);
        candidate = None;
    }
    let assistant = Effect::append(Message::assistant_with_calls(response.content, tool_calls));

    let mut calls = extraction.calls.into_iter();
    if let Some(first) = calls.next() {
        return TransitionResult::new(TurnState::ExecutingTools {
            iteration,
            current: first.clone(),
            remaining: calls.collect(),
            candidate,
        })
        .with_effect(assistant)
        .with_effect(Effect::ExecuteTool { call: first });
    }

    let result = TransitionResult::new(TurnState::Idle).with_effect(assistant);
    match response.finish_reason {
        FinishReason::Stop => {
            finish(result, candidate, NO_RESPONSE_PLACEHOLDER, TurnOutcome::Completed)
        }
        FinishReason::Length => {
            finish(result, candidate, TRUNCATED_PLACEHOLDER, TurnOutcome::Truncated)
        }
        FinishReason::ToolCalls | FinishReason::Other(_) => {
            tracing::debug!(
                iteration,
                finish_reason = %response.finish_reason,
                "Completion carried no tool calls and did not stop"
            );
            next_iteration(result, iteration, candidate, context)
        }
    }
}

/// Request another completion, or finish if the budget is spent
fn next_iteration(
    result: TransitionResult,
    iteration: u32,
    candidate: Option<String>,
    context: &TurnContext,
) -> TransitionResult {
    if iteration >= context.max_iterations {
        tracing::warn!(
            iterations = iteration,
            "Iteration budget exhausted before a final reply"
        );
        return finish(result, candidate, EXHAUSTED_PLACEHOLDER, TurnOutcome::Exhausted);
    }

    let TransitionResult { effects, .. } = result;
    TransitionResult::new(TurnState::AwaitingCompletion {
        iteration: iteration + 1,
        candidate,
    })
    .with_effects(effects)
    .with_effect(Effect::RequestCompletion)
}

fn finish(
    result: TransitionResult,
    candidate: Option<String>,
    placeholder: &str,
    outcome: TurnOutcome,
) -> TransitionResult {
    let reply = candidate.unwrap_or_else(|| placeholder.to_string());
    let TransitionResult { effects, .. } = result;
    TransitionResult::new(TurnState::Finished {
        reply: reply.clone(),
        outcome,
    })
    .with_effects(effects)
    .with_effect(Effect::finish(reply, outcome))
}

fn state_name(state: &TurnState) -> &'static str {
    match state {
        TurnState::Idle => "Idle",
        TurnState::AwaitingCompletion { .. } => "AwaitingCompletion",
        TurnState::ExecutingTools { .. } => "ExecutingTools",
        TurnState::Finished { .. } => "Finished",
    }
}

fn event_name(event: &TurnEvent) -> &'static str {
    match event {
        TurnEvent::UserMessage { .. } => "UserMessage",
        TurnEvent::CompletionReceived { .. } => "CompletionReceived",
        TurnEvent::ToolFinished { .. } => "ToolFinished",
    }
}

/// Calls that will still run after the current one, including it
#[cfg(test)]
pub(super) fn pending_calls(state: &TurnState) -> Vec<&crate::extract::ResolvedCall> {
    match state {
        TurnState::ExecutingTools {
            current, remaining, ..
        } => std::iter::once(current).chain(remaining.iter()).collect(),
        _ => Vec::new(),
    }
}
