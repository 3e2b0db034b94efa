//! Property-based tests for the state machine
//!
//! These tests drive whole turns through `transition` with scripted
//! completions and check invariants that must hold for every script.

use super::transition::pending_calls;
use super::*;
use crate::conversation::{ToolArguments, ToolCall};
use crate::extract::ToolCallPrecedence;
use crate::llm::{FinishReason, LlmResponse, Usage};
use crate::tools::{ToolCatalog, ToolDefinition, ToolInvocationResult};
use proptest::prelude::*;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(max_iterations: u32, precedence: ToolCallPrecedence) -> TurnContext {
    let catalog = ToolCatalog::from_definitions(vec![
        ToolDefinition::new("nod_head", "Nod"),
        ToolDefinition::new("look_at", "Turn the head"),
    ])
    .unwrap();
    TurnContext {
        max_iterations,
        precedence,
        catalog: Arc::new(catalog),
    }
}

/// Outcome of driving one turn to completion
struct Run {
    completions_requested: u32,
    tools_executed: usize,
    finish: Option<(String, TurnOutcome)>,
}

/// Drive a turn, answering completion requests from `script` and every tool
/// call with a success (or failure for odd-numbered calls when `fail_odd`)
fn drive(context: &TurnContext, script: Vec<LlmResponse>, fail_odd: bool) -> Run {
    let mut script: VecDeque<LlmResponse> = script.into();
    let mut state = TurnState::Idle;
    let mut events = VecDeque::from([TurnEvent::UserMessage {
        text: "hi".to_string(),
    }]);
    let mut run = Run {
        completions_requested: 0,
        tools_executed: 0,
        finish: None,
    };

    while let Some(event) = events.pop_front() {
        let result = transition(&state, context, event)
            .expect("scripted turn must not hit an invalid transition");
        state = result.new_state;
        for effect in result.effects {
            match effect {
                Effect::RequestCompletion => {
                    run.completions_requested += 1;
                    let response = script
                        .pop_front()
                        .unwrap_or_else(|| LlmResponse::text("fallback", FinishReason::Stop));
                    events.push_back(TurnEvent::CompletionReceived { response });
                }
                Effect::ExecuteTool { call } => {
                    let result = if fail_odd && run.tools_executed % 2 == 1 {
                        ToolInvocationResult::failed("boom")
                    } else {
                        ToolInvocationResult::success(json!(null))
                    };
                    run.tools_executed += 1;
                    events.push_back(TurnEvent::ToolFinished {
                        call_id: call.id,
                        result,
                    });
                }
                Effect::FinishTurn { reply, outcome } => {
                    assert!(run.finish.is_none(), "turn finished twice");
                    run.finish = Some((reply, outcome));
                }
                Effect::AppendMessage { .. } | Effect::PrepareHistory => {}
            }
        }
    }

    assert!(
        matches!(state, TurnState::Finished { .. }),
        "turn ended in {state:?}"
    );
    run
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_finish_reason() -> impl Strategy<Value = FinishReason> {
    prop_oneof![
        Just(FinishReason::Stop),
        Just(FinishReason::ToolCalls),
        Just(FinishReason::Length),
        Just(FinishReason::Other(String::new())),
    ]
}

fn arb_content() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        "[a-zA-Z !]{1,30}".prop_map(Some),
        Just(Some(r#"{"name": "nod_head", "parameters": {}}"#.to_string())),
        Just(Some(r#"{"name": "teapot"}"#.to_string())),
    ]
}

fn arb_native_calls() -> impl Strategy<Value = Vec<ToolCall>> {
    prop::collection::vec(
        prop_oneof![Just("nod_head"), Just("look_at")],
        0..3,
    )
    .prop_map(|names| {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                ToolCall::native(format!("call_{i}"), name, ToolArguments::Raw("{}".into()))
            })
            .collect()
    })
}

fn arb_response() -> impl Strategy<Value = LlmResponse> {
    (arb_content(), arb_native_calls(), arb_finish_reason()).prop_map(
        |(content, tool_calls, finish_reason)| LlmResponse {
            content,
            tool_calls,
            finish_reason,
            usage: Usage::default(),
        },
    )
}

fn arb_precedence() -> impl Strategy<Value = ToolCallPrecedence> {
    prop_oneof![Just(ToolCallPrecedence::NativeFirst), Just(ToolCallPrecedence::Merge)]
}

fn tool_requesting_response() -> LlmResponse {
    LlmResponse::with_tool_calls(
        None,
        vec![ToolCall::native("call_0", "nod_head", ToolArguments::Raw("{}".into()))],
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Every scripted turn terminates with exactly one non-empty reply and
    /// never requests more completions than the budget allows
    #[test]
    fn prop_turn_terminates_within_budget(
        max_iterations in 1u32..6,
        precedence in arb_precedence(),
        script in prop::collection::vec(arb_response(), 0..8),
        fail_odd in any::<bool>(),
    ) {
        let context = test_context(max_iterations, precedence);
        let run = drive(&context, script, fail_odd);

        prop_assert!(run.completions_requested <= max_iterations);
        let (reply, _) = run.finish.expect("turn must finish");
        prop_assert!(!reply.trim().is_empty());
    }

    /// A backend that always asks for another tool exhausts the budget exactly
    #[test]
    fn prop_endless_tool_calls_exhaust_budget(max_iterations in 1u32..8) {
        let context = test_context(max_iterations, ToolCallPrecedence::NativeFirst);
        let script = (0..max_iterations + 5).map(|_| tool_requesting_response()).collect();
        let run = drive(&context, script, false);

        prop_assert_eq!(run.completions_requested, max_iterations);
        prop_assert_eq!(run.tools_executed, max_iterations as usize);
        prop_assert_eq!(
            run.finish,
            Some((EXHAUSTED_PLACEHOLDER.to_string(), TurnOutcome::Exhausted))
        );
    }

    /// Every native call is executed even when earlier ones fail
    #[test]
    fn prop_all_calls_execute(calls in arb_native_calls(), fail_odd in any::<bool>()) {
        let context = test_context(2, ToolCallPrecedence::NativeFirst);
        let expected = calls.len();
        let first = LlmResponse::with_tool_calls(None, calls);
        let done = LlmResponse::text("done", FinishReason::Stop);
        let run = drive(&context, vec![first, done], fail_odd);

        prop_assert_eq!(run.tools_executed, expected);
    }

    /// A user message is rejected in every busy state
    #[test]
    fn prop_busy_states_reject_user_message(
        response in arb_response(),
        text in "[a-z]{1,10}",
    ) {
        let context = test_context(3, ToolCallPrecedence::NativeFirst);
        let awaiting = TurnState::AwaitingCompletion { iteration: 1, candidate: None };
        let after = transition(&awaiting, &context, TurnEvent::CompletionReceived { response })
            .unwrap()
            .new_state;

        for state in [awaiting, after] {
            let event = TurnEvent::UserMessage { text: text.clone() };
            let result = transition(&state, &context, event);
            if state.is_busy() {
                prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
            } else {
                prop_assert!(result.is_ok());
                prop_assert!(pending_calls(&state).is_empty());
            }
        }
    }
}
