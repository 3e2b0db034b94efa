//! Property-based tests for history sequencing

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_call_id() -> impl Strategy<Value = String> {
    "c[0-4]"
}

fn arb_tool_call() -> impl Strategy<Value = ToolCall> {
    (arb_call_id(), "[a-z_]{3,10}")
        .prop_map(|(id, name)| ToolCall::native(id, name, ToolArguments::Raw("{}".into())))
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        "[a-z ]{0,20}".prop_map(Message::user),
        "[a-z ]{1,20}".prop_map(Message::assistant),
        (
            proptest::option::of("[a-z ]{1,20}"),
            proptest::collection::vec(arb_tool_call(), 0..3)
        )
            .prop_map(|(content, calls)| Message::assistant_with_calls(content, calls)),
        (arb_call_id(), "[a-z_]{3,10}", "[a-z ]{0,20}")
            .prop_map(|(id, name, content)| Message::tool(id, name, content)),
    ]
}

fn arb_policy() -> impl Strategy<Value = RetentionPolicy> {
    prop_oneof![
        (1usize..8).prop_map(|max_messages| RetentionPolicy::BoundedHistory { max_messages }),
        Just(RetentionPolicy::SummaryAugmented),
    ]
}

fn arb_history() -> impl Strategy<Value = ConversationHistory> {
    (arb_policy(), proptest::collection::vec(arb_message(), 0..30)).prop_map(
        |(policy, messages)| {
            let mut history = ConversationHistory::new("system prompt", policy);
            for message in messages {
                history.append(message);
            }
            history
        },
    )
}

/// Every tool message answers a call declared by the assistant message that
/// opens its group
fn assert_no_orphans(messages: &[Message]) -> Result<(), TestCaseError> {
    let mut declared: Option<Vec<String>> = None;
    for message in messages {
        match message {
            Message::Assistant { tool_calls, .. } => {
                declared = Some(tool_calls.iter().map(|c| c.id.clone()).collect());
            }
            Message::Tool { tool_call_id, .. } => {
                let ids = declared.as_ref();
                prop_assert!(
                    ids.is_some_and(|ids| ids.contains(tool_call_id)),
                    "orphaned tool message {}",
                    tool_call_id
                );
            }
            Message::User { .. } | Message::System { .. } => declared = None,
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_sanitized_history_has_no_orphans(mut history in arb_history()) {
        assert_no_orphans(&history.sanitize_for_transmission())?;
        history.prune_or_summarize();
        assert_no_orphans(&history.sanitize_for_transmission())?;
    }

    #[test]
    fn prop_sanitized_history_starts_with_system(history in arb_history()) {
        let sanitized = history.sanitize_for_transmission();
        prop_assert!(
            matches!(sanitized[0], Message::System { .. }),
            "first message is {:?}",
            sanitized[0].role()
        );
        prop_assert_eq!(
            sanitized.iter().filter(|m| matches!(m, Message::System { .. })).count(),
            1
        );
    }

    #[test]
    fn prop_sanitize_only_removes_tool_messages(history in arb_history()) {
        let sanitized = history.sanitize_for_transmission();
        let kept_non_tool = sanitized.iter().filter(|m| !matches!(m, Message::Tool { .. })).count();
        let stored_non_tool = history
            .snapshot()
            .iter()
            .filter(|m| !matches!(m, Message::Tool { .. }))
            .count();
        prop_assert_eq!(kept_non_tool, stored_non_tool);
    }

    #[test]
    fn prop_bounded_policy_caps_length(
        max_messages in 1usize..8,
        messages in proptest::collection::vec(arb_message(), 0..30),
    ) {
        let mut history =
            ConversationHistory::new("p", RetentionPolicy::BoundedHistory { max_messages });
        for message in messages {
            history.append(message);
        }
        history.prune_or_summarize();
        prop_assert!(history.len() <= max_messages + 1);
        prop_assert_eq!(history.snapshot()[0].text(), Some("p"));
    }

    #[test]
    fn prop_summary_policy_never_drops_messages(history in arb_history()) {
        prop_assume!(history.policy() == RetentionPolicy::SummaryAugmented);
        let before = history.len();
        let mut history = history;
        history.prune_or_summarize();
        prop_assert_eq!(history.len(), before);
    }
}
