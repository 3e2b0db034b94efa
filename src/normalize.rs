//! Repairs for quirky tool-call arguments
//!
//! Double-encoding repair runs during extraction, before literal repair;
//! literal repair runs again at dispatch and is idempotent.

use serde_json::{Map, Value};

/// Omit `"null"`/`"None"` string values and turn `"true"`/`"false"` into
/// booleans. Only top-level values are inspected.
pub fn repair_literals(arguments: Map<String, Value>) -> Map<String, Value> {
    arguments
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(s) if s == "null" || s == "None" => {
                tracing::debug!(parameter = %key, "Omitting null-literal argument");
                None
            }
            Value::String(s) if s == "true" => Some((key, Value::Bool(true))),
            Value::String(s) if s == "false" => Some((key, Value::Bool(false))),
            other => Some((key, other)),
        })
        .collect()
}

/// Replace string values that hold serialized JSON arrays or objects with the
/// parsed structure, recursing into nested objects.
///
/// A decoded structure is taken as the value the model meant and is not
/// inspected again, so `repair(stringify(x)) == x` for any container `x`.
/// Arrays are not entered. Strings that only look like JSON but fail to
/// parse are left as they are.
pub fn repair_double_encoding(value: Value) -> Value {
    match value {
        Value::String(s) => match decode_nested(&s) {
            Some(parsed) => {
                tracing::debug!("Repaired double-encoded argument");
                parsed
            }
            None => Value::String(s),
        },
        Value::Object(map) => Value::Object(repair_double_encoded_map(map)),
        other => other,
    }
}

/// [`repair_double_encoding`] applied to every value of an argument map
pub fn repair_double_encoded_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key, repair_double_encoding(value)))
        .collect()
}

fn decode_nested(s: &str) -> Option<Value> {
    let trimmed = s.trim();
    let bracketed = (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'));
    if !bracketed {
        return None;
    }
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .filter(|v| v.is_array() || v.is_object())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_null_literals_are_omitted() {
        let args = map(json!({"angle": "null", "speed": "None", "duration": "2.0"}));
        assert_eq!(repair_literals(args), map(json!({"duration": "2.0"})));
    }

    #[test]
    fn test_boolean_literals_converted() {
        let args = map(json!({"smooth": "true", "loop": "false", "name": "True"}));
        assert_eq!(
            repair_literals(args),
            map(json!({"smooth": true, "loop": false, "name": "True"}))
        );
    }

    #[test]
    fn test_real_null_passes_through() {
        let args = map(json!({"angle": null}));
        assert_eq!(repair_literals(args.clone()), args);
    }

    #[test]
    fn test_double_encoded_array_and_object() {
        let args = map(json!({
            "commands": "[{\"tool_name\": \"nod_head\", \"parameters\": {\"duration\": 2}}]",
            "pose": "{\"x\": 0.1, \"y\": -0.2}",
            "label": "plain",
        }));
        assert_eq!(
            repair_double_encoded_map(args),
            map(json!({
                "commands": [{"tool_name": "nod_head", "parameters": {"duration": 2}}],
                "pose": {"x": 0.1, "y": -0.2},
                "label": "plain",
            }))
        );
    }

    #[test]
    fn test_nested_native_objects_repaired() {
        let value = json!({"outer": {"inner": "[1, 2]", "name": "head"}});
        assert_eq!(
            repair_double_encoding(value),
            json!({"outer": {"inner": [1, 2], "name": "head"}})
        );
    }

    #[test]
    fn test_decoded_values_kept_verbatim() {
        let x = json!(["[1]", {"k": "v"}]);
        assert_eq!(repair_double_encoding(Value::String(x.to_string())), x);

        let y = json!({"note": "{\"a\": 1}"});
        assert_eq!(repair_double_encoding(Value::String(y.to_string())), y);
    }

    #[test]
    fn test_native_arrays_not_entered() {
        let value = json!({"items": ["[1]", "{}"]});
        assert_eq!(repair_double_encoding(value.clone()), value);
    }

    #[test]
    fn test_invalid_nested_json_left_alone() {
        let value = json!({"note": "[not json]", "other": " {broken "});
        assert_eq!(repair_double_encoding(value.clone()), value);
    }

    #[test]
    fn test_padded_encoding_repaired() {
        assert_eq!(repair_double_encoding(json!("  [1, 2] ")), json!([1, 2]));
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Leaf strings that never look like serialized JSON
    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _.-]{0,12}".prop_map(Value::String),
        ]
    }

    /// Leaves that include strings holding serialized JSON
    fn arb_encoded_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            arb_leaf(),
            Just(json!("[1]")),
            Just(json!(" [] ")),
            Just(json!("{\"k\": \"v\"}")),
            Just(json!("[not json]")),
        ]
    }

    fn arb_tree(leaf: BoxedStrategy<Value>) -> impl Strategy<Value = Value> {
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        arb_tree(arb_leaf().boxed())
    }

    fn arb_container() -> impl Strategy<Value = Value> {
        prop_oneof![
            proptest::collection::vec(arb_json(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", arb_json(), 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    }

    fn arb_encoded_container() -> impl Strategy<Value = Value> {
        let tree = || arb_tree(arb_encoded_leaf().boxed());
        prop_oneof![
            proptest::collection::vec(tree(), 0..4).prop_map(Value::Array),
            proptest::collection::btree_map("[a-z]{1,6}", tree(), 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    }

    fn arb_arguments() -> impl Strategy<Value = Map<String, Value>> {
        proptest::collection::btree_map(
            "[a-z]{1,8}",
            prop_oneof![
                arb_leaf(),
                Just(json!("null")),
                Just(json!("None")),
                Just(json!("true")),
                Just(json!("false")),
            ],
            0..6,
        )
        .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_literal_repair_idempotent(args in arb_arguments()) {
            let once = repair_literals(args);
            let twice = repair_literals(once.clone());
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_literal_repair_removes_null_literals(args in arb_arguments()) {
            let repaired = repair_literals(args);
            for value in repaired.values() {
                prop_assert!(value != &json!("null") && value != &json!("None"));
                prop_assert!(value != &json!("true") && value != &json!("false"));
            }
        }

        #[test]
        fn prop_double_encoding_round_trips(x in arb_container()) {
            let encoded = Value::String(x.to_string());
            prop_assert_eq!(repair_double_encoding(encoded), x);
        }

        #[test]
        fn prop_double_encoding_round_trips_encoded_leaves(x in arb_encoded_container()) {
            let encoded = Value::String(x.to_string());
            prop_assert_eq!(repair_double_encoding(encoded), x);
        }

        #[test]
        fn prop_double_encoding_idempotent(x in arb_json()) {
            let wrapped = json!({"a": x.to_string(), "b": x});
            let once = repair_double_encoding(wrapped);
            let twice = repair_double_encoding(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
