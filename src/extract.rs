//! Tool call extraction from assistant responses
//!
//! Native `tool_calls` are preferred. When a model writes its call as JSON in
//! the text content instead, the call is recovered from there, but only if it
//! names a tool in the catalog; otherwise the braces were just prose.

use crate::conversation::{CallOrigin, ToolCall};
use crate::normalize::{repair_double_encoding, repair_literals};
use crate::tools::ToolCatalog;
use serde_json::{Map, Value};

/// How a recovered call is treated when native calls are also present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolCallPrecedence {
    /// Native calls are authoritative; content is not inspected
    #[default]
    NativeFirst,
    /// A recovered call is appended unless a native call already matches it
    Merge,
}

/// A tool call with arguments resolved to a map, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub origin: CallOrigin,
}

impl ResolvedCall {
    fn from_tool_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.resolve(),
            origin: call.origin,
        }
    }
}

/// Result of running extraction over one assistant response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    /// Calls to execute, in order
    pub calls: Vec<ResolvedCall>,
    /// Entry to add to the assistant message's `tool_calls`, if a call was
    /// recovered from content
    pub recovered: Option<ToolCall>,
}

/// Extract the tool calls of one assistant response.
///
/// Never fails: anything unparseable degrades to "no tool call".
/// `iteration` makes the generated id of a recovered call unique per turn.
pub fn extract_tool_calls(
    content: Option<&str>,
    native: &[ToolCall],
    catalog: &ToolCatalog,
    precedence: ToolCallPrecedence,
    iteration: u32,
) -> Extraction {
    let mut calls: Vec<ResolvedCall> = native.iter().map(ResolvedCall::from_tool_call).collect();

    if !native.is_empty() && precedence == ToolCallPrecedence::NativeFirst {
        return Extraction {
            calls,
            recovered: None,
        };
    }

    let Some((name, arguments)) = content
        .filter(|c| !c.trim().is_empty())
        .and_then(|c| recover_tool_call(c, catalog))
    else {
        return Extraction {
            calls,
            recovered: None,
        };
    };

    if calls.iter().any(|c| c.name == name && c.arguments == arguments) {
        return Extraction {
            calls,
            recovered: None,
        };
    }

    let id = format!("call_recovered_{iteration}");
    tracing::debug!(tool = %name, id = %id, "Recovered tool call from content");
    let recovered = ToolCall::recovered(id, name, arguments);
    calls.push(ResolvedCall::from_tool_call(&recovered));
    Extraction {
        calls,
        recovered: Some(recovered),
    }
}

/// Recover a `{"name": ..., "parameters": {...}}` object from free text.
///
/// Takes the span from the first `{` to the last `}`; if that does not parse,
/// one closing brace is appended to cover output cut off mid-object. The
/// parameters are double-encoding- and literal-repaired.
pub fn recover_tool_call(
    content: &str,
    catalog: &ToolCatalog,
) -> Option<(String, Map<String, Value>)> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    let candidate = content.get(start..=end)?;

    let parsed: Value = serde_json::from_str(candidate)
        .or_else(|_| serde_json::from_str(&format!("{candidate}}}")))
        .ok()?;

    let Value::Object(mut object) = parsed else {
        return None;
    };
    let name = match object.remove("name") {
        Some(Value::String(name)) => name,
        _ => return None,
    };
    if !catalog.contains(&name) {
        tracing::debug!(name = %name, "Ignoring JSON object naming an unknown tool");
        return None;
    }

    let parameters = match object.remove("parameters").map(repair_double_encoding) {
        Some(Value::Object(map)) => map,
        None | Some(Value::Null) => Map::new(),
        Some(other) => {
            tracing::debug!(tool = %name, parameters = %other, "Ignoring non-object parameters");
            Map::new()
        }
    };

    Some((name, repair_literals(parameters)))
}
