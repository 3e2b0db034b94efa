//! Tool dispatch with in-band failure reporting

use super::{ToolCatalog, ToolExecutor, ToolInvocationResult};
use crate::normalize::repair_literals;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Validates and dispatches tool calls.
///
/// Every failure (unknown tool, bad arguments, executor error, even an
/// executor panic) becomes a failed [`ToolInvocationResult`] so the model can
/// react to it; nothing here aborts a turn.
pub struct ToolInvoker<T> {
    catalog: Arc<ToolCatalog>,
    executor: T,
}

impl<T: ToolExecutor> ToolInvoker<T> {
    pub fn new(catalog: Arc<ToolCatalog>, executor: T) -> Self {
        Self { catalog, executor }
    }

    pub async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> ToolInvocationResult {
        let arguments = repair_literals(arguments);

        let Some(definition) = self.catalog.get(name) else {
            tracing::warn!(tool = %name, "Model called an unknown tool");
            return ToolInvocationResult::failed(format!("Unknown tool: {name}"));
        };

        let arguments = match definition.validate(arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Rejected tool arguments");
                return ToolInvocationResult::failed(e.to_string());
            }
        };

        let start = std::time::Instant::now();
        let outcome = AssertUnwindSafe(self.executor.execute(name, &arguments))
            .catch_unwind()
            .await;
        let duration_ms = start.elapsed().as_millis();

        match outcome {
            Ok(Ok(payload)) => {
                tracing::info!(tool = %name, duration_ms = %duration_ms, "Tool succeeded");
                ToolInvocationResult::success(payload)
            }
            Ok(Err(e)) => {
                tracing::warn!(tool = %name, duration_ms = %duration_ms, error = %e, "Tool failed");
                ToolInvocationResult::failed(e.to_string())
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool executor panicked".to_string());
                tracing::error!(tool = %name, error = %message, "Tool executor panicked");
                ToolInvocationResult::failed(message)
            }
        }
    }
}
