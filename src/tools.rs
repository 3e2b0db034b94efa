//! Robot tools: catalog, argument validation and dispatch
//!
//! The engine never executes a tool itself. It validates the arguments
//! against the immutable [`ToolCatalog`] and hands the call to a
//! [`ToolExecutor`], usually the robot control server.

mod catalog;
mod http;
mod invoker;

pub use catalog::{
    ArgumentError, CatalogError, ParameterSchema, ParameterSpec, ParameterType, ToolCatalog,
    ToolDefinition,
};
pub use http::HttpToolExecutor;
pub use invoker::ToolInvoker;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a tool executor
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool server unreachable: {0}")]
    Transport(String),
    #[error("Tool server rejected the call (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("{0}")]
    Failed(String),
}

/// Executes a named tool with already-validated arguments
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        (**self).execute(name, arguments).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    Success,
    Failed,
}

/// Outcome of one tool invocation, as reported back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub status: InvocationStatus,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolInvocationResult {
    pub fn success(payload: Value) -> Self {
        Self {
            status: InvocationStatus::Success,
            payload,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Failed,
            payload: Value::Null,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }

    /// Content of the `tool` message answering the call
    pub fn to_message_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"failed","error":"unserializable tool result: {e}"}}"#)
        })
    }
}
