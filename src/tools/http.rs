//! HTTP client for the robot control server

use super::{CatalogError, ToolCatalog, ToolError, ToolExecutor};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Executes tools via `POST {base_url}/execute_tool`
pub struct HttpToolExecutor {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ExecuteToolRequest<'a> {
    tool_name: &'a str,
    arguments: &'a Map<String, Value>,
}

impl HttpToolExecutor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ToolError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the server's tool listing (`GET /tools`)
    pub async fn fetch_catalog(&self) -> Result<ToolCatalog, CatalogError> {
        let url = format!("{}/tools", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Fetch(format!("{url}: HTTP {status}")));
        }

        let listing: Value = response
            .json()
            .await
            .map_err(|e| CatalogError::Fetch(format!("{url}: invalid body: {e}")))?;
        let catalog = ToolCatalog::from_listing(&listing)?;
        tracing::info!(tools = catalog.len(), url = %url, "Fetched tool catalog");
        Ok(catalog)
    }
}

#[async_trait]
impl ToolExecutor for HttpToolExecutor {
    async fn execute(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        let url = format!("{}/execute_tool", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ExecuteToolRequest {
                tool_name: name,
                arguments,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Transport(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    ToolError::Transport(format!("Connection failed: {e}"))
                } else {
                    ToolError::Transport(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(ToolError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
