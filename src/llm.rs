//! LLM provider abstraction
//!
//! One chat-completions backend (any `OpenAI`-compatible server such as
//! vLLM), wrapped by a logging decorator.

mod config;
mod error;
mod openai;
mod stream;
mod types;

pub use config::LlmConfig;
pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAIService;
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Stream of text fragments from a streaming completion
pub type FragmentStream = BoxStream<'static, Result<String, LlmError>>;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Make a streaming completion request, yielding text fragments.
    ///
    /// The default runs a regular completion and yields its text at once.
    async fn stream(&self, request: &LlmRequest) -> Result<FragmentStream, LlmError> {
        let response = self.complete(request).await?;
        let fragments: Vec<Result<String, LlmError>> =
            response.content.into_iter().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(fragments)))
    }

    /// Get the model ID
    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: LlmService + ?Sized> LlmService for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    async fn stream(&self, request: &LlmRequest) -> Result<FragmentStream, LlmError> {
        (**self).stream(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    finish_reason = %response.finish_reason,
                    tool_calls = response.tool_calls.len(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM request failed"
                );
            }
        }

        result
    }

    async fn stream(&self, request: &LlmRequest) -> Result<FragmentStream, LlmError> {
        let result = self.inner.stream(request).await;
        match &result {
            Ok(_) => tracing::info!(
                model = %self.model_id,
                messages = request.messages.len(),
                "LLM stream opened"
            ),
            Err(e) => tracing::error!(
                model = %self.model_id,
                error = %e.message,
                kind = ?e.kind,
                "LLM stream failed"
            ),
        }
        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
