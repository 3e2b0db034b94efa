//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use crate::llm::{FragmentStream, LlmError, LlmRequest, LlmResponse, LlmService};
use crate::tools::{ToolError, ToolExecutor};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    streams: Mutex<VecDeque<Vec<String>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Queue the fragments of one streamed completion
    pub fn queue_stream(&self, fragments: &[&str]) {
        self.streams
            .lock()
            .unwrap()
            .push_back(fragments.iter().map(ToString::to_string).collect());
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    async fn stream(&self, request: &LlmRequest) -> Result<FragmentStream, LlmError> {
        let queued = self.streams.lock().unwrap().pop_front();
        let Some(fragments) = queued else {
            return self.complete(request).await.map(|response| {
                let fragments: Vec<Result<String, LlmError>> =
                    response.content.into_iter().map(Ok).collect();
                Box::pin(futures::stream::iter(fragments)) as FragmentStream
            });
        };
        self.requests.lock().unwrap().push(request.clone());
        Ok(Box::pin(futures::stream::iter(fragments.into_iter().map(Ok))))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// What a mocked tool does when called
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed(Value),
    Fail(String),
    Panic,
}

/// Mock tool executor with scripted outcomes.
///
/// Queued outcomes are consumed in call order first; after that each tool
/// answers with its configured outcome, and unknown tools succeed.
pub struct MockToolExecutor {
    outcomes: HashMap<String, MockOutcome>,
    queued: Mutex<VecDeque<MockOutcome>>,
    /// Record of tool executions
    pub executions: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            queued: Mutex::new(VecDeque::new()),
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Give a tool a fixed outcome
    pub fn with_outcome(mut self, name: impl Into<String>, outcome: MockOutcome) -> Self {
        self.outcomes.insert(name.into(), outcome);
        self
    }

    /// Queue outcomes for the next calls, whatever tool they name
    pub fn with_queued(self, outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        self.queued.lock().unwrap().extend(outcomes);
        self
    }

    /// Get recorded executions
    pub fn recorded_executions(&self) -> Vec<(String, Map<String, Value>)> {
        self.executions.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));

        let queued = self.queued.lock().unwrap().pop_front();
        let outcome = queued
            .or_else(|| self.outcomes.get(name).cloned())
            .unwrap_or_else(|| MockOutcome::Succeed(json!({"ok": true})));

        match outcome {
            MockOutcome::Succeed(value) => Ok(value),
            MockOutcome::Fail(message) => Err(ToolError::Failed(message)),
            MockOutcome::Panic => panic!("mock tool {name} panicked"),
        }
    }
}
