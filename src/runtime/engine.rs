//! Turn engine

use crate::config::EngineConfig;
use crate::conversation::ConversationHistory;
use crate::llm::{LlmError, LlmRequest, LlmService, Sampling};
use crate::state_machine::{
    transition, Effect, TransitionError, TurnContext, TurnEvent, TurnOutcome, TurnState,
};
use crate::tools::{ToolCatalog, ToolExecutor, ToolInvoker};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Final answer of a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub text: String,
    pub outcome: TurnOutcome,
    /// Completion requests made during the turn
    pub iterations: u32,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("A turn is already in progress")]
    Busy,
    #[error(transparent)]
    Transition(TransitionError),
}

impl From<TransitionError> for TurnError {
    fn from(error: TransitionError) -> Self {
        match error {
            TransitionError::Busy => TurnError::Busy,
            other @ TransitionError::InvalidTransition(_) => TurnError::Transition(other),
        }
    }
}

/// Runs turns of one conversation against an LLM and a tool executor
pub struct TurnEngine<L, T> {
    context: TurnContext,
    state: TurnState,
    history: ConversationHistory,
    llm: L,
    invoker: ToolInvoker<T>,
    sampling: Sampling,
}

impl<L, T> TurnEngine<L, T>
where
    L: LlmService,
    T: ToolExecutor,
{
    pub fn new(
        config: &EngineConfig,
        system_prompt: impl Into<String>,
        catalog: Arc<ToolCatalog>,
        llm: L,
        executor: T,
    ) -> Self {
        Self {
            context: TurnContext::new(config, Arc::clone(&catalog)),
            state: TurnState::Idle,
            history: ConversationHistory::new(system_prompt, config.retention),
            llm,
            invoker: ToolInvoker::new(catalog, executor),
            sampling: Sampling::default(),
        }
    }

    #[must_use]
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Drop everything but the system prompt
    pub fn reset(&mut self) {
        self.history.clear();
        self.state = TurnState::Idle;
    }

    /// Run one user turn to completion.
    ///
    /// A failed completion request aborts the turn; the history keeps
    /// everything appended so far and the engine accepts the next input.
    pub async fn run_turn(&mut self, text: impl Into<String>) -> Result<TurnReply, TurnError> {
        let turn_id = Uuid::new_v4();
        tracing::info!(turn_id = %turn_id, "Starting turn");

        let result = self.process(turn_id, text.into()).await;
        match &result {
            Ok(reply) => tracing::info!(
                turn_id = %turn_id,
                iterations = reply.iterations,
                outcome = ?reply.outcome,
                "Turn finished"
            ),
            Err(e) => {
                tracing::error!(turn_id = %turn_id, error = %e, "Turn aborted");
                if self.state.is_busy() {
                    self.state = TurnState::Idle;
                }
            }
        }
        result
    }

    async fn process(&mut self, turn_id: Uuid, text: String) -> Result<TurnReply, TurnError> {
        // Process events in a loop - no recursion
        let mut events_to_process = VecDeque::from([TurnEvent::UserMessage { text }]);
        let mut iterations = 0;

        while let Some(event) = events_to_process.pop_front() {
            // Pure state transition
            let result = transition(&self.state, &self.context, event)?;
            self.state = result.new_state;

            for effect in result.effects {
                if matches!(effect, Effect::RequestCompletion) {
                    iterations += 1;
                }
                if let Some(generated) = self.execute_effect(turn_id, iterations, effect).await? {
                    events_to_process.push_back(generated);
                }
            }
        }

        match &self.state {
            TurnState::Finished { reply, outcome } => Ok(TurnReply {
                text: reply.clone(),
                outcome: *outcome,
                iterations,
            }),
            other => Err(TurnError::Transition(TransitionError::InvalidTransition(format!(
                "Turn stopped without finishing: {other:?}"
            )))),
        }
    }

    async fn execute_effect(
        &mut self,
        turn_id: Uuid,
        iteration: u32,
        effect: Effect,
    ) -> Result<Option<TurnEvent>, TurnError> {
        match effect {
            Effect::AppendMessage { message } => {
                self.history.append(message);
                Ok(None)
            }

            Effect::PrepareHistory => {
                self.history.prune_or_summarize();
                Ok(None)
            }

            Effect::RequestCompletion => {
                let request = LlmRequest::new(self.history.sanitize_for_transmission())
                    .with_tools(self.context.catalog.definitions().to_vec())
                    .with_sampling(self.sampling);
                tracing::debug!(
                    turn_id = %turn_id,
                    iteration,
                    messages = request.messages.len(),
                    "Requesting completion"
                );
                let response = self.llm.complete(&request).await?;
                Ok(Some(TurnEvent::CompletionReceived { response }))
            }

            Effect::ExecuteTool { call } => {
                tracing::info!(
                    turn_id = %turn_id,
                    iteration,
                    tool = %call.name,
                    call_id = %call.id,
                    origin = %call.origin,
                    "Executing tool"
                );
                let result = self.invoker.invoke(&call.name, call.arguments).await;
                Ok(Some(TurnEvent::ToolFinished {
                    call_id: call.id,
                    result,
                }))
            }

            Effect::FinishTurn { reply, outcome } => {
                tracing::debug!(
                    turn_id = %turn_id,
                    outcome = ?outcome,
                    reply_len = reply.len(),
                    "Reply ready"
                );
                Ok(None)
            }
        }
    }
}
