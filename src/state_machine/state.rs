//! Turn state types

use crate::config::EngineConfig;
use crate::extract::{ResolvedCall, ToolCallPrecedence};
use crate::tools::ToolCatalog;
use std::sync::Arc;

/// Where the current turn stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TurnState {
    /// Ready for user input
    #[default]
    Idle,

    /// Completion request `iteration` (1-based) is in flight
    AwaitingCompletion {
        iteration: u32,
        /// Latest assistant text, returned if the turn ends without more
        candidate: Option<String>,
    },

    /// Executing the calls of iteration `iteration`, one at a time
    ExecutingTools {
        iteration: u32,
        current: ResolvedCall,
        remaining: Vec<ResolvedCall>,
        candidate: Option<String>,
    },

    /// Turn finished with a reply
    Finished { reply: String, outcome: TurnOutcome },
}

impl TurnState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            TurnState::AwaitingCompletion { .. } | TurnState::ExecutingTools { .. }
        )
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Backend reported normal completion
    Completed,
    /// Backend stopped on its length limit
    Truncated,
    /// Iteration budget ran out
    Exhausted,
}

/// Fixed inputs to every transition of a session
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub max_iterations: u32,
    pub precedence: ToolCallPrecedence,
    pub catalog: Arc<ToolCatalog>,
}

impl TurnContext {
    pub fn new(config: &EngineConfig, catalog: Arc<ToolCatalog>) -> Self {
        Self {
            max_iterations: config.max_iterations.max(1),
            precedence: config.precedence,
            catalog,
        }
    }
}
