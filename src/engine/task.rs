// ABOUTME: The polymorphic task abstraction and successor routing type
// ABOUTME: Tasks read inputs from isolated state, do one unit of work, and pick the next task

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use super::context::Context;
use super::error::Result;

/// One unit of work in the execution graph.
///
/// Implementations are stateless across invocations except for what they
/// close over at construction; all per-run state lives in the `Context`
/// handed to `execute`. `kind()` is the stable identifier used for cache
/// keys and circuit breaker accounting, so it must not change between
/// releases unless `version()` changes with it.
#[async_trait]
pub trait Task: Send + Sync {
    /// Stable identifier for this task kind.
    fn kind(&self) -> &str;

    /// Optional version tag; bumping it invalidates previously cached results.
    fn version(&self) -> Option<&str> {
        None
    }

    /// Project the slice of state this task's work depends on.
    ///
    /// The projection is what the cache key is derived from, so it must be
    /// deterministic and must cover every state field the task reads.
    fn extract_inputs(&self, state: &Value) -> Value;

    /// Fold a work product back into the state document.
    fn apply_result(&self, state: &mut Value, result: &Value);

    /// Perform the unit of work against an isolated context and decide the
    /// successor. The external call, if any, happens in here.
    async fn execute(&self, ctx: &mut Context) -> Result<NextAction>;
}

/// Where execution goes after a task completes.
#[derive(Clone)]
pub enum NextAction {
    Continue(Arc<dyn Task>),
    Terminal,
}

impl NextAction {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NextAction::Terminal)
    }

    /// Kind of the successor task, if there is one.
    pub fn next_kind(&self) -> Option<&str> {
        match self {
            NextAction::Continue(task) => Some(task.kind()),
            NextAction::Terminal => None,
        }
    }
}

impl fmt::Debug for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAction::Continue(task) => write!(f, "Continue({})", task.kind()),
            NextAction::Terminal => write!(f, "Terminal"),
        }
    }
}
