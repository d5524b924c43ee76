// ABOUTME: Per-execution result type and read-only batch statistics
// ABOUTME: Defines the success/failure invariants for a single task run

use std::time::Duration;

use super::context::Context;
use super::error::ExecutionError;
use super::task::NextAction;

/// The outcome of one task execution against one isolated context.
///
/// Invariant: `error.is_some()` exactly when the run failed, and a failed
/// run always routes to `Terminal`. The context is the isolated copy the
/// task mutated — on failure it is returned partially mutated so callers
/// can inspect how far the work got.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub task_kind: String,
    pub next: NextAction,
    pub context: Context,
    pub duration: Duration,
    pub error: Option<ExecutionError>,
}

impl ExecutionResult {
    pub fn succeeded(
        task_kind: impl Into<String>,
        next: NextAction,
        context: Context,
        duration: Duration,
    ) -> Self {
        Self {
            task_kind: task_kind.into(),
            next,
            context,
            duration,
            error: None,
        }
    }

    /// Build a failed result. The successor is forced to `Terminal`
    /// regardless of what the task would have routed to.
    pub fn failed(
        task_kind: impl Into<String>,
        context: Context,
        duration: Duration,
        error: ExecutionError,
    ) -> Self {
        Self {
            task_kind: task_kind.into(),
            next: NextAction::Terminal,
            context,
            duration,
            error: Some(error),
        }
    }

    /// Synthesize a zero-duration result from a cached execution.
    pub fn from_cache(task_kind: impl Into<String>, context: Context, next: NextAction) -> Self {
        Self {
            task_kind: task_kind.into(),
            next,
            context,
            duration: Duration::ZERO,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Read-only aggregate over a batch of execution results.
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub avg_duration: Duration,
    pub total_duration: Duration,
    pub errors: Vec<String>,
}

impl ExecutionStats {
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let failed = total - succeeded;

        let success_rate = if total > 0 {
            succeeded as f64 / total as f64
        } else {
            0.0
        };

        let total_duration: Duration = results.iter().map(|r| r.duration).sum();
        let min_duration = results.iter().map(|r| r.duration).min().unwrap_or(Duration::ZERO);
        let max_duration = results.iter().map(|r| r.duration).max().unwrap_or(Duration::ZERO);
        let avg_duration = if total > 0 {
            total_duration / total as u32
        } else {
            Duration::ZERO
        };

        let errors = results
            .iter()
            .filter_map(|r| {
                r.error
                    .as_ref()
                    .map(|e| format!("{}: {}", r.task_kind, e))
            })
            .collect();

        Self {
            total,
            succeeded,
            failed,
            success_rate,
            min_duration,
            max_duration,
            avg_duration,
            total_duration,
            errors,
        }
    }
}
