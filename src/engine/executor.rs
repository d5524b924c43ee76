// ABOUTME: Parallel task executor with per-execution state isolation
// ABOUTME: Bounds concurrency with a semaphore and preserves input ordering of results

use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use super::context::Context;
use super::error::{ExecutionError, Result};
use super::result::ExecutionResult;
use super::task::Task;

/// Runs tasks concurrently, each against its own isolated copy of the
/// caller's context.
///
/// A counting semaphore bounds how many executions (and therefore how many
/// in-flight context clones) exist at once. The caller's context is never
/// mutated; every branch returns an owned, updated copy on its result.
#[derive(Clone)]
pub struct ParallelExecutor {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
}

impl ParallelExecutor {
    /// Create an executor with the given concurrency bound.
    pub fn new(max_concurrent: usize) -> Result<Self> {
        if max_concurrent < 1 {
            return Err(ExecutionError::InvalidConfiguration {
                message: format!("max_concurrent must be at least 1, got {}", max_concurrent),
            });
        }

        Ok(Self {
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
        })
    }

    /// Execute a batch of independent tasks concurrently.
    ///
    /// One spawned future per task; results come back in input order no
    /// matter which branch finishes first. A branch that fails terminates
    /// itself only — siblings run to completion.
    #[instrument(skip(self, tasks, ctx), fields(task_count = tasks.len()))]
    pub async fn execute(&self, tasks: &[Arc<dyn Task>], ctx: &Context) -> Vec<ExecutionResult> {
        if tasks.is_empty() {
            return Vec::new();
        }

        info!("Executing batch of {} tasks", tasks.len());

        let kinds: Vec<String> = tasks.iter().map(|t| t.kind().to_string()).collect();

        let handles: Vec<_> = tasks
            .iter()
            .map(|task| {
                let executor = self.clone();
                let task = Arc::clone(task);
                let ctx = ctx.clone();

                tokio::spawn(async move { executor.execute_one(task, &ctx).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut results = Vec::with_capacity(joined.len());
        for (kind, outcome) in kinds.into_iter().zip(joined) {
            match outcome {
                Ok(result) => results.push(result),
                Err(join_error) => {
                    // A panicked branch becomes a failed result instead of
                    // poisoning the whole batch.
                    error!("Task {} aborted: {}", kind, join_error);
                    let message = format!("task {} aborted: {}", kind, join_error);
                    results.push(ExecutionResult::failed(
                        kind,
                        ctx.isolate(),
                        std::time::Duration::ZERO,
                        ExecutionError::Internal { message },
                    ));
                }
            }
        }

        results
    }

    /// Execute a single task against an isolated copy of `ctx`.
    ///
    /// The permit is acquired before the context is cloned so that the
    /// number of in-flight clones is bounded along with the executions.
    pub async fn execute_one(&self, task: Arc<dyn Task>, ctx: &Context) -> ExecutionResult {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("executor semaphore closed");

        let kind = task.kind().to_string();
        debug!("Starting task execution: {}", kind);

        let mut isolated = ctx.isolate();
        isolated.record(&kind, None);

        let start = Instant::now();
        let outcome = task.execute(&mut isolated).await;
        let duration = start.elapsed();

        match outcome {
            Ok(next) => {
                debug!("Task {} completed in {:?}", kind, duration);
                ExecutionResult::succeeded(kind, next, isolated, duration)
            }
            Err(err) => {
                error!("Task {} failed: {}", kind, err);
                ExecutionResult::failed(kind, isolated, duration, err)
            }
        }
    }

    /// Current executor utilization.
    pub fn stats(&self) -> ExecutorStats {
        let available = self.semaphore.available_permits();
        ExecutorStats {
            max_concurrent: self.max_concurrent,
            available_permits: available,
            active_tasks: self.max_concurrent - available,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorStats {
    pub max_concurrent: usize,
    pub available_permits: usize,
    pub active_tasks: usize,
}

impl ExecutorStats {
    pub fn utilization_percentage(&self) -> f64 {
        if self.max_concurrent == 0 {
            0.0
        } else {
            (self.active_tasks as f64 / self.max_concurrent as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_rejects_zero_concurrency() {
        assert!(ParallelExecutor::new(0).is_err());
        assert!(ParallelExecutor::new(1).is_ok());
    }

    #[tokio::test]
    async fn test_executor_stats_idle() {
        let executor = ParallelExecutor::new(4).unwrap();
        let stats = executor.stats();

        assert_eq!(stats.max_concurrent, 4);
        assert_eq!(stats.active_tasks, 0);
        assert_eq!(stats.utilization_percentage(), 0.0);
    }

    #[test]
    fn test_utilization_percentage() {
        let stats = ExecutorStats {
            max_concurrent: 4,
            available_permits: 2,
            active_tasks: 2,
        };
        assert_eq!(stats.utilization_percentage(), 50.0);

        let empty = ExecutorStats {
            max_concurrent: 0,
            available_permits: 0,
            active_tasks: 0,
        };
        assert_eq!(empty.utilization_percentage(), 0.0);
    }
}
