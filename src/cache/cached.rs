// ABOUTME: Executor wrapper that memoizes successful task results
// ABOUTME: Cache hits substitute a zero-duration result; misses delegate and store

use futures::future::join_all;
use std::sync::Arc;
use tracing::debug;

use super::key::cache_key;
use super::{CachedExecution, ResultCache};
use crate::engine::{Context, ExecutionResult, ParallelExecutor, Task};

/// Composes a `ParallelExecutor` with a result cache so previously-seen
/// (task, inputs) pairs skip re-execution.
pub struct CachedExecutor {
    executor: ParallelExecutor,
    cache: Arc<dyn ResultCache>,
}

impl CachedExecutor {
    pub fn new(executor: ParallelExecutor, cache: Arc<dyn ResultCache>) -> Self {
        Self { executor, cache }
    }

    pub fn cache(&self) -> &dyn ResultCache {
        self.cache.as_ref()
    }

    /// Execute one task, consulting the cache first.
    ///
    /// The key covers the task's declared inputs only, so unrelated state
    /// churn does not defeat memoization. Only successful results are ever
    /// stored.
    pub async fn execute_one(&self, task: Arc<dyn Task>, ctx: &Context) -> ExecutionResult {
        let inputs = task.extract_inputs(&ctx.state);
        let key = cache_key(task.as_ref(), &inputs);

        if let Some(cached) = self.cache.get(&key) {
            debug!("Cache hit for task {} ({})", task.kind(), key);
            return ExecutionResult::from_cache(task.kind(), cached.context, cached.next);
        }

        let result = self.executor.execute_one(Arc::clone(&task), ctx).await;

        if result.is_success() {
            self.cache.set(
                key,
                CachedExecution {
                    context: result.context.clone(),
                    next: result.next.clone(),
                },
                task.version().map(str::to_string),
            );
        }

        result
    }

    /// Execute a batch concurrently, each task cache-checked independently,
    /// all under the inner executor's concurrency bound. Results come back
    /// in input order.
    pub async fn execute(&self, tasks: &[Arc<dyn Task>], ctx: &Context) -> Vec<ExecutionResult> {
        let futures = tasks.iter().map(|task| self.execute_one(Arc::clone(task), ctx));
        join_all(futures).await
    }
}
