// ABOUTME: Classification-driven retry with exponential backoff and circuit breaking
// ABOUTME: Wraps the parallel executor so transient failures are retried safely

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::circuit::{CircuitBreaker, CircuitBreakerConfig};
use super::context::Context;
use super::executor::ParallelExecutor;
use super::result::ExecutionResult;
use super::task::Task;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Spread delays by ±25% to avoid thundering-herd retries.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(300),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms =
            (self.initial_delay.as_millis() as f64 * self.backoff_factor.powi(exponent)) as u64;

        let mut delay = Duration::from_millis(delay_ms);
        if delay > self.max_delay {
            delay = self.max_delay;
        }

        if self.jitter {
            let factor = rand::thread_rng().gen_range(0.75..=1.25);
            delay = Duration::from_millis((delay.as_millis() as f64 * factor) as u64);
        }

        delay
    }

    pub fn exponential_backoff(max_attempts: u32, initial_delay: Duration, factor: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor: factor,
            ..Default::default()
        }
    }

    pub fn fixed_delay(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            backoff_factor: 1.0,
            max_delay: delay,
            jitter: false,
        }
    }
}

/// Retrying wrapper around a `ParallelExecutor`.
///
/// Each invocation walks ATTEMPT(n) -> success | classify -> backoff ->
/// ATTEMPT(n+1), giving up on non-retryable categories, an exhausted attempt
/// budget, or an open circuit. The caller's context is untouched throughout;
/// the final failure carries the failing attempt's isolated context.
pub struct ErrorRecovery {
    executor: ParallelExecutor,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
}

impl ErrorRecovery {
    pub fn new(executor: ParallelExecutor, policy: RetryPolicy) -> Self {
        Self {
            executor,
            policy,
            breaker: CircuitBreaker::default(),
        }
    }

    pub fn with_breaker_config(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = CircuitBreaker::new(config);
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Execute one task, retrying retryable failures under the policy.
    ///
    /// Runs at least one attempt even when `max_attempts` is zero.
    pub async fn execute_with_retry(
        &self,
        task: Arc<dyn Task>,
        ctx: &Context,
    ) -> ExecutionResult {
        let kind = task.kind().to_string();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            debug!(
                "Executing task {} (attempt {}/{})",
                kind, attempt, self.policy.max_attempts
            );

            let result = self.executor.execute_one(Arc::clone(&task), ctx).await;

            let Some(error) = result.error.as_ref() else {
                if attempt > 1 {
                    info!("Task {} succeeded on attempt {}", kind, attempt);
                }
                self.breaker.record_success(&kind);
                return result;
            };

            self.breaker.record_failure(&kind);

            let category = error.category();
            if !category.is_retryable() {
                warn!(
                    "Task {} failed with non-retryable {:?} error: {}",
                    kind, category, error
                );
                return result;
            }

            if attempt >= self.policy.max_attempts {
                warn!("Task {} failed after {} attempt(s): {}", kind, attempt, error);
                return result;
            }

            if !self.breaker.allows(&kind) {
                warn!("Circuit open for task kind {}; not retrying", kind);
                return result;
            }

            let delay = self.policy.delay_for_attempt(attempt);
            debug!("Task {} failed ({:?}); retrying in {:?}", kind, category, delay);
            sleep(delay).await;
        }
    }

    /// Execute a batch, each task independently retried, results in input
    /// order. Concurrency stays bounded by the inner executor's semaphore.
    pub async fn execute(&self, tasks: &[Arc<dyn Task>], ctx: &Context) -> Vec<ExecutionResult> {
        let futures = tasks
            .iter()
            .map(|task| self.execute_with_retry(Arc::clone(task), ctx));
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(600),
            jitter: false,
        };

        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(600));
    }

    #[test]
    fn test_jitter_stays_within_band() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(10),
            jitter: true,
        };

        for _ in 0..50 {
            let delay = policy.delay_for_attempt(1);
            assert!(delay >= Duration::from_millis(750), "delay {:?} below band", delay);
            assert!(delay <= Duration::from_millis(1250), "delay {:?} above band", delay);
        }
    }

    #[test]
    fn test_fixed_delay_never_grows() {
        let policy = RetryPolicy::fixed_delay(4, Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(50));
    }
}
