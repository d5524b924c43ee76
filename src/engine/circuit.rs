// ABOUTME: Per-task-kind circuit breaker gating retry attempts
// ABOUTME: Tracks failure streaks and refuses retries while a circuit is open

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Failures beyond this count open the circuit.
    pub failure_threshold: u32,
    /// A failure older than this restarts the streak instead of extending it.
    #[serde(with = "humantime_serde")]
    pub failure_window: Duration,
    /// How long after the last failure an open circuit lets a probe through.
    #[serde(with = "humantime_serde")]
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct CircuitState {
    failure_count: u32,
    open: bool,
    last_failure: Option<Instant>,
}

impl CircuitState {
    fn new() -> Self {
        Self {
            failure_count: 0,
            open: false,
            last_failure: None,
        }
    }
}

/// Read-only view of one circuit, for stats and tests.
#[derive(Debug, Clone)]
pub struct CircuitSnapshot {
    pub failure_count: u32,
    pub open: bool,
}

/// Failure tally keyed by task kind.
///
/// Owns its state behind a single mutex; one instance per recovery wrapper,
/// torn down with it. The count is a streak counter, not a sliding window:
/// a success decrements it and closes the circuit, and a failure arriving
/// after `failure_window` of quiet restarts the streak.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    states: Mutex<HashMap<String, CircuitState>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed attempt for this task kind.
    pub fn record_failure(&self, task_kind: &str) {
        let mut states = self.states.lock().expect("circuit breaker lock poisoned");
        let state = states
            .entry(task_kind.to_string())
            .or_insert_with(CircuitState::new);

        let now = Instant::now();
        if let Some(last) = state.last_failure {
            if now.duration_since(last) > self.config.failure_window {
                state.failure_count = 0;
            }
        }

        state.failure_count += 1;
        state.last_failure = Some(now);

        if state.failure_count > self.config.failure_threshold && !state.open {
            warn!(
                "Circuit opened for task kind {} after {} failures",
                task_kind, state.failure_count
            );
            state.open = true;
        }
    }

    /// Record a successful attempt: the streak shrinks and an open circuit
    /// closes.
    pub fn record_success(&self, task_kind: &str) {
        let mut states = self.states.lock().expect("circuit breaker lock poisoned");
        if let Some(state) = states.get_mut(task_kind) {
            state.failure_count = state.failure_count.saturating_sub(1);
            if state.open {
                debug!("Circuit closed for task kind {}", task_kind);
                state.open = false;
            }
        }
    }

    /// Whether a retry for this task kind is currently admitted.
    ///
    /// An open circuit refuses retries until `cooldown` has elapsed since
    /// the last failure, at which point it is half-open: the next attempt
    /// goes through as a probe while the counter stays put.
    pub fn allows(&self, task_kind: &str) -> bool {
        let states = self.states.lock().expect("circuit breaker lock poisoned");
        let Some(state) = states.get(task_kind) else {
            return true;
        };

        if !state.open {
            return true;
        }

        match state.last_failure {
            Some(last) => last.elapsed() >= self.config.cooldown,
            None => true,
        }
    }

    pub fn snapshot(&self, task_kind: &str) -> Option<CircuitSnapshot> {
        let states = self.states.lock().expect("circuit breaker lock poisoned");
        states.get(task_kind).map(|s| CircuitSnapshot {
            failure_count: s.failure_count,
            open: s.open,
        })
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
