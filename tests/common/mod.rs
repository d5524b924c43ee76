// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides scripted task implementations and context builders

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use flowline::engine::{Context, ExecutionError, NextAction, Task};

pub fn test_context(state: Value) -> Context {
    Context::new(state)
}

/// Reads `state["counter"]`, records the observed value under its own name,
/// and writes the incremented counter back. Used to prove isolation: every
/// concurrent execution must observe the same pre-increment value.
pub struct CountingTask {
    pub name: String,
}

impl CountingTask {
    pub fn new(name: &str) -> Arc<dyn Task> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl Task for CountingTask {
    fn kind(&self) -> &str {
        &self.name
    }

    fn extract_inputs(&self, state: &Value) -> Value {
        json!({ "counter": state.get("counter").cloned().unwrap_or(Value::Null) })
    }

    fn apply_result(&self, state: &mut Value, result: &Value) {
        state[&self.name] = result.clone();
    }

    async fn execute(&self, ctx: &mut Context) -> Result<NextAction, ExecutionError> {
        let observed = ctx.state["counter"].as_i64().unwrap_or(0);

        // Yield so sibling branches interleave before we write back
        tokio::task::yield_now().await;

        let observed_value = json!(observed);
        self.apply_result(&mut ctx.state, &observed_value);
        ctx.state["counter"] = json!(observed + 1);

        Ok(NextAction::Terminal)
    }
}

/// Writes a fixed value into the state and terminates.
pub struct SetValueTask {
    pub name: String,
    pub key: String,
    pub value: Value,
}

impl SetValueTask {
    pub fn new(name: &str, key: &str, value: Value) -> Arc<dyn Task> {
        Arc::new(Self {
            name: name.to_string(),
            key: key.to_string(),
            value,
        })
    }
}

#[async_trait]
impl Task for SetValueTask {
    fn kind(&self) -> &str {
        &self.name
    }

    fn extract_inputs(&self, state: &Value) -> Value {
        json!({ "key": self.key, "prior": state.get(&self.key).cloned() })
    }

    fn apply_result(&self, state: &mut Value, result: &Value) {
        state[&self.key] = result.clone();
    }

    async fn execute(&self, ctx: &mut Context) -> Result<NextAction, ExecutionError> {
        let value = self.value.clone();
        self.apply_result(&mut ctx.state, &value);
        Ok(NextAction::Terminal)
    }
}

/// Always fails with the given message; optionally mutates state first so
/// partial-progress assertions have something to see.
pub struct FailingTask {
    pub name: String,
    pub message: String,
    pub mutate_before_failing: bool,
}

impl FailingTask {
    pub fn new(name: &str, message: &str) -> Arc<dyn Task> {
        Arc::new(Self {
            name: name.to_string(),
            message: message.to_string(),
            mutate_before_failing: false,
        })
    }

    pub fn with_partial_progress(name: &str, message: &str) -> Arc<dyn Task> {
        Arc::new(Self {
            name: name.to_string(),
            message: message.to_string(),
            mutate_before_failing: true,
        })
    }
}

#[async_trait]
impl Task for FailingTask {
    fn kind(&self) -> &str {
        &self.name
    }

    fn extract_inputs(&self, _state: &Value) -> Value {
        json!({})
    }

    fn apply_result(&self, _state: &mut Value, _result: &Value) {}

    async fn execute(&self, ctx: &mut Context) -> Result<NextAction, ExecutionError> {
        if self.mutate_before_failing {
            ctx.state["partial"] = json!(true);
        }
        Err(ExecutionError::task_failed(&self.name, &self.message))
    }
}

/// Fails `failures_before_success` times, then succeeds. The attempt counter
/// is shared so the script survives re-execution of the same task value.
pub struct FlakyTask {
    pub name: String,
    pub message: String,
    pub failures_before_success: u32,
    pub attempts: Arc<AtomicU32>,
}

impl FlakyTask {
    pub fn new(name: &str, message: &str, failures_before_success: u32) -> (Arc<dyn Task>, Arc<AtomicU32>) {
        let attempts = Arc::new(AtomicU32::new(0));
        let task = Arc::new(Self {
            name: name.to_string(),
            message: message.to_string(),
            failures_before_success,
            attempts: Arc::clone(&attempts),
        });
        (task, attempts)
    }
}

#[async_trait]
impl Task for FlakyTask {
    fn kind(&self) -> &str {
        &self.name
    }

    fn extract_inputs(&self, _state: &Value) -> Value {
        json!({})
    }

    fn apply_result(&self, state: &mut Value, result: &Value) {
        state["outcome"] = result.clone();
    }

    async fn execute(&self, ctx: &mut Context) -> Result<NextAction, ExecutionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures_before_success {
            return Err(ExecutionError::task_failed(&self.name, &self.message));
        }

        let outcome = json!("ok");
        self.apply_result(&mut ctx.state, &outcome);
        Ok(NextAction::Terminal)
    }
}

/// Sleeps, then succeeds. For concurrency-bound observations.
pub struct SlowTask {
    pub name: String,
    pub delay: Duration,
    pub active: Arc<AtomicU32>,
    pub peak: Arc<AtomicU32>,
}

impl SlowTask {
    pub fn new(name: &str, delay: Duration, active: Arc<AtomicU32>, peak: Arc<AtomicU32>) -> Arc<dyn Task> {
        Arc::new(Self {
            name: name.to_string(),
            delay,
            active,
            peak,
        })
    }
}

#[async_trait]
impl Task for SlowTask {
    fn kind(&self) -> &str {
        &self.name
    }

    fn extract_inputs(&self, _state: &Value) -> Value {
        json!({})
    }

    fn apply_result(&self, _state: &mut Value, _result: &Value) {}

    async fn execute(&self, _ctx: &mut Context) -> Result<NextAction, ExecutionError> {
        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;

        // Track the high-water mark of concurrently running tasks
        loop {
            let seen = self.peak.load(Ordering::SeqCst);
            if current <= seen
                || self
                    .peak
                    .compare_exchange_weak(seen, current, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                break;
            }
        }

        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(NextAction::Terminal)
    }
}

/// Counts how many times the underlying work actually ran; used to prove a
/// cache hit skipped re-execution.
pub struct TrackedTask {
    pub name: String,
    pub version: Option<String>,
    pub runs: Arc<AtomicU32>,
}

impl TrackedTask {
    pub fn new(name: &str) -> (Arc<dyn Task>, Arc<AtomicU32>) {
        Self::with_version(name, None)
    }

    pub fn with_version(name: &str, version: Option<&str>) -> (Arc<dyn Task>, Arc<AtomicU32>) {
        let runs = Arc::new(AtomicU32::new(0));
        let task = Arc::new(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
            runs: Arc::clone(&runs),
        });
        (task, runs)
    }
}

#[async_trait]
impl Task for TrackedTask {
    fn kind(&self) -> &str {
        &self.name
    }

    fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn extract_inputs(&self, state: &Value) -> Value {
        json!({ "doc": state.get("doc").cloned().unwrap_or(Value::Null) })
    }

    fn apply_result(&self, state: &mut Value, result: &Value) {
        state["derived"] = result.clone();
    }

    async fn execute(&self, ctx: &mut Context) -> Result<NextAction, ExecutionError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let doc = ctx.state["doc"].as_str().unwrap_or("").to_string();
        let derived = json!(format!("derived:{}", doc));
        self.apply_result(&mut ctx.state, &derived);
        Ok(NextAction::Terminal)
    }
}
