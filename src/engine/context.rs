// ABOUTME: Execution context carrying task state, metadata, and provenance
// ABOUTME: Provides per-execution isolation through owned deep copies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// The bundle of mutable state plus run metadata handed to each task.
///
/// A context given to one execution is never concurrently mutated by
/// another: `isolate()` hands every execution its own owned copy, and the
/// merge strategies are the only point where copies recombine. `state` is
/// the task-visible document; `metadata` and `provenance` travel alongside
/// it but are never read by `Task::extract_inputs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub state: Value,
    pub execution_id: String,
    pub user_id: Option<String>,
    pub metadata: HashMap<String, String>,
    pub provenance: Vec<ProvenanceEntry>,
}

/// One append-only log entry recording that a task ran against this context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub task_kind: String,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

impl Context {
    pub fn new(state: Value) -> Self {
        Self {
            state,
            execution_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            metadata: HashMap::new(),
            provenance: Vec::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn add_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&String> {
        self.metadata.get(key)
    }

    /// Produce the owned copy handed to a single execution.
    ///
    /// State is deep-copied; metadata and provenance are carried over. The
    /// copy gets its own execution id so results from sibling branches stay
    /// distinguishable.
    pub fn isolate(&self) -> Self {
        Self {
            state: self.state.clone(),
            execution_id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id.clone(),
            metadata: self.metadata.clone(),
            provenance: self.provenance.clone(),
        }
    }

    /// Append a provenance entry for a task run.
    pub fn record(&mut self, task_kind: impl Into<String>, note: Option<String>) {
        self.provenance.push(ProvenanceEntry {
            task_kind: task_kind.into(),
            timestamp: Utc::now(),
            note,
        });
    }

    /// SHA-256 hex digest of the canonically-serialized state.
    ///
    /// serde_json's default map is ordered by key, so two states with the
    /// same contents digest identically regardless of insertion order.
    pub fn state_digest(&self) -> String {
        let serialized = self.state.to_string();
        let mut hasher = Sha256::new();
        hasher.update(serialized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Fold a sibling branch into this context: its provenance appended in
    /// order, its metadata merged last-wins. State is not touched.
    pub fn absorb(&mut self, other: &Context) {
        self.provenance.extend(other.provenance.iter().cloned());
        for (key, value) in &other.metadata {
            self.metadata.insert(key.clone(), value.clone());
        }
    }
}
