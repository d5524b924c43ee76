// ABOUTME: Deterministic cache key derivation from task identity and inputs
// ABOUTME: SHA-256 over (kind, version, canonical JSON) so key order never matters

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::engine::Task;

/// Derive the cache key for a task and its extracted inputs.
pub fn cache_key(task: &dyn Task, inputs: &Value) -> String {
    cache_key_parts(task.kind(), task.version(), inputs)
}

/// Key derivation from raw parts.
///
/// The composition is `kind \n version-or-none \n canonical-json(inputs)`.
/// serde_json serializes object keys in sorted order, so two structurally
/// equal input documents produce the same digest regardless of how they
/// were built.
pub fn cache_key_parts(kind: &str, version: Option<&str>, inputs: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(b"\n");
    hasher.update(version.unwrap_or("none").as_bytes());
    hasher.update(b"\n");
    hasher.update(inputs.to_string().as_bytes());
    format!("{}:{:x}", kind, hasher.finalize())
}
