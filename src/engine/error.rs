// ABOUTME: Error types for task execution engine operations
// ABOUTME: Defines the execution error enum and failure category classification

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ExecutionError {
    #[error("Invalid executor configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Rate limited: {message}")]
    RateLimited { message: String },

    #[error("Resource exhausted: {resource} - {message}")]
    ResourceExhausted { resource: String, message: String },

    #[error("Transient failure: {message}")]
    Transient { message: String },

    #[error("Task failed: {task_kind} - {message}")]
    TaskFailed { task_kind: String, message: String },

    #[error("Circuit open for task kind: {task_kind}")]
    CircuitOpen { task_kind: String },

    #[error("Merge failed: {message}")]
    MergeFailed { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Failure taxonomy driving the retry decision.
///
/// `Transient` and `Resource` are retryable; `Validation` (caller contract
/// violation) and `Fatal` (unexpected error) never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Transient,
    Resource,
    Validation,
    Fatal,
}

impl ErrorCategory {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Transient | ErrorCategory::Resource)
    }
}

impl ExecutionError {
    pub fn task_failed(task_kind: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutionError::TaskFailed {
            task_kind: task_kind.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ExecutionError::Validation {
            message: message.into(),
        }
    }

    /// Classify this error for the retry decision.
    ///
    /// Typed variants carry their category from the error's origin. Only
    /// `TaskFailed`, which wraps whatever crossed the external-call boundary,
    /// falls back to message inspection.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExecutionError::Validation { .. } | ExecutionError::InvalidConfiguration { .. } => {
                ErrorCategory::Validation
            }
            ExecutionError::RateLimited { .. } | ExecutionError::Transient { .. } => {
                ErrorCategory::Transient
            }
            ExecutionError::ResourceExhausted { .. } => ErrorCategory::Resource,
            ExecutionError::TaskFailed { message, .. } => classify_message(message),
            ExecutionError::CircuitOpen { .. } => ErrorCategory::Fatal,
            ExecutionError::MergeFailed { .. }
            | ExecutionError::Serialization { .. }
            | ExecutionError::Internal { .. } => ErrorCategory::Fatal,
        }
    }
}

/// Substring classification for errors whose origin could not self-tag.
///
/// First match wins, checked in a fixed order so the marker lists cannot
/// overlap. The "pool" marker is a known-coarse heuristic.
pub fn classify_message(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();

    const VALIDATION_MARKERS: &[&str] = &["validation", "invalid argument", "invalid input"];
    const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "429"];
    const RESOURCE_MARKERS: &[&str] = &["memory", "resource", "pool", "quota"];
    const TRANSIENT_MARKERS: &[&str] = &["connection", "timeout", "503", "unavailable"];

    if VALIDATION_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCategory::Validation
    } else if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCategory::Transient
    } else if RESOURCE_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCategory::Resource
    } else if TRANSIENT_MARKERS.iter().any(|m| lower.contains(m)) {
        ErrorCategory::Transient
    } else {
        ErrorCategory::Fatal
    }
}
