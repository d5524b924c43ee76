// ABOUTME: Resource ceilings, usage counters, and threshold classification
// ABOUTME: Pure data plus enforcement checks; no I/O

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("Usage window ended before it started")]
    EndBeforeStart,

    #[error("Usage window was never started")]
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Memory,
    WallTime,
    Tokens,
    ConcurrentTasks,
    ExternalCalls,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Memory,
        ResourceKind::WallTime,
        ResourceKind::Tokens,
        ResourceKind::ConcurrentTasks,
        ResourceKind::ExternalCalls,
    ];
}

/// Optional per-resource ceilings. A `None` ceiling means unconstrained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    #[serde(default)]
    pub max_memory_bytes: Option<u64>,

    #[serde(with = "humantime_serde", default)]
    pub max_wall_time: Option<Duration>,

    #[serde(default)]
    pub max_tokens: Option<u64>,

    #[serde(default)]
    pub max_concurrent_tasks: Option<u64>,

    #[serde(default)]
    pub max_external_calls: Option<u64>,

    /// Fraction of a ceiling at which usage is flagged as a warning.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
}

fn default_warning_threshold() -> f64 {
    0.8
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_memory_bytes: None,
            max_wall_time: None,
            max_tokens: None,
            max_concurrent_tasks: None,
            max_external_calls: None,
            warning_threshold: default_warning_threshold(),
        }
    }
}

impl ResourceLimits {
    fn ceiling(&self, kind: ResourceKind) -> Option<u64> {
        match kind {
            ResourceKind::Memory => self.max_memory_bytes,
            ResourceKind::WallTime => self.max_wall_time.map(|d| d.as_millis() as u64),
            ResourceKind::Tokens => self.max_tokens,
            ResourceKind::ConcurrentTasks => self.max_concurrent_tasks,
            ResourceKind::ExternalCalls => self.max_external_calls,
        }
    }
}

/// Usage counters matched against `ResourceLimits`.
///
/// Tokens and external calls accumulate monotonically; memory and
/// concurrency are settable gauges; wall time is bracketed by
/// `start()`/`end()`.
#[derive(Debug, Clone, Default)]
pub struct ResourceUsage {
    memory_bytes: u64,
    tokens: u64,
    external_calls: u64,
    concurrent_tasks: u64,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl ResourceUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tokens(&mut self, count: u64) {
        self.tokens += count;
    }

    pub fn add_external_calls(&mut self, count: u64) {
        self.external_calls += count;
    }

    pub fn set_memory_bytes(&mut self, bytes: u64) {
        self.memory_bytes = bytes;
    }

    pub fn set_concurrent_tasks(&mut self, count: u64) {
        self.concurrent_tasks = count;
    }

    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    pub fn end(&mut self) -> Result<(), ResourceError> {
        let started = self.started_at.ok_or(ResourceError::NotStarted)?;
        let now = Utc::now();
        if now < started {
            return Err(ResourceError::EndBeforeStart);
        }
        self.finished_at = Some(now);
        Ok(())
    }

    /// Elapsed wall time: the closed bracket if ended, the running span if
    /// still open, `None` if never started.
    pub fn wall_time(&self) -> Option<Duration> {
        let started = self.started_at?;
        let until = self.finished_at.unwrap_or_else(Utc::now);
        (until - started).to_std().ok()
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn external_calls(&self) -> u64 {
        self.external_calls
    }

    fn current(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Memory => self.memory_bytes,
            ResourceKind::WallTime => self
                .wall_time()
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            ResourceKind::Tokens => self.tokens,
            ResourceKind::ConcurrentTasks => self.concurrent_tasks,
            ResourceKind::ExternalCalls => self.external_calls,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Ok,
    Warning,
    Exceeded,
}

/// Classifies usage against limits. Pure computation; callers decide what
/// to do with a warning or an exceeded budget.
#[derive(Debug, Clone)]
pub struct ResourceEnforcer {
    limits: ResourceLimits,
}

impl ResourceEnforcer {
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    pub fn check(&self, kind: ResourceKind, usage: &ResourceUsage) -> ResourceStatus {
        let Some(limit) = self.limits.ceiling(kind) else {
            return ResourceStatus::Ok;
        };

        let current = usage.current(kind);
        if current > limit {
            return ResourceStatus::Exceeded;
        }

        if limit > 0 {
            let percentage = current as f64 / limit as f64;
            if percentage >= self.limits.warning_threshold {
                return ResourceStatus::Warning;
            }
        }

        ResourceStatus::Ok
    }

    pub fn check_all(&self, usage: &ResourceUsage) -> Vec<(ResourceKind, ResourceStatus)> {
        ResourceKind::ALL
            .iter()
            .map(|kind| (*kind, self.check(*kind, usage)))
            .collect()
    }

    /// The most severe status across every resource kind.
    pub fn worst(&self, usage: &ResourceUsage) -> ResourceStatus {
        self.check_all(usage)
            .into_iter()
            .map(|(_, status)| status)
            .max()
            .unwrap_or(ResourceStatus::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_limit_is_always_ok() {
        let enforcer = ResourceEnforcer::new(ResourceLimits::default());
        let mut usage = ResourceUsage::new();
        usage.add_tokens(1_000_000);

        assert_eq!(enforcer.check(ResourceKind::Tokens, &usage), ResourceStatus::Ok);
    }

    #[test]
    fn test_warning_at_threshold() {
        let limits = ResourceLimits {
            max_tokens: Some(100),
            ..Default::default()
        };
        let enforcer = ResourceEnforcer::new(limits);

        let mut usage = ResourceUsage::new();
        usage.add_tokens(85);
        assert_eq!(enforcer.check(ResourceKind::Tokens, &usage), ResourceStatus::Warning);
    }

    #[test]
    fn test_exceeded_above_limit() {
        let limits = ResourceLimits {
            max_tokens: Some(100),
            ..Default::default()
        };
        let enforcer = ResourceEnforcer::new(limits);

        let mut usage = ResourceUsage::new();
        usage.add_tokens(101);
        assert_eq!(enforcer.check(ResourceKind::Tokens, &usage), ResourceStatus::Exceeded);
    }

    #[test]
    fn test_at_limit_is_warning_not_exceeded() {
        let limits = ResourceLimits {
            max_external_calls: Some(10),
            ..Default::default()
        };
        let enforcer = ResourceEnforcer::new(limits);

        let mut usage = ResourceUsage::new();
        usage.add_external_calls(10);
        assert_eq!(
            enforcer.check(ResourceKind::ExternalCalls, &usage),
            ResourceStatus::Warning
        );
    }

    #[test]
    fn test_end_without_start_errors() {
        let mut usage = ResourceUsage::new();
        assert!(matches!(usage.end(), Err(ResourceError::NotStarted)));
    }

    #[test]
    fn test_wall_time_bracket() {
        let mut usage = ResourceUsage::new();
        assert!(usage.wall_time().is_none());

        usage.start();
        usage.end().unwrap();
        assert!(usage.wall_time().is_some());
    }

    #[test]
    fn test_worst_picks_most_severe() {
        let limits = ResourceLimits {
            max_tokens: Some(100),
            max_external_calls: Some(10),
            ..Default::default()
        };
        let enforcer = ResourceEnforcer::new(limits);

        let mut usage = ResourceUsage::new();
        usage.add_tokens(50);
        usage.add_external_calls(11);

        assert_eq!(enforcer.worst(&usage), ResourceStatus::Exceeded);
    }
}
