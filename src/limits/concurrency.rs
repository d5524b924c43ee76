// ABOUTME: Derives a safe concurrency budget from provider rate limits
// ABOUTME: Pure arithmetic feeding the executor bound and resource ceilings

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::resources::ResourceLimits;

#[derive(Error, Debug)]
pub enum ConcurrencyError {
    #[error("Safety margin must be in (0, 1], got {0}")]
    InvalidSafetyMargin(f64),
}

/// Documented rate limits of an external provider, supplied as static
/// configuration — nothing here is discovered at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitProfile {
    pub requests_per_minute: f64,
    pub tokens_per_minute: f64,
    #[serde(default)]
    pub max_concurrent_requests: Option<u32>,
    pub avg_tokens_per_request: f64,
    pub avg_latency_seconds: f64,
}

/// Translates a provider's rate limits into executor-sized numbers.
#[derive(Debug, Clone)]
pub struct ConcurrencyModel {
    profile: RateLimitProfile,
    safety_margin: f64,
}

impl ConcurrencyModel {
    pub fn new(profile: RateLimitProfile, safety_margin: f64) -> Result<Self, ConcurrencyError> {
        if safety_margin <= 0.0 || safety_margin > 1.0 {
            return Err(ConcurrencyError::InvalidSafetyMargin(safety_margin));
        }
        Ok(Self {
            profile,
            safety_margin,
        })
    }

    /// How many external calls may safely be in flight at once.
    ///
    /// Uses the provider's hard concurrency cap when documented; otherwise
    /// Little's law (arrival rate x latency) approximates the steady-state
    /// in-flight count. Never below 1.
    pub fn max_parallel_calls(&self) -> usize {
        let uncapped = match self.profile.max_concurrent_requests {
            Some(cap) => cap as f64,
            None => self.profile.requests_per_minute / 60.0 * self.profile.avg_latency_seconds,
        };

        let budget = (self.safety_margin * uncapped).floor() as usize;
        budget.max(1)
    }

    /// How many tasks may run in parallel when each holds
    /// `expected_concurrent_callers` calls open on average. Never below 1.
    pub fn max_parallel_tasks(&self, expected_concurrent_callers: u32) -> usize {
        let callers = expected_concurrent_callers.max(1) as usize;
        (self.max_parallel_calls() / callers).max(1)
    }

    /// Requests per minute the budget could sustain, bounded by whichever
    /// provider limit binds first.
    pub fn theoretical_throughput_rpm(&self) -> f64 {
        let request_bound = self.profile.requests_per_minute;
        let token_bound = if self.profile.avg_tokens_per_request > 0.0 {
            self.profile.tokens_per_minute / self.profile.avg_tokens_per_request
        } else {
            f64::INFINITY
        };
        let concurrency_bound = match self.profile.max_concurrent_requests {
            Some(cap) if self.profile.avg_latency_seconds > 0.0 => {
                cap as f64 / self.profile.avg_latency_seconds * 60.0
            }
            _ => f64::INFINITY,
        };

        self.safety_margin * request_bound.min(token_bound).min(concurrency_bound)
    }

    /// Resource ceilings implied by the call budget, for the enforcer.
    pub fn resource_limits(&self) -> ResourceLimits {
        ResourceLimits {
            max_concurrent_tasks: Some(self.max_parallel_calls() as u64),
            ..Default::default()
        }
    }

    pub fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    pub fn profile(&self) -> &RateLimitProfile {
        &self.profile
    }
}
