// ABOUTME: Resource budgets and rate-limit-derived concurrency planning
// ABOUTME: Exports limits, usage tracking, enforcement, and the concurrency model

pub mod concurrency;
pub mod resources;

pub use concurrency::{ConcurrencyError, ConcurrencyModel, RateLimitProfile};
pub use resources::{
    ResourceEnforcer, ResourceError, ResourceKind, ResourceLimits, ResourceStatus, ResourceUsage,
};
