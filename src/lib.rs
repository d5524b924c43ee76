// ABOUTME: Main library module for the flowline task execution engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cache;
pub mod config;
pub mod engine;
pub mod limits;

// Re-export commonly used types
pub use cache::{CacheStats, CachedExecutor, InMemoryCache, NoOpCache, ResultCache};
pub use config::{CacheConfig, ConfigError, EngineConfig};
pub use engine::{
    CircuitBreaker, CircuitBreakerConfig, Context, ErrorCategory, ErrorRecovery, ExecutionError,
    ExecutionResult, ExecutionStats, MergeStrategy, NextAction, ParallelExecutor, RetryPolicy, Task,
};
pub use limits::{
    ConcurrencyModel, RateLimitProfile, ResourceEnforcer, ResourceKind, ResourceLimits,
    ResourceStatus, ResourceUsage,
};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
