// ABOUTME: Engine configuration loaded from YAML with sensible defaults
// ABOUTME: Bundles executor, retry, circuit, cache, and provider rate-limit settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::engine::{CircuitBreakerConfig, RetryPolicy};
use crate::limits::{ConcurrencyError, ConcurrencyModel, RateLimitProfile, ResourceLimits};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub circuit: CircuitBreakerConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate-limit profiles keyed by provider name.
    #[serde(default)]
    pub providers: HashMap<String, RateLimitProfile>,

    #[serde(default)]
    pub limits: ResourceLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_entries")]
    pub max_entries: usize,

    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub ttl: Duration,
}

fn default_max_concurrent() -> usize {
    4
}

fn default_safety_margin() -> f64 {
    0.8
}

fn default_cache_entries() -> usize {
    1024
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(3600)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            safety_margin: default_safety_margin(),
            retry: RetryPolicy::default(),
            circuit: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
            providers: HashMap::new(),
            limits: ResourceLimits::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_cache_entries(),
            ttl: default_cache_ttl(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml(&content)
    }

    /// Build the concurrency model for a named provider profile.
    pub fn concurrency_for(&self, provider: &str) -> Result<ConcurrencyModel, ConfigError> {
        let profile = self
            .providers
            .get(provider)
            .ok_or_else(|| ConfigError::UnknownProvider {
                name: provider.to_string(),
            })?;

        Ok(ConcurrencyModel::new(profile.clone(), self.safety_margin)?)
    }
}
