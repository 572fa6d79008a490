//! Serializable run configuration.
//!
//! Everything a download run needs is collected here and handed to each
//! component at construction; nothing reads global state. Loadable from TOML,
//! with every field optional (missing fields take the defaults below).

use dartfin_core::api::{ApiConfig, RateLimiter, ReportKind, RetryPolicy, DEFAULT_BASE_URL};
use dartfin_core::registry::RegistryPolicy;
use dartfin_core::RetrievalConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pacing of outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// One token is refilled per interval.
    pub min_interval_ms: u64,
    /// Tokens that may accumulate while idle.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 200,
            burst: 1,
        }
    }
}

/// Retry behaviour for registry and per-entity calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub registry_max_retries: u32,
    pub registry_base_delay_ms: u64,
    /// Repeat a classification or statements call once after a transport failure.
    pub retry_entity_calls: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            registry_max_retries: 3,
            registry_base_delay_ms: 500,
            retry_entity_calls: false,
        }
    }
}

/// Configuration for one download run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub api_key: String,
    pub base_url: String,

    /// First fiscal year (inclusive).
    pub start_year: i32,
    /// Last fiscal year (inclusive).
    pub end_year: i32,
    pub report: ReportKind,

    /// Only process registry entries that carried a ticker at snapshot time.
    pub listed_only: bool,

    /// Root of the `listed/` and `delisted/` output collections.
    pub output_dir: PathBuf,
    pub cache_path: PathBuf,
    /// Registry snapshot lifetime. `None` keeps a verified snapshot forever.
    pub registry_ttl_hours: Option<u64>,
    pub force_refresh: bool,

    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,

    pub request_timeout_secs: u64,
    pub registry_timeout_secs: u64,

    /// Entities processed concurrently behind the shared limiter.
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            start_year: 2020,
            end_year: 2022,
            report: ReportKind::Annual,
            listed_only: true,
            output_dir: PathBuf::from("data"),
            cache_path: PathBuf::from("corp_codes.csv"),
            registry_ttl_hours: Some(7 * 24),
            force_refresh: false,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            request_timeout_secs: 30,
            registry_timeout_secs: 30,
            workers: 1,
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "api_key is empty (set it in the config file or DART_API_KEY)".into(),
            ));
        }
        if self.start_year > self.end_year {
            return Err(ConfigError::Invalid(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.rate_limit.burst == 0 {
            return Err(ConfigError::Invalid("rate_limit.burst must be at least 1".into()));
        }
        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            registry_timeout: Duration::from_secs(self.registry_timeout_secs),
        }
    }

    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(
            Duration::from_millis(self.rate_limit.min_interval_ms),
            self.rate_limit.burst,
        )
    }

    pub fn registry_policy(&self) -> RegistryPolicy {
        RegistryPolicy {
            ttl: self
                .registry_ttl_hours
                .map(|h| Duration::from_secs(h.saturating_mul(3600))),
            force_refresh: self.force_refresh,
            retry: RetryPolicy::exponential(
                self.retry.registry_max_retries,
                Duration::from_millis(self.retry.registry_base_delay_ms),
            ),
        }
    }

    /// Retry policy for classification and statements calls.
    pub fn entity_retry(&self) -> RetryPolicy {
        if self.retry.retry_entity_calls {
            RetryPolicy::single()
        } else {
            RetryPolicy::none()
        }
    }

    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig {
            start_year: self.start_year,
            end_year: self.end_year,
            report: self.report,
            retry: self.entity_retry(),
        }
    }
}
