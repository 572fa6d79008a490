//! Registry resolution: fresh cache, or download → decode → cache.

use super::archive::decode_archive;
use super::cache::{CacheLookup, RegistryCache};
use super::RegistryError;
use crate::api::{DisclosureApi, RateLimiter, RetryPolicy};
use crate::domain::Registry;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Cache and retry policy for registry resolution.
#[derive(Debug, Clone)]
pub struct RegistryPolicy {
    /// Maximum snapshot age. `None` trusts a verified snapshot indefinitely.
    pub ttl: Option<Duration>,
    /// Ignore any cached snapshot.
    pub force_refresh: bool,
    pub retry: RetryPolicy,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            ttl: Some(Duration::from_secs(7 * 24 * 3600)),
            force_refresh: false,
            retry: RetryPolicy::exponential(3, Duration::from_millis(500)),
        }
    }
}

/// Where the resolved registry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    Cache,
    Network,
}

#[derive(Debug, Clone)]
pub struct ResolvedRegistry {
    pub records: Registry,
    pub source: RegistrySource,
}

/// Obtains the full corporate registry, once per run.
pub struct RegistryResolver {
    api: Arc<dyn DisclosureApi>,
    cache: RegistryCache,
    limiter: Arc<RateLimiter>,
    policy: RegistryPolicy,
}

impl RegistryResolver {
    pub fn new(
        api: Arc<dyn DisclosureApi>,
        cache: RegistryCache,
        limiter: Arc<RateLimiter>,
        policy: RegistryPolicy,
    ) -> Self {
        Self {
            api,
            cache,
            limiter,
            policy,
        }
    }

    pub fn cache(&self) -> &RegistryCache {
        &self.cache
    }

    /// Return the registry, touching the network only when the cache is missing or stale.
    pub fn resolve(&self) -> Result<ResolvedRegistry, RegistryError> {
        if !self.policy.force_refresh {
            match self.cache.lookup(self.policy.ttl, Utc::now()) {
                CacheLookup::Fresh { records, meta } => {
                    info!(
                        path = %self.cache.path().display(),
                        records = records.len(),
                        cached_at = %meta.cached_at,
                        "using cached registry"
                    );
                    return Ok(ResolvedRegistry {
                        records,
                        source: RegistrySource::Cache,
                    });
                }
                CacheLookup::Stale { reason } => {
                    warn!(path = %self.cache.path().display(), %reason, "registry cache is stale, refetching");
                }
                CacheLookup::Missing => {}
            }
        }

        info!(source = self.api.name(), "downloading registry");
        let records = self.policy.retry.run(
            "registry download",
            || self.fetch(),
            RegistryError::is_retryable,
        )?;

        self.cache.write(&records, self.api.name(), Utc::now())?;
        info!(records = records.len(), path = %self.cache.path().display(), "registry cached");

        Ok(ResolvedRegistry {
            records,
            source: RegistrySource::Network,
        })
    }

    fn fetch(&self) -> Result<Registry, RegistryError> {
        self.limiter.acquire();
        let payload = self.api.registry_archive().map_err(RegistryError::Network)?;
        decode_archive(&payload)
    }
}
