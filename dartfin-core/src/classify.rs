//! Listing-status classification from a live entity-detail query.
//!
//! Status is never read from the registry snapshot's own ticker: listings
//! change between snapshot and run time, so every run asks again.

use crate::api::{ApiError, DisclosureApi, RateLimiter, RetryPolicy};
use crate::domain::{Classification, EntityCode};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Why an entity could not be classified. The caller skips such entities.
#[derive(Debug, Error)]
pub enum Unclassifiable {
    /// The API answered with a non-success status.
    #[error("detail query returned status {status}: {message}")]
    Status { status: String, message: String },
    /// The call itself failed.
    #[error("detail query failed: {0}")]
    Transport(#[source] ApiError),
}

/// Determines LISTED / DELISTED per entity.
pub struct ClassificationService {
    api: Arc<dyn DisclosureApi>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl ClassificationService {
    pub fn new(api: Arc<dyn DisclosureApi>, limiter: Arc<RateLimiter>, retry: RetryPolicy) -> Self {
        Self {
            api,
            limiter,
            retry,
        }
    }

    pub fn classify(&self, entity_code: &EntityCode) -> Result<Classification, Unclassifiable> {
        let resp = self
            .retry
            .run(
                "company detail",
                || {
                    self.limiter.acquire();
                    self.api.company(entity_code)
                },
                ApiError::is_transient,
            )
            .map_err(Unclassifiable::Transport)?;

        if !resp.is_success() {
            debug!(entity = %entity_code, status = %resp.status, "unclassifiable");
            return Err(Unclassifiable::Status {
                status: resp.status,
                message: resp.message,
            });
        }

        Ok(match resp.ticker() {
            Some(_) => Classification::Listed,
            None => Classification::Delisted,
        })
    }
}
