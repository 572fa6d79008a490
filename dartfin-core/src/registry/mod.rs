//! Corporate registry: archive decoding, snapshot cache and resolution.

pub mod archive;
pub mod cache;
pub mod resolver;

pub use archive::{decode_archive, parse_registry_xml, INNER_DOCUMENT, ZIP_SIGNATURE};
pub use cache::{CacheLookup, CacheMeta, RegistryCache};
pub use resolver::{RegistryPolicy, RegistryResolver, RegistrySource, ResolvedRegistry};

use crate::api::ApiError;
use thiserror::Error;

/// Registry failures. All of them abort a run.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry download failed: {0}")]
    Network(#[source] ApiError),

    #[error("unexpected registry format: {0}")]
    Format(String),

    #[error("registry cache error: {0}")]
    Cache(String),
}

impl RegistryError {
    /// Only transient transport failures are worth another download attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Network(e) if e.is_transient())
    }
}
