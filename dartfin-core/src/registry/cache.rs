//! Registry snapshot cache.
//!
//! Layout: `{path}` holds the records as CSV (`corp_code,corp_name,stock_code`)
//! and `{path}.meta.json` a sidecar with the write time, record count and a
//! BLAKE3 checksum of the CSV bytes.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Freshness check against a TTL
//! - Integrity check on load (checksum, record count)
//!
//! There are no incremental updates: a stale snapshot is replaced wholesale.

use super::RegistryError;
use crate::domain::CorporateRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Metadata sidecar for the cached snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub cached_at: DateTime<Utc>,
    pub record_count: usize,
    pub checksum: String,
    pub source: String,
}

impl CacheMeta {
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.cached_at
    }
}

/// Outcome of looking the snapshot up.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Missing,
    Stale { reason: String },
    Fresh {
        records: Vec<CorporateRecord>,
        meta: CacheMeta,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    corp_code: String,
    corp_name: String,
    stock_code: Option<String>,
}

/// File-backed registry snapshot.
#[derive(Debug, Clone)]
pub struct RegistryCache {
    path: PathBuf,
}

impl RegistryCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn meta_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".meta.json");
        PathBuf::from(name)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Replace the snapshot with `records`.
    pub fn write(
        &self,
        records: &[CorporateRecord],
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<CacheMeta, RegistryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RegistryError::Cache(format!("failed to create dir: {e}")))?;
        }

        let bytes = encode_records(records)?;

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, &bytes)
            .map_err(|e| RegistryError::Cache(format!("write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            RegistryError::Cache(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            cached_at: now,
            record_count: records.len(),
            checksum: blake3::hash(&bytes).to_hex().to_string(),
            source: source.to_string(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| RegistryError::Cache(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(), meta_json)
            .map_err(|e| RegistryError::Cache(format!("meta write: {e}")))?;

        Ok(meta)
    }

    /// Sidecar metadata, if present and readable.
    pub fn read_meta(&self) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path()).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Look the snapshot up. `ttl = None` means a verified snapshot never expires.
    pub fn lookup(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> CacheLookup {
        if !self.exists() {
            return CacheLookup::Missing;
        }

        let Some(meta) = self.read_meta() else {
            return stale("metadata sidecar missing or unreadable");
        };

        if let Some(ttl) = ttl {
            let age = meta.age(now);
            let expired = match age.to_std() {
                Ok(age) => age > ttl,
                // cached_at in the future: clock skew, treat as just written
                Err(_) => false,
            };
            if expired {
                return stale(format!("snapshot is {}h old", age.num_hours()));
            }
        }

        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) => return stale(format!("read failed: {e}")),
        };

        if blake3::hash(&bytes).to_hex().as_str() != meta.checksum {
            return stale("checksum mismatch");
        }

        let records = match decode_records(&bytes) {
            Ok(r) => r,
            Err(e) => return stale(e.to_string()),
        };

        if records.len() != meta.record_count {
            return stale(format!(
                "record count {} does not match metadata {}",
                records.len(),
                meta.record_count
            ));
        }

        CacheLookup::Fresh { records, meta }
    }
}

fn stale(reason: impl Into<String>) -> CacheLookup {
    CacheLookup::Stale {
        reason: reason.into(),
    }
}

fn encode_records(records: &[CorporateRecord]) -> Result<Vec<u8>, RegistryError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for r in records {
        wtr.serialize(CacheRow {
            corp_code: r.entity_code.0.clone(),
            corp_name: r.display_name.clone(),
            stock_code: r.stock_code.clone(),
        })
        .map_err(|e| RegistryError::Cache(format!("csv encode: {e}")))?;
    }
    wtr.into_inner()
        .map_err(|e| RegistryError::Cache(format!("csv flush: {e}")))
}

fn decode_records(bytes: &[u8]) -> Result<Vec<CorporateRecord>, RegistryError> {
    let mut rdr = csv::Reader::from_reader(bytes);
    rdr.deserialize::<CacheRow>()
        .map(|row| {
            row.map(|r| CorporateRecord::new(r.corp_code, r.corp_name, r.stock_code))
                .map_err(|e| RegistryError::Cache(format!("csv decode: {e}")))
        })
        .collect()
}
