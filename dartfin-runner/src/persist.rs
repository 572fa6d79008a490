//! Per-entity CSV artifacts.
//!
//! Layout: `{output_dir}/listed/{name}_{code}.csv` and
//! `{output_dir}/delisted/{name}_{code}.csv`.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet tools pick the right
//! encoding. Each write fully replaces the previous file; writes are not atomic.

use dartfin_core::domain::{Classification, CorporateRecord, EntityFinancialHistory};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot create {path}: {reason}")]
    CreateDir { path: String, reason: String },

    #[error("cannot write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("csv encoding failed: {0}")]
    Csv(String),
}

/// Root of the listed/delisted collections.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir_for(&self, classification: Classification) -> PathBuf {
        self.root.join(classification.collection())
    }

    /// Create both collections.
    pub fn ensure(&self) -> Result<(), PersistError> {
        for c in [Classification::Listed, Classification::Delisted] {
            let dir = self.dir_for(c);
            fs::create_dir_all(&dir).map_err(|e| PersistError::CreateDir {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn artifact_path(&self, record: &CorporateRecord, classification: Classification) -> PathBuf {
        self.dir_for(classification).join(artifact_file_name(record))
    }
}

/// Make a display name safe as a file-name component: path separators become
/// `_`, whitespace is removed.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// `{sanitized name}_{entity code}.csv`. The code keeps names unique.
pub fn artifact_file_name(record: &CorporateRecord) -> String {
    format!(
        "{}_{}.csv",
        sanitize_name(&record.display_name),
        sanitize_name(record.entity_code.as_str())
    )
}

/// Artifact header. Entity and request columns first, then every source
/// column of the statements row in the API's documented order.
pub const HISTORY_COLUMNS: [&str; 24] = [
    "corp_code",
    "corp_name",
    "year",
    "fs_div",
    "rcept_no",
    "reprt_code",
    "bsns_year",
    "sj_div",
    "sj_nm",
    "account_id",
    "account_nm",
    "account_detail",
    "thstrm_nm",
    "thstrm_amount",
    "thstrm_add_amount",
    "frmtrm_nm",
    "frmtrm_amount",
    "frmtrm_q_nm",
    "frmtrm_q_amount",
    "frmtrm_add_amount",
    "bfefrmtrm_nm",
    "bfefrmtrm_amount",
    "ord",
    "currency",
];

/// Render a history as CSV bytes, BOM included. Amounts are written as the
/// API sent them.
pub fn encode_history(
    record: &CorporateRecord,
    history: &EntityFinancialHistory,
) -> Result<Vec<u8>, PersistError> {
    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());

    wtr.write_record(HISTORY_COLUMNS)
        .map_err(|e| PersistError::Csv(e.to_string()))?;

    for fragment in history.fragments() {
        let year = fragment.fiscal_year.to_string();
        for item in &fragment.items {
            let d = &item.detail;
            wtr.write_record([
                record.entity_code.as_str(),
                record.display_name.as_str(),
                year.as_str(),
                fragment.basis.code(),
                d.rcept_no.as_str(),
                d.reprt_code.as_str(),
                d.bsns_year.as_str(),
                item.context_ref.as_str(),
                d.sj_nm.as_str(),
                item.account_tag.as_str(),
                item.account_name.as_str(),
                d.account_detail.as_str(),
                d.thstrm_nm.as_str(),
                d.thstrm_amount.as_str(),
                d.thstrm_add_amount.as_str(),
                d.frmtrm_nm.as_str(),
                d.frmtrm_amount.as_str(),
                d.frmtrm_q_nm.as_str(),
                d.frmtrm_q_amount.as_str(),
                d.frmtrm_add_amount.as_str(),
                d.bfefrmtrm_nm.as_str(),
                d.bfefrmtrm_amount.as_str(),
                d.ord.as_str(),
                item.unit_ref.as_str(),
            ])
            .map_err(|e| PersistError::Csv(e.to_string()))?;
        }
    }

    wtr.into_inner()
        .map_err(|e| PersistError::Csv(e.to_string()))
}

/// Write one entity's artifact into the collection for its classification.
pub fn persist(
    layout: &OutputLayout,
    record: &CorporateRecord,
    history: &EntityFinancialHistory,
    classification: Classification,
) -> Result<PathBuf, PersistError> {
    let bytes = encode_history(record, history)?;
    let path = layout.artifact_path(record, classification);
    fs::write(&path, bytes).map_err(|e| PersistError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(path)
}

/// Write pre-encoded CSV bytes with a leading BOM.
pub fn write_with_bom(path: &Path, csv_bytes: &[u8]) -> Result<(), PersistError> {
    let mut out = Vec::with_capacity(UTF8_BOM.len() + csv_bytes.len());
    out.extend_from_slice(UTF8_BOM);
    out.extend_from_slice(csv_bytes);
    fs::write(path, out).map_err(|e| PersistError::Write {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
