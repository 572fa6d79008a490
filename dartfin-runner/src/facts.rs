//! Fact export: one CSV per statement category, plus a parse-error report.
//!
//! Columns: account, value, context, unit. Missing context or unit refs are
//! written as empty cells. `parse_errors.csv` is only written when at least one
//! number-like fact failed to parse.

use crate::persist::{write_with_bom, PersistError};
use dartfin_core::domain::{ClassifiedFactSet, RawFact, StatementCategory};
use dartfin_core::facts::{classify_facts, extract_facts_from_path, FactError, FactParseError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

pub const PARSE_ERRORS_FILE: &str = "parse_errors.csv";

#[derive(Debug, Error)]
pub enum FactExportError {
    #[error(transparent)]
    Facts(#[from] FactError),

    #[error(transparent)]
    Write(#[from] PersistError),
}

/// What a fact export produced.
#[derive(Debug, Clone, Default)]
pub struct FactExportSummary {
    pub facts: usize,
    /// (category, rows written, file)
    pub categories: Vec<(StatementCategory, usize, PathBuf)>,
    pub parse_errors: usize,
    pub parse_error_file: Option<PathBuf>,
}

fn facts_csv(facts: &[RawFact]) -> Result<Vec<u8>, PersistError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["account", "value", "context", "unit"])
        .map_err(|e| PersistError::Csv(e.to_string()))?;
    for fact in facts {
        wtr.write_record([
            fact.account_tag.as_str(),
            fact.numeric_value.to_string().as_str(),
            fact.context_ref.as_deref().unwrap_or(""),
            fact.unit_ref.as_deref().unwrap_or(""),
        ])
        .map_err(|e| PersistError::Csv(e.to_string()))?;
    }
    wtr.into_inner().map_err(|e| PersistError::Csv(e.to_string()))
}

fn errors_csv(errors: &[FactParseError]) -> Result<Vec<u8>, PersistError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for err in errors {
        wtr.serialize(err)
            .map_err(|e| PersistError::Csv(e.to_string()))?;
    }
    wtr.into_inner().map_err(|e| PersistError::Csv(e.to_string()))
}

/// Write the three category files (always) and the error report (when needed).
pub fn export_fact_set(
    set: &ClassifiedFactSet,
    errors: &[FactParseError],
    dir: &Path,
) -> Result<FactExportSummary, PersistError> {
    fs::create_dir_all(dir).map_err(|e| PersistError::CreateDir {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut summary = FactExportSummary::default();
    for category in StatementCategory::ALL {
        let facts = set.get(category);
        let path = dir.join(format!("{}.csv", category.file_stem()));
        write_with_bom(&path, &facts_csv(facts)?)?;
        summary.categories.push((category, facts.len(), path));
    }

    let stale = dir.join(PARSE_ERRORS_FILE);
    if errors.is_empty() {
        // An old report from a previous run would misdescribe this document.
        if stale.exists() {
            fs::remove_file(&stale).map_err(|e| PersistError::Write {
                path: stale.display().to_string(),
                reason: e.to_string(),
            })?;
        }
    } else {
        write_with_bom(&stale, &errors_csv(errors)?)?;
        summary.parse_errors = errors.len();
        summary.parse_error_file = Some(stale);
    }

    Ok(summary)
}

/// Extract, classify and export the facts of one XBRL instance.
pub fn run_facts(xbrl: &Path, out_dir: &Path) -> Result<FactExportSummary, FactExportError> {
    let extraction = extract_facts_from_path(xbrl)?;
    let set = classify_facts(&extraction.facts);

    let mut summary = export_fact_set(&set, &extraction.errors, out_dir)?;
    summary.facts = extraction.facts.len();

    for (category, rows, path) in &summary.categories {
        info!(%category, rows, path = %path.display(), "facts exported");
    }
    if summary.parse_errors > 0 {
        warn!(errors = summary.parse_errors, "some number-like facts did not parse");
    }
    Ok(summary)
}
