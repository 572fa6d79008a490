//! XBRL fact extraction and statement classification.
//!
//! Independent of the network pipeline: works on one local document.

pub mod classify;
pub mod extract;

pub use classify::{categories_for, classify_facts};
pub use extract::{extract_facts, extract_facts_from_path, parse_numeric};

use crate::domain::RawFact;
use serde::Serialize;
use thiserror::Error;

/// Document-level failures. Per-fact problems are `FactParseError`s instead.
#[derive(Debug, Error)]
pub enum FactError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("malformed XBRL near byte {position}: {reason}")]
    Xml { position: u64, reason: String },
}

/// A namespace-qualified element whose text is not numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactParseError {
    pub tag: String,
    pub text: String,
    /// Byte offset of the element's start tag.
    pub position: u64,
}

/// Extracted facts together with the elements that failed to parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactExtraction {
    pub facts: Vec<RawFact>,
    pub errors: Vec<FactParseError>,
}
