use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier assigned by the disclosure source (8-digit `corp_code`).
///
/// Kept as text end to end: codes carry leading zeros.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCode(pub String);

impl EntityCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the corporate registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateRecord {
    pub entity_code: EntityCode,
    pub display_name: String,
    /// Exchange ticker at snapshot time. Not used for listing status.
    pub stock_code: Option<String>,
}

impl CorporateRecord {
    pub fn new(
        entity_code: impl Into<String>,
        display_name: impl Into<String>,
        stock_code: Option<String>,
    ) -> Self {
        Self {
            entity_code: EntityCode::new(entity_code),
            display_name: display_name.into(),
            stock_code: normalize_ticker(stock_code),
        }
    }

    /// Whether the snapshot carried a ticker for this entity.
    pub fn has_ticker(&self) -> bool {
        self.stock_code.is_some()
    }
}

/// Whitespace-only tickers are how the registry marks "no ticker".
pub fn normalize_ticker(stock_code: Option<String>) -> Option<String> {
    stock_code.filter(|s| !s.trim().is_empty())
}

/// Listing status derived from a live detail query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Listed,
    Delisted,
}

impl Classification {
    /// Directory name of the output collection for this status.
    pub fn collection(&self) -> &'static str {
        match self {
            Classification::Listed => "listed",
            Classification::Delisted => "delisted",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Listed => f.write_str("LISTED"),
            Classification::Delisted => f.write_str("DELISTED"),
        }
    }
}
