//! Domain types for dartfin

pub mod corporate;
pub mod fact;
pub mod statement;

pub use corporate::{normalize_ticker, Classification, CorporateRecord, EntityCode};
pub use fact::{ClassifiedFactSet, RawFact, StatementCategory};
pub use statement::{
    parse_amount, Basis, EntityFinancialHistory, LineDetail, LineItem, StatementFragment,
};

/// Ordered registry snapshot.
pub type Registry = Vec<CorporateRecord>;
