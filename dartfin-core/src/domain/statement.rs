use super::corporate::EntityCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a statement aggregates subsidiaries or covers the parent alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Basis {
    Consolidated,
    Separate,
}

impl Basis {
    /// Retrieval order: consolidated first, separate as fallback.
    pub const FALLBACK_ORDER: [Basis; 2] = [Basis::Consolidated, Basis::Separate];

    /// `fs_div` query value used by the remote API.
    pub fn code(&self) -> &'static str {
        match self {
            Basis::Consolidated => "CFS",
            Basis::Separate => "OFS",
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single account row of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub account_tag: String,
    pub account_name: String,
    /// Current-term amount. `None` when the source left it blank or unparseable.
    pub value: Option<Decimal>,
    /// Statement division (BS, IS, CIS, CF, SCE).
    pub context_ref: String,
    /// Reporting currency.
    pub unit_ref: String,
    /// Remaining source columns, verbatim.
    pub detail: LineDetail,
}

/// Source columns of a statements row that the pipeline carries through
/// untouched. Amounts stay as the text the API sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineDetail {
    pub rcept_no: String,
    pub reprt_code: String,
    pub bsns_year: String,
    pub sj_nm: String,
    pub account_detail: String,
    pub thstrm_nm: String,
    pub thstrm_amount: String,
    pub thstrm_add_amount: String,
    pub frmtrm_nm: String,
    pub frmtrm_amount: String,
    pub frmtrm_q_nm: String,
    pub frmtrm_q_amount: String,
    pub frmtrm_add_amount: String,
    pub bfefrmtrm_nm: String,
    pub bfefrmtrm_amount: String,
    pub ord: String,
}

/// Parse a remote amount string: thousands separators allowed, blank means absent.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Statements for one entity and fiscal year on a single basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementFragment {
    pub entity_code: EntityCode,
    pub fiscal_year: i32,
    pub basis: Basis,
    pub items: Vec<LineItem>,
}

/// Year-ascending concatenation of every fragment obtained for one entity.
///
/// Holds at most one fragment per fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityFinancialHistory {
    fragments: Vec<StatementFragment>,
}

impl EntityFinancialHistory {
    /// Build from fragments in any order. Later duplicates for a year are discarded.
    pub fn from_fragments(mut fragments: Vec<StatementFragment>) -> Self {
        fragments.sort_by_key(|f| f.fiscal_year);
        fragments.dedup_by_key(|f| f.fiscal_year);
        Self { fragments }
    }

    pub fn fragments(&self) -> &[StatementFragment] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn years(&self) -> Vec<i32> {
        self.fragments.iter().map(|f| f.fiscal_year).collect()
    }

    pub fn line_count(&self) -> usize {
        self.fragments.iter().map(|f| f.items.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(year: i32, basis: Basis) -> StatementFragment {
        StatementFragment {
            entity_code: EntityCode::new("00000001"),
            fiscal_year: year,
            basis,
            items: vec![],
        }
    }

    #[test]
    fn amounts_with_separators() {
        assert_eq!(parse_amount("1,234,567"), Some(Decimal::from(1_234_567)));
        assert_eq!(parse_amount("-42"), Some(Decimal::from(-42)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("  "), None);
        assert_eq!(parse_amount("-"), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn history_sorted_by_year() {
        let h = EntityFinancialHistory::from_fragments(vec![
            fragment(2022, Basis::Separate),
            fragment(2020, Basis::Consolidated),
            fragment(2021, Basis::Consolidated),
        ]);
        assert_eq!(h.years(), vec![2020, 2021, 2022]);
    }

    #[test]
    fn history_keeps_one_fragment_per_year() {
        let h = EntityFinancialHistory::from_fragments(vec![
            fragment(2020, Basis::Consolidated),
            fragment(2020, Basis::Separate),
        ]);
        assert_eq!(h.fragments().len(), 1);
        assert_eq!(h.fragments()[0].basis, Basis::Consolidated);
    }

    #[test]
    fn basis_codes() {
        assert_eq!(Basis::Consolidated.code(), "CFS");
        assert_eq!(Basis::Separate.code(), "OFS");
    }
}
