use serde::{Deserialize, Serialize};
use std::fmt;

/// A tagged numeric value extracted from an XBRL instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    /// Local name of the element (namespace prefix stripped).
    pub account_tag: String,
    pub numeric_value: f64,
    pub context_ref: Option<String>,
    pub unit_ref: Option<String>,
}

/// Financial-statement category a fact can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementCategory {
    Balance,
    Income,
    CashFlow,
}

impl StatementCategory {
    pub const ALL: [StatementCategory; 3] = [
        StatementCategory::Balance,
        StatementCategory::Income,
        StatementCategory::CashFlow,
    ];

    /// Tag keywords matched case-insensitively as substrings.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            StatementCategory::Balance => &["Assets", "Liabilities", "Equity"],
            StatementCategory::Income => &["Revenue", "Profit", "Loss", "OperatingIncome"],
            StatementCategory::CashFlow => &["CashFlows", "NetCash", "CashAndCashEquivalents"],
        }
    }

    /// Export file stem for this category.
    pub fn file_stem(&self) -> &'static str {
        match self {
            StatementCategory::Balance => "balance_sheet",
            StatementCategory::Income => "income_statement",
            StatementCategory::CashFlow => "cashflow_statement",
        }
    }
}

impl fmt::Display for StatementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementCategory::Balance => f.write_str("BALANCE"),
            StatementCategory::Income => f.write_str("INCOME"),
            StatementCategory::CashFlow => f.write_str("CASHFLOW"),
        }
    }
}

/// Facts filed per category. A fact may appear under several categories or none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedFactSet {
    pub balance: Vec<RawFact>,
    pub income: Vec<RawFact>,
    pub cash_flow: Vec<RawFact>,
}

impl ClassifiedFactSet {
    pub fn get(&self, category: StatementCategory) -> &[RawFact] {
        match category {
            StatementCategory::Balance => &self.balance,
            StatementCategory::Income => &self.income,
            StatementCategory::CashFlow => &self.cash_flow,
        }
    }

    pub fn get_mut(&mut self, category: StatementCategory) -> &mut Vec<RawFact> {
        match category {
            StatementCategory::Balance => &mut self.balance,
            StatementCategory::Income => &mut self.income,
            StatementCategory::CashFlow => &mut self.cash_flow,
        }
    }
}
