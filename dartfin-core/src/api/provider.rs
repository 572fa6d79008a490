//! Disclosure API trait, response shapes and structured error types.
//!
//! The `DisclosureApi` trait abstracts over the remote source so the resolver,
//! classifier and retrieval engine can be driven by the live client or by an
//! in-memory double in tests.

use crate::domain::{Basis, EntityCode, LineDetail};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Status code the remote API uses for a successful response.
pub const STATUS_OK: &str = "000";

/// Status code for "no data found".
pub const STATUS_NO_DATA: &str = "013";

/// Transport-level failures talking to the remote API.
///
/// Non-success *API statuses* are not errors at this level; they travel in the
/// response bodies and each component decides what they mean.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("HTTP {status} from {endpoint}")]
    Http { endpoint: String, status: u16 },

    #[error("failed to decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("client setup failed: {0}")]
    Client(String),
}

impl ApiError {
    /// Whether repeating the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Http { status, .. } => *status == 429 || *status >= 500,
            ApiError::Decode { .. } | ApiError::Client(_) => false,
        }
    }
}

/// Periodic report the statements endpoint is queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Annual business report.
    #[default]
    Annual,
    HalfYear,
    FirstQuarter,
    ThirdQuarter,
}

impl ReportKind {
    /// `reprt_code` query value.
    pub fn code(&self) -> &'static str {
        match self {
            ReportKind::Annual => "11011",
            ReportKind::HalfYear => "11012",
            ReportKind::FirstQuarter => "11013",
            ReportKind::ThirdQuarter => "11014",
        }
    }
}

/// Parameters of a single statements call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementQuery {
    pub entity_code: EntityCode,
    pub year: i32,
    pub report: ReportKind,
    pub basis: Basis,
}

impl fmt::Display for StatementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.entity_code,
            self.year,
            self.report.code(),
            self.basis
        )
    }
}

/// Body of the entity-detail endpoint (only the fields we read).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub corp_name: Option<String>,
    #[serde(default)]
    pub stock_code: Option<String>,
}

impl CompanyResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Ticker, if the response carries a non-blank one.
    pub fn ticker(&self) -> Option<&str> {
        self.stock_code
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One account row from the statements endpoint.
///
/// The four columns the pipeline interprets are named; every other documented
/// column lands in `detail`. Undocumented fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementRow {
    #[serde(default)]
    pub sj_div: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub account_nm: String,
    #[serde(default)]
    pub currency: String,
    #[serde(flatten)]
    pub detail: LineDetail,
}

impl StatementRow {
    pub fn new(
        sj_div: &str,
        account_id: &str,
        account_nm: &str,
        amount: &str,
        currency: &str,
    ) -> Self {
        Self {
            sj_div: sj_div.to_string(),
            account_id: account_id.to_string(),
            account_nm: account_nm.to_string(),
            currency: currency.to_string(),
            detail: LineDetail {
                thstrm_amount: amount.to_string(),
                ..Default::default()
            },
        }
    }

    /// Current-term amount text as sent.
    pub fn amount(&self) -> &str {
        &self.detail.thstrm_amount
    }
}

/// Body of the statements endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatementResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub list: Vec<StatementRow>,
}

impl StatementResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Remote disclosure source: registry archive, entity detail, statements.
pub trait DisclosureApi: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Raw bytes of the registry archive.
    fn registry_archive(&self) -> Result<Vec<u8>, ApiError>;

    /// Entity-detail lookup.
    fn company(&self, entity_code: &EntityCode) -> Result<CompanyResponse, ApiError>;

    /// Full statements for one entity/year/report/basis.
    fn statements(&self, query: &StatementQuery) -> Result<StatementResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_ticker_blank_is_none() {
        let resp: CompanyResponse =
            serde_json::from_str(r#"{"status":"000","message":"OK","stock_code":" "}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.ticker(), None);
    }

    #[test]
    fn company_missing_ticker_field() {
        let resp: CompanyResponse = serde_json::from_str(r#"{"status":"000"}"#).unwrap();
        assert_eq!(resp.ticker(), None);
    }

    #[test]
    fn statements_error_body_has_no_list() {
        let resp: StatementResponse =
            serde_json::from_str(r#"{"status":"013","message":"no data"}"#).unwrap();
        assert!(!resp.is_success());
        assert!(resp.list.is_empty());
    }

    #[test]
    fn statement_row_keeps_every_documented_column() {
        let resp: StatementResponse = serde_json::from_str(
            r#"{"status":"000","list":[{"rcept_no":"20220308000798","reprt_code":"11011",
            "bsns_year":"2021","corp_code":"00126380","sj_div":"BS","sj_nm":"재무상태표",
            "account_id":"ifrs-full_Assets","account_nm":"자산총계","account_detail":"-",
            "thstrm_nm":"제 53 기","thstrm_amount":"426,621,158","frmtrm_nm":"제 52 기",
            "frmtrm_amount":"378,235,718","bfefrmtrm_nm":"제 51 기","bfefrmtrm_amount":"352,564,497",
            "ord":"1","currency":"KRW","unexpected":"x"}]}"#,
        )
        .unwrap();
        let row = &resp.list[0];
        assert_eq!(row.account_id, "ifrs-full_Assets");
        assert_eq!(row.amount(), "426,621,158");
        assert_eq!(row.detail.rcept_no, "20220308000798");
        assert_eq!(row.detail.sj_nm, "재무상태표");
        assert_eq!(row.detail.account_detail, "-");
        assert_eq!(row.detail.frmtrm_amount, "378,235,718");
        assert_eq!(row.detail.bfefrmtrm_amount, "352,564,497");
        assert_eq!(row.detail.ord, "1");
        assert_eq!(row.detail.thstrm_add_amount, "");
    }

    #[test]
    fn transient_errors() {
        assert!(ApiError::Network("reset".into()).is_transient());
        assert!(ApiError::Http { endpoint: "x".into(), status: 503 }.is_transient());
        assert!(!ApiError::Http { endpoint: "x".into(), status: 404 }.is_transient());
        assert!(!ApiError::Decode { endpoint: "x".into(), reason: "bad".into() }.is_transient());
    }
}
