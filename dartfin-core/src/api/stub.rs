//! In-memory `DisclosureApi` with canned responses and a call log.
//!
//! Used by tests and offline dry runs. Unknown entities answer with the
//! "no data" status; anything registered as a failure answers with a
//! network error.

use super::provider::{
    ApiError, CompanyResponse, DisclosureApi, StatementQuery, StatementResponse, StatementRow,
    STATUS_NO_DATA, STATUS_OK,
};
use crate::domain::{Basis, EntityCode};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum Reply<T> {
    Ok(T),
    Fail(String),
}

impl<T: Clone> Reply<T> {
    fn get(&self) -> Result<T, ApiError> {
        match self {
            Reply::Ok(v) => Ok(v.clone()),
            Reply::Fail(msg) => Err(ApiError::Network(msg.clone())),
        }
    }
}

/// A call the stub received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubCall {
    Registry,
    Company(EntityCode),
    Statements(StatementQuery),
}

#[derive(Debug, Default)]
pub struct StubApi {
    archive: Option<Reply<Vec<u8>>>,
    companies: HashMap<EntityCode, Reply<CompanyResponse>>,
    statements: HashMap<(EntityCode, i32, Basis), Reply<StatementResponse>>,
    calls: Mutex<Vec<StubCall>>,
}

impl StubApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_archive(mut self, payload: Vec<u8>) -> Self {
        self.archive = Some(Reply::Ok(payload));
        self
    }

    pub fn with_archive_failure(mut self, message: &str) -> Self {
        self.archive = Some(Reply::Fail(message.to_string()));
        self
    }

    /// Successful detail response; `ticker = None` answers with an empty ticker.
    pub fn with_company(mut self, code: &str, ticker: Option<&str>) -> Self {
        let resp = CompanyResponse {
            status: STATUS_OK.to_string(),
            message: "정상".to_string(),
            corp_name: None,
            stock_code: Some(ticker.unwrap_or("").to_string()),
        };
        self.companies.insert(EntityCode::new(code), Reply::Ok(resp));
        self
    }

    pub fn with_company_status(mut self, code: &str, status: &str) -> Self {
        let resp = CompanyResponse {
            status: status.to_string(),
            message: "error".to_string(),
            ..Default::default()
        };
        self.companies.insert(EntityCode::new(code), Reply::Ok(resp));
        self
    }

    pub fn with_company_failure(mut self, code: &str) -> Self {
        self.companies
            .insert(EntityCode::new(code), Reply::Fail("connection reset".into()));
        self
    }

    pub fn with_statements(
        mut self,
        code: &str,
        year: i32,
        basis: Basis,
        rows: Vec<StatementRow>,
    ) -> Self {
        let resp = StatementResponse {
            status: STATUS_OK.to_string(),
            message: "정상".to_string(),
            list: rows,
        };
        self.statements
            .insert((EntityCode::new(code), year, basis), Reply::Ok(resp));
        self
    }

    pub fn with_statement_failure(mut self, code: &str, year: i32, basis: Basis) -> Self {
        self.statements.insert(
            (EntityCode::new(code), year, basis),
            Reply::Fail("timed out".into()),
        );
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<StubCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Statement queries received for one entity.
    pub fn statement_calls(&self, code: &str) -> Vec<StatementQuery> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StubCall::Statements(q) if q.entity_code.as_str() == code => Some(q),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StubCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl DisclosureApi for StubApi {
    fn name(&self) -> &str {
        "stub"
    }

    fn registry_archive(&self) -> Result<Vec<u8>, ApiError> {
        self.record(StubCall::Registry);
        match &self.archive {
            Some(reply) => reply.get(),
            None => Err(ApiError::Network("no archive configured".into())),
        }
    }

    fn company(&self, entity_code: &EntityCode) -> Result<CompanyResponse, ApiError> {
        self.record(StubCall::Company(entity_code.clone()));
        match self.companies.get(entity_code) {
            Some(reply) => reply.get(),
            None => Ok(CompanyResponse {
                status: STATUS_NO_DATA.to_string(),
                message: "조회된 데이타가 없습니다.".to_string(),
                ..Default::default()
            }),
        }
    }

    fn statements(&self, query: &StatementQuery) -> Result<StatementResponse, ApiError> {
        self.record(StubCall::Statements(query.clone()));
        let key = (query.entity_code.clone(), query.year, query.basis);
        match self.statements.get(&key) {
            Some(reply) => reply.get(),
            None => Ok(StatementResponse {
                status: STATUS_NO_DATA.to_string(),
                message: "조회된 데이타가 없습니다.".to_string(),
                list: vec![],
            }),
        }
    }
}
