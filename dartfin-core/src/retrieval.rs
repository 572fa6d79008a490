//! Financial statement retrieval with consolidated → separate fallback.
//!
//! For each fiscal year in the configured window:
//! 1. Ask for the consolidated statements
//! 2. If the API has no consolidated data, ask for the separate statements
//! 3. Keep whichever answered, or nothing
//!
//! A year never yields both bases. A transport failure is not "no data", so a
//! failed consolidated call skips the year instead of falling back. Every call
//! goes through the shared rate limiter.

use crate::api::{
    ApiError, DisclosureApi, RateLimiter, ReportKind, RetryPolicy, StatementQuery, STATUS_NO_DATA,
};
use crate::domain::{parse_amount, Basis, EntityCode, EntityFinancialHistory, LineItem, StatementFragment};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fiscal year window and report type.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub start_year: i32,
    pub end_year: i32,
    pub report: ReportKind,
    pub retry: RetryPolicy,
}

impl RetrievalConfig {
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start_year..=self.end_year
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            start_year: 2020,
            end_year: 2022,
            report: ReportKind::Annual,
            retry: RetryPolicy::none(),
        }
    }
}

/// A statements call that failed in transport.
#[derive(Debug)]
pub struct CallFailure {
    pub year: i32,
    pub basis: Basis,
    pub error: ApiError,
}

/// Everything retrieval produced for one entity.
#[derive(Debug, Default)]
pub struct EntityRetrieval {
    pub history: EntityFinancialHistory,
    pub failures: Vec<CallFailure>,
    /// Number of statements calls issued.
    pub calls: usize,
}

enum YearOutcome {
    Found(StatementFragment),
    NoData,
    Failed(CallFailure),
}

pub struct RetrievalEngine {
    api: Arc<dyn DisclosureApi>,
    limiter: Arc<RateLimiter>,
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        api: Arc<dyn DisclosureApi>,
        limiter: Arc<RateLimiter>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            api,
            limiter,
            config,
        }
    }

    /// One paced statements call. Non-success statuses and empty lists are `Ok(None)`.
    pub fn fetch_year(
        &self,
        entity_code: &EntityCode,
        year: i32,
        basis: Basis,
    ) -> Result<Option<StatementFragment>, ApiError> {
        let query = StatementQuery {
            entity_code: entity_code.clone(),
            year,
            report: self.config.report,
            basis,
        };

        let resp = self.config.retry.run(
            "statements",
            || {
                self.limiter.acquire();
                self.api.statements(&query)
            },
            ApiError::is_transient,
        )?;

        if !resp.is_success() {
            if resp.status != STATUS_NO_DATA {
                debug!(%query, status = %resp.status, message = %resp.message, "statements refused");
            }
            return Ok(None);
        }
        if resp.list.is_empty() {
            return Ok(None);
        }

        let items = resp
            .list
            .into_iter()
            .map(|row| LineItem {
                value: parse_amount(row.amount()),
                account_tag: row.account_id,
                account_name: row.account_nm,
                context_ref: row.sj_div,
                unit_ref: row.currency,
                detail: row.detail,
            })
            .collect();

        Ok(Some(StatementFragment {
            entity_code: entity_code.clone(),
            fiscal_year: year,
            basis,
            items,
        }))
    }

    fn fetch_with_fallback(
        &self,
        entity_code: &EntityCode,
        year: i32,
        calls: &mut usize,
    ) -> YearOutcome {
        for basis in Basis::FALLBACK_ORDER {
            *calls += 1;
            match self.fetch_year(entity_code, year, basis) {
                Ok(Some(fragment)) => return YearOutcome::Found(fragment),
                Ok(None) => continue,
                Err(error) => {
                    warn!(entity = %entity_code, year, %basis, %error, "statements call failed");
                    return YearOutcome::Failed(CallFailure { year, basis, error });
                }
            }
        }
        YearOutcome::NoData
    }

    /// Walk the whole year window for one entity.
    pub fn retrieve(&self, entity_code: &EntityCode) -> EntityRetrieval {
        let mut fragments = Vec::new();
        let mut failures = Vec::new();
        let mut calls = 0;

        for year in self.config.years() {
            match self.fetch_with_fallback(entity_code, year, &mut calls) {
                YearOutcome::Found(fragment) => {
                    debug!(
                        entity = %entity_code,
                        year,
                        basis = %fragment.basis,
                        lines = fragment.items.len(),
                        "statements found"
                    );
                    fragments.push(fragment);
                }
                YearOutcome::NoData => {}
                YearOutcome::Failed(failure) => failures.push(failure),
            }
        }

        EntityRetrieval {
            history: EntityFinancialHistory::from_fragments(fragments),
            failures,
            calls,
        }
    }
}
