//! OpenDART client.
//!
//! Talks to the three endpoints the pipeline needs: the registry archive
//! (`corpCode.xml`), entity detail (`company.json`) and full statements
//! (`fnlttSinglAcntAll.json`). Pacing and retries live above this layer; the
//! client issues exactly one HTTP request per call.

use super::provider::{
    ApiError, CompanyResponse, DisclosureApi, StatementQuery, StatementResponse,
};
use crate::domain::EntityCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://opendart.fss.or.kr/api";

const REGISTRY_ENDPOINT: &str = "corpCode.xml";
const COMPANY_ENDPOINT: &str = "company.json";
const STATEMENTS_ENDPOINT: &str = "fnlttSinglAcntAll.json";

/// Connection settings handed to the client at construction.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Timeout for detail and statement calls.
    pub request_timeout: Duration,
    /// Timeout for the registry archive download.
    pub registry_timeout: Duration,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(30),
            registry_timeout: Duration::from_secs(30),
        }
    }
}

/// Blocking OpenDART client.
pub struct OpenDartClient {
    client: reqwest::blocking::Client,
    config: ApiConfig,
}

impl OpenDartClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("dartfin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    fn send(
        &self,
        endpoint: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, ApiError> {
        let resp = request
            .send()
            .map_err(|e| ApiError::Network(format!("{endpoint}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self
            .client
            .get(self.url(endpoint))
            .query(&[("crtfc_key", self.config.api_key.as_str())])
            .query(params);

        let resp = self.send(endpoint, request)?;
        resp.json().map_err(|e| {
            if e.is_timeout() {
                ApiError::Network(format!("{endpoint}: {e}"))
            } else {
                ApiError::Decode {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }
}

impl DisclosureApi for OpenDartClient {
    fn name(&self) -> &str {
        "opendart"
    }

    fn registry_archive(&self) -> Result<Vec<u8>, ApiError> {
        debug!(endpoint = REGISTRY_ENDPOINT, "downloading registry archive");
        let request = self
            .client
            .get(self.url(REGISTRY_ENDPOINT))
            .query(&[("crtfc_key", self.config.api_key.as_str())])
            .timeout(self.config.registry_timeout);

        let resp = self.send(REGISTRY_ENDPOINT, request)?;
        let bytes = resp
            .bytes()
            .map_err(|e| ApiError::Network(format!("{REGISTRY_ENDPOINT}: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn company(&self, entity_code: &EntityCode) -> Result<CompanyResponse, ApiError> {
        debug!(entity = %entity_code, "company detail");
        self.get_json(COMPANY_ENDPOINT, &[("corp_code", entity_code.as_str())])
    }

    fn statements(&self, query: &StatementQuery) -> Result<StatementResponse, ApiError> {
        debug!(%query, "statements");
        let year = query.year.to_string();
        self.get_json(
            STATEMENTS_ENDPOINT,
            &[
                ("corp_code", query.entity_code.as_str()),
                ("bsns_year", year.as_str()),
                ("reprt_code", query.report.code()),
                ("fs_div", query.basis.code()),
            ],
        )
    }
}
