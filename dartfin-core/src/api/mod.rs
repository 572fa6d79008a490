//! Remote disclosure API: trait, OpenDART client, pacing and retry.

pub mod opendart;
pub mod provider;
pub mod rate_limiter;
pub mod retry;
pub mod stub;

pub use opendart::{ApiConfig, OpenDartClient, DEFAULT_BASE_URL};
pub use provider::{
    ApiError, CompanyResponse, DisclosureApi, ReportKind, StatementQuery, StatementResponse,
    StatementRow, STATUS_NO_DATA, STATUS_OK,
};
pub use rate_limiter::{RateLimiter, DEFAULT_MIN_INTERVAL};
pub use retry::RetryPolicy;
pub use stub::{StubApi, StubCall};
