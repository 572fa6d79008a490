//! dartfin runner: run configuration, download orchestration, artifacts.
//!
//! This crate builds on `dartfin-core` to provide:
//! - TOML-loadable run configuration with documented defaults
//! - The download pipeline: registry → classification → retrieval → CSV
//! - Per-entity artifact layout under `listed/` and `delisted/`
//! - XBRL fact export by statement category

pub mod config;
pub mod facts;
pub mod persist;
pub mod pipeline;

pub use config::{ConfigError, RateLimitConfig, RetryConfig, RunConfig};
pub use facts::{export_fact_set, run_facts, FactExportError, FactExportSummary};
pub use persist::{persist, OutputLayout, PersistError};
pub use pipeline::{
    run_download, EntityOutcome, EntityReport, LogProgress, Pipeline, PipelineProgress, RunError,
    RunSummary,
};
