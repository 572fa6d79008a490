//! Download orchestrator: classify, retrieve and persist every selected entity.
//!
//! Per entity:
//! 1. Classify via a live detail query → skip if unclassifiable
//! 2. Retrieve the whole fiscal-year window → skip if nothing came back
//! 3. Persist into the listed or delisted collection
//!
//! Entities are independent work units. With `workers = 1` they run strictly
//! in registry order; wider pools share the same rate limiter, so the global
//! request ceiling does not move. One entity's failure never touches another's
//! output: every outcome, good or bad, lands in the `RunSummary`.

use crate::config::{ConfigError, RunConfig};
use crate::persist::{persist, OutputLayout, PersistError};
use dartfin_core::api::{DisclosureApi, RateLimiter};
use dartfin_core::domain::{Classification, CorporateRecord};
use dartfin_core::registry::{RegistryCache, RegistryError, RegistryResolver, RegistrySource};
use dartfin_core::{ClassificationService, RetrievalEngine};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("output setup failed: {0}")]
    Output(#[from] PersistError),

    #[error("worker pool setup failed: {0}")]
    WorkerPool(String),
}

/// What happened to one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityOutcome {
    /// Artifact written.
    Persisted {
        classification: Classification,
        path: PathBuf,
        years: Vec<i32>,
        rows: usize,
    },
    /// Detail query failed or was refused; nothing else was attempted.
    Unclassifiable { reason: String },
    /// Classified, but no year in the window produced statements.
    NoData { classification: Classification },
    /// Statements were retrieved but the artifact could not be written.
    PersistFailed {
        classification: Classification,
        reason: String,
    },
}

/// Outcome for one entity plus any statements calls that failed along the way.
#[derive(Debug, Clone)]
pub struct EntityReport {
    pub record: CorporateRecord,
    pub outcome: EntityOutcome,
    /// `year basis: error` for each failed statements call.
    pub call_failures: Vec<String>,
}

/// Summary of a download run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub registry_source: RegistrySource,
    pub registry_size: usize,
    pub reports: Vec<EntityReport>,
}

impl RunSummary {
    fn count(&self, pred: impl Fn(&EntityOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn selected(&self) -> usize {
        self.reports.len()
    }

    pub fn persisted(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::Persisted { .. }))
    }

    pub fn unclassifiable(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::Unclassifiable { .. }))
    }

    pub fn no_data(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::NoData { .. }))
    }

    pub fn persist_failed(&self) -> usize {
        self.count(|o| matches!(o, EntityOutcome::PersistFailed { .. }))
    }

    pub fn persisted_as(&self, classification: Classification) -> usize {
        self.count(|o| {
            matches!(o, EntityOutcome::Persisted { classification: c, .. } if *c == classification)
        })
    }

    /// Total failed statements calls across all entities.
    pub fn call_failures(&self) -> usize {
        self.reports.iter().map(|r| r.call_failures.len()).sum()
    }
}

/// Progress callback for a download run.
pub trait PipelineProgress: Send + Sync {
    /// Called when an entity is picked up.
    fn on_start(&self, record: &CorporateRecord, index: usize, total: usize);

    /// Called when an entity is finished, whatever the outcome.
    fn on_complete(&self, report: &EntityReport, index: usize, total: usize);

    /// Called once every selected entity has been processed.
    fn on_batch_complete(&self, summary: &RunSummary);
}

/// Progress reporter that writes through `tracing`.
pub struct LogProgress;

impl PipelineProgress for LogProgress {
    fn on_start(&self, record: &CorporateRecord, index: usize, total: usize) {
        tracing::debug!(
            entity = %record.entity_code,
            name = %record.display_name,
            "[{}/{total}] processing",
            index + 1
        );
    }

    fn on_complete(&self, report: &EntityReport, index: usize, total: usize) {
        let entity = &report.record.entity_code;
        match &report.outcome {
            EntityOutcome::Persisted {
                classification,
                path,
                years,
                rows,
            } => info!(
                %entity,
                %classification,
                ?years,
                rows,
                path = %path.display(),
                "[{}/{total}] saved",
                index + 1
            ),
            EntityOutcome::Unclassifiable { reason } => {
                warn!(%entity, %reason, "[{}/{total}] skipped: unclassifiable", index + 1)
            }
            EntityOutcome::NoData { classification } => {
                info!(%entity, %classification, "[{}/{total}] no statements", index + 1)
            }
            EntityOutcome::PersistFailed { reason, .. } => {
                warn!(%entity, %reason, "[{}/{total}] write failed", index + 1)
            }
        }
        for failure in &report.call_failures {
            warn!(%entity, %failure, "statements call failed");
        }
    }

    fn on_batch_complete(&self, summary: &RunSummary) {
        info!(
            selected = summary.selected(),
            listed = summary.persisted_as(Classification::Listed),
            delisted = summary.persisted_as(Classification::Delisted),
            no_data = summary.no_data(),
            unclassifiable = summary.unclassifiable(),
            write_failures = summary.persist_failed(),
            call_failures = summary.call_failures(),
            "download complete"
        );
    }
}

/// Classification → retrieval → persistence over a registry.
pub struct Pipeline {
    classifier: ClassificationService,
    retrieval: RetrievalEngine,
    layout: OutputLayout,
    listed_only: bool,
    workers: usize,
}

impl Pipeline {
    pub fn new(api: Arc<dyn DisclosureApi>, limiter: Arc<RateLimiter>, config: &RunConfig) -> Self {
        Self {
            classifier: ClassificationService::new(
                Arc::clone(&api),
                Arc::clone(&limiter),
                config.entity_retry(),
            ),
            retrieval: RetrievalEngine::new(api, limiter, config.retrieval_config()),
            layout: OutputLayout::new(&config.output_dir),
            listed_only: config.listed_only,
            workers: config.workers.max(1),
        }
    }

    /// Registry entries this run will process, in registry order.
    pub fn select<'a>(&self, registry: &'a [CorporateRecord]) -> Vec<&'a CorporateRecord> {
        registry
            .iter()
            .filter(|r| !self.listed_only || r.has_ticker())
            .collect()
    }

    /// Classify, retrieve and persist a single entity.
    pub fn process_entity(&self, record: &CorporateRecord) -> EntityReport {
        let classification = match self.classifier.classify(&record.entity_code) {
            Ok(c) => c,
            Err(reason) => {
                return EntityReport {
                    record: record.clone(),
                    outcome: EntityOutcome::Unclassifiable {
                        reason: reason.to_string(),
                    },
                    call_failures: Vec::new(),
                }
            }
        };

        let retrieval = self.retrieval.retrieve(&record.entity_code);
        let call_failures = retrieval
            .failures
            .iter()
            .map(|f| format!("{} {}: {}", f.year, f.basis, f.error))
            .collect();

        let outcome = if retrieval.history.is_empty() {
            EntityOutcome::NoData { classification }
        } else {
            match persist(&self.layout, record, &retrieval.history, classification) {
                Ok(path) => EntityOutcome::Persisted {
                    classification,
                    path,
                    years: retrieval.history.years(),
                    rows: retrieval.history.line_count(),
                },
                Err(e) => EntityOutcome::PersistFailed {
                    classification,
                    reason: e.to_string(),
                },
            }
        };

        EntityReport {
            record: record.clone(),
            outcome,
            call_failures,
        }
    }

    /// Process every selected entity. Output directories are created first.
    pub fn run(
        &self,
        registry: &[CorporateRecord],
        progress: &dyn PipelineProgress,
    ) -> Result<Vec<EntityReport>, RunError> {
        self.layout.ensure()?;

        let selected = self.select(registry);
        let total = selected.len();
        info!(registry = registry.len(), selected = total, workers = self.workers, "processing entities");

        let work = |(index, record): (usize, &&CorporateRecord)| {
            progress.on_start(record, index, total);
            let report = self.process_entity(record);
            progress.on_complete(&report, index, total);
            report
        };

        if self.workers == 1 {
            return Ok(selected.iter().enumerate().map(work).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| RunError::WorkerPool(e.to_string()))?;
        Ok(pool.install(|| selected.par_iter().enumerate().map(work).collect()))
    }
}

/// Resolve the registry and run the pipeline over it.
pub fn run_download(
    config: &RunConfig,
    api: Arc<dyn DisclosureApi>,
    progress: &dyn PipelineProgress,
) -> Result<RunSummary, RunError> {
    config.validate()?;

    let limiter = Arc::new(config.limiter());
    let resolver = RegistryResolver::new(
        Arc::clone(&api),
        RegistryCache::new(&config.cache_path),
        Arc::clone(&limiter),
        config.registry_policy(),
    );
    let registry = resolver.resolve()?;

    let pipeline = Pipeline::new(api, limiter, config);
    let reports = pipeline.run(&registry.records, progress)?;

    let summary = RunSummary {
        registry_source: registry.source,
        registry_size: registry.records.len(),
        reports,
    };
    progress.on_batch_complete(&summary);
    Ok(summary)
}
