//! dartfin CLI: registry, statement download and XBRL fact commands.
//!
//! Commands:
//! - `download`: resolve the corporate registry, classify every entity and
//!   save its annual statements under `listed/` or `delisted/`
//! - `facts`: extract and classify the facts of a local XBRL instance
//! - `registry status`: report the cached registry snapshot's age and size

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dartfin_core::api::{OpenDartClient, ReportKind};
use dartfin_core::registry::{CacheLookup, RegistryCache};
use dartfin_runner::{run_download, run_facts, EntityOutcome, LogProgress, RunConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "dartfin=info,dartfin_core=info,dartfin_runner=info";

#[derive(Parser)]
#[command(
    name = "dartfin",
    about = "dartfin: bulk financial statement acquisition from the DART disclosure API"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download annual statements for every entity in the registry.
    Download {
        /// TOML config file. Flags below override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// API key.
        #[arg(long, env = "DART_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// First fiscal year (inclusive).
        #[arg(long)]
        start_year: Option<i32>,

        /// Last fiscal year (inclusive).
        #[arg(long)]
        end_year: Option<i32>,

        /// Report type: annual, half_year, first_quarter, third_quarter.
        #[arg(long)]
        report: Option<String>,

        /// Root of the listed/ and delisted/ collections.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Registry snapshot file.
        #[arg(long)]
        cache_path: Option<PathBuf>,

        /// Entities processed concurrently (all share one rate limit).
        #[arg(long)]
        workers: Option<usize>,

        /// Minimum spacing between outbound calls, in milliseconds.
        #[arg(long)]
        min_interval_ms: Option<u64>,

        /// Re-download the registry even if the cached snapshot is fresh.
        #[arg(long, default_value_t = false)]
        refresh_registry: bool,

        /// Include registry entries without a ticker.
        #[arg(long, default_value_t = false)]
        all_entities: bool,
    },
    /// Extract facts from an XBRL instance and export them by statement.
    Facts {
        /// XBRL instance document.
        xbrl: PathBuf,

        /// Output directory for the category CSVs.
        #[arg(long, default_value = "facts")]
        output_dir: PathBuf,
    },
    /// Registry snapshot commands.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
}

#[derive(Subcommand)]
enum RegistryAction {
    /// Report the cached snapshot's age, size and validity.
    Status {
        /// Registry snapshot file.
        #[arg(long, default_value = "corp_codes.csv")]
        cache_path: PathBuf,

        /// Freshness window in hours.
        #[arg(long, default_value_t = 168)]
        ttl_hours: u64,
    },
}

/// Flag overrides for `download`.
struct DownloadArgs {
    config: Option<PathBuf>,
    api_key: Option<String>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    report: Option<String>,
    output_dir: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    workers: Option<usize>,
    min_interval_ms: Option<u64>,
    refresh_registry: bool,
    all_entities: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            config,
            api_key,
            start_year,
            end_year,
            report,
            output_dir,
            cache_path,
            workers,
            min_interval_ms,
            refresh_registry,
            all_entities,
        } => run_download_cmd(DownloadArgs {
            config,
            api_key,
            start_year,
            end_year,
            report,
            output_dir,
            cache_path,
            workers,
            min_interval_ms,
            refresh_registry,
            all_entities,
        }),
        Commands::Facts { xbrl, output_dir } => run_facts_cmd(&xbrl, &output_dir),
        Commands::Registry { action } => match action {
            RegistryAction::Status {
                cache_path,
                ttl_hours,
            } => run_registry_status(&cache_path, ttl_hours),
        },
    }
}

fn parse_report(s: &str) -> Result<ReportKind> {
    match s {
        "annual" => Ok(ReportKind::Annual),
        "half_year" => Ok(ReportKind::HalfYear),
        "first_quarter" => Ok(ReportKind::FirstQuarter),
        "third_quarter" => Ok(ReportKind::ThirdQuarter),
        other => anyhow::bail!(
            "unknown report type '{other}' (expected annual, half_year, first_quarter, third_quarter)"
        ),
    }
}

fn build_config(args: DownloadArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if let Some(key) = args.api_key {
        config.api_key = key;
    }
    if let Some(y) = args.start_year {
        config.start_year = y;
    }
    if let Some(y) = args.end_year {
        config.end_year = y;
    }
    if let Some(r) = args.report {
        config.report = parse_report(&r)?;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(path) = args.cache_path {
        config.cache_path = path;
    }
    if let Some(w) = args.workers {
        config.workers = w;
    }
    if let Some(ms) = args.min_interval_ms {
        config.rate_limit.min_interval_ms = ms;
    }
    if args.refresh_registry {
        config.force_refresh = true;
    }
    if args.all_entities {
        config.listed_only = false;
    }

    config.validate()?;
    Ok(config)
}

fn run_download_cmd(args: DownloadArgs) -> Result<()> {
    let config = build_config(args)?;
    let client = OpenDartClient::new(config.api_config()).context("failed to build HTTP client")?;

    let summary = run_download(&config, Arc::new(client), &LogProgress)?;

    println!();
    println!("=== Download Summary ===");
    println!(
        "Registry:        {} entities ({:?})",
        summary.registry_size, summary.registry_source
    );
    println!("Selected:        {}", summary.selected());
    println!("Saved:           {}", summary.persisted());
    println!("No statements:   {}", summary.no_data());
    println!("Unclassifiable:  {}", summary.unclassifiable());
    println!("Write failures:  {}", summary.persist_failed());
    println!("Failed calls:    {}", summary.call_failures());
    println!("Output:          {}", config.output_dir.display());

    let write_failures: Vec<_> = summary
        .reports
        .iter()
        .filter_map(|r| match &r.outcome {
            EntityOutcome::PersistFailed { reason, .. } => Some((&r.record, reason)),
            _ => None,
        })
        .collect();
    if !write_failures.is_empty() {
        for (record, reason) in &write_failures {
            eprintln!("Write failed for {} ({}): {reason}", record.display_name, record.entity_code);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_facts_cmd(xbrl: &Path, output_dir: &Path) -> Result<()> {
    let summary = run_facts(xbrl, output_dir)
        .with_context(|| format!("fact export failed for {}", xbrl.display()))?;

    println!("Facts: {}", summary.facts);
    for (category, rows, path) in &summary.categories {
        println!("  {:<10} {:>6}  {}", category.to_string(), rows, path.display());
    }
    if let Some(path) = &summary.parse_error_file {
        println!(
            "Parse errors: {} (see {})",
            summary.parse_errors,
            path.display()
        );
    }
    Ok(())
}

fn run_registry_status(cache_path: &Path, ttl_hours: u64) -> Result<()> {
    let cache = RegistryCache::new(cache_path);
    let now = chrono::Utc::now();

    let Some(meta) = cache.read_meta() else {
        println!("No registry snapshot at {}", cache_path.display());
        return Ok(());
    };

    println!("Snapshot:   {}", cache_path.display());
    println!("Source:     {}", meta.source);
    println!("Cached at:  {}", meta.cached_at);
    println!("Age:        {}h", meta.age(now).num_hours());
    println!("Records:    {}", meta.record_count);
    println!("Checksum:   {}", meta.checksum);

    let ttl = Duration::from_secs(ttl_hours.saturating_mul(3600));
    match cache.lookup(Some(ttl), now) {
        CacheLookup::Fresh { .. } => println!("Status:     fresh"),
        CacheLookup::Stale { reason } => println!("Status:     stale ({reason})"),
        CacheLookup::Missing => println!("Status:     missing"),
    }
    Ok(())
}
