//! End-to-end download runs against the in-memory API.

use dartfin_core::api::{StatementRow, StubApi, StubCall};
use dartfin_core::domain::{Basis, Classification};
use dartfin_runner::persist::HISTORY_COLUMNS;
use dartfin_runner::{
    run_download, EntityOutcome, LogProgress, RunConfig, RunError, RunSummary,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use zip::write::SimpleFileOptions;

const LISTED: &str = "00000001";
const BROKEN: &str = "00000002";
const DELISTED: &str = "00000003";
const EMPTY: &str = "00000004";
const NO_TICKER: &str = "00000005";

fn registry_archive() -> Vec<u8> {
    let entries = [
        (LISTED, "가나 전자", "000001"),
        (BROKEN, "Broken Co", "000002"),
        (DELISTED, "Old/Corp", "000003"),
        (EMPTY, "Quiet Ltd", "000004"),
        (NO_TICKER, "Private Co", " "),
    ];
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<result>\n");
    for (code, name, ticker) in entries {
        xml.push_str(&format!(
            "<list><corp_code>{code}</corp_code><corp_name>{name}</corp_name><stock_code>{ticker}</stock_code><modify_date>20240101</modify_date></list>\n"
        ));
    }
    xml.push_str("</result>\n");

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("CORPCODE.xml", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn rows(amount: &str) -> Vec<StatementRow> {
    let mut assets = StatementRow::new("BS", "ifrs-full_Assets", "자산총계", amount, "KRW");
    assets.detail.frmtrm_amount = "500".into();
    assets.detail.ord = "1".into();
    vec![
        assets,
        StatementRow::new("IS", "ifrs-full_Revenue", "매출액", "-", "KRW"),
    ]
}

fn scenario() -> StubApi {
    StubApi::new()
        .with_archive(registry_archive())
        .with_company(LISTED, Some("000001"))
        .with_company_failure(BROKEN)
        .with_company(DELISTED, None)
        .with_company(EMPTY, Some("000004"))
        // LISTED: consolidated for 2020, separate only for 2021, nothing for 2022
        .with_statements(LISTED, 2020, Basis::Consolidated, rows("1,000"))
        .with_statements(LISTED, 2020, Basis::Separate, rows("999"))
        .with_statements(LISTED, 2021, Basis::Separate, rows("2000"))
        // DELISTED: consolidated 2022 only
        .with_statements(DELISTED, 2022, Basis::Consolidated, rows("3000"))
}

fn config(root: &Path) -> RunConfig {
    let mut c = RunConfig {
        api_key: "test-key".into(),
        output_dir: root.join("data"),
        cache_path: root.join("corp_codes.csv"),
        ..Default::default()
    };
    c.rate_limit.min_interval_ms = 0;
    c.retry.registry_max_retries = 0;
    c.retry.registry_base_delay_ms = 0;
    c
}

fn run(api: Arc<StubApi>, config: &RunConfig) -> RunSummary {
    run_download(config, api, &LogProgress).unwrap()
}

/// Every file under `dir`, keyed by path relative to it.
fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    for collection in ["listed", "delisted"] {
        let sub = dir.join(collection);
        for entry in fs::read_dir(&sub).unwrap() {
            let path = entry.unwrap().path();
            let key = format!("{collection}/{}", path.file_name().unwrap().to_string_lossy());
            out.insert(key, fs::read(&path).unwrap());
        }
    }
    out
}

fn outcome_of<'a>(summary: &'a RunSummary, code: &str) -> &'a EntityOutcome {
    &summary
        .reports
        .iter()
        .find(|r| r.record.entity_code.as_str() == code)
        .unwrap()
        .outcome
}

#[test]
fn one_artifact_per_classified_entity_with_data() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let summary = run(Arc::new(scenario()), &cfg);

    assert_eq!(summary.registry_size, 5);
    assert_eq!(summary.selected(), 4);
    assert_eq!(summary.persisted_as(Classification::Listed), 1);
    assert_eq!(summary.persisted_as(Classification::Delisted), 1);
    assert_eq!(summary.unclassifiable(), 1);
    assert_eq!(summary.no_data(), 1);

    let files: Vec<String> = snapshot(&cfg.output_dir).into_keys().collect();
    assert_eq!(
        files,
        vec![
            "delisted/Old_Corp_00000003.csv".to_string(),
            "listed/가나전자_00000001.csv".to_string(),
        ]
    );

    match outcome_of(&summary, LISTED) {
        EntityOutcome::Persisted { years, .. } => assert_eq!(years, &vec![2020, 2021]),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(
        outcome_of(&summary, EMPTY),
        EntityOutcome::NoData {
            classification: Classification::Listed
        }
    ));
}

#[test]
fn unclassifiable_entity_gets_no_statement_calls() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(scenario());
    let summary = run(api.clone(), &config(dir.path()));

    assert!(matches!(
        outcome_of(&summary, BROKEN),
        EntityOutcome::Unclassifiable { .. }
    ));
    assert!(api.statement_calls(BROKEN).is_empty());
}

#[test]
fn refused_detail_query_means_no_calls_and_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let api = Arc::new(
        scenario()
            .with_company_status(BROKEN, "013")
            .with_statements(BROKEN, 2020, Basis::Consolidated, rows("1")),
    );
    let summary = run(api.clone(), &cfg);

    assert!(matches!(
        outcome_of(&summary, BROKEN),
        EntityOutcome::Unclassifiable { .. }
    ));
    assert!(api.statement_calls(BROKEN).is_empty());
    assert!(!snapshot(&cfg.output_dir)
        .keys()
        .any(|name| name.contains(BROKEN)));
}

#[test]
fn separate_is_asked_only_when_consolidated_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let api = Arc::new(scenario());
    run(api.clone(), &cfg);

    let asked: Vec<(i32, Basis)> = api
        .statement_calls(LISTED)
        .into_iter()
        .map(|q| (q.year, q.basis))
        .collect();
    assert_eq!(
        asked,
        vec![
            (2020, Basis::Consolidated),
            (2021, Basis::Consolidated),
            (2021, Basis::Separate),
            (2022, Basis::Consolidated),
            (2022, Basis::Separate),
        ]
    );

    let bytes = fs::read(cfg.output_dir.join("listed/가나전자_00000001.csv")).unwrap();
    let mut rdr = csv::Reader::from_reader(&bytes[3..]);
    let header: Vec<&str> = rdr.headers().unwrap().iter().collect();
    assert_eq!(header, HISTORY_COLUMNS.to_vec());
    let picked: Vec<Vec<String>> = rdr
        .deserialize::<BTreeMap<String, String>>()
        .map(|row| {
            let row = row.unwrap();
            ["year", "fs_div", "sj_div", "thstrm_amount", "frmtrm_amount", "ord"]
                .iter()
                .map(|c| row[*c].clone())
                .collect()
        })
        .collect();
    assert_eq!(
        picked,
        vec![
            vec!["2020", "CFS", "BS", "1,000", "500", "1"],
            vec!["2020", "CFS", "IS", "-", "", ""],
            vec!["2021", "OFS", "BS", "2000", "500", "1"],
            vec!["2021", "OFS", "IS", "-", "", ""],
        ]
    );
}

#[test]
fn failed_consolidated_call_skips_year_and_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(
        scenario().with_statement_failure(DELISTED, 2022, Basis::Consolidated),
    );
    let summary = run(api.clone(), &config(dir.path()));

    assert!(matches!(
        outcome_of(&summary, DELISTED),
        EntityOutcome::NoData { .. }
    ));
    assert_eq!(summary.call_failures(), 1);
    assert!(!api
        .statement_calls(DELISTED)
        .iter()
        .any(|q| q.year == 2022 && q.basis == Basis::Separate));
}

#[test]
fn rerun_produces_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    run(Arc::new(scenario()), &cfg);
    let first = snapshot(&cfg.output_dir);
    run(Arc::new(scenario()), &cfg);
    let second = snapshot(&cfg.output_dir);

    assert_eq!(first, second);
}

#[test]
fn second_run_reuses_registry_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    run(Arc::new(scenario()), &cfg);

    let api = Arc::new(scenario());
    run(api.clone(), &cfg);
    assert!(!api.calls().contains(&StubCall::Registry));
}

#[test]
fn all_entities_mode_includes_tickerless_records() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = RunConfig {
        listed_only: false,
        ..config(dir.path())
    };
    let summary = run(Arc::new(scenario()), &cfg);

    assert_eq!(summary.selected(), 5);
    // The stub has no detail for it, so it answers "no data".
    assert!(matches!(
        outcome_of(&summary, NO_TICKER),
        EntityOutcome::Unclassifiable { .. }
    ));
}

#[test]
fn worker_pool_matches_sequential_output() {
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();
    let seq_cfg = config(seq_dir.path());
    let par_cfg = RunConfig {
        workers: 4,
        ..config(par_dir.path())
    };

    let seq = run(Arc::new(scenario()), &seq_cfg);
    let par = run(Arc::new(scenario()), &par_cfg);

    assert_eq!(snapshot(&seq_cfg.output_dir), snapshot(&par_cfg.output_dir));
    let order = |s: &RunSummary| -> Vec<String> {
        s.reports
            .iter()
            .map(|r| r.record.entity_code.to_string())
            .collect()
    };
    assert_eq!(order(&seq), order(&par));
}

#[test]
fn every_call_is_paced_by_the_shared_limiter() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = RunConfig {
        workers: 3,
        ..config(dir.path())
    };
    cfg.rate_limit.min_interval_ms = 10;
    let api = Arc::new(scenario());

    let start = Instant::now();
    run(api.clone(), &cfg);
    let elapsed = start.elapsed().as_millis();

    let calls = api.calls().len() as u128;
    assert!(calls > 10);
    // burst 1: first call free, every later one waits an interval
    assert!(elapsed >= (calls - 1) * 10 - 5, "{calls} calls in {elapsed}ms");
}

#[test]
fn registry_failure_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let api = Arc::new(StubApi::new().with_archive_failure("connection refused"));

    let err = run_download(&cfg, api.clone(), &LogProgress).unwrap_err();

    assert!(matches!(err, RunError::Registry(_)));
    assert_eq!(api.calls(), vec![StubCall::Registry]);
    assert!(!cfg.output_dir.exists());
}

#[test]
fn invalid_config_is_rejected_before_any_call() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = RunConfig {
        api_key: String::new(),
        ..config(dir.path())
    };
    let api = Arc::new(scenario());

    let err = run_download(&cfg, api.clone(), &LogProgress).unwrap_err();
    assert!(matches!(err, RunError::Config(_)));
    assert!(api.calls().is_empty());
}
