// LogHarvest - tests/e2e_pipeline.rs
//
// End-to-end tests for the full batch: real .eml files on disk, real
// walkdir discovery, real MIME decoding, HTML rendering, aggregation,
// coercion and the XLSX/CSV/JSON writers. No mocks.

use logharvest::app::mailbox::decode_message;
use logharvest::app::pipeline::{self, PipelineConfig};
use logharvest::core::model::{ColumnType, ExportOutcome};
use logharvest::platform::fs::{discover_messages, SpoolConfig};
use std::fs;
use std::path::{Path, PathBuf};

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn spool_paths() -> Vec<PathBuf> {
    discover_messages(&fixture("spool"), &SpoolConfig::default())
        .expect("fixture spool must exist")
        .paths
}

fn copy_into(dir: &Path, names: &[&str]) {
    for name in names {
        let src = fixture(name);
        let file_name = src.file_name().unwrap();
        fs::copy(&src, dir.join(file_name)).unwrap();
    }
}

// =============================================================================
// Discovery and decoding
// =============================================================================

#[test]
fn e2e_spool_is_discovered_in_name_order() {
    let names: Vec<String> = spool_paths()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "01_nightly_jobs.eml",
            "02_host_inventory.eml",
            "03_bad_date.eml",
            "04_no_log.eml",
            "05_received_fallback.eml",
        ]
    );
}

#[test]
fn e2e_multipart_message_uses_html_part() {
    let raw = fs::read(fixture("spool/01_nightly_jobs.eml")).unwrap();
    let message = decode_message("01", &raw).unwrap();
    assert!(message.multipart);
    assert_eq!(message.received.len(), 3);
    let body = message.html_body.expect("html part must be selected");
    assert!(body.contains("Log: Job,Status,Run Date,Duration"));
    assert!(!body.contains("Plain,Copy"));
}

// =============================================================================
// Aggregation
// =============================================================================

#[test]
fn e2e_unified_table_aligns_heterogeneous_headers() {
    let (table, summary) = pipeline::process_paths(&spool_paths(), &PipelineConfig::default());

    assert_eq!(
        table.columns(),
        ["Timestamp", "Job", "Status", "Run Date", "Duration", "Host"]
    );
    assert_eq!(table.len(), 5);

    // Message 1: Date header.
    assert_eq!(table.cell_by_label(0, "Timestamp"), Some("2024-01-15 14:30:22"));
    assert_eq!(table.cell_by_label(0, "Job"), Some("backup"));
    assert_eq!(table.cell_by_label(0, "Host"), None);
    assert_eq!(table.cell_by_label(1, "Status"), Some("failed"));

    // Message 2: wall-clock time as written in its own offset.
    assert_eq!(table.cell_by_label(2, "Timestamp"), Some("2024-01-16 09:05:00"));
    assert_eq!(table.cell_by_label(2, "Host"), Some("srv1"));
    assert_eq!(table.cell_by_label(2, "Status"), None);

    // Message 3: unparseable Date and only two Received headers.
    assert_eq!(table.cell_by_label(3, "Timestamp"), Some("Unknown"));
    assert_eq!(table.cell_by_label(3, "Duration"), Some("7"));

    // Message 5: no Date; third Received header.
    assert_eq!(table.cell_by_label(4, "Timestamp"), Some("2024-01-18 08:15:00"));
    assert_eq!(table.cell_by_label(4, "Run Date"), Some("not yet"));

    assert_eq!(summary.messages_seen, 5);
    assert_eq!(summary.messages_skipped, 0);
    assert_eq!(summary.messages_with_rows, 4);
    assert_eq!(summary.unknown_timestamps, 1);
    assert_eq!(summary.total_rows, 5);
}

#[test]
fn e2e_received_fallback_can_be_disabled() {
    let config = PipelineConfig {
        timestamp: logharvest::core::timestamp::TimestampConfig { received_hop: 0 },
        ..PipelineConfig::default()
    };
    let (table, summary) = pipeline::process_paths(&spool_paths(), &config);
    assert_eq!(table.cell_by_label(4, "Timestamp"), Some("Unknown"));
    assert_eq!(summary.unknown_timestamps, 2);
}

#[test]
fn e2e_broken_message_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    copy_into(dir.path(), &["spool/02_host_inventory.eml", "broken_header.eml"]);
    let listing = discover_messages(dir.path(), &SpoolConfig::default()).unwrap();

    let (table, summary) = pipeline::process_paths(&listing.paths, &PipelineConfig::default());
    assert_eq!(summary.messages_seen, 2);
    assert_eq!(summary.messages_skipped, 1);
    assert_eq!(table.len(), 1);
    assert_eq!(table.cell_by_label(0, "Host"), Some("srv1"));
}

#[test]
fn e2e_parallel_and_sequential_runs_match() {
    let paths = spool_paths();
    let sequential = pipeline::process_paths(
        &paths,
        &PipelineConfig {
            worker_threads: 1,
            ..PipelineConfig::default()
        },
    );
    let parallel = pipeline::process_paths(
        &paths,
        &PipelineConfig {
            worker_threads: 3,
            ..PipelineConfig::default()
        },
    );
    assert_eq!(sequential, parallel);
}

// =============================================================================
// Export
// =============================================================================

#[test]
fn e2e_json_export_has_coerced_types() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reports").join("log.json");
    let report =
        pipeline::run_batch(&spool_paths(), &PipelineConfig::default(), &dest, "Log Data")
            .unwrap();

    let kinds: Vec<(&str, ColumnType)> = report
        .table
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("Timestamp", ColumnType::Text),
            ("Job", ColumnType::Text),
            ("Status", ColumnType::Text),
            ("Run Date", ColumnType::Date),
            ("Duration", ColumnType::Numeric),
            ("Host", ColumnType::Text),
        ]
    );

    let value: serde_json::Value = serde_json::from_slice(&fs::read(&dest).unwrap()).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["Run Date"], "2024-01-15");
    assert_eq!(rows[0]["Duration"], 12.5);
    assert!(rows[0]["Host"].is_null());
    assert_eq!(rows[3]["Timestamp"], "Unknown");
    // "not yet" in a date column is dropped, not kept as text.
    assert!(rows[4]["Run Date"].is_null());
}

#[test]
fn e2e_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("log.csv");
    pipeline::run_batch(&spool_paths(), &PipelineConfig::default(), &dest, "Log Data").unwrap();

    let text = fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Timestamp,Job,Status,Run Date,Duration,Host");
    assert_eq!(lines[1], "2024-01-15 14:30:22,backup,ok,01/15/2024,12.5,");
    assert_eq!(lines[3], "2024-01-16 09:05:00,backup,,,,srv1");
    assert_eq!(lines.len(), 6);
}

#[test]
fn e2e_xlsx_export_creates_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("output").join("output.xlsx");
    let report =
        pipeline::run_batch(&spool_paths(), &PipelineConfig::default(), &dest, "Log Data")
            .unwrap();

    assert_eq!(
        report.outcome,
        ExportOutcome::Written {
            path: dest.clone(),
            rows: 5,
            columns: 6,
        }
    );
    let bytes = fs::read(&dest).unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[test]
fn e2e_no_rows_means_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let spool = dir.path().join("spool");
    fs::create_dir(&spool).unwrap();
    copy_into(&spool, &["spool/04_no_log.eml"]);

    let listing = discover_messages(&spool, &SpoolConfig::default()).unwrap();
    let dest = dir.path().join("output").join("output.xlsx");
    let report =
        pipeline::run_batch(&listing.paths, &PipelineConfig::default(), &dest, "Log Data")
            .unwrap();

    assert_eq!(report.outcome, ExportOutcome::NoData);
    assert_eq!(report.summary.total_rows, 0);
    assert!(!dest.exists());
    assert!(!dest.parent().unwrap().exists());
}

#[test]
fn e2e_runs_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.csv");
    let second = dir.path().join("b.csv");
    let paths = spool_paths();
    let config = PipelineConfig::default();

    pipeline::run_batch(&paths, &config, &first, "Log Data").unwrap();
    pipeline::run_batch(&paths, &config, &second, "Log Data").unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}
