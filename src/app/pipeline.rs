// LogHarvest - app/pipeline.rs
//
// Batch orchestration: decode -> resolve timestamp -> extract -> aggregate
// -> coerce -> export.
//
// Per-message work runs on a rayon pool. Every result is tagged with its
// source index and merged in that order, so the output is the same for any
// worker count. `worker_threads = 1` runs on the calling thread.
//
// Per-message failures (unreadable file, bad MIME, empty header) are skipped
// by the aggregator. Only export failures reach the caller.

use crate::app::mailbox;
use crate::core::aggregate::{self, Extraction};
use crate::core::coerce::{self, CoerceConfig};
use crate::core::export;
use crate::core::model::{BatchSummary, ExportOutcome, ExportTable, Message, RowSet, UnifiedTable};
use crate::core::parser::{self, ExtractConfig};
use crate::core::timestamp::{self, TimestampConfig};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::error::{ExportError, ExtractError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub timestamp: TimestampConfig,
    pub coerce: CoerceConfig,

    /// Worker threads for per-message work (0 = rayon default).
    pub worker_threads: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extract: ExtractConfig::default(),
            timestamp: TimestampConfig::default(),
            coerce: CoerceConfig::default(),
            worker_threads: crate::util::constants::DEFAULT_WORKER_THREADS,
        }
    }
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            extract: ExtractConfig {
                marker: config.marker.clone(),
            },
            timestamp: TimestampConfig {
                received_hop: config.received_hop,
            },
            coerce: CoerceConfig {
                date_threshold: config.date_threshold,
            },
            worker_threads: config.worker_threads,
        }
    }
}

/// Everything a finished batch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub table: ExportTable,
    pub outcome: ExportOutcome,
}

// =============================================================================
// Per-message processing
// =============================================================================

/// Resolve the timestamp of one decoded message and extract its log table.
pub fn process_message(index: usize, message: &Message, config: &PipelineConfig) -> Extraction {
    let ts = timestamp::resolve_timestamp(message, &config.timestamp);

    let outcome = match &message.html_body {
        Some(html) => parser::parse_log_entries(html, &message.id, index, ts, &config.extract),
        None => {
            tracing::info!(message = %message.id, "No HTML body; no log entries");
            Ok(RowSet::empty(index, &message.id, ts))
        }
    };

    Extraction {
        source_index: index,
        message_id: message.id.clone(),
        outcome,
    }
}

/// Read, decode and process one spool file.
pub fn process_path(index: usize, path: &Path, config: &PipelineConfig) -> Extraction {
    let id = fs::message_id_for(path);
    let decoded = fs::read_message_bytes(path).and_then(|raw| mailbox::decode_message(&id, &raw));

    match decoded {
        Ok(message) => process_message(index, &message, config),
        Err(e) => Extraction {
            source_index: index,
            message_id: id,
            outcome: Err(ExtractError::from(e)),
        },
    }
}

/// Map `f` over `items` on the configured pool, keeping input order.
fn run_indexed<T, F>(items: &[T], worker_threads: usize, f: F) -> Vec<Extraction>
where
    T: Sync,
    F: Fn(usize, &T) -> Extraction + Sync + Send,
{
    if worker_threads == 1 || items.len() <= 1 {
        return items.iter().enumerate().map(|(i, item)| f(i, item)).collect();
    }

    let job = || -> Vec<Extraction> {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| f(i, item))
            .collect()
    };

    if worker_threads == 0 {
        return job();
    }

    match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .build()
    {
        Ok(pool) => pool.install(job),
        Err(e) => {
            tracing::warn!(
                worker_threads,
                error = %e,
                "Could not build worker pool; using the global pool"
            );
            job()
        }
    }
}

/// Process already-decoded messages into the unified table.
pub fn process_messages(
    messages: &[Message],
    config: &PipelineConfig,
) -> (UnifiedTable, BatchSummary) {
    let extractions = run_indexed(messages, config.worker_threads, |i, m| {
        process_message(i, m, config)
    });
    aggregate::aggregate(extractions)
}

/// Process every spool file into the unified table. Paths are in fetch order.
pub fn process_paths(paths: &[PathBuf], config: &PipelineConfig) -> (UnifiedTable, BatchSummary) {
    let extractions = run_indexed(paths, config.worker_threads, |i, p| {
        process_path(i, p, config)
    });
    aggregate::aggregate(extractions)
}

// =============================================================================
// Full batch
// =============================================================================

/// Process `paths`, coerce the table and write it to `dest`.
///
/// Zero rows is `ExportOutcome::NoData` and nothing is written.
pub fn run_batch(
    paths: &[PathBuf],
    config: &PipelineConfig,
    dest: &Path,
    sheet_name: &str,
) -> Result<BatchReport, ExportError> {
    let started = Instant::now();
    let (unified, summary) = process_paths(paths, config);
    finish_batch(unified, summary, config, dest, sheet_name, started)
}

/// Same as `run_batch` for messages that are already decoded.
pub fn run_batch_messages(
    messages: &[Message],
    config: &PipelineConfig,
    dest: &Path,
    sheet_name: &str,
) -> Result<BatchReport, ExportError> {
    let started = Instant::now();
    let (unified, summary) = process_messages(messages, config);
    finish_batch(unified, summary, config, dest, sheet_name, started)
}

fn finish_batch(
    unified: UnifiedTable,
    summary: BatchSummary,
    config: &PipelineConfig,
    dest: &Path,
    sheet_name: &str,
    started: Instant,
) -> Result<BatchReport, ExportError> {
    tracing::info!(
        messages = summary.messages_seen,
        skipped = summary.messages_skipped,
        with_rows = summary.messages_with_rows,
        unknown_timestamps = summary.unknown_timestamps,
        rows = summary.total_rows,
        columns = summary.total_columns,
        "Aggregation complete"
    );

    let table = coerce::coerce_table(&unified, &config.coerce);
    let outcome = export::write_table(&table, dest, sheet_name)?;

    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch complete"
    );

    Ok(BatchReport {
        summary,
        table,
        outcome,
    })
}
