// LogHarvest - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading (CLI flags override config values)
// 3. Logging initialisation (debug mode support)
// 4. Spool discovery, batch processing and export
// 5. Summary, preview and exit code

use logharvest::app::pipeline::{self, PipelineConfig};
use logharvest::core::export;
use logharvest::core::model::ExportOutcome;
use logharvest::platform::config::{self, AppConfig, PlatformPaths};
use logharvest::platform::fs::{self, SpoolConfig};
use logharvest::util::constants;
use logharvest::util::error::{LogHarvestError, Result};

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// LogHarvest - extract marker-prefixed log tables from report emails.
///
/// Reads every raw message (*.eml) under SPOOL_DIR, pulls the `Log:` lines
/// out of each HTML body, merges them into one table and writes it as XLSX,
/// CSV or JSON depending on the output extension.
#[derive(Parser, Debug)]
#[command(name = "logharvest", version, about)]
struct Cli {
    /// Directory of raw RFC 822 messages.
    spool_dir: PathBuf,

    /// Output file (.xlsx, .csv or .json).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Token that introduces a log line.
    #[arg(short = 'm', long = "marker")]
    marker: Option<String>,

    /// 1-based Received header used when Date is unusable (0 disables).
    #[arg(long = "received-hop")]
    received_hop: Option<usize>,

    /// Worksheet name for XLSX output.
    #[arg(long = "sheet")]
    sheet: Option<String>,

    /// Worker threads for message parsing (0 = one per core).
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (mut app_config, config_warnings) = config::load_config(&config_path);

    logharvest::util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "LogHarvest starting"
    );

    // Warnings raised before the subscriber existed.
    for warning in config_warnings {
        let warning = LogHarvestError::from(warning);
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Err(message) = apply_overrides(&cli, &mut app_config) {
        tracing::error!(error = %message, "Invalid command-line option");
        eprintln!("Error: {message}");
        return ExitCode::FAILURE;
    }

    match run(&cli, &app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Batch failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Apply CLI flags on top of the validated config.
fn apply_overrides(cli: &Cli, config: &mut AppConfig) -> std::result::Result<(), String> {
    if let Some(ref marker) = cli.marker {
        if marker.trim().is_empty() || marker.len() > constants::MAX_MARKER_LENGTH {
            return Err(format!(
                "--marker must be 1-{} non-blank characters",
                constants::MAX_MARKER_LENGTH
            ));
        }
        config.marker = marker.clone();
    }
    if let Some(hop) = cli.received_hop {
        if hop > constants::MAX_RECEIVED_HOP {
            return Err(format!(
                "--received-hop must be 0-{}",
                constants::MAX_RECEIVED_HOP
            ));
        }
        config.received_hop = hop;
    }
    if let Some(ref output) = cli.output {
        if !config::has_supported_extension(output) {
            return Err(format!(
                "--output '{}' must end in .xlsx, .csv or .json",
                output.display()
            ));
        }
        config.output = output.clone();
    }
    if let Some(ref sheet) = cli.sheet {
        config.sheet_name = sheet.clone();
    }
    if let Some(jobs) = cli.jobs {
        config.worker_threads = jobs.min(constants::MAX_WORKER_THREADS);
    }
    Ok(())
}

fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let spool = SpoolConfig {
        max_depth: config.max_depth,
        max_messages: config.max_messages,
        include_patterns: config.include_patterns.clone(),
    };
    let listing = fs::discover_messages(&cli.spool_dir, &spool)?;
    for warning in &listing.warnings {
        tracing::warn!(warning = %warning, "Discovery warning");
    }
    tracing::info!(
        spool = %cli.spool_dir.display(),
        messages = listing.paths.len(),
        "Messages discovered"
    );

    let pipeline_config = PipelineConfig::from_app_config(config);
    let report = pipeline::run_batch(
        &listing.paths,
        &pipeline_config,
        &config.output,
        &config.sheet_name,
    )
    .map_err(LogHarvestError::from)?;

    let summary = &report.summary;
    println!(
        "Processed {} message(s): {} with log rows, {} skipped, {} without a timestamp.",
        summary.messages_seen,
        summary.messages_with_rows,
        summary.messages_skipped,
        summary.unknown_timestamps
    );

    match &report.outcome {
        ExportOutcome::Written {
            path,
            rows,
            columns,
        } => {
            println!("Data saved to {} ({rows} rows, {columns} columns).", path.display());
            if config.preview_rows > 0 {
                println!();
                print!("{}", export::render_preview(&report.table, config.preview_rows));
            }
        }
        ExportOutcome::NoData => {
            println!("No data found. Nothing was written.");
        }
    }

    Ok(())
}
