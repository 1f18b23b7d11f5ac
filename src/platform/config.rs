// LogHarvest - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogHarvest configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logharvest/ or %APPDATA%\LogHarvest\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of `config.toml`.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored so a newer config file still loads in
/// an older binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub extraction: ExtractionSection,
    pub coercion: CoercionSection,
    pub input: InputSection,
    pub export: ExportSection,
    pub processing: ProcessingSection,
    pub logging: LoggingSection,
}

/// `[extraction]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    /// Literal token introducing a log line.
    pub marker: Option<String>,
    /// 1-based `Received` header used as timestamp fallback (0 = disabled).
    pub received_hop: Option<usize>,
}

/// `[coercion]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct CoercionSection {
    /// Share of date-like values above which a column becomes a date column.
    pub date_threshold: Option<f64>,
}

/// `[input]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub include_patterns: Option<Vec<String>>,
    pub max_messages: Option<usize>,
    pub max_depth: Option<usize>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Destination file; the extension selects the format.
    pub output: Option<String>,
    pub sheet_name: Option<String>,
    /// Rows printed in the post-export preview (0 = no preview).
    pub preview_rows: Option<usize>,
}

/// `[processing]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ProcessingSection {
    /// Number of worker threads (0 = auto).
    pub worker_threads: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Every value is checked against named constants at load time. Invalid
/// values produce a `ConfigError` warning and keep their default.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Extraction --
    pub marker: String,
    pub received_hop: usize,

    // -- Coercion --
    pub date_threshold: f64,

    // -- Input --
    pub include_patterns: Vec<String>,
    pub max_messages: usize,
    pub max_depth: usize,

    // -- Export --
    pub output: PathBuf,
    pub sheet_name: String,
    pub preview_rows: usize,

    // -- Processing --
    pub worker_threads: usize,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            marker: constants::DEFAULT_MARKER.to_string(),
            received_hop: constants::DEFAULT_RECEIVED_HOP,
            date_threshold: constants::DEFAULT_DATE_THRESHOLD,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_messages: constants::DEFAULT_MAX_MESSAGES,
            max_depth: constants::DEFAULT_MAX_DEPTH,
            output: PathBuf::from(constants::DEFAULT_OUTPUT_PATH),
            sheet_name: constants::DEFAULT_SHEET_NAME.to_string(),
            preview_rows: constants::DEFAULT_PREVIEW_ROWS,
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` at `config_path`.
///
/// A missing file is a first run: defaults, no warnings. An unreadable or
/// unparseable file yields defaults plus one error describing why. The
/// program still runs in both cases.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<ConfigError>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            tracing::warn!(error = %err, "Using default configuration");
            return (AppConfig::default(), vec![err]);
        }
    };

    let (config, warnings) = parse_config(&content, config_path);
    if warnings.is_empty() {
        tracing::info!(path = %config_path.display(), "Loaded config.toml");
    }
    (config, warnings)
}

/// Parse and validate config.toml content. `path` is used for messages only.
pub fn parse_config(content: &str, path: &Path) -> (AppConfig, Vec<ConfigError>) {
    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: path.to_path_buf(),
                source: e,
            };
            tracing::warn!(error = %err, "Using default configuration");
            return (AppConfig::default(), vec![err]);
        }
    };

    let mut warnings: Vec<ConfigError> = Vec::new();
    let mut config = AppConfig::default();

    // -- Extraction: marker --
    if let Some(marker) = raw.extraction.marker {
        if !marker.trim().is_empty() && marker.len() <= constants::MAX_MARKER_LENGTH {
            config.marker = marker;
        } else {
            warnings.push(out_of_range(
                "extraction.marker",
                &marker,
                format!("1-{} non-blank characters", constants::MAX_MARKER_LENGTH),
            ));
        }
    }

    // -- Extraction: received_hop --
    if let Some(hop) = raw.extraction.received_hop {
        if hop <= constants::MAX_RECEIVED_HOP {
            config.received_hop = hop;
        } else {
            warnings.push(out_of_range(
                "extraction.received_hop",
                &hop.to_string(),
                format!("0-{} (0 disables the fallback)", constants::MAX_RECEIVED_HOP),
            ));
        }
    }

    // -- Coercion: date_threshold --
    if let Some(threshold) = raw.coercion.date_threshold {
        if (0.0..1.0).contains(&threshold) {
            config.date_threshold = threshold;
        } else {
            warnings.push(out_of_range(
                "coercion.date_threshold",
                &threshold.to_string(),
                "a fraction in [0.0, 1.0)".to_string(),
            ));
        }
    }

    // -- Input: include_patterns --
    if let Some(patterns) = raw.input.include_patterns {
        let invalid: Vec<&String> = patterns
            .iter()
            .filter(|p| glob::Pattern::new(p).is_err())
            .collect();
        if !patterns.is_empty() && invalid.is_empty() {
            config.include_patterns = patterns;
        } else {
            warnings.push(out_of_range(
                "input.include_patterns",
                &format!("{patterns:?}"),
                "a non-empty list of valid glob patterns".to_string(),
            ));
        }
    }

    // -- Input: max_messages --
    if let Some(max) = raw.input.max_messages {
        if (1..=constants::ABSOLUTE_MAX_MESSAGES).contains(&max) {
            config.max_messages = max;
        } else {
            warnings.push(out_of_range(
                "input.max_messages",
                &max.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_MESSAGES),
            ));
        }
    }

    // -- Input: max_depth --
    if let Some(depth) = raw.input.max_depth {
        if (1..=constants::ABSOLUTE_MAX_DEPTH).contains(&depth) {
            config.max_depth = depth;
        } else {
            warnings.push(out_of_range(
                "input.max_depth",
                &depth.to_string(),
                format!("1-{}", constants::ABSOLUTE_MAX_DEPTH),
            ));
        }
    }

    // -- Export: output --
    if let Some(output) = raw.export.output {
        if has_supported_extension(Path::new(&output)) {
            config.output = PathBuf::from(output);
        } else {
            warnings.push(out_of_range(
                "export.output",
                &output,
                "a path ending in .xlsx, .csv or .json".to_string(),
            ));
        }
    }

    // -- Export: sheet_name --
    if let Some(name) = raw.export.sheet_name {
        let len = name.chars().count();
        if !name.trim().is_empty() && len <= constants::MAX_SHEET_NAME_LENGTH {
            config.sheet_name = name;
        } else {
            warnings.push(out_of_range(
                "export.sheet_name",
                &name,
                format!("1-{} characters", constants::MAX_SHEET_NAME_LENGTH),
            ));
        }
    }

    // -- Export: preview_rows --
    if let Some(rows) = raw.export.preview_rows {
        if rows <= constants::MAX_PREVIEW_ROWS {
            config.preview_rows = rows;
        } else {
            warnings.push(out_of_range(
                "export.preview_rows",
                &rows.to_string(),
                format!("0-{}", constants::MAX_PREVIEW_ROWS),
            ));
        }
    }

    // -- Processing: worker_threads --
    if let Some(threads) = raw.processing.worker_threads {
        if threads <= constants::MAX_WORKER_THREADS {
            config.worker_threads = threads;
        } else {
            warnings.push(out_of_range(
                "processing.worker_threads",
                &threads.to_string(),
                format!("0-{} (0 = auto)", constants::MAX_WORKER_THREADS),
            ));
        }
    }

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(out_of_range(
                "logging.level",
                &level,
                "one of error, warn, info, debug, trace".to_string(),
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

fn out_of_range(field: &str, value: &str, expected: String) -> ConfigError {
    ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Whether `path` ends in an extension the exporter can write.
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "xlsx" | "csv" | "json"))
        .unwrap_or(false)
}
