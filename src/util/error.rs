// LogHarvest - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation. All errors preserve the causal chain
// for diagnostic logging.
//
// Propagation policy: message, extraction, and config errors are contained
// by the component that detects them (logged, item skipped). Only discovery
// and export errors are surfaced to the caller as fatal.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for LogHarvest operations that reach the CLI.
/// Per-message errors never get here; the aggregator contains them.
#[derive(Debug)]
pub enum LogHarvestError {
    /// Message spool discovery failed.
    Discovery(DiscoveryError),

    /// Export operation failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for LogHarvestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery(e) => write!(f, "Discovery error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for LogHarvestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Discovery(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Message errors
// ---------------------------------------------------------------------------

/// Errors decoding a raw RFC 822 message into a `Message`.
#[derive(Debug)]
pub enum MessageError {
    /// The MIME structure could not be parsed.
    Mime {
        id: String,
        source: mailparse::MailParseError,
    },

    /// The HTML part was found but its transfer encoding could not be decoded.
    Body {
        id: String,
        source: mailparse::MailParseError,
    },

    /// The raw message exceeds the maximum accepted size.
    TooLarge { id: String, size: u64, max: u64 },

    /// I/O error reading the raw message.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mime { id, source } => write!(f, "'{id}': malformed MIME structure: {source}"),
            Self::Body { id, source } => write!(f, "'{id}': cannot decode HTML body: {source}"),
            Self::TooLarge { id, size, max } => write!(
                f,
                "'{id}' is {size} bytes, exceeds maximum of {max} bytes"
            ),
            Self::Io { path, source } => {
                write!(f, "I/O error reading message '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for MessageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Mime { source, .. } => Some(source),
            Self::Body { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::TooLarge { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction errors
// ---------------------------------------------------------------------------

/// Errors that make one message's log block unusable. The aggregator skips
/// the message and carries on with the rest of the batch.
#[derive(Debug)]
pub enum ExtractError {
    /// The message itself could not be decoded.
    Message(MessageError),

    /// The first marker line was found but carries no column labels.
    EmptyHeader { message: String },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(e) => write!(f, "{e}"),
            Self::EmptyHeader { message } => {
                write!(f, "'{message}': header line has no column labels")
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Message(e) => Some(e),
            Self::EmptyHeader { .. } => None,
        }
    }
}

impl From<MessageError> for ExtractError {
    fn from(e: MessageError) -> Self {
        Self::Message(e)
    }
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors related to message spool discovery.
#[derive(Debug)]
pub enum DiscoveryError {
    /// The spool path does not exist or is not accessible.
    RootNotFound { path: PathBuf },

    /// The spool path is not a directory.
    NotADirectory { path: PathBuf },

    /// Permission denied accessing the spool path.
    PermissionDenied { path: PathBuf, source: io::Error },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Spool path '{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Spool path '{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => write!(
                f,
                "Permission denied accessing '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for DiscoveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DiscoveryError> for LogHarvestError {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to export operations. These are fatal for the batch.
#[derive(Debug)]
pub enum ExportError {
    /// The destination's parent directory could not be created.
    CreateDir { path: PathBuf, source: io::Error },

    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// Spreadsheet writer error.
    Xlsx {
        path: PathBuf,
        source: rust_xlsxwriter::XlsxError,
    },

    /// CSV serialisation error.
    Csv { path: PathBuf, source: csv::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The table has more rows than a sheet can hold.
    TooManyRows { rows: usize, max: usize },

    /// The table has more columns than a sheet can hold.
    TooManyColumns { columns: usize, max: usize },

    /// The destination extension does not name a supported format.
    UnsupportedFormat { path: PathBuf },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path, source } => write!(
                f,
                "Cannot create output directory '{}': {source}",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Xlsx { path, source } => {
                write!(f, "Spreadsheet export error '{}': {source}", path.display())
            }
            Self::Csv { path, source } => {
                write!(f, "CSV export error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
            Self::TooManyRows { rows, max } => write!(
                f,
                "Export of {rows} rows exceeds the sheet maximum of {max}. \
                 Narrow the message selection or export to CSV."
            ),
            Self::TooManyColumns { columns, max } => write!(
                f,
                "Export of {columns} columns exceeds the sheet maximum of {max}"
            ),
            Self::UnsupportedFormat { path } => write!(
                f,
                "Unsupported export format for '{}'. Expected .xlsx, .csv or .json",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Xlsx { source, .. } => Some(source),
            Self::Csv { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ExportError> for LogHarvestError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogHarvestError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogHarvest results.
pub type Result<T> = std::result::Result<T, LogHarvestError>;
