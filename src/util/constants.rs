// LogHarvest - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogHarvest";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogHarvest";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Extraction
// =============================================================================

/// Marker token that introduces a log line in the scheduler report format.
pub const DEFAULT_MARKER: &str = "Log:";

/// Maximum length of a configured marker token.
pub const MAX_MARKER_LENGTH: usize = 64;

/// Delimiters recognised in a header line, in priority order.
pub const DELIMITER_PRIORITY: [char; 3] = [',', ';', '|'];

/// Delimiter every recognised variant is rewritten to before splitting.
pub const NORMALISED_DELIMITER: char = '|';

/// Line width handed to the HTML renderer. Wide enough that a single report
/// line is never wrapped onto two lines.
pub const MARKUP_RENDER_WIDTH: usize = 10_000;

/// Prefix for synthesized column labels (blank header cells, surplus fields).
pub const SYNTHETIC_COLUMN_PREFIX: &str = "Column";

// =============================================================================
// Timestamp resolution
// =============================================================================

/// Sentinel rendered when no timestamp could be resolved for a message.
pub const UNKNOWN_TIMESTAMP: &str = "Unknown";

/// Canonical rendering of a resolved message timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 1-based position of the `Received` header used when `Date` is unusable.
///
/// Topology-dependent: with the relay chain the scheduler reports travel
/// through, the third hop is the one stamped when the provider accepted the
/// message. Other deployments will need a different value (see
/// `[extraction] received_hop` in config.toml).
pub const DEFAULT_RECEIVED_HOP: usize = 3;

/// Upper bound on the configurable `Received` hop.
pub const MAX_RECEIVED_HOP: usize = 64;

// =============================================================================
// Aggregation
// =============================================================================

/// Label of the leading column carrying each row's message timestamp.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";

// =============================================================================
// Type coercion
// =============================================================================

/// Fraction of non-missing values that must look like `M/D/YYYY` dates
/// before a column is coerced to dates. The comparison is strict.
pub const DEFAULT_DATE_THRESHOLD: f64 = 0.5;

/// chrono format used to parse date-like cells.
pub const DATE_PARSE_FORMAT: &str = "%m/%d/%Y";

/// Earliest year a spreadsheet date can hold. Date-like values before it are
/// dropped like impossible calendar dates.
pub const MIN_SHEET_DATE_YEAR: i32 = 1900;

/// Display format applied to date columns in spreadsheet output.
pub const SHEET_DATE_FORMAT: &str = "mm/dd/yyyy";

/// Text rendering of date cells in CSV output and previews.
pub const TEXT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Column width applied to date columns in spreadsheet output.
pub const DATE_COLUMN_WIDTH: f64 = 15.0;

// =============================================================================
// Input discovery
// =============================================================================

/// Default include glob patterns for message spool discovery.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.eml"];

/// Maximum directory recursion depth during spool discovery.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Hard upper bound on max depth (prevents runaway traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 32;

/// Default maximum number of messages processed in one batch.
pub const DEFAULT_MAX_MESSAGES: usize = 10_000;

/// Hard upper bound on messages per batch.
pub const ABSOLUTE_MAX_MESSAGES: usize = 1_000_000;

/// Maximum size of a single raw message in bytes. Larger files are skipped.
pub const MAX_MESSAGE_SIZE: u64 = 50 * 1024 * 1024; // 50 MB

// =============================================================================
// Processing
// =============================================================================

/// Default number of worker threads for per-message parsing.
/// 0 means auto-detect (use available CPU cores).
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Hard upper bound on worker threads.
pub const MAX_WORKER_THREADS: usize = 256;

// =============================================================================
// Export
// =============================================================================

/// Default destination of the exported table.
pub const DEFAULT_OUTPUT_PATH: &str = "output/output.xlsx";

/// Default sheet name in spreadsheet output.
pub const DEFAULT_SHEET_NAME: &str = "Log Data";

/// Maximum sheet name length accepted by spreadsheet applications.
pub const MAX_SHEET_NAME_LENGTH: usize = 31;

/// Rows per sheet, including the header row.
pub const MAX_SHEET_ROWS: usize = 1_048_576;

/// Columns per sheet.
pub const MAX_SHEET_COLUMNS: usize = 16_384;

/// Default number of rows shown in the post-export preview.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Upper bound on preview rows.
pub const MAX_PREVIEW_ROWS: usize = 100;

/// Maximum width of a single cell in the text preview.
pub const PREVIEW_CELL_WIDTH: usize = 24;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of message content included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
