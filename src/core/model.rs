// LogHarvest - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

// =============================================================================
// Message (input from the mailbox collaborator)
// =============================================================================

/// One retrieved mail item, reduced to the parts the pipeline reads.
///
/// Immutable once built; the pipeline only borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Identifier for diagnostics (spool file name, IMAP sequence number, ...).
    pub id: String,

    /// Decoded HTML body, if the message carried one.
    pub html_body: Option<String>,

    /// Raw `Date` header value.
    pub date: Option<String>,

    /// Raw `Received` header values in header order (most recent hop first).
    pub received: Vec<String>,

    /// Whether the message was a MIME multipart container.
    pub multipart: bool,
}

// =============================================================================
// Message timestamp
// =============================================================================

/// Best-effort timestamp of a message, or the "unknown" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MessageTimestamp {
    /// Wall-clock time as written in the source header.
    Resolved(NaiveDateTime),
    #[default]
    Unknown,
}

impl MessageTimestamp {
    /// Canonical `YYYY-MM-DD HH:MM:SS` rendering, or `Unknown`.
    pub fn render(&self) -> String {
        match self {
            Self::Resolved(ts) => ts.format(constants::TIMESTAMP_FORMAT).to_string(),
            Self::Unknown => constants::UNKNOWN_TIMESTAMP.to_string(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl std::fmt::Display for MessageTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

// =============================================================================
// Log records and row sets (output of the log entry parser)
// =============================================================================

/// One extracted line of tabular data, positionally aligned to its
/// message's header. May be ragged (shorter or longer than the header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub fields: Vec<String>,
}

impl LogRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    /// Field at `position`, or `None` past the end of a short row.
    pub fn field(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(String::as_str)
    }
}

/// Every record parsed from one message, with the header and timestamp
/// that apply to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSet {
    /// Position of the source message in fetch order.
    pub source_index: usize,

    /// Source message identifier, for diagnostics.
    pub message_id: String,

    /// Resolved timestamp of the source message.
    pub timestamp: MessageTimestamp,

    /// Column labels, left to right. Unique within this set.
    pub header: Vec<String>,

    /// Data rows in document order.
    pub records: Vec<LogRecord>,
}

impl RowSet {
    /// A row set with no header and no records.
    pub fn empty(source_index: usize, message_id: &str, timestamp: MessageTimestamp) -> Self {
        Self {
            source_index,
            message_id: message_id.to_string(),
            timestamp,
            header: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Labels for the first `width` field positions. Positions past the end
    /// of the header (long ragged rows) get synthesized `Column N` labels,
    /// suffixed if a header label already uses that text.
    pub fn labels(&self, width: usize) -> Vec<String> {
        let mut labels: Vec<String> = self.header.iter().take(width).cloned().collect();
        for position in self.header.len()..width {
            let base = synthetic_label(position);
            let mut candidate = base.clone();
            let mut suffix = 1;
            while labels.contains(&candidate) {
                candidate = format!("{base}.{suffix}");
                suffix += 1;
            }
            labels.push(candidate);
        }
        labels
    }

    /// Widest row in the set, never narrower than the header.
    pub fn width(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.fields.len())
            .max()
            .unwrap_or(0)
            .max(self.header.len())
    }
}

/// Synthesized label for the 0-based field `position`.
pub fn synthetic_label(position: usize) -> String {
    format!("{} {}", constants::SYNTHETIC_COLUMN_PREFIX, position + 1)
}

// =============================================================================
// Unified table (output of the record aggregator)
// =============================================================================

/// Label-aligned concatenation of every row set in a batch.
///
/// Column 0 is always the timestamp column. Rows keep message processing
/// order. Rows are stored unpadded: a row shorter than the column list has
/// "no value" for every trailing column, which is how rows appended before a
/// column first appeared read as missing for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedTable {
    pub(crate) columns: Vec<String>,
    pub(crate) index: HashMap<String, usize>,
    pub(crate) rows: Vec<Vec<Option<String>>>,
}

impl Default for UnifiedTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UnifiedTable {
    pub fn new() -> Self {
        let timestamp = constants::TIMESTAMP_COLUMN.to_string();
        let mut index = HashMap::new();
        index.insert(timestamp.clone(), 0);
        Self {
            columns: vec![timestamp],
            index,
            rows: Vec::new(),
        }
    }

    /// Column labels in first-seen order, timestamp first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, or `None` for "no value".
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    /// Cell text by column label.
    pub fn cell_by_label(&self, row: usize, label: &str) -> Option<&str> {
        self.column_index(label).and_then(|c| self.cell(row, c))
    }

    /// Every cell of `column`, top to bottom, including missing ones.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, column))
    }
}

// =============================================================================
// Export table (output of type coercion)
// =============================================================================

/// Semantic type inferred for one whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Numeric,
    Text,
}

impl ColumnType {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Date => "date",
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One typed cell. `Empty` is the explicit "no value" marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Date(NaiveDate),
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Plain-text rendering used by CSV output and the preview.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Date(d) => d.format(constants::TEXT_DATE_FORMAT).to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

/// A column header with its fixed semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportColumn {
    pub name: String,
    pub kind: ColumnType,
}

/// The unified table after type coercion. Every row has exactly one cell per
/// column, and every non-empty cell agrees with its column's type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportTable {
    pub columns: Vec<ExportColumn>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ExportTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indices of columns coerced to dates.
    pub fn date_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind == ColumnType::Date)
            .map(|(i, _)| i)
            .collect()
    }
}

// =============================================================================
// Batch outcome
// =============================================================================

/// Summary statistics for one processed batch of messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Messages handed to the pipeline.
    pub messages_seen: usize,

    /// Messages skipped because they could not be decoded or extracted.
    pub messages_skipped: usize,

    /// Messages that contributed at least one row.
    pub messages_with_rows: usize,

    /// Messages whose timestamp resolved to the "unknown" sentinel.
    pub unknown_timestamps: usize,

    /// Total rows in the unified table.
    pub total_rows: usize,

    /// Total columns in the unified table, timestamp included.
    pub total_columns: usize,
}

/// What the export step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The table was written to `path`.
    Written {
        path: PathBuf,
        rows: usize,
        columns: usize,
    },

    /// The table had zero rows; nothing was written.
    NoData,
}
