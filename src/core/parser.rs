// LogHarvest - core/parser.rs
//
// Log entry extraction from one message's HTML body.
// Core layer: accepts strings, never touches the filesystem.
//
// Steps:
//   1. Render the HTML to plain text.
//   2. Collect every marker-introduced line (document order).
//   3. First line = header, the rest = data rows.
//   4. Rewrite `,` and `;` to `|` and split on `|`.
//
// Step 4 is a textual substitution, not a quote-aware CSV parse: a literal
// comma or semicolon inside a field value splits that field. Existing report
// emails depend on this behaviour.

use crate::core::model::{synthetic_label, LogRecord, MessageTimestamp, RowSet};
use crate::util::constants;
use crate::util::error::ExtractError;
use html2text::render::text_renderer::TrivialDecorator;
use std::collections::HashSet;

/// Characters that end a marker line's content in rendered text.
/// `<` catches markup that survived rendering; `│` is the cell border the HTML
/// renderer draws between table cells.
const LINE_TERMINATORS: [char; 3] = ['\n', '<', '│'];

/// Configuration for log entry extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    /// Literal token that introduces a log line.
    pub marker: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            marker: constants::DEFAULT_MARKER.to_string(),
        }
    }
}

/// Extract the log table carried by one message.
///
/// A body with no marker lines yields an empty `RowSet`; that is an
/// informational outcome, not an error. Returns `Err` only when the header
/// line is present but carries no usable labels.
pub fn parse_log_entries(
    html: &str,
    message_id: &str,
    source_index: usize,
    timestamp: MessageTimestamp,
    config: &ExtractConfig,
) -> Result<RowSet, ExtractError> {
    let text = html_to_text(html);
    parse_text(&text, message_id, source_index, timestamp, config)
}

/// Same as `parse_log_entries`, for text that is already free of markup.
pub fn parse_text(
    text: &str,
    message_id: &str,
    source_index: usize,
    timestamp: MessageTimestamp,
    config: &ExtractConfig,
) -> Result<RowSet, ExtractError> {
    let lines = find_marker_lines(text, &config.marker);

    let Some((header_line, data_lines)) = lines.split_first() else {
        tracing::info!(message = %message_id, "No log entries found in message");
        return Ok(RowSet::empty(source_index, message_id, timestamp));
    };

    let delimiter = detect_delimiter(header_line);
    let raw_labels = split_fields(header_line);
    if raw_labels.iter().all(|l| l.is_empty()) {
        return Err(ExtractError::EmptyHeader {
            message: message_id.to_string(),
        });
    }
    let header = unique_labels(raw_labels);

    let records: Vec<LogRecord> = data_lines
        .iter()
        .map(|line| LogRecord::new(split_fields(line)))
        .collect();

    let ragged = records
        .iter()
        .filter(|r| r.fields.len() != header.len())
        .count();
    if ragged > 0 {
        tracing::debug!(
            message = %message_id,
            ragged,
            columns = header.len(),
            "Rows with a field count different from the header"
        );
    }

    tracing::info!(
        message = %message_id,
        rows = records.len(),
        columns = header.len(),
        delimiter = ?delimiter,
        "Extracted log entries"
    );

    Ok(RowSet {
        source_index,
        message_id: message_id.to_string(),
        timestamp,
        header,
        records,
    })
}

/// Render HTML to plain text for marker scanning.
///
/// Inline markup adds no characters of its own: no `*` around emphasis, no
/// `[n]` link references. Only the text the reader sees reaches the fields.
pub fn html_to_text(html: &str) -> String {
    html2text::from_read_with_decorator(
        html.as_bytes(),
        constants::MARKUP_RENDER_WIDTH,
        TrivialDecorator::new(),
    )
}

/// Return the content of every marker-introduced line, in document order.
///
/// Content starts after the marker and any whitespace, and runs to the end
/// of the line, the next `<`, a table cell border, or the next marker,
/// whichever comes first. Every marker therefore starts its own line even
/// when HTML rendering has joined source lines together. Empty captures are
/// dropped.
pub fn find_marker_lines<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    if marker.is_empty() {
        return Vec::new();
    }

    let starts: Vec<usize> = text.match_indices(marker).map(|(i, _)| i).collect();
    let mut lines = Vec::with_capacity(starts.len());

    for (n, &start) in starts.iter().enumerate() {
        let after = start + marker.len();
        let bound = starts.get(n + 1).copied().unwrap_or(text.len());
        let rest = text[after..bound].trim_start();
        let end = rest.find(LINE_TERMINATORS).unwrap_or(rest.len());
        let content = rest[..end].trim_end();
        if !content.is_empty() {
            lines.push(content);
        }
    }
    lines
}

/// Delimiter announced by a header line: the first of `,` `;` `|` present.
/// `None` means the header is a single column.
pub fn detect_delimiter(header_line: &str) -> Option<char> {
    constants::DELIMITER_PRIORITY
        .iter()
        .copied()
        .find(|d| header_line.contains(*d))
}

/// Split one line into trimmed fields after normalising every recognised
/// delimiter to `|`.
pub fn split_fields(line: &str) -> Vec<String> {
    let normalised: String = line
        .chars()
        .map(|c| {
            if constants::DELIMITER_PRIORITY.contains(&c) {
                constants::NORMALISED_DELIMITER
            } else {
                c
            }
        })
        .collect();

    normalised
        .split(constants::NORMALISED_DELIMITER)
        .map(|f| f.trim().to_string())
        .collect()
}

/// Make header labels unique within one row set.
///
/// Blank labels become `Column N` (1-based position). A label that repeats
/// an earlier one, or collides with the reserved timestamp column, gets a
/// `.1`, `.2`, ... suffix.
fn unique_labels(raw: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    taken.insert(constants::TIMESTAMP_COLUMN.to_string());

    let mut labels = Vec::with_capacity(raw.len());
    for (position, label) in raw.into_iter().enumerate() {
        let base = if label.is_empty() {
            synthetic_label(position)
        } else {
            label
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        taken.insert(candidate.clone());
        labels.push(candidate);
    }
    labels
}
