// LogHarvest - core/aggregate.rs
//
// Merges per-message row sets into one label-aligned table.
// Core layer: pure logic.
//
// Invariants:
//   - Rows keep message fetch order (source index), then document order.
//   - Columns are unified by label text; a column missing from a row set
//     reads as "no value" in that set's rows.
//   - A message whose extraction failed is skipped with a warning and never
//     aborts the batch.

use crate::core::model::{BatchSummary, RowSet, UnifiedTable};
use crate::util::error::ExtractError;

/// Outcome of processing one message, tagged with its fetch position so
/// results produced out of order can be merged back in order.
#[derive(Debug)]
pub struct Extraction {
    pub source_index: usize,
    pub message_id: String,
    pub outcome: Result<RowSet, ExtractError>,
}

/// Append-only accumulator threaded through the batch loop.
#[derive(Debug, Default)]
pub struct Aggregator {
    table: UnifiedTable,
    summary: BatchSummary,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message's outcome. Failures are logged and counted.
    pub fn push(&mut self, extraction: Extraction) {
        self.summary.messages_seen += 1;
        match extraction.outcome {
            Ok(set) => self.append(&set),
            Err(e) => {
                self.summary.messages_skipped += 1;
                tracing::warn!(
                    message = %extraction.message_id,
                    index = extraction.source_index,
                    error = %e,
                    "Skipping message"
                );
            }
        }
    }

    /// Append every record of `set`, prefixed with the set's timestamp.
    pub fn append(&mut self, set: &RowSet) {
        if !set.timestamp.is_known() {
            self.summary.unknown_timestamps += 1;
        }
        if set.is_empty() {
            return;
        }
        self.summary.messages_with_rows += 1;

        let labels = set.labels(set.width());
        let columns: Vec<usize> = labels.iter().map(|l| self.column_for(l)).collect();
        let row_width = columns.iter().copied().max().unwrap_or(0) + 1;
        let timestamp = set.timestamp.render();

        for record in &set.records {
            let mut row: Vec<Option<String>> = vec![None; row_width];
            row[0] = Some(timestamp.clone());
            for (position, value) in record.fields.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                row[columns[position]] = Some(value.clone());
            }
            self.table.rows.push(row);
        }

        tracing::debug!(
            message = %set.message_id,
            rows = set.len(),
            total_rows = self.table.len(),
            columns = self.table.columns.len(),
            "Row set appended"
        );
    }

    /// Index of the column labelled `label`, creating it if unseen.
    fn column_for(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.table.index.get(label) {
            return idx;
        }
        let idx = self.table.columns.len();
        self.table.columns.push(label.to_string());
        self.table.index.insert(label.to_string(), idx);
        idx
    }

    /// Rows accumulated so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Close the batch and hand back the table with its summary.
    pub fn finish(mut self) -> (UnifiedTable, BatchSummary) {
        self.summary.total_rows = self.table.len();
        self.summary.total_columns = self.table.columns.len();
        (self.table, self.summary)
    }
}

/// Merge extractions produced in any order. Results are sorted by source
/// index first (stable), so the table always follows message fetch order.
pub fn aggregate(mut extractions: Vec<Extraction>) -> (UnifiedTable, BatchSummary) {
    extractions.sort_by_key(|e| e.source_index);
    let mut aggregator = Aggregator::new();
    for extraction in extractions {
        aggregator.push(extraction);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{LogRecord, MessageTimestamp};
    use chrono::NaiveDate;

    fn ts(day: u32) -> MessageTimestamp {
        MessageTimestamp::Resolved(
            NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    fn set(index: usize, timestamp: MessageTimestamp, header: &[&str], rows: &[&[&str]]) -> RowSet {
        RowSet {
            source_index: index,
            message_id: format!("msg-{index}"),
            timestamp,
            header: header.iter().map(|s| s.to_string()).collect(),
            records: rows
                .iter()
                .map(|r| LogRecord::new(r.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }

    fn ok(set: RowSet) -> Extraction {
        Extraction {
            source_index: set.source_index,
            message_id: set.message_id.clone(),
            outcome: Ok(set),
        }
    }

    #[test]
    fn test_heterogeneous_headers_align_on_labels() {
        let (table, summary) = aggregate(vec![
            ok(set(0, ts(1), &["A", "B"], &[&["1", "2"]])),
            ok(set(1, ts(2), &["A", "C"], &[&["3", "4"]])),
        ]);

        assert_eq!(table.columns(), ["Timestamp", "A", "B", "C"]);
        assert_eq!(table.len(), 2);

        assert_eq!(table.cell_by_label(0, "Timestamp"), Some("2024-01-01 12:00:00"));
        assert_eq!(table.cell_by_label(0, "A"), Some("1"));
        assert_eq!(table.cell_by_label(0, "B"), Some("2"));
        assert_eq!(table.cell_by_label(0, "C"), None);

        assert_eq!(table.cell_by_label(1, "A"), Some("3"));
        assert_eq!(table.cell_by_label(1, "B"), None);
        assert_eq!(table.cell_by_label(1, "C"), Some("4"));

        assert_eq!(summary.messages_with_rows, 2);
        assert_eq!(summary.total_columns, 4);
    }

    #[test]
    fn test_out_of_order_extractions_merge_in_fetch_order() {
        let (table, _) = aggregate(vec![
            ok(set(2, ts(3), &["A"], &[&["third"]])),
            ok(set(0, ts(1), &["A"], &[&["first"]])),
            ok(set(1, ts(2), &["A"], &[&["second"]])),
        ]);
        let values: Vec<_> = table.column_values(1).collect();
        assert_eq!(values, vec![Some("first"), Some("second"), Some("third")]);
    }

    #[test]
    fn test_short_rows_read_as_no_value() {
        let (table, _) = aggregate(vec![ok(set(
            0,
            ts(1),
            &["A", "B", "C"],
            &[&["1"], &["1", "2", "3"]],
        ))]);
        assert_eq!(table.cell_by_label(0, "B"), None);
        assert_eq!(table.cell_by_label(0, "C"), None);
        assert_eq!(table.cell_by_label(1, "C"), Some("3"));
    }

    #[test]
    fn test_long_rows_get_synthesized_columns() {
        let (table, _) = aggregate(vec![ok(set(0, ts(1), &["A"], &[&["1", "extra"]]))]);
        assert_eq!(table.columns(), ["Timestamp", "A", "Column 2"]);
        assert_eq!(table.cell_by_label(0, "Column 2"), Some("extra"));
    }

    #[test]
    fn test_blank_fields_are_no_value() {
        let (table, _) = aggregate(vec![ok(set(0, ts(1), &["A", "B"], &[&["", "2"]]))]);
        assert_eq!(table.cell_by_label(0, "A"), None);
        assert_eq!(table.cell_by_label(0, "B"), Some("2"));
    }

    #[test]
    fn test_failed_extraction_is_skipped() {
        let (table, summary) = aggregate(vec![
            ok(set(0, ts(1), &["A"], &[&["1"]])),
            Extraction {
                source_index: 1,
                message_id: "broken".to_string(),
                outcome: Err(ExtractError::EmptyHeader {
                    message: "broken".to_string(),
                }),
            },
            ok(set(2, ts(3), &["A"], &[&["3"]])),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(summary.messages_seen, 3);
        assert_eq!(summary.messages_skipped, 1);
        assert_eq!(summary.total_rows, 2);
    }

    #[test]
    fn test_unknown_timestamp_prefixes_rows() {
        let (table, summary) = aggregate(vec![ok(set(
            0,
            MessageTimestamp::Unknown,
            &["A"],
            &[&["1"]],
        ))]);
        assert_eq!(table.cell(0, 0), Some("Unknown"));
        assert_eq!(summary.unknown_timestamps, 1);
    }

    #[test]
    fn test_empty_row_sets_leave_table_empty() {
        let (table, summary) = aggregate(vec![
            ok(RowSet::empty(0, "a", ts(1))),
            ok(set(1, ts(2), &["A", "B"], &[])),
        ]);
        assert!(table.is_empty());
        assert_eq!(summary.messages_with_rows, 0);
        assert_eq!(summary.total_rows, 0);
    }

    #[test]
    fn test_incremental_push_matches_batch_aggregate() {
        let sets = [
            set(0, ts(1), &["A", "B"], &[&["1", "2"]]),
            set(1, ts(2), &["B", "C"], &[&["3", "4"]]),
        ];
        let mut aggregator = Aggregator::new();
        for s in &sets {
            aggregator.push(ok(s.clone()));
        }
        assert_eq!(aggregator.len(), 2);
        let (incremental, _) = aggregator.finish();
        let (batch, _) = aggregate(sets.into_iter().map(ok).collect());
        assert_eq!(incremental, batch);
    }
}
