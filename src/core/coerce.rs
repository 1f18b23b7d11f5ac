// LogHarvest - core/coerce.rs
//
// Per-column semantic type inference and coercion of the unified table.
// Core layer: pure logic.
//
// Rules, applied to each column independently:
//   1. Date    - more than `date_threshold` of the non-missing values look
//                like M/D/YYYY. Every value is parsed as a date; values that
//                do not parse become missing.
//   2. Numeric - every non-missing value parses as a finite number.
//   3. Text    - anything else. Values are kept verbatim.
//
// A column never ends up with mixed types: a single non-numeric value keeps
// the whole column as text rather than leaving a half-converted column.

use crate::core::model::{CellValue, ColumnType, ExportColumn, ExportTable, UnifiedTable};
use crate::util::constants;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Configuration for type coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CoerceConfig {
    /// Fraction (exclusive) of non-missing values that must be date-like
    /// for a column to become a date column.
    pub date_threshold: f64,
}

impl Default for CoerceConfig {
    fn default() -> Self {
        Self {
            date_threshold: constants::DEFAULT_DATE_THRESHOLD,
        }
    }
}

/// Infer one type per column and convert every cell accordingly.
pub fn coerce_table(table: &UnifiedTable, config: &CoerceConfig) -> ExportTable {
    let width = table.columns().len();
    let mut rows: Vec<Vec<CellValue>> = vec![Vec::with_capacity(width); table.len()];
    let mut columns = Vec::with_capacity(width);

    for (col, name) in table.columns().iter().enumerate() {
        let values: Vec<Option<&str>> = table.column_values(col).collect();
        let kind = infer_column_type(&values, config.date_threshold);

        let mut dropped = 0usize;
        for (row, value) in values.iter().enumerate() {
            let cell = coerce_value(*value, kind);
            if value.is_some() && cell.is_empty() {
                dropped += 1;
            }
            rows[row].push(cell);
        }

        if dropped > 0 {
            tracing::debug!(
                column = %name,
                dropped,
                "Values that failed date parsing set to missing"
            );
        }
        tracing::debug!(column = %name, kind = %kind, "Column type inferred");

        columns.push(ExportColumn {
            name: name.clone(),
            kind,
        });
    }

    ExportTable { columns, rows }
}

/// Decide the semantic type of one column from its cells.
pub fn infer_column_type(values: &[Option<&str>], date_threshold: f64) -> ColumnType {
    let present: Vec<&str> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return ColumnType::Text;
    }

    let date_like = present.iter().filter(|v| is_date_like(v)).count();
    if date_like as f64 / present.len() as f64 > date_threshold {
        return ColumnType::Date;
    }

    if present.iter().all(|v| parse_number(v).is_some()) {
        return ColumnType::Numeric;
    }

    ColumnType::Text
}

/// Convert one cell to the column's type.
pub fn coerce_value(value: Option<&str>, kind: ColumnType) -> CellValue {
    let Some(raw) = value else {
        return CellValue::Empty;
    };
    match kind {
        ColumnType::Date => parse_date(raw).map_or(CellValue::Empty, CellValue::Date),
        ColumnType::Numeric => match parse_number(raw) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(raw.to_string()),
        },
        ColumnType::Text => CellValue::Text(raw.to_string()),
    }
}

/// Strict `M/D/YYYY` shape check: month 1-12, day 1-31, four-digit year,
/// optional leading zeros.
pub fn is_date_like(value: &str) -> bool {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    DATE_SHAPE
        .get_or_init(|| {
            Regex::new(r"^(0?[1-9]|1[0-2])/(0?[1-9]|[12][0-9]|3[01])/\d{4}$")
                .expect("is_date_like: invalid regex")
        })
        .is_match(value)
}

/// Parse an `M/D/YYYY` value into a calendar date. Shape-valid values that
/// name an impossible day (e.g. 2/30/2024) or a year before
/// `MIN_SHEET_DATE_YEAR` return `None`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if !is_date_like(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, constants::DATE_PARSE_FORMAT)
        .ok()
        .filter(|d| d.year() >= constants::MIN_SHEET_DATE_YEAR)
}

/// Parse a finite number. `NaN` and infinities are treated as text.
pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
