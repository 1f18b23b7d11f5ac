// LogHarvest - core/export.rs
//
// Persists the coerced table: XLSX (default), CSV, or JSON, chosen by the
// destination extension. Also renders the plain-text preview shown after a
// successful write.
//
// A table with zero rows is never written; the caller gets
// `ExportOutcome::NoData` instead. Every other failure is fatal and returned
// as `ExportError`.

use crate::core::model::{CellValue, ColumnType, ExportColumn, ExportOutcome, ExportTable};
use crate::util::constants;
use crate::util::error::ExportError;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output format, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Json,
}

impl ExportFormat {
    /// Format for `path`, by case-insensitive extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("xlsx") => Ok(Self::Xlsx),
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            _ => Err(ExportError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// One named sheet of a workbook.
#[derive(Debug, Clone, Copy)]
pub struct NamedSheet<'a> {
    pub name: &'a str,
    pub table: &'a ExportTable,
}

/// Write `table` to `dest`, creating parent directories first.
///
/// Returns `ExportOutcome::NoData` without touching the filesystem when the
/// table has no rows.
pub fn write_table(
    table: &ExportTable,
    dest: &Path,
    sheet_name: &str,
) -> Result<ExportOutcome, ExportError> {
    if table.is_empty() {
        tracing::info!(path = %dest.display(), "No data found; nothing written");
        return Ok(ExportOutcome::NoData);
    }

    let format = ExportFormat::from_path(dest)?;
    ensure_parent_dir(dest)?;

    let rows = match format {
        ExportFormat::Xlsx => export_xlsx(
            &[NamedSheet {
                name: sheet_name,
                table,
            }],
            dest,
        )?,
        ExportFormat::Csv => {
            let file = create_file(dest)?;
            export_csv(table, BufWriter::new(file), dest)?
        }
        ExportFormat::Json => {
            let file = create_file(dest)?;
            export_json(table, BufWriter::new(file), dest)?
        }
    };

    tracing::info!(
        path = %dest.display(),
        format = ?format,
        rows,
        columns = table.columns.len(),
        "Data saved"
    );

    Ok(ExportOutcome::Written {
        path: dest.to_path_buf(),
        rows,
        columns: table.columns.len(),
    })
}

/// Create the parent directory of `dest` if it does not exist yet.
pub fn ensure_parent_dir(dest: &Path) -> Result<(), ExportError> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| ExportError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

fn create_file(path: &Path) -> Result<File, ExportError> {
    File::create(path).map_err(|e| ExportError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Reject tables a sheet cannot hold.
fn check_sheet_limits(table: &ExportTable) -> Result<(), ExportError> {
    // +1 for the header row.
    if table.len() + 1 > constants::MAX_SHEET_ROWS {
        return Err(ExportError::TooManyRows {
            rows: table.len(),
            max: constants::MAX_SHEET_ROWS - 1,
        });
    }
    if table.columns.len() > constants::MAX_SHEET_COLUMNS {
        return Err(ExportError::TooManyColumns {
            columns: table.columns.len(),
            max: constants::MAX_SHEET_COLUMNS,
        });
    }
    Ok(())
}

/// Sheet names are limited to 31 characters and may not contain `[]:*?/\`.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .take(constants::MAX_SHEET_NAME_LENGTH)
        .collect();
    let trimmed = cleaned.trim_matches('\'').trim();
    if trimmed.is_empty() {
        constants::DEFAULT_SHEET_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitise each name and make it unique within the workbook.
///
/// Sheet names compare case-insensitively, so "Log Data" and "log data"
/// collide. Later duplicates get a `.1`, `.2`, ... suffix, with the base
/// shortened so the result still fits in 31 characters.
pub fn unique_sheet_names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for name in names {
        let base = sanitize_sheet_name(name);
        let mut candidate = base.clone();
        let mut n = 1usize;
        while taken.contains(&candidate.to_lowercase()) {
            let suffix = format!(".{n}");
            let room = constants::MAX_SHEET_NAME_LENGTH - suffix.len();
            let stem: String = base.chars().take(room).collect();
            candidate = format!("{}{suffix}", stem.trim_end());
            n += 1;
        }
        if candidate != base {
            tracing::debug!(requested = name, used = %candidate, "Sheet name renamed");
        }
        taken.insert(candidate.to_lowercase());
        out.push(candidate);
    }
    out
}

/// Write one or more sheets to an XLSX workbook at `path`.
///
/// Header row is bold. Date columns hold real spreadsheet dates with the
/// `mm/dd/yyyy` display format applied at column level. Missing cells are
/// left blank. Returns the total number of data rows written.
pub fn export_xlsx(sheets: &[NamedSheet<'_>], path: &Path) -> Result<usize, ExportError> {
    let xlsx_err = |source| ExportError::Xlsx {
        path: path.to_path_buf(),
        source,
    };

    for sheet in sheets {
        check_sheet_limits(sheet.table)?;
    }

    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(constants::SHEET_DATE_FORMAT);

    let mut workbook = Workbook::new();
    let mut total = 0;

    let names = unique_sheet_names(sheets.iter().map(|s| s.name));

    for (sheet, name) in sheets.iter().zip(names) {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name).map_err(xlsx_err)?;

        // Row and column counts fit u32/u16 after check_sheet_limits.
        for (col, column) in sheet.table.columns.iter().enumerate() {
            let col = col as u16;
            worksheet
                .write_string_with_format(0, col, column.name.as_str(), &header_format)
                .map_err(xlsx_err)?;
            if column.kind == ColumnType::Date {
                worksheet
                    .set_column_width(col, constants::DATE_COLUMN_WIDTH)
                    .map_err(xlsx_err)?;
                worksheet
                    .set_column_format(col, &date_format)
                    .map_err(xlsx_err)?;
            }
        }

        for (row_idx, row) in sheet.table.rows.iter().enumerate() {
            let row_num = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    CellValue::Empty => {}
                    CellValue::Text(s) => {
                        worksheet
                            .write_string(row_num, col, s.as_str())
                            .map_err(xlsx_err)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(row_num, col, *n).map_err(xlsx_err)?;
                    }
                    CellValue::Date(d) => match excel_date(*d) {
                        Ok(date) => {
                            worksheet
                                .write_datetime_with_format(row_num, col, &date, &date_format)
                                .map_err(xlsx_err)?;
                        }
                        Err(e) => {
                            // Outside the sheet's date range; leave the cell blank.
                            tracing::warn!(
                                sheet = sheet.name,
                                row = row_num,
                                column = col,
                                date = %d,
                                error = %e,
                                "Date cannot be stored in a sheet; cell left blank"
                            );
                        }
                    },
                }
            }
        }

        total += sheet.table.len();
        tracing::debug!(sheet = sheet.name, rows = sheet.table.len(), "Sheet written");
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(total)
}

fn excel_date(date: chrono::NaiveDate) -> Result<ExcelDateTime, rust_xlsxwriter::XlsxError> {
    use chrono::Datelike;
    // Years outside u16 cannot come from a four-digit M/D/YYYY value.
    ExcelDateTime::from_ymd(date.year() as u16, date.month() as u8, date.day() as u8)
}

/// Export the table as CSV with a header row. Dates are written `MM/DD/YYYY`,
/// missing cells as empty fields.
pub fn export_csv<W: Write>(
    table: &ExportTable,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |source| ExportError::Csv {
        path: export_path.to_path_buf(),
        source,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(table.columns.iter().map(|c| c.name.as_str()))
        .map_err(csv_err)?;

    let mut count = 0;
    for row in &table.rows {
        csv_writer
            .write_record(row.iter().map(CellValue::display_text))
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export the table as a JSON array of row objects keyed by column name.
pub fn export_json<W: Write>(
    table: &ExportTable,
    mut writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    serde_json::to_writer_pretty(&mut writer, &JsonRows(table)).map_err(|e| {
        ExportError::Json {
            path: export_path.to_path_buf(),
            source: e,
        }
    })?;
    writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(table.len())
}

struct JsonRows<'a>(&'a ExportTable);

struct JsonRow<'a> {
    columns: &'a [ExportColumn],
    cells: &'a [CellValue],
}

impl Serialize for JsonRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&JsonRow {
                columns: &self.0.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(&column.name, cell)?;
        }
        map.end()
    }
}

/// Plain-text preview of the first `max_rows` rows, for operator sanity
/// checks. Not part of the data contract.
pub fn render_preview(table: &ExportTable, max_rows: usize) -> String {
    let shown: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(|c| clip(&c.display_text())).collect())
        .collect();

    let headers: Vec<String> = table.columns.iter().map(|c| clip(&c.name)).collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            shown
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(&headers));
    out.push('\n');
    for row in &shown {
        out.push_str(&format_line(row));
        out.push('\n');
    }
    if table.len() > shown.len() {
        out.push_str(&format!("... ({} more rows)\n", table.len() - shown.len()));
    }
    out
}

fn clip(text: &str) -> String {
    let max = constants::PREVIEW_CELL_WIDTH;
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut clipped: String = text.chars().take(max - 1).collect();
        clipped.push('~');
        clipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn sample_table() -> ExportTable {
        ExportTable {
            columns: vec![
                ExportColumn {
                    name: "Timestamp".to_string(),
                    kind: ColumnType::Text,
                },
                ExportColumn {
                    name: "When".to_string(),
                    kind: ColumnType::Date,
                },
                ExportColumn {
                    name: "Count".to_string(),
                    kind: ColumnType::Numeric,
                },
            ],
            rows: vec![
                vec![
                    CellValue::Text("2024-01-15 14:30:22".to_string()),
                    CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
                    CellValue::Number(3.0),
                ],
                vec![
                    CellValue::Text("Unknown".to_string()),
                    CellValue::Empty,
                    CellValue::Number(4.5),
                ],
            ],
        }
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ExportFormat::from_path(Path::new("out/report.XLSX")).unwrap(),
            ExportFormat::Xlsx
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("a.csv")).unwrap(),
            ExportFormat::Csv
        );
        assert_eq!(
            ExportFormat::from_path(Path::new("a.json")).unwrap(),
            ExportFormat::Json
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("a.txt")),
            Err(ExportError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_csv_export() {
        let mut buf = Vec::new();
        let count = export_csv(&sample_table(), &mut buf, &PathBuf::from("out.csv")).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Timestamp,When,Count");
        assert_eq!(lines[1], "2024-01-15 14:30:22,01/05/2024,3");
        assert_eq!(lines[2], "Unknown,,4.5");
    }

    #[test]
    fn test_json_export() {
        let mut buf = Vec::new();
        let count = export_json(&sample_table(), &mut buf, &PathBuf::from("out.json")).unwrap();
        assert_eq!(count, 2);

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value[0]["When"], "2024-01-05");
        assert_eq!(value[0]["Count"], 3.0);
        assert!(value[1]["When"].is_null());
        assert_eq!(value[1]["Timestamp"], "Unknown");
    }

    #[test]
    fn test_empty_table_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("out.xlsx");
        let outcome = write_table(&ExportTable::default(), &dest, "Log Data").unwrap();
        assert_eq!(outcome, ExportOutcome::NoData);
        assert!(!dest.exists());
        assert!(!dest.parent().unwrap().exists());
    }

    #[test]
    fn test_write_xlsx_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("output").join("deep").join("out.xlsx");
        let outcome = write_table(&sample_table(), &dest, "Log Data").unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                path: dest.clone(),
                rows: 2,
                columns: 3
            }
        );
        let bytes = std::fs::read(&dest).unwrap();
        // XLSX is a zip container.
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_csv_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.csv");
        write_table(&sample_table(), &dest, "ignored").unwrap();
        let text = std::fs::read_to_string(&dest).unwrap();
        assert!(text.starts_with("Timestamp,When,Count"));
    }

    #[test]
    fn test_export_xlsx_multiple_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("multi.xlsx");
        let table = sample_table();
        let rows = export_xlsx(
            &[
                NamedSheet {
                    name: "First",
                    table: &table,
                },
                NamedSheet {
                    name: "Second",
                    table: &table,
                },
            ],
            &dest,
        )
        .unwrap();
        assert_eq!(rows, 4);
        assert!(dest.exists());
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("Log Data"), "Log Data");
        assert_eq!(sanitize_sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sanitize_sheet_name("  "), "Log Data");
    }

    #[test]
    fn test_sheet_names_unique_ignoring_case() {
        let names = unique_sheet_names(["Log Data", "log data", "a/b", "a:b", "LOG DATA"]);
        assert_eq!(names, vec!["Log Data", "log data.1", "a_b", "a_b.1", "LOG DATA.2"]);

        let long = "x".repeat(40);
        let names = unique_sheet_names([long.as_str(), long.as_str()]);
        assert_eq!(names[0].chars().count(), 31);
        assert_eq!(names[1].chars().count(), 31);
        assert!(names[1].ends_with(".1"));
    }

    #[test]
    fn test_export_xlsx_with_colliding_sheet_names() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("collide.xlsx");
        let table = sample_table();
        let rows = export_xlsx(
            &[
                NamedSheet {
                    name: "Log Data",
                    table: &table,
                },
                NamedSheet {
                    name: "log data",
                    table: &table,
                },
                NamedSheet {
                    name: "a/b",
                    table: &table,
                },
                NamedSheet {
                    name: "a:b",
                    table: &table,
                },
            ],
            &dest,
        )
        .unwrap();
        assert_eq!(rows, 8);
        assert!(dest.exists());
    }

    #[test]
    fn test_xlsx_export_tolerates_dates_before_1900() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("old.xlsx");
        let mut table = sample_table();
        table.rows[1][1] = CellValue::Date(NaiveDate::from_ymd_opt(1899, 1, 1).unwrap());

        let outcome = write_table(&table, &dest, "Log Data").unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                path: dest.clone(),
                rows: 2,
                columns: 3
            }
        );
        let bytes = std::fs::read(&dest).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_preview_lists_first_rows() {
        let preview = render_preview(&sample_table(), 1);
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp"));
        assert!(lines[1].contains("01/05/2024"));
        assert_eq!(lines[2], "... (1 more rows)");
    }
}
