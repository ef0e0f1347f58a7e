//! Raw saleyard report ingest.
//!
//! A raw export is a CSV file with a free-form preamble, a header row starting
//! with the `Category` column, data rows, and a trailing blank line. Parsing is
//! two-phase:
//!
//! 1. **Locate** the data table: the first line whose trimmed content starts with
//!    the sentinel token, up to (not including) the next blank line.
//! 2. **Parse** that block with a fixed schema: rows are padded/truncated to the
//!    header width and only allow-listed columns are kept.
//!
//! Saleyard and report date are not in the file body; they come from the
//! filename (`<Saleyard_Name>_<DD-MM-YYYY>.csv`).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{ProvenanceKey, ReportColumn, ReportRow};
use crate::error::{AppError, IngestError};

/// Trimmed header lines start with this token.
pub const SENTINEL_HEADER: &str = "Category,";

const CSV_EXTENSION: &str = ".csv";
const DATE_TOKEN_LEN: usize = 10;
const FILENAME_DATE_FORMAT: &str = "%d-%m-%Y";
/// One saleyard character, the separator, and the date token.
const MIN_STEM_LEN: usize = DATE_TOKEN_LEN + 2;

/// The located data table: header names and raw cell text per row.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A successfully parsed report file.
#[derive(Debug, Clone)]
pub struct RawReport {
    pub path: PathBuf,
    pub key: ProvenanceKey,
    pub rows: Vec<ReportRow>,
}

/// Derive `(saleyard, report date)` from a report filename.
pub fn parse_report_filename(file_name: &str) -> Result<ProvenanceKey, IngestError> {
    let malformed = || IngestError::MalformedFilename(file_name.to_string());

    let stem = strip_csv_extension(file_name).ok_or_else(malformed)?;
    if stem.chars().count() < MIN_STEM_LEN {
        return Err(malformed());
    }

    // The date token is the last ten characters, not bytes.
    let (split, _) = stem
        .char_indices()
        .rev()
        .nth(DATE_TOKEN_LEN - 1)
        .ok_or_else(malformed)?;
    let (head, token) = stem.split_at(split);

    let report_date = NaiveDate::parse_from_str(token, FILENAME_DATE_FORMAT).map_err(|_| {
        IngestError::UnparseableDate {
            file: file_name.to_string(),
            token: token.to_string(),
        }
    })?;

    // Drop the separator between saleyard and date.
    let (sep_idx, _) = head.char_indices().last().ok_or_else(malformed)?;
    let saleyard = head[..sep_idx].replace('_', " ").trim().to_string();
    if saleyard.is_empty() {
        return Err(malformed());
    }

    Ok(ProvenanceKey::new(saleyard, report_date))
}

fn strip_csv_extension(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(CSV_EXTENSION.len())?;
    let ext = file_name.get(split..)?;
    if ext.eq_ignore_ascii_case(CSV_EXTENSION) {
        file_name.get(..split)
    } else {
        None
    }
}

/// Phase 1 + 2: locate the embedded table and split it into cells.
pub fn locate_table(content: &str) -> Result<RawTable, IngestError> {
    let mut lines = content.lines().map(normalize_line);

    let header_line = lines
        .by_ref()
        .find(|line| line.starts_with(SENTINEL_HEADER))
        .ok_or(IngestError::MissingDataTable)?;

    let mut block = String::from(header_line);
    for line in lines.take_while(|line| !line.is_empty()) {
        block.push('\n');
        block.push_str(line);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(block.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(Ok(record)) => record.iter().map(|h| h.trim().to_string()).collect(),
        _ => return Err(IngestError::MissingDataTable),
    };

    let width = headers.len();
    let mut rows = Vec::new();
    for (idx, result) in records.enumerate() {
        match result {
            Ok(record) => {
                let mut cells: Vec<String> = record.iter().take(width).map(str::to_string).collect();
                cells.resize(width, String::new());
                rows.push(cells);
            }
            Err(e) => warn!(row = idx + 1, "skipping unreadable data row: {e}"),
        }
    }

    if rows.is_empty() {
        return Err(IngestError::EmptyDataTable);
    }

    Ok(RawTable { headers, rows })
}

fn normalize_line(line: &str) -> &str {
    line.trim().trim_start_matches('\u{feff}').trim_start()
}

/// Restrict a located table to the allow-listed columns.
///
/// Columns the file does not carry stay `None` on every row. Cells failing
/// numeric coercion are kept as text and logged.
pub fn rows_from_table(table: &RawTable) -> Vec<ReportRow> {
    let mapping: Vec<(usize, ReportColumn)> = table
        .headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let column = ReportColumn::from_header(name)?;
            ReportColumn::ALLOWED.contains(&column).then_some((idx, column))
        })
        .collect();

    // The first occurrence of a duplicated header wins.
    let mut seen = Vec::new();
    let mapping: Vec<(usize, ReportColumn)> = mapping
        .into_iter()
        .filter(|(_, c)| {
            if seen.contains(c) {
                false
            } else {
                seen.push(*c);
                true
            }
        })
        .collect();

    table
        .rows
        .iter()
        .map(|cells| {
            let mut row = ReportRow::default();
            for &(idx, column) in &mapping {
                row.set(column, cells[idx].as_str());
            }
            for (column, value) in row.coercion_failures() {
                let issue = IngestError::NumericCoercion {
                    column,
                    value: value.to_string(),
                };
                warn!("{issue}; treating as missing");
            }
            row
        })
        .collect()
}

/// Parse the body of a raw report into allow-listed rows.
pub fn parse_report_rows(content: &str) -> Result<Vec<ReportRow>, IngestError> {
    let table = locate_table(content)?;
    Ok(rows_from_table(&table))
}

/// Read and parse one raw report file.
pub fn load_report(path: &Path) -> Result<RawReport, IngestError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| IngestError::MalformedFilename(path.display().to_string()))?;
    let key = parse_report_filename(file_name)?;

    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = parse_report_rows(&content)?;

    debug!(file = file_name, rows = rows.len(), "parsed report {key}");
    Ok(RawReport {
        path: path.to_path_buf(),
        key,
        rows,
    })
}

/// List candidate report files in `dir`, sorted by name.
///
/// Only `*.csv` files are considered; names starting with `combined` are
/// previous merge outputs and are ignored. A missing directory yields no files.
pub fn list_report_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        AppError::new(2, format!("Failed to read downloads directory '{}': {e}", dir.display()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::new(2, format!("Failed to list downloads directory '{}': {e}", dir.display()))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if strip_csv_extension(name).is_some() && !name.starts_with("combined") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Report generated 02/01/2024 10:15
Saleyard: Scone
,,
Category,Weight Range,Sale Prefix,Head Count,Head Change,Min Lwt c/kg,Max Lwt c/kg,Avg Lwt c/kg,Avg Lwt Change,Min $/Head,Max $/Head,Avg $/Head,Dressing %
Yearling Steer,280-330,Restocker,45,-3,310.0,352.5,331.20,4.5,930.00,1150.00,1042.75,52
Vealer Heifer,200-280,Processor,12,0,280,301,290.00,-1.25,600,790,702.10,50

Notes: indicative only
";

    #[test]
    fn filename_scone() {
        let key = parse_report_filename("Scone_01-01-2024.csv").unwrap();
        assert_eq!(key.saleyard, "Scone");
        assert_eq!(key.report_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn filename_underscores_become_spaces() {
        let key = parse_report_filename("Wagga_Wagga_15-03-2024.csv").unwrap();
        assert_eq!(key.saleyard, "Wagga Wagga");
        assert_eq!(key.report_date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
    }

    #[test]
    fn filename_too_short_is_malformed() {
        assert!(matches!(
            parse_report_filename("X.csv"),
            Err(IngestError::MalformedFilename(_))
        ));
        assert!(matches!(
            parse_report_filename("_01-01-2024.csv"),
            Err(IngestError::MalformedFilename(_))
        ));
    }

    #[test]
    fn filename_bad_date() {
        assert!(matches!(
            parse_report_filename("Scone_31-02-2024.csv"),
            Err(IngestError::UnparseableDate { .. })
        ));
        assert!(matches!(
            parse_report_filename("Scone_2024-01-01.csv"),
            Err(IngestError::UnparseableDate { .. })
        ));
    }

    #[test]
    fn filename_non_ascii_date_is_unparseable() {
        for name in ["Sconeé1-01-2024.csv", "Scone_01-01-202é.csv"] {
            match parse_report_filename(name) {
                Err(IngestError::UnparseableDate { token, .. }) => {
                    assert_eq!(token.chars().count(), 10, "{name}")
                }
                other => panic!("{name}: unexpected {other:?}"),
            }
        }
        let key = parse_report_filename("Güntherskehl_05-03-2024.csv").unwrap();
        assert_eq!(key.saleyard, "Güntherskehl");
    }

    #[test]
    fn locates_table_after_preamble() {
        let table = locate_table(SAMPLE).unwrap();
        assert_eq!(table.headers.len(), 13);
        assert_eq!(table.headers[0], "Category");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1][0], "Vealer Heifer");
    }

    #[test]
    fn allowed_columns_round_trip_exactly() {
        let table = locate_table(SAMPLE).unwrap();
        let rows = rows_from_table(&table);
        assert_eq!(rows.len(), table.rows.len());

        for (row, cells) in rows.iter().zip(&table.rows) {
            for (idx, name) in table.headers.iter().enumerate() {
                match ReportColumn::from_header(name) {
                    Some(column) => assert_eq!(row.text(column), Some(cells[idx].as_str())),
                    None => assert_eq!(name, "Dressing %"),
                }
            }
        }
        assert_eq!(rows[0].text(ReportColumn::AvgLwtCkg), Some("331.20"));
        assert_eq!(rows[0].value(ReportColumn::HeadChange), Some(-3.0));
    }

    #[test]
    fn missing_header_is_reported() {
        let err = locate_table("just a preamble\nno table here\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingDataTable));
    }

    #[test]
    fn header_without_rows_is_reported() {
        let err = locate_table("preamble\nCategory,Head Count\n\nCattle,3\n").unwrap_err();
        assert!(matches!(err, IngestError::EmptyDataTable));
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_truncated() {
        let content = "Category,Weight Range,Head Count\nCows,400+\nBulls,600+,4,extra,cells\n";
        let table = locate_table(content).unwrap();
        assert_eq!(table.rows[0], vec!["Cows", "400+", ""]);
        assert_eq!(table.rows[1], vec!["Bulls", "600+", "4"]);

        let rows = rows_from_table(&table);
        assert_eq!(rows[0].value(ReportColumn::HeadCount), None);
        assert!(rows[0].sale_prefix.is_none());
    }

    #[test]
    fn absent_columns_are_omitted() {
        let rows = parse_report_rows("Category,Head Count\nCows,7\n").unwrap();
        assert_eq!(rows[0].category.as_deref(), Some("Cows"));
        assert!(rows[0].weight_range.is_none());
        assert!(rows[0].avg_dollar_head.is_none());
    }

    #[test]
    fn bad_numbers_become_missing() {
        let rows = parse_report_rows("Category,Head Count,Avg $/Head\nCows,lots,1,200.50\n").unwrap();
        assert_eq!(rows[0].value(ReportColumn::HeadCount), None);
        assert_eq!(rows[0].text(ReportColumn::HeadCount), Some("lots"));
        assert_eq!(rows[0].value(ReportColumn::AvgDollarHead), Some(1.0));
    }

    #[test]
    fn quoted_cells_keep_their_commas() {
        let rows = parse_report_rows("Category,Head Count\n\"Cows, Heavy\",7\n").unwrap();
        assert_eq!(rows[0].category.as_deref(), Some("Cows, Heavy"));
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let rows = parse_report_rows("\u{feff}Category,Head Count\r\nCows,7\r\n\r\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value(ReportColumn::HeadCount), Some(7.0));
    }
}
