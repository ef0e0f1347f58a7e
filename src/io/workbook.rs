//! Export the combined dataset and pivot to a formatted `.xlsx` workbook.
//!
//! Layout:
//! - `All Data`: every exported row in dataset column order
//! - `Pivot Table`: weighted metrics per weight range plus the grand total
//! - one sheet per distinct category, named by truncating to 31 characters
//!
//! Column widths fit the longest rendered value. Decimal columns use
//! `#,##0.00`, head count/change use `0`.

use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{debug, warn};

use crate::aggregate::Pivot;
use crate::domain::{ColumnKind, DatasetRow, Metric, ReportColumn};
use crate::error::AppError;
use crate::report::format_thousands;

/// Excel's sheet-name length limit.
pub const MAX_SHEET_NAME_LEN: usize = 31;

pub const ALL_DATA_SHEET: &str = "All Data";
pub const PIVOT_SHEET: &str = "Pivot Table";

/// Sheets written, and category sheets that could not be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkbookSummary {
    pub sheets: Vec<String>,
    pub skipped: Vec<String>,
}

pub const INTEGER_FORMAT: &str = "0";
pub const DECIMAL_FORMAT: &str = "#,##0.00";
/// Added to the longest rendered value (or header) of a column.
pub const WIDTH_PADDING: usize = 2;

/// Excel number format for a column kind; text has none.
pub fn number_format(kind: ColumnKind) -> Option<&'static str> {
    match kind {
        ColumnKind::Text => None,
        ColumnKind::Integer => Some(INTEGER_FORMAT),
        ColumnKind::Decimal => Some(DECIMAL_FORMAT),
    }
}

/// What a data cell on a rows sheet holds.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Absent text, or a numeric cell that is missing or failed coercion.
    Blank,
    Text(String),
    Number { value: f64, kind: ColumnKind },
}

impl CellValue {
    /// The cell as Excel displays it under its number format.
    pub fn rendered(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Text(text) => text.clone(),
            CellValue::Number { value, kind: ColumnKind::Integer } => format!("{value:.0}"),
            CellValue::Number { value, .. } => format_thousands(*value),
        }
    }
}

pub fn cell_value(row: &DatasetRow, column: ReportColumn) -> CellValue {
    let kind = column.kind();
    if kind == ColumnKind::Text {
        let text = row.cell(column);
        return if text.is_empty() {
            CellValue::Blank
        } else {
            CellValue::Text(text)
        };
    }
    match row.row.value(column) {
        Some(value) => CellValue::Number { value, kind },
        None => CellValue::Blank,
    }
}

/// Column of a rows sheet and its final width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub column: ReportColumn,
    pub width: usize,
}

/// Dataset columns in order, each sized to its longest rendered value or
/// header plus [`WIDTH_PADDING`].
pub fn column_layout(rows: &[&DatasetRow]) -> Vec<ColumnLayout> {
    ReportColumn::DATASET
        .into_iter()
        .map(|column| {
            let longest = rows
                .iter()
                .map(|row| cell_value(row, column).rendered().chars().count())
                .chain(std::iter::once(column.header().chars().count()))
                .max()
                .unwrap_or(0);
            ColumnLayout {
                column,
                width: longest + WIDTH_PADDING,
            }
        })
        .collect()
}

struct Formats {
    header: Format,
    integer: Format,
    decimal: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            integer: Format::new().set_num_format(INTEGER_FORMAT),
            decimal: Format::new().set_num_format(DECIMAL_FORMAT),
        }
    }

    fn number(&self, kind: ColumnKind) -> Option<&Format> {
        match kind {
            ColumnKind::Text => None,
            ColumnKind::Integer => Some(&self.integer),
            ColumnKind::Decimal => Some(&self.decimal),
        }
    }
}

/// Sheet name for a category: the first 31 characters.
///
/// Two categories sharing a 31-character prefix map to the same name; the
/// writer keeps the first and skips the rest.
pub fn sheet_name_for(category: &str) -> String {
    category.trim().chars().take(MAX_SHEET_NAME_LEN).collect()
}

/// Write the workbook to `path`, replacing any existing file.
pub fn write_workbook(path: &Path, rows: &[&DatasetRow], pivot: &Pivot) -> Result<WorkbookSummary, AppError> {
    let xlsx_err = |e: XlsxError| {
        AppError::new(2, format!("Failed to write workbook '{}': {e}", path.display()))
    };

    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let mut summary = WorkbookSummary::default();

    workbook.push_worksheet(rows_sheet(ALL_DATA_SHEET, rows, &formats).map_err(xlsx_err)?);
    summary.sheets.push(ALL_DATA_SHEET.to_string());

    workbook.push_worksheet(pivot_sheet(pivot, &formats).map_err(xlsx_err)?);
    summary.sheets.push(PIVOT_SHEET.to_string());

    // Excel compares sheet names case-insensitively.
    let mut used: HashSet<String> = summary.sheets.iter().map(|s| s.to_lowercase()).collect();
    for category in distinct_categories(rows) {
        let name = sheet_name_for(category);
        if name.is_empty() || !used.insert(name.to_lowercase()) {
            warn!(category, sheet = %name, "sheet name already used; skipping category sheet");
            summary.skipped.push(category.to_string());
            continue;
        }

        let category_rows: Vec<&DatasetRow> = rows
            .iter()
            .copied()
            .filter(|r| r.row.category.as_deref().map(str::trim) == Some(category))
            .collect();

        match rows_sheet(&name, &category_rows, &formats) {
            Ok(sheet) => {
                workbook.push_worksheet(sheet);
                summary.sheets.push(name);
            }
            Err(e) => {
                warn!(category, "cannot create category sheet: {e}");
                summary.skipped.push(category.to_string());
            }
        }
    }

    workbook.save(path).map_err(xlsx_err)?;
    debug!(path = %path.display(), sheets = summary.sheets.len(), "workbook written");
    Ok(summary)
}

/// Categories in first-seen order, trimmed, without blanks.
fn distinct_categories<'a>(rows: &[&'a DatasetRow]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|r| r.row.category.as_deref().map(str::trim))
        .filter(|c| !c.is_empty() && seen.insert(*c))
        .collect()
}

fn rows_sheet(name: &str, rows: &[&DatasetRow], formats: &Formats) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(name)?;

    let layout = column_layout(rows);
    for (col, entry) in layout.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, entry.column.header(), &formats.header)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let excel_row = idx as u32 + 1;
        for (col, entry) in layout.iter().enumerate() {
            let col_num = col as u16;
            match cell_value(row, entry.column) {
                CellValue::Blank => {}
                CellValue::Text(text) => {
                    sheet.write_string(excel_row, col_num, text)?;
                }
                CellValue::Number { value, kind } => match formats.number(kind) {
                    Some(format) => {
                        sheet.write_number_with_format(excel_row, col_num, value, format)?;
                    }
                    None => {
                        sheet.write_number(excel_row, col_num, value)?;
                    }
                },
            }
        }
    }

    apply_widths(&mut sheet, layout.iter().map(|entry| entry.width))?;
    Ok(sheet)
}

fn pivot_sheet(pivot: &Pivot, formats: &Formats) -> Result<Worksheet, XlsxError> {
    let mut sheet = Worksheet::new();
    sheet.set_name(PIVOT_SHEET)?;

    let headers = [
        ReportColumn::WeightRange.header(),
        Metric::LiveWeight.display_name(),
        Metric::CentsPerKg.display_name(),
        Metric::DollarsPerHead.display_name(),
    ];
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &formats.header)?;
    }

    for (idx, row) in pivot.all_rows().enumerate() {
        let excel_row = idx as u32 + 1;
        sheet.write_string(excel_row, 0, row.weight_range.as_str())?;
        widths[0] = widths[0].max(row.weight_range.chars().count());

        for (offset, metric) in Metric::ALL.into_iter().enumerate() {
            let col = offset + 1;
            let value = row.metrics.get(metric);
            sheet.write_number_with_format(excel_row, col as u16, value, &formats.decimal)?;
            widths[col] = widths[col].max(format_thousands(value).chars().count());
        }
    }

    apply_widths(&mut sheet, widths.into_iter().map(|w| w + WIDTH_PADDING))?;
    Ok(sheet)
}

fn apply_widths(sheet: &mut Worksheet, widths: impl IntoIterator<Item = usize>) -> Result<(), XlsxError> {
    for (col, width) in widths.into_iter().enumerate() {
        sheet.set_column_width(col as u16, width as f64)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::aggregate::pivot_by_weight_range;
    use crate::domain::{ProvenanceKey, ReportRow};

    fn row(category: &str) -> DatasetRow {
        let key = ProvenanceKey::new("Scone", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let mut r = ReportRow::default();
        r.set(ReportColumn::Category, category);
        r.set(ReportColumn::WeightRange, "200-280");
        r.set(ReportColumn::HeadCount, "4");
        r.set(ReportColumn::AvgLwtCkg, "350.5");
        r.set(ReportColumn::AvgDollarHead, "bad");
        DatasetRow::new(&key, r)
    }

    #[test]
    fn long_category_is_truncated_to_31_chars() {
        let name = sheet_name_for("Yearling Steer Processor Grown Heavy Export");
        assert_eq!(name.chars().count(), MAX_SHEET_NAME_LEN);
        assert_eq!(name, "Yearling Steer Processor Grown ");
        assert_eq!(sheet_name_for("Cows"), "Cows");
    }

    #[test]
    fn missing_and_bad_numbers_are_blank() {
        let r = row("Cows");
        assert_eq!(cell_value(&r, ReportColumn::AvgDollarHead), CellValue::Blank);
        assert_eq!(cell_value(&r, ReportColumn::SalePrefix), CellValue::Blank);
        assert_eq!(cell_value(&r, ReportColumn::Category), CellValue::Text("Cows".into()));
        assert_eq!(
            cell_value(&r, ReportColumn::AvgLwtCkg),
            CellValue::Number { value: 350.5, kind: ColumnKind::Decimal }
        );
        assert_eq!(
            cell_value(&r, ReportColumn::HeadCount),
            CellValue::Number { value: 4.0, kind: ColumnKind::Integer }
        );
        assert_eq!(cell_value(&r, ReportColumn::AvgLwtCkg).rendered(), "350.50");
    }

    #[test]
    fn number_formats_by_column_kind() {
        assert_eq!(number_format(ReportColumn::HeadCount.kind()), Some("0"));
        assert_eq!(number_format(ReportColumn::HeadChange.kind()), Some("0"));
        assert_eq!(number_format(ReportColumn::AvgLwtCkg.kind()), Some("#,##0.00"));
        assert_eq!(number_format(ReportColumn::MaxDollarHead.kind()), Some("#,##0.00"));
        assert_eq!(number_format(ReportColumn::Category.kind()), None);
    }

    #[test]
    fn widths_fit_longest_value_plus_two() {
        let mut r = row("Yearling Steer Processor Grown A");
        r.row.set(ReportColumn::MinDollarHead, "1234567.5");
        let layout = column_layout(&[&r]);
        let width = |column: ReportColumn| {
            layout
                .iter()
                .find(|entry| entry.column == column)
                .map(|entry| entry.width)
                .unwrap()
        };

        assert_eq!(layout.len(), ReportColumn::DATASET.len());
        // Values longer than the header.
        assert_eq!(width(ReportColumn::Category), 32 + 2);
        assert_eq!(width(ReportColumn::MinDollarHead), "1,234,567.50".len() + 2);
        // Header longer than the values.
        assert_eq!(width(ReportColumn::Saleyard), "Saleyard".len() + 2);
        assert_eq!(width(ReportColumn::ReportDate), "Report Date".len() + 2);
        assert_eq!(width(ReportColumn::HeadCount), "Head Count".len() + 2);
        assert_eq!(width(ReportColumn::AvgDollarHead), "Avg $/Head".len() + 2);
    }

    #[test]
    fn writes_all_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final_mla_output.xlsx");

        let data = [row("Cows"), row("Yearling Steer"), row("Cows")];
        let refs: Vec<&DatasetRow> = data.iter().collect();
        let pivot = pivot_by_weight_range(&refs);

        let summary = write_workbook(&path, &refs, &pivot).unwrap();
        assert_eq!(summary.sheets, ["All Data", "Pivot Table", "Cows", "Yearling Steer"]);
        assert!(summary.skipped.is_empty());
        assert!(path.exists());
    }

    #[test]
    fn colliding_truncated_names_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let a = "Yearling Steer Processor Grown A";
        let b = "Yearling Steer Processor Grown B";
        let data = [row(a), row(b)];
        let refs: Vec<&DatasetRow> = data.iter().collect();
        let pivot = pivot_by_weight_range(&refs);

        let summary = write_workbook(&path, &refs, &pivot).unwrap();
        assert_eq!(summary.sheets.len(), 3);
        assert_eq!(summary.skipped, [b]);
    }
}
