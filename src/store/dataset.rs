//! The combined dataset: every ingested row, deduplicated, with provenance.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{DatasetRow, REPORT_DATE_FORMAT, ReportColumn, ReportRow};
use crate::error::AppError;

/// Result of appending a batch of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCounts {
    pub added: usize,
    pub duplicates: usize,
}

/// Rows are unique on their full persisted record; duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct CombinedDataset {
    rows: Vec<DatasetRow>,
    seen: HashSet<Vec<String>>,
}

impl CombinedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row unless an identical one is already present.
    pub fn insert(&mut self, row: DatasetRow) -> bool {
        if self.seen.insert(row.record()) {
            self.rows.push(row);
            true
        } else {
            false
        }
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = DatasetRow>) -> MergeCounts {
        let mut counts = MergeCounts::default();
        for row in rows {
            if self.insert(row) {
                counts.added += 1;
            } else {
                counts.duplicates += 1;
            }
        }
        counts
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load a persisted dataset; a missing file is an empty dataset.
    ///
    /// Exact duplicates already in the file are dropped. Numeric cells that fail
    /// coercion become missing values. Anything structurally wrong is an error.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut dataset = Self::new();
        if !path.exists() {
            debug!(path = %path.display(), "no combined dataset yet; starting empty");
            return Ok(dataset);
        }

        let corrupt = |detail: String| {
            AppError::new(
                4,
                format!("Corrupt combined dataset '{}': {detail}", path.display()),
            )
        };

        let mut reader = csv::ReaderBuilder::new()
            .from_path(path)
            .map_err(|e| corrupt(e.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|e| corrupt(format!("unreadable header: {e}")))?
            .clone();

        let columns: Vec<Option<ReportColumn>> = headers
            .iter()
            .map(|h| ReportColumn::from_header(h.trim().trim_start_matches('\u{feff}')))
            .collect();
        let position = |column: ReportColumn| columns.iter().position(|c| *c == Some(column));
        let (Some(yard_idx), Some(date_idx)) = (
            position(ReportColumn::Saleyard),
            position(ReportColumn::ReportDate),
        ) else {
            return Err(corrupt("missing `Saleyard` or `Report Date` column".to_string()));
        };

        let mut duplicates = 0usize;
        let mut coercion_failures = 0usize;
        for (idx, result) in reader.records().enumerate() {
            let line = idx + 2;
            let record = result.map_err(|e| corrupt(format!("line {line}: {e}")))?;

            let saleyard = record.get(yard_idx).unwrap_or_default().to_string();
            let raw_date = record.get(date_idx).unwrap_or_default().trim();
            let report_date = NaiveDate::parse_from_str(raw_date, REPORT_DATE_FORMAT)
                .map_err(|_| corrupt(format!("line {line}: invalid report date '{raw_date}'")))?;

            let mut row = ReportRow::default();
            // Blank cells stay absent so a reloaded row equals the row that was saved.
            for (cell, column) in record.iter().zip(&columns) {
                if let (Some(column), false) = (column, cell.is_empty()) {
                    row.set(*column, cell);
                }
            }
            coercion_failures += row.coercion_failures().len();

            if !dataset.insert(DatasetRow {
                saleyard,
                report_date,
                row,
            }) {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            warn!(duplicates, "dropped duplicate rows from persisted dataset");
        }
        if coercion_failures > 0 {
            warn!(cells = coercion_failures, "non-numeric cells in persisted dataset treated as missing");
        }
        debug!(path = %path.display(), rows = dataset.len(), "loaded combined dataset");
        Ok(dataset)
    }

    /// Rewrite the dataset file atomically (write a sibling temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let io_err = |e: &dyn std::fmt::Display| {
            AppError::new(
                2,
                format!("Failed to write combined dataset '{}': {e}", path.display()),
            )
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_err(&e))?;
            }
        }

        let tmp_path = path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path).map_err(|e| io_err(&e))?;
            writer
                .write_record(ReportColumn::DATASET.iter().map(|c| c.header()))
                .map_err(|e| io_err(&e))?;
            for row in &self.rows {
                writer.write_record(row.record()).map_err(|e| io_err(&e))?;
            }
            writer.flush().map_err(|e| io_err(&e))?;
        }
        fs::rename(&tmp_path, path).map_err(|e| io_err(&e))?;

        debug!(path = %path.display(), rows = self.rows.len(), "combined dataset saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProvenanceKey;

    fn row(category: &str, head: &str) -> DatasetRow {
        let key = ProvenanceKey::new("Scone", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let mut r = ReportRow::default();
        r.set(ReportColumn::Category, category);
        r.set(ReportColumn::HeadCount, head);
        DatasetRow::new(&key, r)
    }

    #[test]
    fn duplicates_are_dropped_not_summed() {
        let mut ds = CombinedDataset::new();
        let counts = ds.extend([row("Cows", "5"), row("Cows", "5"), row("Cows", "6")]);
        assert_eq!(counts, MergeCounts { added: 2, duplicates: 1 });
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn save_then_load_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined_mla_output.csv");

        let mut ds = CombinedDataset::new();
        ds.extend([row("Cows", "5"), row("Yearling Steer", "12.0")]);
        ds.save(&path).unwrap();

        let loaded = CombinedDataset::load(&path).unwrap();
        assert_eq!(loaded.rows(), ds.rows());
        assert_eq!(loaded.rows()[1].row.text(ReportColumn::HeadCount), Some("12.0"));
        assert!(!dir.path().join("combined_mla_output.csv.tmp").exists());
    }

    #[test]
    fn load_drops_duplicates_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        fs::write(
            &path,
            "Saleyard,Report Date,Category,Head Count\nScone,01/01/2024,Cows,5\nScone,01/01/2024,Cows,5\n",
        )
        .unwrap();

        let ds = CombinedDataset::load(&path).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0].head_count(), Some(5.0));
    }

    #[test]
    fn corrupt_dataset_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combined.csv");
        fs::write(&path, "Category,Head Count\nCows,5\n").unwrap();
        assert_eq!(CombinedDataset::load(&path).unwrap_err().exit_code(), 4);

        fs::write(&path, "Saleyard,Report Date\nScone,2024/13/45\n").unwrap();
        assert_eq!(CombinedDataset::load(&path).unwrap_err().exit_code(), 4);
    }
}
