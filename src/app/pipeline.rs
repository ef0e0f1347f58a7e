//! Shared workflows behind the CLI commands.
//!
//! Merge: list downloads -> parse -> ingest -> save store -> archive -> workbook.
//! Report/trend: load dataset -> filter -> aggregate.
//!
//! The CLI handlers in `app` only deal with presentation (printing vs JSON).

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::aggregate::{
    Pivot, RowFilter, TREND_START, WeeklyTrend, export_rows, pivot_by_weight_range, weekly_trend,
};
use crate::config::StorePaths;
use crate::domain::{DatasetRow, ProvenanceKey};
use crate::error::AppError;
use crate::io::{WorkbookSummary, archive_report, list_report_files, load_report, write_workbook};
use crate::store::{CombinedDataset, IngestOutcome, MergeCounts, MergeStore};

/// Outcome of one `merge` run.
#[derive(Debug, Default)]
pub struct MergeRun {
    pub merged: Vec<(ProvenanceKey, MergeCounts)>,
    pub already_ingested: Vec<ProvenanceKey>,
    /// Files that could not be parsed; they stay in the downloads directory.
    pub failed: Vec<(PathBuf, String)>,
    pub archived: Vec<PathBuf>,
    pub dataset_rows: usize,
    pub workbook: Option<WorkbookSummary>,
}

/// Ingest every report waiting in the downloads directory.
///
/// Per-file problems are logged and skipped. Only store and workbook I/O
/// abort the run.
pub fn run_merge(paths: &StorePaths, with_workbook: bool) -> Result<MergeRun, AppError> {
    let mut store = MergeStore::load(&paths.ledger, &paths.dataset)?;
    let files = list_report_files(&paths.downloads)?;
    info!(files = files.len(), dir = %paths.downloads.display(), "scanning downloads");

    let mut run = MergeRun::default();
    let mut processed = Vec::new();
    for path in files {
        let report = match load_report(&path) {
            Ok(report) => report,
            Err(err) => {
                warn!(file = %path.display(), "skipping report: {err}");
                run.failed.push((path, err.to_string()));
                continue;
            }
        };

        match store.ingest(&report.key, report.rows) {
            IngestOutcome::Merged(counts) => {
                info!(
                    added = counts.added,
                    duplicates = counts.duplicates,
                    "merged {}",
                    report.key
                );
                run.merged.push((report.key, counts));
            }
            IngestOutcome::AlreadyIngested => {
                info!("{} already ingested; archiving without merge", report.key);
                run.already_ingested.push(report.key);
            }
        }
        processed.push(report.path);
    }

    store.save()?;

    // Archive only after the store is on disk. A file that fails to move is
    // picked up again next run and archived as already ingested.
    for path in processed {
        match archive_report(&path, &paths.history) {
            Ok(target) => run.archived.push(target),
            Err(err) => warn!("{err}"),
        }
    }

    run.dataset_rows = store.dataset().len();
    if with_workbook && !store.dataset().is_empty() {
        run.workbook = Some(write_full_workbook(&paths.workbook, store.dataset())?);
    }

    Ok(run)
}

/// Write every dataset row plus the unfiltered pivot.
pub fn write_full_workbook(path: &Path, dataset: &CombinedDataset) -> Result<WorkbookSummary, AppError> {
    let rows: Vec<&DatasetRow> = dataset.rows().iter().collect();
    let pivot = pivot_by_weight_range(&rows);
    let summary = write_workbook(path, &rows, &pivot)?;
    info!(path = %path.display(), sheets = summary.sheets.len(), "workbook written");
    Ok(summary)
}

/// Rows matching `filter`, or exit code 3 when none do.
pub fn filtered_rows<'a>(
    dataset: &'a CombinedDataset,
    filter: &RowFilter,
) -> Result<Vec<&'a DatasetRow>, AppError> {
    if dataset.is_empty() {
        return Err(AppError::new(3, "The combined dataset is empty. Run `saleyard merge` first."));
    }
    let rows = filter.apply(dataset.rows());
    if rows.is_empty() {
        return Err(AppError::new(3, "No data matches your filters."));
    }
    Ok(rows)
}

/// Pivot of the filtered rows.
pub fn run_report(dataset: &CombinedDataset, filter: &RowFilter) -> Result<Pivot, AppError> {
    let rows = filtered_rows(dataset, filter)?;
    info!(rows = rows.len(), "building pivot");
    Ok(pivot_by_weight_range(&rows))
}

/// Export the filtered view (see [`export_rows`]) with its pivot.
pub fn export_report(
    path: &Path,
    dataset: &CombinedDataset,
    filter: &RowFilter,
    include_all_filters: bool,
) -> Result<WorkbookSummary, AppError> {
    let filtered = filtered_rows(dataset, filter)?;
    let rows = export_rows(dataset.rows(), &filtered, include_all_filters);
    let pivot = pivot_by_weight_range(&filtered);
    let summary = write_workbook(path, &rows, &pivot)?;
    info!(path = %path.display(), rows = rows.len(), "report exported");
    Ok(summary)
}

/// Weekly trend since [`TREND_START`], ignoring the filter's date window.
pub fn run_trend(dataset: &CombinedDataset, filter: &RowFilter) -> Result<WeeklyTrend, AppError> {
    let rows = filtered_rows(dataset, &filter.without_window())?;
    let trend = weekly_trend(&rows, TREND_START);
    if trend.is_empty() {
        return Err(AppError::new(
            3,
            "No weekly data since 1 January 2024 matches your filters.",
        ));
    }
    Ok(trend)
}
