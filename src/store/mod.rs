//! Persisted pipeline state: the download ledger and the combined dataset.
//!
//! `MergeStore` owns both for the duration of a run (load at start, save at
//! end). It is the only writer; ingestion is idempotent on the ledger key and
//! row-level dedup keeps reruns safe even if ledger and dataset disagree.

pub mod dataset;
pub mod ledger;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::domain::{DatasetRow, ProvenanceKey, ReportRow};
use crate::error::AppError;

pub use dataset::*;
pub use ledger::*;

/// What happened to one report handed to [`MergeStore::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First time this key was seen; rows were merged.
    Merged(MergeCounts),
    /// The ledger already had this key; nothing was merged.
    AlreadyIngested,
}

#[derive(Debug)]
pub struct MergeStore {
    ledger: DownloadLedger,
    dataset: CombinedDataset,
    dataset_path: PathBuf,
    dataset_dirty: bool,
}

impl MergeStore {
    pub fn load(ledger_path: &Path, dataset_path: &Path) -> Result<Self, AppError> {
        let ledger = DownloadLedger::load(ledger_path)?;
        let dataset = CombinedDataset::load(dataset_path)?;
        info!(
            ledger_entries = ledger.len(),
            dataset_rows = dataset.len(),
            "store loaded"
        );
        Ok(Self {
            ledger,
            dataset,
            dataset_path: dataset_path.to_path_buf(),
            dataset_dirty: false,
        })
    }

    pub fn ledger(&self) -> &DownloadLedger {
        &self.ledger
    }

    pub fn dataset(&self) -> &CombinedDataset {
        &self.dataset
    }

    pub fn contains(&self, key: &ProvenanceKey) -> bool {
        self.ledger.contains(key)
    }

    /// Merge one report's rows, unless its key is already in the ledger.
    pub fn ingest(&mut self, key: &ProvenanceKey, rows: Vec<ReportRow>) -> IngestOutcome {
        if self.ledger.contains(key) {
            debug!("{key} already in ledger; not merging");
            return IngestOutcome::AlreadyIngested;
        }

        let counts = self
            .dataset
            .extend(rows.into_iter().map(|row| DatasetRow::new(key, row)));
        self.ledger.record(key.clone());
        if counts.added > 0 {
            self.dataset_dirty = true;
        }
        IngestOutcome::Merged(counts)
    }

    pub fn has_changes(&self) -> bool {
        self.dataset_dirty || self.ledger.has_pending()
    }

    /// Persist the dataset first, then the ledger, so the ledger never names a
    /// report whose rows were not written.
    pub fn save(&mut self) -> Result<(), AppError> {
        if self.dataset_dirty {
            self.dataset.save(&self.dataset_path)?;
            self.dataset_dirty = false;
        }
        self.ledger.save()
    }
}
