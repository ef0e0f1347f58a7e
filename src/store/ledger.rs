//! The download ledger: which (saleyard, report date) pairs are already ingested.
//!
//! Persisted as a two-column CSV (`Saleyard,Report Date`) that is only ever
//! appended to. The external downloader reads the same file to decide what not
//! to fetch again.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ProvenanceKey, REPORT_DATE_FORMAT};
use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRecord {
    #[serde(rename = "Saleyard")]
    saleyard: String,
    #[serde(rename = "Report Date")]
    report_date: String,
}

#[derive(Debug, Clone)]
pub struct DownloadLedger {
    path: PathBuf,
    entries: BTreeSet<ProvenanceKey>,
    /// Recorded this run, not yet appended to disk.
    pending: Vec<ProvenanceKey>,
}

impl DownloadLedger {
    /// Load the ledger at `path`; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let mut ledger = Self {
            path: path.to_path_buf(),
            entries: BTreeSet::new(),
            pending: Vec::new(),
        };
        if !path.exists() {
            debug!(path = %path.display(), "no ledger yet; starting empty");
            return Ok(ledger);
        }

        let corrupt = |detail: String| {
            AppError::new(4, format!("Corrupt ledger '{}': {detail}", path.display()))
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| corrupt(e.to_string()))?;

        for (idx, result) in reader.deserialize::<LedgerRecord>().enumerate() {
            let line = idx + 2;
            let record = result.map_err(|e| corrupt(format!("line {line}: {e}")))?;
            let report_date = NaiveDate::parse_from_str(&record.report_date, REPORT_DATE_FORMAT)
                .map_err(|_| corrupt(format!("line {line}: invalid date '{}'", record.report_date)))?;
            ledger
                .entries
                .insert(ProvenanceKey::new(record.saleyard, report_date));
        }

        debug!(path = %path.display(), entries = ledger.entries.len(), "loaded ledger");
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &ProvenanceKey) -> bool {
        self.entries.contains(key)
    }

    /// Record a key; returns `false` if it was already present.
    pub fn record(&mut self, key: ProvenanceKey) -> bool {
        if self.entries.contains(&key) {
            return false;
        }
        self.entries.insert(key.clone());
        self.pending.push(key);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProvenanceKey> {
        self.entries.iter()
    }

    /// Append keys recorded since load to the ledger file.
    pub fn save(&mut self) -> Result<(), AppError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let io_err = |e: &dyn std::fmt::Display| {
            AppError::new(2, format!("Failed to write ledger '{}': {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_err(&e))?;
            }
        }

        let is_new = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let needs_newline = !is_new && !ends_with_newline(&self.path).map_err(|e| io_err(&e))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_err(&e))?;
        if needs_newline {
            file.write_all(b"\n").map_err(|e| io_err(&e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);
        for key in &self.pending {
            writer
                .serialize(LedgerRecord {
                    saleyard: key.saleyard.clone(),
                    report_date: key.report_date.format(REPORT_DATE_FORMAT).to_string(),
                })
                .map_err(|e| io_err(&e))?;
        }
        writer.flush().map_err(|e| io_err(&e))?;

        debug!(appended = self.pending.len(), "ledger saved");
        self.pending.clear();
        Ok(())
    }
}

/// True when the last byte of a non-empty file is `\n`.
fn ends_with_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
