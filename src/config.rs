//! Filesystem layout of the pipeline's inputs and persisted state.
//!
//! Everything lives under one data directory unless the downloads or history
//! directories are overridden (flags or `SALEYARD_*` environment variables,
//! optionally from `.env`).

use std::path::{Path, PathBuf};

pub const DOWNLOADS_DIR: &str = "downloads";
pub const HISTORY_DIR: &str = "history";
pub const LEDGER_FILE: &str = "download_log.csv";
pub const DATASET_FILE: &str = "combined_mla_output.csv";
pub const WORKBOOK_FILE: &str = "final_mla_output.xlsx";
pub const FAVOURITES_FILE: &str = "favourites.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Where the report source deposits raw exports.
    pub downloads: PathBuf,
    /// Where processed raw exports are moved.
    pub history: PathBuf,
    pub ledger: PathBuf,
    pub dataset: PathBuf,
    pub workbook: PathBuf,
    pub favourites: PathBuf,
}

impl StorePaths {
    /// Default layout under `root`.
    pub fn under(root: &Path) -> Self {
        Self {
            downloads: root.join(DOWNLOADS_DIR),
            history: root.join(HISTORY_DIR),
            ledger: root.join(LEDGER_FILE),
            dataset: root.join(DATASET_FILE),
            workbook: root.join(WORKBOOK_FILE),
            favourites: root.join(FAVOURITES_FILE),
        }
    }

    pub fn with_downloads(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.downloads = dir;
        }
        self
    }

    pub fn with_history(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.history = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_touch_their_directory() {
        let paths = StorePaths::under(Path::new("/data"))
            .with_downloads(Some(PathBuf::from("/incoming")))
            .with_history(None);
        assert_eq!(paths.downloads, PathBuf::from("/incoming"));
        assert_eq!(paths.history, PathBuf::from("/data/history"));
        assert_eq!(paths.dataset, PathBuf::from("/data/combined_mla_output.csv"));
    }
}
