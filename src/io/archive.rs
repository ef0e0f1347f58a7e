//! Move processed raw reports into the history directory.
//!
//! Files are moved, never deleted or overwritten: a name already present in
//! the history directory gets a ` (n)` suffix.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Move `path` into `history_dir`, returning the new location.
pub fn archive_report(path: &Path, history_dir: &Path) -> Result<PathBuf, AppError> {
    let io_err = |e: std::io::Error| {
        AppError::new(
            2,
            format!(
                "Failed to archive '{}' into '{}': {e}",
                path.display(),
                history_dir.display()
            ),
        )
    };

    fs::create_dir_all(history_dir).map_err(io_err)?;
    let target = free_target(path, history_dir)
        .ok_or_else(|| AppError::new(2, format!("Not a file path: '{}'", path.display())))?;

    // `rename` fails across filesystems; fall back to copy + remove.
    if fs::rename(path, &target).is_err() {
        fs::copy(path, &target).map_err(io_err)?;
        fs::remove_file(path).map_err(io_err)?;
    }
    Ok(target)
}

fn free_target(path: &Path, history_dir: &Path) -> Option<PathBuf> {
    let file_name = path.file_name()?;
    let candidate = history_dir.join(file_name);
    if !candidate.exists() {
        return Some(candidate);
    }

    let stem = path.file_stem()?.to_string_lossy();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| history_dir.join(format!("{stem} ({n}){ext}")))
        .find(|candidate| !candidate.exists())
}
