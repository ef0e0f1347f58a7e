//! Per-user favourite saleyards.
//!
//! `favourites.csv` has one row per user: `User,<saleyard>,<saleyard>,...`.
//! Trailing blank cells are ignored.

use std::path::Path;

use tracing::debug;

use crate::error::AppError;

/// Favourite saleyards of `user`; empty when the file or the user is missing.
pub fn load_favourites(path: &Path, user: &str) -> Result<Vec<String>, AppError> {
    if !path.exists() {
        debug!(path = %path.display(), "no favourites file");
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open favourites '{}': {e}", path.display())))?;

    for result in reader.records() {
        let record = result
            .map_err(|e| AppError::new(2, format!("Failed to read favourites '{}': {e}", path.display())))?;
        if record.get(0) != Some(user) {
            continue;
        }
        return Ok(record
            .iter()
            .skip(1)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect());
    }

    debug!(user, "user has no favourites");
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_users_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favourites.csv");
        std::fs::write(
            &path,
            "User,Fav 1,Fav 2,Fav 3\nSam,Dubbo,,\nGus,Scone, Tamworth ,\n",
        )
        .unwrap();

        assert_eq!(load_favourites(&path, "Gus").unwrap(), ["Scone", "Tamworth"]);
        assert_eq!(load_favourites(&path, "Sam").unwrap(), ["Dubbo"]);
        assert!(load_favourites(&path, "Nobody").unwrap().is_empty());
        assert!(load_favourites(&dir.path().join("missing.csv"), "Gus").unwrap().is_empty());
    }
}
