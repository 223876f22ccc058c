// SPDX-License-Identifier: MIT

//! Per-folder summary metadata (`folder_summary.json`)

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// Filename of the summary artifact written into organized folders
pub const SUMMARY_FILENAME: &str = "folder_summary.json";

/// Filename of the not-found report written to the models root
pub const NOT_FOUND_FILENAME: &str = "not_found_models.json";

/// Snapshot of a folder's contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FolderSummary {
    pub total_files: usize,
    pub total_subfolders: usize,
    /// Lowercased extension (with dot) to file count
    pub file_types: BTreeMap<String, usize>,
    /// Local wall-clock time of the last refresh
    pub last_updated: String,
}

impl FolderSummary {
    /// Compute a summary by walking the folder recursively.
    ///
    /// Summary files and not-found reports are bookkeeping and are excluded
    /// from the counts.
    pub fn compute(folder: &Path) -> Self {
        let mut summary = Self {
            total_files: 0,
            total_subfolders: 0,
            file_types: BTreeMap::new(),
            last_updated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        };

        let (files, dirs) = crate::fsops::walk_tree(folder);
        summary.total_subfolders = dirs.len();

        for file in files {
            if is_bookkeeping_file(&file) {
                continue;
            }
            summary.total_files += 1;
            let ext = file
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e.to_lowercase()))
                .unwrap_or_default();
            *summary.file_types.entry(ext).or_insert(0) += 1;
        }

        summary
    }

    /// Write this summary into the folder
    pub fn write(&self, folder: &Path) -> Result<PathBuf> {
        let path = folder.join(SUMMARY_FILENAME);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Read a folder's summary file, if present
    pub fn read(folder: &Path) -> Result<Option<Self>> {
        let path = folder.join(SUMMARY_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

/// Recompute and write the summary for a folder
pub fn refresh(folder: &Path) -> Result<FolderSummary> {
    let summary = FolderSummary::compute(folder);
    summary.write(folder)?;
    debug!(
        "Summary refreshed for {:?}: {} files in {} subfolders",
        folder, summary.total_files, summary.total_subfolders
    );
    Ok(summary)
}

/// Check whether a path is a summary or not-found artifact
pub fn is_bookkeeping_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some(SUMMARY_FILENAME) | Some(NOT_FOUND_FILENAME)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_files_and_subfolders() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Furniture/Table")).unwrap();
        std::fs::write(dir.path().join("Furniture/Table/1.abc.zip"), b"x").unwrap();
        std::fs::write(dir.path().join("Furniture/Table/1.abc.jpeg"), b"x").unwrap();
        std::fs::write(dir.path().join("Furniture/note.ZIP"), b"x").unwrap();

        let summary = FolderSummary::compute(dir.path());
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.total_subfolders, 2);
        assert_eq!(summary.file_types.get(".zip"), Some(&2));
        assert_eq!(summary.file_types.get(".jpeg"), Some(&1));
    }

    #[test]
    fn summary_file_itself_is_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.abc.zip"), b"x").unwrap();

        refresh(dir.path()).unwrap();
        let second = refresh(dir.path()).unwrap();

        assert_eq!(second.total_files, 1);
        assert!(!second.file_types.contains_key(".json"));
    }

    #[test]
    fn roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rar"), b"x").unwrap();

        let written = refresh(dir.path()).unwrap();
        let read = FolderSummary::read(dir.path()).unwrap().unwrap();
        assert_eq!(written, read);
    }

    #[test]
    fn read_missing_summary_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FolderSummary::read(dir.path()).unwrap().is_none());
    }
}
