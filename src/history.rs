// SPDX-License-Identifier: MIT

//! History management for undo support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::Result;

/// A single archive move in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub model_id: String,
    pub title: Option<String>,
    pub categories: Vec<String>,
    pub undone: bool,
}

/// History manager for tracking archive moves
pub struct History {
    path: PathBuf,
}

impl History {
    /// Create a new history manager
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append an entry to the history
    pub fn append(&self, entry: &HistoryEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // One write per entry keeps concurrent appends line-atomic
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;

        Ok(())
    }

    /// Read all history entries
    pub fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!("Failed to parse history entry: {}", e);
                }
            }
        }

        Ok(entries)
    }

    /// Get the most recent N entries (newest first)
    pub fn get_recent(&self, count: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries = self.read_all()?;
        entries.reverse();
        entries.truncate(count);
        Ok(entries)
    }

    /// Mark an entry as undone
    pub fn mark_undone(&self, id: &str) -> Result<()> {
        let entries = self.read_all()?;

        // Rewrite the entire file with the updated entry
        let file = File::create(&self.path)?;
        let mut writer = std::io::BufWriter::new(file);

        for mut entry in entries {
            if entry.id == id {
                entry.undone = true;
            }
            let json = serde_json::to_string(&entry)?;
            writeln!(writer, "{}", json)?;
        }

        Ok(())
    }

    /// Get entries that haven't been undone
    pub fn get_undoable(&self) -> Result<Vec<HistoryEntry>> {
        let entries = self.read_all()?;
        Ok(entries.into_iter().filter(|e| !e.undone).collect())
    }

    /// Clear all history
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Get history file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Create a new history entry for an archive move
pub fn create_entry(
    original_path: PathBuf,
    new_path: PathBuf,
    model_id: String,
    title: Option<String>,
    categories: Vec<String>,
) -> HistoryEntry {
    HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        original_path,
        new_path,
        model_id,
        title,
        categories,
        undone: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry(dir: &Path, name: &str) -> HistoryEntry {
        create_entry(
            dir.join(name),
            dir.join("3ds_models/Furniture").join(name),
            "123.abc".to_string(),
            Some("Table".to_string()),
            vec!["Furniture".to_string()],
        )
    }

    #[test]
    fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));

        history.append(&sample_entry(dir.path(), "a.zip")).unwrap();
        history.append(&sample_entry(dir.path(), "b.zip")).unwrap();

        let entries = history.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].model_id, "123.abc");
    }

    #[test]
    fn recent_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));

        history.append(&sample_entry(dir.path(), "old.zip")).unwrap();
        history.append(&sample_entry(dir.path(), "new.zip")).unwrap();

        let recent = history.get_recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].original_path.ends_with("new.zip"));
    }

    #[test]
    fn mark_undone_excludes_from_undoable() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));

        let entry = sample_entry(dir.path(), "a.zip");
        history.append(&entry).unwrap();
        history.mark_undone(&entry.id).unwrap();

        assert!(history.get_undoable().unwrap().is_empty());
        assert!(history.read_all().unwrap()[0].undone);
    }

    #[test]
    fn concurrent_appends_keep_every_line_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");

        let mut handles = Vec::new();
        for worker in 0..4 {
            let path = path.clone();
            let dir = dir.path().to_path_buf();
            handles.push(std::thread::spawn(move || {
                let history = History::new(path);
                for i in 0..25 {
                    let entry = sample_entry(&dir, &format!("w{}_{}.zip", worker, i));
                    history.append(&entry).unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // No interleaved partial lines: every entry comes back intact
        let entries = History::new(path).read_all().unwrap();
        assert_eq!(entries.len(), 100);
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::new(dir.path().join("history.jsonl"));

        history.append(&sample_entry(dir.path(), "a.zip")).unwrap();
        history.clear().unwrap();

        assert!(history.read_all().unwrap().is_empty());
    }
}
