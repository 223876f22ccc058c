// SPDX-License-Identifier: MIT

//! Filesystem helpers shared by the organizer and merger

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// Move a file, falling back to copy-then-remove across filesystems.
///
/// The source is only removed after the data has fully arrived at the
/// destination, so a failed move never loses the file.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Rename fails across filesystems (EXDEV); copy, then remove.
            debug!("Rename failed ({}), copying {:?} -> {:?}", e, from, to);
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)?;
            Ok(())
        }
    }
}

/// Strip characters that are invalid in Windows folder names
pub fn sanitize_folder_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Pick a destination path that does not collide with an existing file.
///
/// `table.zip` becomes `table_1.zip`, `table_2.zip`, and so on.
pub fn deconflict_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str());

    for counter in 1u32.. {
        let name = match ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };
        let candidate = parent.join(name);
        if !candidate.exists() {
            return candidate;
        }
    }

    unreachable!("counter exhausted")
}

/// Walk a directory tree, collecting every file
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk_into(root, &mut files, &mut Vec::new());
    files
}

/// Walk a directory tree, collecting files and directories separately
pub fn walk_tree(root: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    walk_into(root, &mut files, &mut dirs);
    (files, dirs)
}

fn walk_into(path: &Path, files: &mut Vec<PathBuf>, dirs: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                dirs.push(p.clone());
                walk_into(&p, files, dirs);
            } else if p.is_file() {
                files.push(p);
            }
        }
    }
}

/// Blake3 hash of a file's contents
pub fn file_hash(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    Ok(blake3::hash(&data).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.zip");
        let to = dir.path().join("b.zip");
        std::fs::write(&from, b"payload").unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"payload");
    }

    #[test]
    fn sanitize_strips_reserved_characters() {
        assert_eq!(sanitize_folder_name("Tables / Chairs"), "Tables  Chairs");
        assert_eq!(sanitize_folder_name("Deco: \"modern\"?"), "Deco modern");
        assert_eq!(sanitize_folder_name("Furniture"), "Furniture");
    }

    #[test]
    fn deconflict_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.zip");
        assert_eq!(deconflict_path(&path), path);

        std::fs::write(&path, b"x").unwrap();
        assert_eq!(deconflict_path(&path), dir.path().join("table_1.zip"));

        std::fs::write(dir.path().join("table_1.zip"), b"y").unwrap();
        assert_eq!(deconflict_path(&path), dir.path().join("table_2.zip"));
    }

    #[test]
    fn walk_finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("top.txt"), b"1").unwrap();
        std::fs::write(dir.path().join("a/b/deep.txt"), b"2").unwrap();

        let (files, dirs) = walk_tree(dir.path());
        assert_eq!(files.len(), 2);
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn hashes_differ_for_different_contents() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, b"one").unwrap();
        std::fs::write(&b, b"two").unwrap();
        assert_ne!(file_hash(&a).unwrap(), file_hash(&b).unwrap());
    }
}
