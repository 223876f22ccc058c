// SPDX-License-Identifier: MIT

//! Folder Merger: combines organized trees and refreshes summaries

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::fsops;
use crate::progress::Reporter;
use crate::summary::{self, NOT_FOUND_FILENAME, SUMMARY_FILENAME};
use crate::{Result, SkyorgError};

/// Outcome of a merge run
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Files moved into the target tree
    pub moved: usize,
    /// Identical duplicates dropped
    pub duplicates: usize,
    /// Files kept under a de-conflicted name
    pub renamed: usize,
    /// Summary files regenerated
    pub summaries_refreshed: usize,
}

/// Folder merger for organized trees
pub struct Merger {
    dry_run: bool,
}

impl Merger {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Merge every source tree into the target, preserving relative paths.
    ///
    /// Name collisions with identical contents are dropped; differing
    /// contents are kept under a numbered name. Summary files are
    /// bookkeeping and are regenerated rather than copied; not-found
    /// reports are unioned into the target's report.
    pub fn merge(
        &self,
        sources: &[PathBuf],
        target: &Path,
        reporter: Arc<dyn Reporter>,
    ) -> Result<MergeOutcome> {
        if sources.is_empty() {
            return Err(SkyorgError::Merge("No source folders given".to_string()));
        }
        for source in sources {
            if !source.is_dir() {
                return Err(SkyorgError::Merge(format!(
                    "Source folder {} does not exist",
                    source.display()
                )));
            }
            if same_tree(source, target) {
                return Err(SkyorgError::Merge(format!(
                    "Source {} overlaps the target",
                    source.display()
                )));
            }
        }

        if !self.dry_run {
            std::fs::create_dir_all(target)?;
        }

        let mut outcome = MergeOutcome::default();
        let mut not_found: BTreeMap<String, String> = BTreeMap::new();
        // Relative folders whose summaries must be refreshed after the union
        let mut summary_dirs: BTreeSet<PathBuf> = BTreeSet::new();

        if !self.dry_run {
            not_found = crate::organizer::read_not_found(&target.join(NOT_FOUND_FILENAME))?;
        }
        collect_summary_dirs(target, target, &mut summary_dirs);

        let mut work: Vec<(PathBuf, PathBuf)> = Vec::new();
        for source in sources {
            for file in fsops::walk_files(source) {
                let rel = file
                    .strip_prefix(source)
                    .map_err(|_| SkyorgError::Merge(format!("Bad path {}", file.display())))?
                    .to_path_buf();
                work.push((file, rel));
            }
            collect_summary_dirs(source, source, &mut summary_dirs);
        }

        reporter.begin(work.len());

        for (file, rel) in work {
            let name = rel.to_string_lossy().to_string();
            reporter.item_started(&name);

            if summary::is_bookkeeping_file(&file) {
                self.absorb_bookkeeping(&file, &mut not_found)?;
                reporter.item_done(&name, true);
                continue;
            }

            match self.merge_file(&file, &target.join(&rel), &mut outcome) {
                Ok(()) => reporter.item_done(&name, true),
                Err(e) => {
                    warn!("Failed to merge {}: {}", name, e);
                    reporter.item_done(&name, false);
                }
            }
        }

        if !self.dry_run {
            if !not_found.is_empty() {
                crate::organizer::write_not_found(&target.join(NOT_FOUND_FILENAME), &not_found)?;
            }

            summary_dirs.insert(PathBuf::new()); // target root, always
            for rel in &summary_dirs {
                let folder = target.join(rel);
                if folder.is_dir() {
                    summary::refresh(&folder)?;
                    outcome.summaries_refreshed += 1;
                }
            }

            for source in sources {
                prune_empty_dirs(source);
            }
        }

        reporter.note(&format!(
            "Merge complete: {} moved, {} duplicates, {} renamed",
            outcome.moved, outcome.duplicates, outcome.renamed
        ));

        Ok(outcome)
    }

    /// Move one file into the target, resolving name collisions
    fn merge_file(&self, file: &Path, dest: &Path, outcome: &mut MergeOutcome) -> Result<()> {
        if self.dry_run {
            outcome.moved += 1;
            return Ok(());
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if !dest.exists() {
            fsops::move_file(file, dest)?;
            outcome.moved += 1;
            return Ok(());
        }

        if fsops::file_hash(file)? == fsops::file_hash(dest)? {
            // Same bytes on both sides; one copy is enough.
            debug!("Dropping duplicate {:?}", file);
            std::fs::remove_file(file)?;
            outcome.duplicates += 1;
            return Ok(());
        }

        let renamed = fsops::deconflict_path(dest);
        info!("Collision at {:?}, keeping incoming file as {:?}", dest, renamed);
        fsops::move_file(file, &renamed)?;
        outcome.moved += 1;
        outcome.renamed += 1;
        Ok(())
    }

    /// Fold a source bookkeeping file into the merged state and drop it
    fn absorb_bookkeeping(
        &self,
        file: &Path,
        not_found: &mut BTreeMap<String, String>,
    ) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }

        if file.file_name().and_then(|n| n.to_str()) == Some(NOT_FOUND_FILENAME) {
            for (id, reason) in crate::organizer::read_not_found(file)? {
                not_found.entry(id).or_insert(reason);
            }
        }

        std::fs::remove_file(file)?;
        Ok(())
    }
}

/// Record relative paths of folders that carry a summary file
fn collect_summary_dirs(root: &Path, current: &Path, dirs: &mut BTreeSet<PathBuf>) {
    if !current.is_dir() {
        return;
    }
    if current.join(SUMMARY_FILENAME).is_file() {
        if let Ok(rel) = current.strip_prefix(root) {
            dirs.insert(rel.to_path_buf());
        }
    }
    if let Ok(entries) = std::fs::read_dir(current) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                collect_summary_dirs(root, &p, dirs);
            }
        }
    }
}

/// Check whether two paths resolve to the same tree or nest within each other
fn same_tree(a: &Path, b: &Path) -> bool {
    let a = std::fs::canonicalize(a).unwrap_or_else(|_| a.to_path_buf());
    let b = std::fs::canonicalize(b).unwrap_or_else(|_| b.to_path_buf());
    a == b || a.starts_with(&b) || b.starts_with(&a)
}

/// Remove directories left empty after their files moved out
fn prune_empty_dirs(root: &Path) {
    let (_, mut dirs) = fsops::walk_tree(root);
    dirs.sort();
    // Deepest first so parents empty out as children disappear
    for dir in dirs.iter().rev() {
        let _ = std::fs::remove_dir(dir);
    }
}
