// SPDX-License-Identifier: MIT

//! File Organizer: sorts 3DSky archives into categorized folders

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogClient, ModelRecord};
use crate::config::AppConfig;
use crate::fsops;
use crate::history::{self, History};
use crate::model_id::ModelId;
use crate::progress::Reporter;
use crate::summary::{self, NOT_FOUND_FILENAME};
use crate::{Result, SkyorgError};

/// Outcome of an organize run
#[derive(Debug)]
pub struct OrganizeOutcome {
    /// Archives found in the source directory
    pub total: usize,
    /// Archives moved into the tree
    pub organized: usize,
    /// Archives that could not be placed, with the reason
    pub not_found: BTreeMap<String, String>,
}

/// File organizer for 3DSky archives
pub struct Organizer {
    config: AppConfig,
    history_path: PathBuf,
    dry_run: bool,
}

struct OrganizeCtx {
    config: AppConfig,
    client: CatalogClient,
    history: History,
    source: PathBuf,
    models_root: PathBuf,
    reporter: Arc<dyn Reporter>,
    not_found: Mutex<BTreeMap<String, String>>,
    organized: Mutex<usize>,
    touched: Mutex<BTreeSet<PathBuf>>,
    dry_run: bool,
}

impl Organizer {
    pub fn new(config: AppConfig, history_path: PathBuf, dry_run: bool) -> Self {
        Self {
            config,
            history_path,
            dry_run,
        }
    }

    /// Organize every archive in `source` into `<destination>/<models dir>/`.
    ///
    /// Archives are processed concurrently up to the configured worker
    /// count, with a delay between catalog lookups. Per-archive failures are
    /// collected in the not-found report; they never abort the run.
    pub async fn run(
        &self,
        source: &Path,
        destination: &Path,
        reporter: Arc<dyn Reporter>,
    ) -> Result<OrganizeOutcome> {
        if !source.is_dir() {
            return Err(SkyorgError::Organize(format!(
                "Source directory {} does not exist",
                source.display()
            )));
        }
        if !destination.is_dir() {
            return Err(SkyorgError::Organize(format!(
                "Destination directory {} does not exist",
                destination.display()
            )));
        }

        let models_root = destination.join(&self.config.organizer.models_dirname);
        if !self.dry_run && !models_root.exists() {
            std::fs::create_dir_all(&models_root)?;
            info!("Created models directory at {:?}", models_root);
        }

        let archives = scan_archives(source, &self.config)?;
        reporter.begin(archives.len());
        info!("Found {} archives to process", archives.len());

        let ctx = Arc::new(OrganizeCtx {
            config: self.config.clone(),
            client: CatalogClient::new(&self.config.catalog),
            history: History::new(self.history_path.clone()),
            source: source.to_path_buf(),
            models_root: models_root.clone(),
            reporter: reporter.clone(),
            not_found: Mutex::new(BTreeMap::new()),
            organized: Mutex::new(0),
            touched: Mutex::new(BTreeSet::new()),
            dry_run: self.dry_run,
        });

        let semaphore = Arc::new(Semaphore::new(self.config.organizer.workers.max(1)));
        let mut tasks = JoinSet::new();

        for path in &archives {
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();
            let path = path.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                process_archive(&ctx, &path).await;
                // Throttle before releasing the slot to the next lookup
                tokio::time::sleep(Duration::from_millis(ctx.config.catalog.request_delay_ms))
                    .await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Worker task failed: {}", e);
            }
        }

        let not_found = ctx.not_found.lock().await.clone();
        let organized = *ctx.organized.lock().await;

        if !self.dry_run {
            if !not_found.is_empty() {
                let report_path = models_root.join(NOT_FOUND_FILENAME);
                reporter.note(&format!(
                    "Writing {} unplaced archives to {}",
                    not_found.len(),
                    report_path.display()
                ));
                write_not_found(&report_path, &not_found)?;
            }
            // Summaries are refreshed once per folder after the workers drain
            for folder in ctx.touched.lock().await.iter() {
                summary::refresh(folder)?;
            }
            summary::refresh(&models_root)?;
        }

        reporter.note("Processing complete");

        Ok(OrganizeOutcome {
            total: archives.len(),
            organized,
            not_found,
        })
    }
}

/// Collect archives from the top level of the source directory
fn scan_archives(source: &Path, config: &AppConfig) -> Result<Vec<PathBuf>> {
    let mut archives: Vec<PathBuf> = std::fs::read_dir(source)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && config.is_archive(p))
        .collect();
    archives.sort();
    Ok(archives)
}

/// Process a single archive; failures are recorded, never propagated
async fn process_archive(ctx: &OrganizeCtx, path: &Path) {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<non-utf8>")
        .to_string();

    ctx.reporter.item_started(&filename);

    let id = match ModelId::from_filename(path) {
        Ok(id) => id,
        Err(_) => {
            warn!("Invalid filename format: {}", filename);
            record_not_found(ctx, &filename, "Invalid filename format").await;
            ctx.reporter.item_done(&filename, false);
            return;
        }
    };

    match organize_one(ctx, path, &id, &filename).await {
        Ok(()) => {
            *ctx.organized.lock().await += 1;
            ctx.reporter.item_done(&filename, true);
        }
        Err(e) => {
            warn!("Failed to organize {}: {}", filename, e);
            record_not_found(ctx, &id.to_string(), &e.to_string()).await;
            ctx.reporter.item_done(&filename, false);
        }
    }
}

async fn organize_one(
    ctx: &OrganizeCtx,
    path: &Path,
    id: &ModelId,
    filename: &str,
) -> Result<()> {
    let record = ctx.client.lookup_with_retry(id).await?;

    if let Some(title) = &record.title {
        info!("Found model '{}' for {}", title, filename);
    }

    let folder = category_folder(&ctx.models_root, &record.categories);

    if ctx.dry_run {
        ctx.reporter.note(&format!(
            "DRY RUN: would move {} to {}",
            filename,
            folder.display()
        ));
        return Ok(());
    }

    std::fs::create_dir_all(&folder)?;

    let dest = fsops::deconflict_path(&folder.join(filename));
    fsops::move_file(path, &dest)?;
    info!("Moved {} to {:?}", filename, folder);

    let entry = history::create_entry(
        path.to_path_buf(),
        dest,
        id.to_string(),
        record.title.clone(),
        record.categories.clone(),
    );
    if let Err(e) = ctx.history.append(&entry) {
        warn!("Failed to journal move for {}: {}", filename, e);
    }

    handle_images(ctx, id, &folder, &record).await;

    ctx.touched.lock().await.insert(folder);

    Ok(())
}

/// Build the nested category path under the models root
fn category_folder(models_root: &Path, categories: &[String]) -> PathBuf {
    let mut folder = models_root.to_path_buf();
    for category in categories {
        let clean = fsops::sanitize_folder_name(category);
        if !clean.is_empty() {
            folder.push(clean);
        }
    }
    folder
}

/// Download the preview image, falling back to images shipped alongside
/// the archive when the download fails.
async fn handle_images(ctx: &OrganizeCtx, id: &ModelId, folder: &Path, record: &ModelRecord) {
    let preview = folder.join(format!("{}.jpeg", id));

    let downloaded = match ctx.client.download_image(&record.image_url, &preview).await {
        Ok(()) => {
            debug!("Downloaded preview for {}", id);
            true
        }
        Err(e) => {
            warn!("Preview download failed for {}: {}", id, e);
            false
        }
    };

    if downloaded {
        // The fresh preview supersedes any renders shipped with the archive.
        remove_stale_images(ctx, id, folder, &preview);
    } else if let Err(e) = move_related_images(ctx, id, folder) {
        warn!("Failed to move related images for {}: {}", id, e);
    }
}

/// Remove pre-existing images for a model, keeping the fresh preview
fn remove_stale_images(ctx: &OrganizeCtx, id: &ModelId, folder: &Path, keep: &Path) {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {:?}: {}", folder, e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path == keep || !path.is_file() || !ctx.config.is_image(&path) {
            continue;
        }
        if id.matches_image(&path) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale image {:?}", path),
                Err(e) => warn!("Failed to remove stale image {:?}: {}", path, e),
            }
        }
    }
}

/// Move images for this model from the source directory into the folder
fn move_related_images(ctx: &OrganizeCtx, id: &ModelId, folder: &Path) -> Result<()> {
    let mut moved = 0;

    for entry in std::fs::read_dir(&ctx.source)?.flatten() {
        let path = entry.path();
        if !path.is_file() || !ctx.config.is_image(&path) || !id.matches_image(&path) {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        let dest = fsops::deconflict_path(&folder.join(name));
        match fsops::move_file(&path, &dest) {
            Ok(()) => moved += 1,
            Err(e) => warn!("Failed to move image {:?}: {}", path, e),
        }
    }

    if moved > 0 {
        info!("Moved {} related images for {}", moved, id);
    }

    Ok(())
}

async fn record_not_found(ctx: &OrganizeCtx, key: &str, reason: &str) {
    ctx.not_found
        .lock()
        .await
        .insert(key.to_string(), reason.to_string());
}

/// Write the not-found report as pretty JSON
pub fn write_not_found(path: &Path, not_found: &BTreeMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(not_found)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a not-found report, tolerating a missing file
pub fn read_not_found(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::LogReporter;

    fn test_config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn category_folder_sanitizes_segments() {
        let root = PathBuf::from("/dest/3ds_models");
        let folder = category_folder(
            &root,
            &["Furniture".to_string(), "Table / Desk".to_string()],
        );
        assert_eq!(folder, root.join("Furniture").join("Table  Desk"));
    }

    #[test]
    fn scan_picks_only_archives() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.abc.zip"), b"x").unwrap();
        std::fs::write(dir.path().join("2.def.RAR"), b"x").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("3.aaa.zip.d")).unwrap();

        let archives = scan_archives(dir.path(), &test_config()).unwrap();
        assert_eq!(archives.len(), 2);
    }

    #[test]
    fn not_found_report_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(NOT_FOUND_FILENAME);

        let mut report = BTreeMap::new();
        report.insert("1.abc".to_string(), "No models in response".to_string());
        write_not_found(&path, &report).unwrap();

        assert_eq!(read_not_found(&path).unwrap(), report);
        assert!(read_not_found(&dir.path().join("missing.json")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_rejects_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let organizer = Organizer::new(
            test_config(),
            dir.path().join("history.jsonl"),
            false,
        );

        let missing = dir.path().join("nope");
        let result = organizer
            .run(&missing, dir.path(), Arc::new(LogReporter))
            .await;
        assert!(matches!(result, Err(SkyorgError::Organize(_))));
    }

    #[tokio::test]
    async fn invalid_filenames_go_to_not_found() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("my_model.zip"), b"x").unwrap();

        let mut config = test_config();
        config.catalog.request_delay_ms = 0;
        let organizer = Organizer::new(config, dest.path().join("history.jsonl"), false);

        let outcome = organizer
            .run(source.path(), dest.path(), Arc::new(LogReporter))
            .await
            .unwrap();

        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.organized, 0);
        assert_eq!(
            outcome.not_found.get("my_model.zip").map(String::as_str),
            Some("Invalid filename format")
        );
        // Archive stays put when it cannot be placed
        assert!(source.path().join("my_model.zip").exists());

        let report = read_not_found(
            &dest
                .path()
                .join("3ds_models")
                .join(NOT_FOUND_FILENAME),
        )
        .unwrap();
        assert_eq!(report.len(), 1);
    }
}
