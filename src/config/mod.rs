// SPDX-License-Identifier: MIT

//! Configuration management for Skyorg

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Catalog API settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Organizer behavior
    #[serde(default)]
    pub organizer: OrganizerConfig,

    /// Web UI settings
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogConfig {
    /// Model lookup endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL that preview image paths are resolved against
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// User-Agent sent with every request; the catalog rejects bare clients
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Delay between lookups to avoid hammering the API
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrganizerConfig {
    /// Name of the tree created under the destination directory
    #[serde(default = "default_models_dirname")]
    pub models_dirname: String,

    /// Archive extensions picked up from the source directory
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// Extensions treated as preview images
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Number of archives processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// Default value functions
fn default_api_url() -> String {
    "https://3dsky.org/api/models".to_string()
}
fn default_image_base_url() -> String {
    "https://b6.3ddd.ru/media/cache/tuk_model_custom_filter_ang_en/".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_timeout() -> u64 {
    30
}
fn default_retries() -> u32 {
    3
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_models_dirname() -> String {
    "3ds_models".to_string()
}
fn default_archive_extensions() -> Vec<String> {
    vec!["zip", "rar", "7z"].into_iter().map(String::from).collect()
}
fn default_image_extensions() -> Vec<String> {
    vec!["jpg", "jpeg", "png"].into_iter().map(String::from).collect()
}
fn default_workers() -> usize {
    5
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    8080
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            image_base_url: default_image_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            retries: default_retries(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            models_dirname: default_models_dirname(),
            archive_extensions: default_archive_extensions(),
            image_extensions: default_image_extensions(),
            workers: default_workers(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            organizer: OrganizerConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::SkyorgError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check whether a filename has one of the configured archive extensions
    pub fn is_archive(&self, path: &Path) -> bool {
        has_extension(path, &self.organizer.archive_extensions)
    }

    /// Check whether a filename has one of the configured image extensions
    pub fn is_image(&self, path: &Path) -> bool {
        has_extension(path, &self.organizer.image_extensions)
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_point_at_catalog() {
        let config = AppConfig::default();
        assert_eq!(config.catalog.api_url, "https://3dsky.org/api/models");
        assert_eq!(config.organizer.models_dirname, "3ds_models");
        assert_eq!(config.organizer.workers, 5);
    }

    #[test]
    fn archive_extension_check_is_case_insensitive() {
        let config = AppConfig::default();
        assert!(config.is_archive(&PathBuf::from("a.ZIP")));
        assert!(config.is_archive(&PathBuf::from("a.rar")));
        assert!(!config.is_archive(&PathBuf::from("a.txt")));
        assert!(!config.is_archive(&PathBuf::from("noext")));
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load(&PathBuf::from("/nonexistent/config.json")).unwrap();
        assert_eq!(config.web.port, 8080);
    }

    #[test]
    fn roundtrips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.organizer.workers = 2;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.organizer.workers, 2);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"web": {"port": 9000}}"#).unwrap();
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "127.0.0.1");
        assert_eq!(config.catalog.retries, 3);
    }
}
