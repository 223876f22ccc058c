// SPDX-License-Identifier: MIT

//! Error types for Skyorg

use thiserror::Error;

/// Result type alias for Skyorg operations
pub type Result<T> = std::result::Result<T, SkyorgError>;

/// Skyorg error types
#[derive(Error, Debug)]
pub enum SkyorgError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Catalog not available: {0}")]
    CatalogUnavailable(String),

    #[error("Invalid model id: {0}")]
    InvalidModelId(String),

    #[error("Model not found in catalog: {0}")]
    ModelNotFound(String),

    #[error("Organize error: {0}")]
    Organize(String),

    #[error("Merge error: {0}")]
    Merge(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
