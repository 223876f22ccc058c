// SPDX-License-Identifier: MIT

//! 3dsky.org catalog API client

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::model_id::ModelId;
use crate::{Result, SkyorgError};

/// Catalog API client
pub struct CatalogClient {
    client: Client,
    api_url: String,
    image_base_url: String,
    retries: u32,
}

#[derive(Serialize)]
struct SearchRequest {
    query: String,
    order: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    data: SearchData,
}

#[derive(Deserialize, Default)]
struct SearchData {
    #[serde(default)]
    models: Vec<CatalogModel>,
}

#[derive(Deserialize)]
struct CatalogModel {
    #[serde(default)]
    title_en: Option<String>,
    #[serde(default)]
    category: Option<CategoryInfo>,
    #[serde(default)]
    category_parent: Option<CategoryInfo>,
    #[serde(default)]
    images: Vec<ImageInfo>,
}

#[derive(Deserialize)]
struct CategoryInfo {
    title_en: String,
}

#[derive(Deserialize)]
struct ImageInfo {
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    web_path: Option<String>,
}

/// Catalog record for a model, resolved from a search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    /// English title, if the catalog has one
    pub title: Option<String>,
    /// Category path, parent first
    pub categories: Vec<String>,
    /// Fully-resolved preview image URL
    pub image_url: String,
}

impl CatalogClient {
    /// Create a new catalog client from configuration
    pub fn new(config: &CatalogConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            image_base_url: config.image_base_url.clone(),
            retries: config.retries,
        }
    }

    /// Check that the catalog endpoint is reachable
    pub async fn health_check(&self) -> Result<()> {
        self.client
            .head(&self.api_url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                SkyorgError::CatalogUnavailable(format!(
                    "Cannot reach catalog at {}: {}",
                    self.api_url, e
                ))
            })?;

        Ok(())
    }

    /// Look up a model by id and resolve its category path and preview image.
    ///
    /// Returns `ModelNotFound` when the catalog has no entry for the id, the
    /// entry carries no categories, or no listed image matches the model
    /// number. Callers record these in the not-found report.
    pub async fn lookup(&self, id: &ModelId) -> Result<ModelRecord> {
        let request = SearchRequest {
            query: id.to_string(),
            order: "relevance".to_string(),
        };

        debug!("Catalog lookup for {}", id);

        let response = self.client.post(&self.api_url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(SkyorgError::CatalogUnavailable(format!(
                "Catalog returned status {}",
                response.status()
            )));
        }

        let result: SearchResponse = response.json().await?;

        let model = result
            .data
            .models
            .into_iter()
            .next()
            .ok_or_else(|| SkyorgError::ModelNotFound(format!("{}: no models in response", id)))?;

        resolve_record(model, id, &self.image_base_url)
    }

    /// Look up a model with bounded retry on transport failures
    pub async fn lookup_with_retry(&self, id: &ModelId) -> Result<ModelRecord> {
        let mut last_error = None;

        for attempt in 0..=self.retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                warn!("Retrying catalog lookup for {} in {:?} (attempt {})", id, delay, attempt + 1);
                tokio::time::sleep(delay).await;
            }

            match self.lookup(id).await {
                Ok(record) => return Ok(record),
                // A definitive miss will not improve with retries
                Err(e @ SkyorgError::ModelNotFound(_)) => return Err(e),
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SkyorgError::CatalogUnavailable("Unknown error".to_string())))
    }

    /// Download a preview image to a local file, streaming to disk
    pub async fn download_image(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("Downloading preview image from {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SkyorgError::CatalogUnavailable(format!(
                "Image download returned status {}",
                response.status()
            )));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

/// Resolve a raw catalog model into a `ModelRecord`.
///
/// The catalog lists renders of several models per entry; the one for this
/// model shares its number as a filename prefix. An entry without categories
/// or without a matching image is treated as a miss.
fn resolve_record(model: CatalogModel, id: &ModelId, image_base_url: &str) -> Result<ModelRecord> {
    let mut categories = Vec::new();
    if let Some(parent) = model.category_parent {
        categories.push(parent.title_en);
    }
    if let Some(category) = model.category {
        categories.push(category.title_en);
    }

    if categories.is_empty() {
        return Err(SkyorgError::ModelNotFound(format!("{}: no categories", id)));
    }

    let image_url = model
        .images
        .iter()
        .find(|img| img.file_name.starts_with(id.number()))
        .and_then(|img| img.web_path.as_deref())
        .map(|web_path| format!("{}{}", image_base_url, web_path))
        .ok_or_else(|| {
            SkyorgError::ModelNotFound(format!("{}: no matching preview image", id))
        })?;

    Ok(ModelRecord {
        title: model.title_en,
        categories,
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_response(body: &str) -> SearchResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn parses_full_search_response() {
        let response = parse_response(
            r#"{
                "data": {
                    "models": [{
                        "title_en": "Dining table",
                        "category": {"title_en": "Table"},
                        "category_parent": {"title_en": "Furniture"},
                        "images": [
                            {"file_name": "999_other.jpeg", "web_path": "aa/other.jpeg"},
                            {"file_name": "2871534_main.jpeg", "web_path": "bb/main.jpeg"}
                        ]
                    }]
                }
            }"#,
        );

        let model = &response.data.models[0];
        assert_eq!(model.title_en.as_deref(), Some("Dining table"));
        assert_eq!(model.category.as_ref().unwrap().title_en, "Table");
        assert_eq!(model.images.len(), 2);
    }

    #[test]
    fn parses_empty_models_list() {
        let response = parse_response(r#"{"data": {"models": []}}"#);
        assert!(response.data.models.is_empty());
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        let response = parse_response(r#"{"data": {"models": [{}]}}"#);
        let model = &response.data.models[0];
        assert!(model.title_en.is_none());
        assert!(model.category.is_none());
        assert!(model.images.is_empty());
    }

    const IMAGE_BASE: &str = "https://images.example/cache/";

    fn first_model(body: &str) -> CatalogModel {
        parse_response(body).data.models.remove(0)
    }

    #[test]
    fn resolves_record_with_matching_image() {
        let model = first_model(
            r#"{
                "data": {
                    "models": [{
                        "title_en": "Dining table",
                        "category": {"title_en": "Table"},
                        "category_parent": {"title_en": "Furniture"},
                        "images": [
                            {"file_name": "999_other.jpeg", "web_path": "aa/other.jpeg"},
                            {"file_name": "2871534_main.jpeg", "web_path": "bb/main.jpeg"}
                        ]
                    }]
                }
            }"#,
        );
        let id = ModelId::parse("2871534.5bd4ec3bb6a78").unwrap();

        let record = resolve_record(model, &id, IMAGE_BASE).unwrap();
        assert_eq!(record.categories, vec!["Furniture", "Table"]);
        assert_eq!(record.image_url, "https://images.example/cache/bb/main.jpeg");
    }

    #[test]
    fn entry_without_matching_image_is_a_miss() {
        let model = first_model(
            r#"{
                "data": {
                    "models": [{
                        "category": {"title_en": "Table"},
                        "category_parent": {"title_en": "Furniture"},
                        "images": [
                            {"file_name": "999_other.jpeg", "web_path": "aa/other.jpeg"}
                        ]
                    }]
                }
            }"#,
        );
        let id = ModelId::parse("2871534.5bd4ec3bb6a78").unwrap();

        let err = resolve_record(model, &id, IMAGE_BASE).unwrap_err();
        match err {
            SkyorgError::ModelNotFound(msg) => assert!(msg.contains("no matching preview image")),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn entry_without_categories_is_a_miss() {
        let model = first_model(
            r#"{
                "data": {
                    "models": [{
                        "images": [
                            {"file_name": "2871534_main.jpeg", "web_path": "bb/main.jpeg"}
                        ]
                    }]
                }
            }"#,
        );
        let id = ModelId::parse("2871534.5bd4ec3bb6a78").unwrap();

        assert!(matches!(
            resolve_record(model, &id, IMAGE_BASE),
            Err(SkyorgError::ModelNotFound(_))
        ));
    }
}
