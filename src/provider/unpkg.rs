// src/provider/unpkg.rs

//! unpkg catalog
//!
//! Versions are read from the npm registry packument; file listings come
//! from unpkg's `?meta` endpoint, which has been served both as a nested
//! directory tree and as a flat list over time. Both shapes are accepted.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::base::{catalog_cache_file, CdnCatalog};
use super::catalog::{select_latest, Library, LibraryCatalog};
use crate::cache::CacheService;
use crate::error::{Error, Result};

pub const UNPKG_PROVIDER_ID: &str = "unpkg";

const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
const DEFAULT_CDN_URL: &str = "https://unpkg.com";

#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: serde_json::Map<String, Value>,
}

pub struct UnpkgCatalog {
    cache: Arc<CacheService>,
    registry_url: String,
    cdn_url: String,
}

impl UnpkgCatalog {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self {
            cache,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
        }
    }

    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cdn_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn cache_file(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        catalog_cache_file(&self.cache, UNPKG_PROVIDER_ID, name, file_name)
    }

    async fn packument(&self, name: &str, cancel: &CancellationToken) -> Result<Packument> {
        let url = format!("{}/{}", self.registry_url, name);
        let text = self
            .cache
            .get_catalog(&url, &self.cache_file(name, "metadata.json")?, cancel)
            .await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::ParseError(format!("Invalid npm metadata for {name}: {e}")))
    }
}

/// Collect file paths from either `?meta` shape
fn collect_meta_files(node: &Value, out: &mut Vec<String>) {
    if let Some(children) = node.get("files").and_then(Value::as_array) {
        for child in children {
            collect_meta_files(child, out);
        }
        return;
    }
    let is_directory = node.get("type").and_then(Value::as_str) == Some("directory");
    if !is_directory && let Some(path) = node.get("path").and_then(Value::as_str) {
        out.push(path.to_string());
    }
}

#[async_trait]
impl LibraryCatalog for UnpkgCatalog {
    async fn get_library(&self, name: &str, version: &str, cancel: &CancellationToken) -> Result<Library> {
        let url = format!("{}/{}@{}/?meta", self.cdn_url, name, version);
        let cache_file = self.cache_file(name, &format!("files-{version}.json"))?;
        let text = self.cache.get_catalog(&url, &cache_file, cancel).await?;
        let meta: Value = serde_json::from_str(&text)
            .map_err(|e| Error::ParseError(format!("Invalid unpkg listing for {name}@{version}: {e}")))?;

        let mut files = Vec::new();
        collect_meta_files(&meta, &mut files);
        if files.is_empty() {
            return Err(Error::NotFoundError(format!("unpkg has no files for {name}@{version}")));
        }
        Ok(Library::new(name, version, UNPKG_PROVIDER_ID, files))
    }

    async fn get_versions(&self, name: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let packument = self.packument(name, cancel).await?;
        if packument.versions.is_empty() {
            return Err(Error::NotFoundError(format!("npm has no package named {name}")));
        }
        Ok(packument.versions.keys().cloned().collect())
    }

    async fn get_latest_version(
        &self,
        name: &str,
        include_pre_release: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let packument = self.packument(name, cancel).await?;
        if !include_pre_release && let Some(latest) = packument.dist_tags.get("latest") {
            return Ok(Some(latest.clone()));
        }
        let versions: Vec<String> = packument.versions.keys().cloned().collect();
        Ok(select_latest(&versions, include_pre_release))
    }
}

impl CdnCatalog for UnpkgCatalog {
    fn file_url(&self, name: &str, version: &str, file: &str) -> String {
        format!("{}/{}@{}/{}", self.cdn_url, name, version, file)
    }
}
