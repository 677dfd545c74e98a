// src/provider/jsdelivr.rs

//! jsDelivr catalog
//!
//! Serves npm packages by default. Names beginning with `gh/` address GitHub
//! repositories (`gh/user/repo@v1.2.0`) and are passed through unchanged.

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

pub const JSDELIVR_PROVIDER_ID: &str = "jsdelivr";

const DEFAULT_DATA_URL: &str = "https://data.jsdelivr.com/v1/package";
const DEFAULT_CDN_URL: &str = "https://cdn.jsdelivr.net";

#[derive(Debug, Deserialize)]
struct PackageEntry {
    #[serde(default)]
    tags: HashMap<String, String>,
    /// Plain strings in v1 responses, `{ "version": .. }` objects in newer ones
    #[serde(default)]
    versions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct FlatListing {
    #[serde(default)]
    files: Vec<FlatFile>,
}

#[derive(Debug, Deserialize)]
struct FlatFile {
    name: String,
}

pub struct JsDelivrCatalog {
    cache: Arc<CacheService>,
    data_url: String,
    cdn_url: String,
}

impl JsDelivrCatalog {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self {
            cache,
            data_url: DEFAULT_DATA_URL.to_string(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
        }
    }

    pub fn with_data_url(mut self, url: impl Into<String>) -> Self {
        self.data_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cdn_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn cache_file(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        catalog_cache_file(&self.cache, JSDELIVR_PROVIDER_ID, name, file_name)
    }

    async fn entry(&self, name: &str, cancel: &CancellationToken) -> Result<PackageEntry> {
        let url = format!("{}/{}", self.data_url, package_path(name));
        let text = self
            .cache
            .get_catalog(&url, &self.cache_file(name, "metadata.json")?, cancel)
            .await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::ParseError(format!("Invalid jsDelivr metadata for {name}: {e}")))
    }
}

/// `npm/<name>` for packages, the name itself for `gh/` repositories
fn package_path(name: &str) -> String {
    if name.starts_with("gh/") {
        name.to_string()
    } else {
        format!("npm/{name}")
    }
}

fn version_strings(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("version").and_then(Value::as_str).map(String::from),
            _ => None,
        })
        .collect()
}

#[async_trait]
impl LibraryCatalog for JsDelivrCatalog {
    async fn get_library(&self, name: &str, version: &str, cancel: &CancellationToken) -> Result<Library> {
        let url = format!("{}/{}@{}/flat", self.data_url, package_path(name), version);
        let cache_file = self.cache_file(name, &format!("files-{version}.json"))?;
        let text = self.cache.get_catalog(&url, &cache_file, cancel).await?;
        let listing: FlatListing = serde_json::from_str(&text)
            .map_err(|e| Error::ParseError(format!("Invalid jsDelivr listing for {name}@{version}: {e}")))?;

        if listing.files.is_empty() {
            return Err(Error::NotFoundError(format!("jsDelivr has no files for {name}@{version}")));
        }
        Ok(Library::new(
            name,
            version,
            JSDELIVR_PROVIDER_ID,
            listing.files.into_iter().map(|f| f.name),
        ))
    }

    async fn get_versions(&self, name: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let versions = version_strings(&self.entry(name, cancel).await?.versions);
        if versions.is_empty() {
            return Err(Error::NotFoundError(format!("jsDelivr has no package named {name}")));
        }
        Ok(versions)
    }

    async fn get_latest_version(
        &self,
        name: &str,
        include_pre_release: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let entry = self.entry(name, cancel).await?;
        if !include_pre_release && let Some(latest) = entry.tags.get("latest") {
            return Ok(Some(latest.clone()));
        }
        Ok(select_latest(&version_strings(&entry.versions), include_pre_release))
    }
}

impl CdnCatalog for JsDelivrCatalog {
    fn file_url(&self, name: &str, version: &str, file: &str) -> String {
        format!("{}/{}@{}/{}", self.cdn_url, package_path(name), version, file)
    }
}
