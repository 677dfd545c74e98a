// src/provider/cdnjs.rs

//! cdnjs catalog
//!
//! Version lists and file lists come from the cdnjs API; files are served
//! from the Cloudflare CDN. Both API responses are cached per library:
//!
//! ```text
//! <cache>/cdnjs/<name>/metadata.json          versions
//! <cache>/cdnjs/<name>/files-<version>.json   files of one version
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::base::{catalog_cache_file, CdnCatalog};
use super::catalog::{select_latest, Library, LibraryCatalog};
use crate::cache::CacheService;
use crate::error::{Error, Result};

pub const CDNJS_PROVIDER_ID: &str = "cdnjs";

const DEFAULT_API_URL: &str = "https://api.cdnjs.com/libraries";
const DEFAULT_CDN_URL: &str = "https://cdnjs.cloudflare.com/ajax/libs";

/// `GET /libraries/<name>?fields=name,version,versions`
#[derive(Debug, Deserialize)]
struct LibraryEntry {
    name: Option<String>,
    /// Latest stable version as chosen by cdnjs
    version: Option<String>,
    #[serde(default)]
    versions: Vec<String>,
}

/// `GET /libraries/<name>/<version>?fields=name,version,files`
#[derive(Debug, Deserialize)]
struct VersionEntry {
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    error: bool,
}

pub struct CdnjsCatalog {
    cache: Arc<CacheService>,
    api_url: String,
    cdn_url: String,
}

impl CdnjsCatalog {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self {
            cache,
            api_url: DEFAULT_API_URL.to_string(),
            cdn_url: DEFAULT_CDN_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_cdn_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn cache_file(&self, name: &str, file_name: &str) -> Result<PathBuf> {
        catalog_cache_file(&self.cache, CDNJS_PROVIDER_ID, name, file_name)
    }

    async fn entry(&self, name: &str, cancel: &CancellationToken) -> Result<LibraryEntry> {
        let url = format!("{}/{}?fields=name,version,versions", self.api_url, name);
        let text = self
            .cache
            .get_catalog(&url, &self.cache_file(name, "metadata.json")?, cancel)
            .await?;
        let entry: LibraryEntry = serde_json::from_str(&text)
            .map_err(|e| Error::ParseError(format!("Invalid cdnjs entry for {name}: {e}")))?;

        // Unknown libraries come back as `{}`
        if entry.name.is_none() {
            return Err(Error::NotFoundError(format!("cdnjs has no library named {name}")));
        }
        Ok(entry)
    }
}

#[async_trait]
impl LibraryCatalog for CdnjsCatalog {
    async fn get_library(&self, name: &str, version: &str, cancel: &CancellationToken) -> Result<Library> {
        let url = format!("{}/{}/{}?fields=name,version,files", self.api_url, name, version);
        let cache_file = self.cache_file(name, &format!("files-{version}.json"))?;
        let text = self.cache.get_catalog(&url, &cache_file, cancel).await?;
        let entry: VersionEntry = serde_json::from_str(&text)
            .map_err(|e| Error::ParseError(format!("Invalid cdnjs file list for {name}@{version}: {e}")))?;

        if entry.error || entry.files.is_empty() {
            return Err(Error::NotFoundError(format!("cdnjs has no files for {name}@{version}")));
        }
        Ok(Library::new(name, version, CDNJS_PROVIDER_ID, entry.files))
    }

    async fn get_versions(&self, name: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        Ok(self.entry(name, cancel).await?.versions)
    }

    async fn get_latest_version(
        &self,
        name: &str,
        include_pre_release: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let entry = self.entry(name, cancel).await?;
        if !include_pre_release && let Some(latest) = entry.version.filter(|v| !v.is_empty()) {
            return Ok(Some(latest));
        }
        Ok(select_latest(&entry.versions, include_pre_release))
    }
}

impl CdnCatalog for CdnjsCatalog {
    fn file_url(&self, name: &str, version: &str, file: &str) -> String {
        format!("{}/{}/{}/{}", self.cdn_url, name, version, file)
    }
}
