// src/cache/mod.rs

//! On-disk cache for provider catalogs and library files
//!
//! The cache directory is shared by every project on the machine and may be
//! used by several processes at once. No locks are taken: correctness relies
//! on every write going to a temporary file that is renamed over the target,
//! so readers see either the old file or the complete new one.
//!
//! Layout:
//!
//! ```text
//! <cache>/<provider>/<library name>/metadata.json      catalog entry
//! <cache>/<provider>/<library name>/<version>/<file>   library files
//! ```

mod download;
mod inventory;

pub use download::{HttpDownloader, ResourceDownloader};
pub use inventory::{CachedLibrary, CachedProvider};

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::host::write_atomic;

/// Environment variable overriding the cache directory
pub const CACHE_DIR_ENV: &str = "LIBDROP_CACHE_DIR";

/// Default catalog freshness window (24 hours)
pub const DEFAULT_CATALOG_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum concurrent file downloads while hydrating
const MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// One unit of cache hydration work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheServiceMetadata {
    pub source_url: String,
    pub destination_cache_path: PathBuf,
}

impl CacheServiceMetadata {
    pub fn new(source_url: impl Into<String>, destination_cache_path: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            destination_cache_path: destination_cache_path.into(),
        }
    }
}

/// TTL-aware store for catalogs and downloaded files
pub struct CacheService {
    root: PathBuf,
    downloader: Arc<dyn ResourceDownloader>,
    catalog_expiry: Duration,
}

impl CacheService {
    pub fn new(root: impl Into<PathBuf>, downloader: Arc<dyn ResourceDownloader>) -> Self {
        Self {
            root: root.into(),
            downloader,
            catalog_expiry: DEFAULT_CATALOG_EXPIRY,
        }
    }

    pub fn with_catalog_expiry(mut self, expiry: Duration) -> Self {
        self.catalog_expiry = expiry;
        self
    }

    /// Default cache root: `$LIBDROP_CACHE_DIR` or `<cache_dir>/libdrop`
    pub fn default_root() -> PathBuf {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV)
            && !dir.is_empty()
        {
            return PathBuf::from(dir);
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("libdrop")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn downloader(&self) -> &dyn ResourceDownloader {
        self.downloader.as_ref()
    }

    /// Directory holding everything cached for one provider
    pub fn provider_dir(&self, provider_id: &str) -> PathBuf {
        self.root.join(provider_id)
    }

    /// Return catalog text, fetching `url` only when the cached copy is stale
    ///
    /// A cached file younger than the freshness window is returned without
    /// network access. On a download failure a stale cached copy is used as
    /// an offline fallback.
    pub async fn get_catalog(
        &self,
        url: &str,
        cache_file: &Path,
        cancel: &CancellationToken,
    ) -> Result<String> {
        validate_cache_path(cache_file)?;

        if self.is_fresh(cache_file) {
            debug!("Catalog cache hit: {}", cache_file.display());
            return read_text(cache_file).await;
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match self.downloader.download(url, cancel).await {
            Ok(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    Error::ParseError(format!("Invalid UTF-8 in catalog from {url}: {e}"))
                })?;
                write_atomic(cache_file, text.clone().into_bytes()).await?;
                debug!("Cached catalog {} at {}", url, cache_file.display());
                Ok(text)
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) if cache_file.is_file() => {
                warn!("Using stale catalog {} ({})", cache_file.display(), e);
                read_text(cache_file).await
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch every item and overwrite its cache file
    ///
    /// Cancellation is checked before each fetch; once observed no further
    /// downloads or writes start and `Error::Cancelled` is returned.
    pub async fn refresh_cache(
        &self,
        items: &[CacheServiceMetadata],
        cancel: &CancellationToken,
    ) -> Result<()> {
        for item in items {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            self.fetch_item(item, cancel).await?;
        }
        Ok(())
    }

    /// Fetch only the items whose cache file is missing, in parallel
    pub async fn hydrate(
        &self,
        items: &[CacheServiceMetadata],
        cancel: &CancellationToken,
    ) -> Result<()> {
        let missing: Vec<&CacheServiceMetadata> = items
            .iter()
            .filter(|item| !item.destination_cache_path.is_file())
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        info!("Downloading {} file(s) into cache", missing.len());

        let fetches: Vec<_> = missing
            .into_iter()
            .map(|item| self.fetch_unless_cancelled(item, cancel))
            .collect();
        let results: Vec<Result<()>> = stream::iter(fetches)
            .buffer_unordered(MAX_CONCURRENT_DOWNLOADS)
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        results.into_iter().collect()
    }

    async fn fetch_unless_cancelled(
        &self,
        item: &CacheServiceMetadata,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.fetch_item(item, cancel).await
    }

    async fn fetch_item(&self, item: &CacheServiceMetadata, cancel: &CancellationToken) -> Result<()> {
        validate_cache_path(&item.destination_cache_path)?;
        let bytes = self.downloader.download(&item.source_url, cancel).await?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        write_atomic(&item.destination_cache_path, bytes).await?;
        debug!("Cached {} -> {}", item.source_url, item.destination_cache_path.display());
        Ok(())
    }

    fn is_fresh(&self, cache_file: &Path) -> bool {
        let Ok(modified) = std::fs::metadata(cache_file).and_then(|m| m.modified()) else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age <= self.catalog_expiry)
            // Modified in the future (clock skew): treat as fresh
            .unwrap_or(true)
    }
}

/// Reject cache paths that can never hold a file
fn validate_cache_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.file_name().is_none() {
        return Err(Error::NotFoundError(format!(
            "Invalid cache path \"{}\"",
            path.display()
        )));
    }
    for ancestor in path.ancestors().skip(1) {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        if ancestor.exists() {
            if !ancestor.is_dir() {
                return Err(Error::NotFoundError(format!(
                    "Cache path \"{}\" is not reachable: {} is not a directory",
                    path.display(),
                    ancestor.display()
                )));
            }
            break;
        }
    }
    Ok(())
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::IoError(format!("Failed to read {}: {e}", path.display())))
}
