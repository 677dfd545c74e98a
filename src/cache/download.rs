// src/cache/download.rs

//! Resource downloaders
//!
//! The cache service fetches catalogs and library files through a
//! [`ResourceDownloader`], so tests and offline hosts can substitute their
//! own transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for a failed request
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 500;

/// Transport for fetching a URL into memory
#[async_trait]
pub trait ResourceDownloader: Send + Sync {
    /// Fetch `url`, returning the response body
    async fn download(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>>;

    /// Human-readable name for logging
    fn name(&self) -> &str;
}

/// HTTP downloader using reqwest, with retry on transport errors
pub struct HttpDownloader {
    client: Client,
    max_retries: u32,
}

impl HttpDownloader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("libdrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, FetchFailure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchFailure::Transient(format!("Failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // Server answers are final; only transport errors and 5xx are retried
            let message = format!("HTTP {status} from {url}");
            return Err(if status.is_server_error() {
                FetchFailure::Transient(message)
            } else {
                FetchFailure::Permanent(message)
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Transient(format!("Failed to read response from {url}: {e}")))?;
        Ok(bytes.to_vec())
    }
}

enum FetchFailure {
    Transient(String),
    Permanent(String),
}

#[async_trait]
impl ResourceDownloader for HttpDownloader {
    async fn download(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("GET {} (attempt {})", url, attempt);

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = self.fetch_once(url) => outcome,
            };

            match outcome {
                Ok(bytes) => return Ok(bytes),
                Err(FetchFailure::Permanent(message)) => return Err(Error::DownloadError(message)),
                Err(FetchFailure::Transient(message)) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "{message} (after {attempt} attempts)"
                        )));
                    }
                    warn!("Download attempt {} failed: {}, retrying...", attempt, message);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64)) => {}
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_before_request() {
        let downloader = HttpDownloader::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = downloader.download("https://example.invalid/file.js", &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
