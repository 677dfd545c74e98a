// src/commands/common.rs

//! Shared setup and reporting for command handlers

use anyhow::{Context as _, Result};
use futures::future::{BoxFuture, FutureExt};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use libdrop::cache::CACHE_DIR_ENV;
use libdrop::settings::{CACHE_ROOT_KEY, CATALOG_EXPIRY_KEY};
use libdrop::{
    CacheService, ConsoleLogger, Dependencies, FileSystemHost, HostInteraction, HttpDownloader,
    LibraryOperationResult, LogLevel, Logger, Manifest, Settings, MANIFEST_FILE_NAME,
};

/// Everything a command needs, built once per invocation
pub struct Context {
    pub deps: Dependencies,
    pub cache: Arc<CacheService>,
    pub manifest_path: PathBuf,
    pub cancel: CancellationToken,
}

impl Context {
    /// Resolve the working directory, settings and cache, and register providers
    pub fn open(root: &str, verbose: bool, cancel: CancellationToken) -> Result<Self> {
        let working_directory = std::path::absolute(root)
            .with_context(|| format!("Invalid project directory: {}", root))?;
        let settings = Settings::load_default()?;

        let cache_root = std::env::var(CACHE_DIR_ENV)
            .ok()
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| settings.get(CACHE_ROOT_KEY).map(PathBuf::from))
            .unwrap_or_else(CacheService::default_root);

        let mut cache = CacheService::new(&cache_root, Arc::new(HttpDownloader::new()?));
        if let Some(hours) = settings.get(CATALOG_EXPIRY_KEY) {
            let hours: u64 = hours
                .parse()
                .with_context(|| format!("{} must be a whole number of hours, got {}", CATALOG_EXPIRY_KEY, hours))?;
            cache = cache.with_catalog_expiry(Duration::from_secs(hours * 60 * 60));
        }
        let cache = Arc::new(cache);

        debug!(
            "Working directory {}, cache {}",
            working_directory.display(),
            cache_root.display()
        );

        let host: Arc<dyn HostInteraction> = Arc::new(FileSystemHost::new(
            &working_directory,
            &cache_root,
            Arc::new(ConsoleLogger::new(verbose)),
            settings,
        ));

        Ok(Self {
            deps: Dependencies::with_default_providers(host, cache.clone()),
            cache,
            manifest_path: working_directory.join(MANIFEST_FILE_NAME),
            cancel,
        })
    }

    pub fn logger(&self) -> &dyn Logger {
        self.deps.host().logger()
    }

    /// Load libdrop.json, reporting a malformed file as a coded error
    pub async fn load_manifest(&self) -> Result<Manifest> {
        match Manifest::from_file(&self.manifest_path, self.deps.clone()).await {
            Ok(manifest) => Ok(manifest),
            Err(diagnostic) => {
                self.logger().log(&diagnostic.to_string(), LogLevel::Error);
                anyhow::bail!("Could not load {}", self.manifest_path.display())
            }
        }
    }

    pub async fn save_manifest(&self, manifest: &Manifest) -> Result<()> {
        manifest
            .save(&self.manifest_path)
            .await
            .with_context(|| format!("Failed to write {}", self.manifest_path.display()))
    }

    /// Delete callback handed to uninstall, clean and update
    pub fn file_deleter(&self) -> impl Fn(Vec<String>) -> BoxFuture<'static, bool> {
        let host = self.deps.host_arc();
        move |files: Vec<String>| {
            let host = host.clone();
            async move {
                debug!("Deleting {} file(s)", files.len());
                host.delete_files(&files).await
            }
            .boxed()
        }
    }
}

/// Log every result and return the number of failed libraries
pub fn report_results(logger: &dyn Logger, manifest: &Manifest, results: &[LibraryOperationResult], verb: &str) -> usize {
    let mut failed = 0;
    for result in results {
        let library_id = result
            .installation_state
            .as_ref()
            .map(|state| manifest.library_id(state));

        if result.cancelled_result() {
            if let Some(id) = &library_id {
                logger.log(&format!("Cancelled {}", id), LogLevel::Task);
            }
        } else if !result.errors().is_empty() {
            failed += 1;
            for error in result.errors() {
                match &library_id {
                    Some(id) => logger.log(&format!("{}: {}", id, error), LogLevel::Error),
                    None => logger.log(&error.to_string(), LogLevel::Error),
                }
            }
        } else if let Some(id) = &library_id {
            if result.up_to_date() {
                logger.log(&format!("{} is up to date", id), LogLevel::Task);
            } else {
                logger.log(&format!("{} {}", verb, id), LogLevel::Task);
            }
        }
    }
    failed
}

/// Ask a question on stdin, returning `default` for an empty answer
pub fn prompt(question: &str, default: &str) -> Result<String> {
    print!("{} [{}]: ", question, default);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(if answer.is_empty() { default.to_string() } else { answer.to_string() })
}

/// Split a `KEY=VALUE` argument
pub fn parse_key_value(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => anyhow::bail!("Expected KEY=VALUE, got '{}'", arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("providers.cdnjs.url=https://x").unwrap(), ("providers.cdnjs.url", "https://x"));
        assert_eq!(parse_key_value("a=").unwrap(), ("a", ""));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
