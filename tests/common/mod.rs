// tests/common/mod.rs

//! Shared test utilities for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use libdrop::host::MemoryLogger;
use libdrop::{
    CacheService, Dependencies, Error, FileSystemHost, HostInteraction, Manifest,
    ResourceDownloader, Result, Settings,
};

pub const CDNJS_API: &str = "https://api.cdnjs.com/libraries";
pub const CDNJS_CDN: &str = "https://cdnjs.cloudflare.com/ajax/libs";

/// Downloader answering from a fixed URL table and recording every request
#[derive(Default)]
pub struct CannedDownloader {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl CannedDownloader {
    pub fn insert(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.as_bytes().to_vec());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceDownloader for CannedDownloader {
    async fn download(&self, url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::DownloadError(format!("HTTP 404 from {url}")))
    }

    fn name(&self) -> &str {
        "canned"
    }
}

/// A temporary project and cache wired to the built-in providers.
///
/// Keep the struct alive for the duration of the test; dropping it removes
/// both directories.
pub struct TestProject {
    _temp: TempDir,
    pub root: PathBuf,
    pub cache_root: PathBuf,
    pub downloader: Arc<CannedDownloader>,
    pub logger: Arc<MemoryLogger>,
    pub deps: Dependencies,
}

impl TestProject {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("project");
        let cache_root = temp.path().join("cache");
        std::fs::create_dir_all(&root).unwrap();

        let downloader = Arc::new(CannedDownloader::default());
        let logger = Arc::new(MemoryLogger::new());
        let cache = Arc::new(CacheService::new(&cache_root, downloader.clone()));
        let host: Arc<dyn HostInteraction> = Arc::new(FileSystemHost::new(
            &root,
            &cache_root,
            logger.clone(),
            Settings::in_memory(),
        ));

        Self {
            _temp: temp,
            root,
            cache_root,
            downloader,
            logger,
            deps: Dependencies::with_default_providers(host, cache),
        }
    }

    /// Serve a cdnjs library version: its file list and each file's content
    pub fn serve_cdnjs(&self, name: &str, version: &str, files: &[(&str, &str)]) {
        let names: Vec<&str> = files.iter().map(|(file, _)| *file).collect();
        self.downloader.insert(
            &format!("{CDNJS_API}/{name}/{version}?fields=name,version,files"),
            &serde_json::json!({ "name": name, "version": version, "files": names }).to_string(),
        );
        for (file, content) in files {
            self.downloader
                .insert(&format!("{CDNJS_CDN}/{name}/{version}/{file}"), content);
        }
    }

    pub fn manifest(&self, json: &str) -> Manifest {
        Manifest::from_json(json, self.deps.clone()).unwrap()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn cache_path(&self, parts: &[&str]) -> PathBuf {
        parts.iter().fold(self.cache_root.clone(), |path, part| path.join(part))
    }
}

/// Delete callback that removes project-relative files under `root`
pub fn deleter(root: &Path) -> impl Fn(Vec<String>) -> std::future::Ready<bool> + use<> {
    let root = root.to_path_buf();
    move |files: Vec<String>| {
        for file in files {
            let path = root.join(&file);
            if path.exists() && std::fs::remove_file(&path).is_err() {
                return std::future::ready(false);
            }
        }
        std::future::ready(true)
    }
}
