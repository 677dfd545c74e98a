// src/provider/filesystem.rs

//! Local file system and plain URL provider
//!
//! The library id is a path (relative to the working directory or absolute)
//! to a file or directory, or an http(s) URL to a single file. There are no
//! versions and nothing is cached: local sources are copied directly and
//! URLs are downloaded on every install.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::base::{catalog_failure, check_state, select_files};
use super::catalog::{Library, LibraryCatalog};
use super::Provider;
use crate::cache::CacheService;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::host::{HostInteraction, LogLevel};
use crate::library::{LibraryInstallationGoalState, LibraryInstallationState};
use crate::naming::{LibraryNamingScheme, SimpleLibraryNamingScheme};
use crate::operation::OperationResult;
use crate::paths;

pub const FILESYSTEM_PROVIDER_ID: &str = "filesystem";

/// Lists files of a local path or names the single file behind a URL
pub struct FileSystemCatalog {
    working_directory: PathBuf,
}

impl FileSystemCatalog {
    /// Absolute location of a local library id
    fn locate(&self, name: &str) -> PathBuf {
        paths::normalize_path(&paths::resolve(&self.working_directory, name))
    }

    /// Source for one library file: the URL, the file itself, or a file under the directory
    fn source_of(&self, name: &str, file: &str) -> String {
        if paths::is_remote_uri(name) {
            return name.to_string();
        }
        let root = self.locate(name);
        if root.is_dir() {
            let mut path = root;
            path.extend(file.split('/'));
            path.to_string_lossy().into_owned()
        } else {
            root.to_string_lossy().into_owned()
        }
    }
}

#[async_trait]
impl LibraryCatalog for FileSystemCatalog {
    async fn get_library(&self, name: &str, _version: &str, _cancel: &CancellationToken) -> Result<Library> {
        if paths::is_remote_uri(name) {
            let file = paths::file_name_of(name);
            if file.is_empty() {
                return Err(Error::NotFoundError(format!("{name} does not name a file")));
            }
            return Ok(Library::new(name, "", FILESYSTEM_PROVIDER_ID, vec![file]));
        }

        let root = self.locate(name);
        let files: Vec<String> = if root.is_file() {
            vec![paths::file_name_of(&root.to_string_lossy())]
        } else if root.is_dir() {
            WalkDir::new(&root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    entry
                        .path()
                        .strip_prefix(&root)
                        .ok()
                        .map(|p| p.to_string_lossy().replace('\\', "/"))
                })
                .collect()
        } else {
            return Err(Error::NotFoundError(format!("{} does not exist", root.display())));
        };

        Ok(Library::new(name, "", FILESYSTEM_PROVIDER_ID, files))
    }

    async fn get_versions(&self, _name: &str, _cancel: &CancellationToken) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn get_latest_version(
        &self,
        _name: &str,
        _include_pre_release: bool,
        _cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        Ok(None)
    }
}

pub struct FileSystemProvider {
    host: Arc<dyn HostInteraction>,
    cache: Arc<CacheService>,
    catalog: FileSystemCatalog,
    naming: SimpleLibraryNamingScheme,
}

impl FileSystemProvider {
    pub fn new(host: Arc<dyn HostInteraction>, cache: Arc<CacheService>) -> Self {
        let catalog = FileSystemCatalog {
            working_directory: host.working_directory().to_path_buf(),
        };
        Self {
            host,
            cache,
            catalog,
            naming: SimpleLibraryNamingScheme,
        }
    }

    /// Fetch a remote source and write it into the project
    async fn download_to(&self, url: &str, destination: &str, cancel: &CancellationToken) -> Result<()> {
        let bytes = self.cache.downloader().download(url, cancel).await?;
        self.host.write_file(destination, bytes, cancel).await
    }
}

#[async_trait]
impl Provider for FileSystemProvider {
    fn id(&self) -> &str {
        FILESYSTEM_PROVIDER_ID
    }

    fn supports_library_versions(&self) -> bool {
        false
    }

    fn naming_scheme(&self) -> &dyn LibraryNamingScheme {
        &self.naming
    }

    async fn get_installation_goal_state(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState> {
        let errors = check_state(state, &self.naming, FILESYSTEM_PROVIDER_ID, self.host.working_directory());
        if !errors.is_empty() {
            return OperationResult::from_errors(errors);
        }
        if cancel.is_cancelled() {
            return OperationResult::Cancelled(None);
        }

        let library = match self.catalog.get_library(&state.name, "", cancel).await {
            Ok(library) => library,
            Err(e) => return catalog_failure(e, &state.name, FILESYSTEM_PROVIDER_ID),
        };
        let files = match select_files(state, &library, &state.name) {
            Ok(files) => files,
            Err(error) => return OperationResult::from_error(error),
        };

        let destination = paths::relative_destination(state.destination(), self.host.working_directory());
        let installed_files: BTreeMap<String, String> = files
            .iter()
            .map(|file| {
                (
                    paths::join_destination(&destination, file),
                    self.catalog.source_of(&state.name, file),
                )
            })
            .collect();

        OperationResult::Success(LibraryInstallationGoalState::new(
            state.clone(),
            self.host.working_directory(),
            installed_files,
        ))
    }

    async fn install(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState> {
        let goal = match self.get_installation_goal_state(state, cancel).await {
            OperationResult::Success(goal) => goal,
            other => return other,
        };
        if goal.is_achieved() {
            debug!("{} already installed", state.name);
            return OperationResult::UpToDate(goal);
        }

        for (destination, source) in &goal.installed_files {
            if cancel.is_cancelled() {
                return OperationResult::Cancelled(Some(goal));
            }

            let written = if paths::is_remote_uri(source) {
                self.download_to(source, destination, cancel).await
            } else {
                self.host.copy_file(Path::new(source), destination, cancel).await
            };

            match written {
                Ok(()) => self
                    .host
                    .logger()
                    .log(&format!("Wrote {destination}"), LogLevel::Status),
                Err(Error::Cancelled) => return OperationResult::Cancelled(Some(goal)),
                Err(Error::DownloadError(detail)) => {
                    return OperationResult::from_error(Diagnostic::failed_to_download_resource(
                        &state.name,
                        &detail,
                    ));
                }
                Err(e) => {
                    warn!("Failed to install {} -> {}: {}", source, destination, e);
                    return OperationResult::from_error(Diagnostic::could_not_write_file(destination));
                }
            }
        }

        OperationResult::Success(goal)
    }

    fn get_catalog(&self) -> &dyn LibraryCatalog {
        &self.catalog
    }

    fn get_suggested_destination(&self, library: &Library) -> String {
        let root = self.catalog.locate(&library.name);
        if !paths::is_remote_uri(&library.name) && root.is_dir() {
            format!("lib/{}", paths::file_name_of(&library.name))
        } else {
            "lib".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResourceDownloader;
    use crate::diagnostics::ErrorCode;
    use crate::host::{FileSystemHost, MemoryLogger};
    use crate::settings::Settings;
    use std::fs;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingDownloader {
        requests: Mutex<usize>,
    }

    #[async_trait]
    impl ResourceDownloader for CountingDownloader {
        async fn download(&self, url: &str, _cancel: &CancellationToken) -> Result<Vec<u8>> {
            *self.requests.lock().unwrap() += 1;
            if url.ends_with("missing.js") {
                return Err(Error::DownloadError(format!("HTTP 404 from {url}")));
            }
            Ok(b"remote body".to_vec())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn provider(root: &Path, downloader: Arc<CountingDownloader>) -> FileSystemProvider {
        let host: Arc<dyn HostInteraction> = Arc::new(FileSystemHost::new(
            root.join("project"),
            root.join("cache"),
            Arc::new(MemoryLogger::new()),
            Settings::in_memory(),
        ));
        let cache = Arc::new(CacheService::new(root.join("cache"), downloader));
        FileSystemProvider::new(host, cache)
    }

    fn seed(root: &Path) {
        fs::create_dir_all(root.join("project/vendor/widgets/css")).unwrap();
        fs::write(root.join("project/vendor/widgets/widgets.js"), "js").unwrap();
        fs::write(root.join("project/vendor/widgets/css/widgets.css"), "css").unwrap();
        fs::write(root.join("shared.js"), "shared").unwrap();
    }

    #[tokio::test]
    async fn test_install_directory_subset() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let provider = provider(temp.path(), Arc::new(CountingDownloader::default()));
        let state = LibraryInstallationState::new("vendor/widgets", "")
            .with_destination("lib/widgets")
            .with_files(["css/widgets.css"]);

        let result = provider.install(&state, &CancellationToken::new()).await;
        assert!(matches!(result, OperationResult::Success(_)));
        let goal = result.result().unwrap();
        assert_eq!(goal.installed_files.len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("project/lib/widgets/css/widgets.css")).unwrap(),
            "css"
        );
        assert!(!temp.path().join("project/lib/widgets/widgets.js").exists());

        let again = provider.install(&state, &CancellationToken::new()).await;
        assert!(again.up_to_date());
    }

    #[tokio::test]
    async fn test_install_single_file_outside_project() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let provider = provider(temp.path(), Arc::new(CountingDownloader::default()));
        let state = LibraryInstallationState::new("../shared.js", "").with_destination("lib");

        let result = provider.install(&state, &CancellationToken::new()).await;
        assert!(result.success());
        assert_eq!(
            fs::read_to_string(temp.path().join("project/lib/shared.js")).unwrap(),
            "shared"
        );
    }

    #[tokio::test]
    async fn test_missing_source_cannot_resolve() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let provider = provider(temp.path(), Arc::new(CountingDownloader::default()));
        let state = LibraryInstallationState::new("vendor/nothing", "").with_destination("lib");

        let result = provider
            .get_installation_goal_state(&state, &CancellationToken::new())
            .await;
        assert_eq!(result.errors()[0].code, ErrorCode::UnableToResolveSource);
    }

    #[tokio::test]
    async fn test_url_source_is_downloaded_every_time() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let downloader = Arc::new(CountingDownloader::default());
        let provider = provider(temp.path(), downloader.clone());
        let state = LibraryInstallationState::new("https://example.com/dist/app.js", "")
            .with_destination("lib");
        let cancel = CancellationToken::new();

        assert!(provider.install(&state, &cancel).await.success());
        let second = provider.install(&state, &cancel).await;
        assert!(second.success() && !second.up_to_date());
        assert_eq!(*downloader.requests.lock().unwrap(), 2);
        assert_eq!(
            fs::read_to_string(temp.path().join("project/lib/app.js")).unwrap(),
            "remote body"
        );

        let broken = LibraryInstallationState::new("https://example.com/missing.js", "")
            .with_destination("lib");
        let result = provider.install(&broken, &cancel).await;
        assert_eq!(result.errors()[0].code, ErrorCode::FailedToDownloadResource);
    }

    #[test]
    fn test_suggested_destination() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let provider = provider(temp.path(), Arc::new(CountingDownloader::default()));
        let dir = Library::new("vendor/widgets", "", FILESYSTEM_PROVIDER_ID, Vec::new());
        let url = Library::new("https://example.com/app.js", "", FILESYSTEM_PROVIDER_ID, Vec::new());
        assert_eq!(provider.get_suggested_destination(&dir), "lib/widgets");
        assert_eq!(provider.get_suggested_destination(&url), "lib");
    }
}
