// src/provider/base.rs

//! Shared provider machinery
//!
//! Every CDN-style provider follows the same pipeline: validate the declared
//! state, resolve the library in the catalog, pick the files, map them to
//! cache paths, hydrate the cache and copy into the project. Only the catalog
//! differs, so [`CdnProvider`] is generic over a [`CdnCatalog`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::catalog::{Library, LibraryCatalog};
use super::Provider;
use crate::cache::{CacheService, CacheServiceMetadata};
use crate::diagnostics::Diagnostic;
use crate::error::Error;
use crate::host::{HostInteraction, LogLevel};
use crate::library::{LibraryInstallationGoalState, LibraryInstallationState};
use crate::naming::{LibraryNamingScheme, VersionedLibraryNamingScheme};
use crate::operation::OperationResult;
use crate::paths;

/// A catalog whose files can be downloaded individually
pub trait CdnCatalog: LibraryCatalog {
    /// Download URL of one library file
    fn file_url(&self, name: &str, version: &str, file: &str) -> String;
}

// =============================================================================
// Validation helpers
// =============================================================================

/// Check a destination: defined, legal characters, inside the working directory
pub fn check_destination(destination: Option<&str>, working_directory: &Path) -> Option<Diagnostic> {
    let destination = match destination {
        Some(d) if !d.trim().is_empty() => d,
        _ => return Some(Diagnostic::path_is_undefined()),
    };
    if paths::has_invalid_path_chars(destination) {
        return Some(Diagnostic::destination_path_has_invalid_characters(destination));
    }
    if !paths::is_under_working_directory(destination, working_directory) {
        return Some(Diagnostic::path_outside_working_directory(destination));
    }
    None
}

/// Property checks every provider applies before touching its catalog
pub(crate) fn check_state(
    state: &LibraryInstallationState,
    scheme: &dyn LibraryNamingScheme,
    provider_id: &str,
    working_directory: &Path,
) -> Vec<Diagnostic> {
    if state.name.trim().is_empty() {
        return vec![Diagnostic::library_id_is_undefined()];
    }
    if let Some(error) = check_destination(state.destination_path.as_deref(), working_directory) {
        return vec![error];
    }

    let library_id = scheme.get_id(&state.name, &state.version);
    if !scheme.is_valid_library_id(&library_id) {
        return vec![Diagnostic::invalid_library_id(&library_id, provider_id)];
    }
    if state
        .files
        .as_ref()
        .is_some_and(|files| files.iter().any(|f| f.trim().is_empty()))
    {
        return vec![Diagnostic::file_name_must_not_be_empty(&library_id)];
    }
    Vec::new()
}

/// Whether a name and version can be used as cache directory segments
pub(crate) fn is_cache_safe(name: &str, version: &str) -> bool {
    let name_ok = !name.starts_with('/')
        && !name.contains('\\')
        && name.split('/').all(|s| !s.is_empty() && s != "." && s != "..");
    let version_ok = !version.contains(['/', '\\']) && version != "." && version != "..";
    name_ok && version_ok && !paths::has_invalid_path_chars(name) && !paths::has_invalid_path_chars(version)
}

/// Path of one cached catalog response: `<cache>/<provider>/<name>/<file_name>`
///
/// Names or file names that would leave the provider's cache directory are
/// rejected before any path is built.
pub(crate) fn catalog_cache_file(
    cache: &CacheService,
    provider_id: &str,
    name: &str,
    file_name: &str,
) -> crate::error::Result<PathBuf> {
    if !is_cache_safe(name, file_name) {
        return Err(Error::InvalidPath(format!(
            "Library name \"{name}\" cannot be cached by {provider_id}"
        )));
    }
    let mut path = cache.provider_dir(provider_id);
    path.extend(name.split('/'));
    path.push(file_name);
    Ok(path)
}

/// Files to install: the declared list, or every file when none was declared
///
/// Declared names are normalized (leading `/` stripped) and must all exist
/// in the library.
pub(crate) fn select_files(
    state: &LibraryInstallationState,
    library: &Library,
    library_id: &str,
) -> Result<Vec<String>, Diagnostic> {
    let Some(declared) = &state.files else {
        return Ok(library.files.clone());
    };

    let mut selected = Vec::with_capacity(declared.len());
    let mut missing = Vec::new();
    for file in declared {
        match paths::normalize_relative(file.trim_start_matches('/')) {
            Some(normalized) if library.contains(&normalized) => selected.push(normalized),
            _ => missing.push(file.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(Diagnostic::invalid_files_in_library(library_id, &missing, library.files.len()));
    }
    Ok(selected)
}

/// Convert a catalog lookup failure into a coded result
pub(crate) fn catalog_failure<T>(error: Error, library_id: &str, provider_id: &str) -> OperationResult<T> {
    match error {
        Error::Cancelled => OperationResult::Cancelled(None),
        Error::NotFoundError(detail) | Error::DownloadError(detail) | Error::ParseError(detail) => {
            debug!("Could not resolve {} from {}: {}", library_id, provider_id, detail);
            OperationResult::from_error(Diagnostic::unable_to_resolve_source(library_id, provider_id))
        }
        other => {
            warn!("Unexpected error resolving {} from {}: {}", library_id, provider_id, other);
            OperationResult::from_error(Diagnostic::unknown_exception())
        }
    }
}

/// Copy every goal-state file into the project
pub(crate) async fn copy_goal_files(
    host: &dyn HostInteraction,
    goal: LibraryInstallationGoalState,
    cancel: &CancellationToken,
) -> OperationResult<LibraryInstallationGoalState> {
    for (destination, source) in &goal.installed_files {
        if cancel.is_cancelled() {
            return OperationResult::Cancelled(Some(goal));
        }
        match host.copy_file(Path::new(source), destination, cancel).await {
            Ok(()) => host
                .logger()
                .log(&format!("Wrote {destination}"), LogLevel::Status),
            Err(Error::Cancelled) => return OperationResult::Cancelled(Some(goal)),
            Err(e) => {
                warn!("Copy {} -> {} failed: {}", source, destination, e);
                return OperationResult::from_error(Diagnostic::could_not_write_file(destination));
            }
        }
    }
    OperationResult::Success(goal)
}

// =============================================================================
// CdnProvider
// =============================================================================

/// Provider backed by a versioned CDN catalog and the shared cache
pub struct CdnProvider<C> {
    id: String,
    catalog: C,
    host: Arc<dyn HostInteraction>,
    cache: Arc<CacheService>,
    naming: VersionedLibraryNamingScheme,
}

impl<C: CdnCatalog + 'static> CdnProvider<C> {
    pub fn new(
        id: impl Into<String>,
        catalog: C,
        host: Arc<dyn HostInteraction>,
        cache: Arc<CacheService>,
    ) -> Self {
        Self {
            id: id.into(),
            catalog,
            host,
            cache,
            naming: VersionedLibraryNamingScheme,
        }
    }

    /// `<cache>/<provider>/<name>/<version>/<file>`
    fn cache_file(&self, library: &Library, file: &str) -> PathBuf {
        let mut path = self.cache.provider_dir(&self.id);
        path.extend(library.name.split('/'));
        path.push(&library.version);
        path.extend(file.split('/'));
        path
    }

    fn goal_state(
        &self,
        state: &LibraryInstallationState,
        library: &Library,
        files: &[String],
    ) -> LibraryInstallationGoalState {
        let destination = paths::relative_destination(state.destination(), self.host.working_directory());
        let installed_files: BTreeMap<String, String> = files
            .iter()
            .map(|file| {
                (
                    paths::join_destination(&destination, file),
                    self.cache_file(library, file).to_string_lossy().into_owned(),
                )
            })
            .collect();
        LibraryInstallationGoalState::new(
            state.clone(),
            self.host.working_directory(),
            installed_files,
        )
    }

    /// Validate, look up the library and select its files
    async fn resolve(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<(Library, Vec<String>)> {
        let errors = check_state(state, &self.naming, &self.id, self.host.working_directory());
        if !errors.is_empty() {
            return OperationResult::from_errors(errors);
        }

        let library_id = self.naming.get_id(&state.name, &state.version);
        if !is_cache_safe(&state.name, &state.version) {
            return OperationResult::from_error(Diagnostic::invalid_library_id(&library_id, &self.id));
        }
        if cancel.is_cancelled() {
            return OperationResult::Cancelled(None);
        }

        let library = match self.catalog.get_library(&state.name, &state.version, cancel).await {
            Ok(library) => library,
            Err(e) => return catalog_failure(e, &library_id, &self.id),
        };

        match select_files(state, &library, &library_id) {
            Ok(files) => OperationResult::Success((library, files)),
            Err(error) => OperationResult::from_error(error),
        }
    }
}

#[async_trait]
impl<C: CdnCatalog + 'static> Provider for CdnProvider<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_library_versions(&self) -> bool {
        true
    }

    fn naming_scheme(&self) -> &dyn LibraryNamingScheme {
        &self.naming
    }

    async fn get_installation_goal_state(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState> {
        self.resolve(state, cancel)
            .await
            .map(|(library, files)| self.goal_state(state, &library, &files))
    }

    async fn install(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState> {
        let (library, files) = match self.resolve(state, cancel).await {
            OperationResult::Success(resolved) => resolved,
            other => return other.map(|(library, files)| self.goal_state(state, &library, &files)),
        };
        let goal = self.goal_state(state, &library, &files);

        if goal.is_achieved() {
            debug!("{}@{} already installed", library.name, library.version);
            return OperationResult::UpToDate(goal);
        }

        let items: Vec<CacheServiceMetadata> = files
            .iter()
            .map(|file| {
                CacheServiceMetadata::new(
                    self.catalog.file_url(&library.name, &library.version, file),
                    self.cache_file(&library, file),
                )
            })
            .collect();

        if let Err(e) = self.cache.hydrate(&items, cancel).await {
            let library_id = self.naming.get_id(&library.name, &library.version);
            return match e {
                Error::Cancelled => OperationResult::Cancelled(Some(goal)),
                Error::DownloadError(detail) => OperationResult::from_error(
                    Diagnostic::failed_to_download_resource(&library_id, &detail),
                ),
                Error::IoError(detail) => {
                    warn!("Cache write failed for {}: {}", library_id, detail);
                    OperationResult::from_error(Diagnostic::could_not_write_file(
                        &self.cache.provider_dir(&self.id).to_string_lossy(),
                    ))
                }
                other => {
                    warn!("Unexpected error hydrating {}: {}", library_id, other);
                    OperationResult::from_error(Diagnostic::unknown_exception())
                }
            };
        }

        copy_goal_files(self.host.as_ref(), goal, cancel).await
    }

    fn get_catalog(&self) -> &dyn LibraryCatalog {
        &self.catalog
    }
}
