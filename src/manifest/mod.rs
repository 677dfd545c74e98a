// src/manifest/mod.rs

//! Manifest loading, saving and orchestration
//!
//! A [`Manifest`] is built from JSON every time a command runs, mutated in
//! memory by install/uninstall/update, then written back atomically. Goal
//! states are never stored in it; every operation recomputes them through
//! the providers.
//!
//! Libraries are kept in declaration order, and every batch operation
//! returns its results in that same order.

mod json;

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dependencies::Dependencies;
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::host::write_atomic;
use crate::library::{LibraryInstallationGoalState, LibraryInstallationState};
use crate::operation::{LibraryOperationResult, OperationResult};
use crate::validator;
use json::{non_empty, LibraryEntry, ManifestDocument};

/// Manifest file name in the project root
pub const MANIFEST_FILE_NAME: &str = "libdrop.json";

/// Manifest schema versions this build understands, oldest first
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// Declared libraries of one project
#[derive(Debug, Clone)]
pub struct Manifest {
    version: String,
    default_provider: Option<String>,
    default_destination: Option<String>,
    libraries: Vec<LibraryInstallationState>,
    deps: Dependencies,
}

impl Manifest {
    /// An empty manifest at the newest supported version
    pub fn new(deps: Dependencies) -> Self {
        Self {
            version: latest_version().to_string(),
            default_provider: None,
            default_destination: None,
            libraries: Vec::new(),
            deps,
        }
    }

    /// Parse manifest JSON, applying defaults to every library
    ///
    /// Blank text is an empty manifest with no version. Invalid JSON fails
    /// with `LIB004`.
    pub fn from_json(text: &str, deps: Dependencies) -> Result<Self, Diagnostic> {
        let document: ManifestDocument = if text.trim().is_empty() {
            ManifestDocument::default()
        } else {
            serde_json::from_str(text).map_err(|e| Diagnostic::manifest_malformed(&e.to_string()))?
        };

        let default_provider = non_empty(document.default_provider);
        let default_destination = non_empty(document.default_destination);

        let libraries = document
            .libraries
            .into_iter()
            .map(|entry| {
                let provider_id = non_empty(entry.provider);
                let scheme_provider = provider_id.as_deref().or(default_provider.as_deref());
                let (name, version) = deps
                    .naming()
                    .get_name_and_version(entry.library.trim(), scheme_provider);

                let mut state = LibraryInstallationState {
                    name,
                    version,
                    provider_id,
                    destination_path: non_empty(entry.destination),
                    files: entry.files,
                    ..LibraryInstallationState::default()
                };
                state.apply_defaults(default_provider.as_deref(), default_destination.as_deref());
                state
            })
            .collect();

        Ok(Self {
            version: document.version.unwrap_or_default(),
            default_provider,
            default_destination,
            libraries,
            deps,
        })
    }

    /// Load a manifest file; a missing file is an empty manifest
    pub async fn from_file(path: &Path, deps: Dependencies) -> Result<Self, Diagnostic> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Self::from_json(&text, deps),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                Self::from_json("{}", deps)
            }
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                Err(Diagnostic::unknown_exception())
            }
        }
    }

    /// Serialize, omitting fields that came from manifest defaults
    pub fn to_json(&self) -> String {
        let document = ManifestDocument {
            version: Some(self.version.clone()).filter(|v| !v.is_empty()),
            default_provider: self.default_provider.clone(),
            default_destination: self.default_destination.clone(),
            libraries: self
                .libraries
                .iter()
                .map(|state| LibraryEntry {
                    library: self.library_id(state),
                    provider: state
                        .provider_id
                        .clone()
                        .filter(|_| !state.is_using_default_provider),
                    destination: state
                        .destination_path
                        .clone()
                        .filter(|_| !state.is_using_default_destination),
                    files: state.files.clone(),
                })
                .collect(),
        };
        // Plain strings and vectors always serialize
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
    }

    /// Write the manifest atomically
    pub async fn save(&self, path: &Path) -> crate::Result<()> {
        let mut text = self.to_json();
        text.push('\n');
        write_atomic(path, text.into_bytes()).await?;
        info!("Saved manifest {}", path.display());
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn default_provider(&self) -> Option<&str> {
        self.default_provider.as_deref()
    }

    pub fn default_destination(&self) -> Option<&str> {
        self.default_destination.as_deref()
    }

    pub fn libraries(&self) -> &[LibraryInstallationState] {
        &self.libraries
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.deps
    }

    /// Change the default provider, moving libraries that relied on it
    pub fn set_default_provider(&mut self, provider_id: Option<String>) {
        let provider_id = non_empty(provider_id);
        for state in self.libraries.iter_mut().filter(|s| s.is_using_default_provider) {
            match &provider_id {
                Some(id) => state.provider_id = Some(id.clone()),
                None => state.is_using_default_provider = false,
            }
        }
        self.default_provider = provider_id;
    }

    /// Change the default destination, moving libraries that relied on it
    pub fn set_default_destination(&mut self, destination: Option<String>) {
        let destination = non_empty(destination);
        for state in self.libraries.iter_mut().filter(|s| s.is_using_default_destination) {
            match &destination {
                Some(d) => state.destination_path = Some(d.clone()),
                None => state.is_using_default_destination = false,
            }
        }
        self.default_destination = destination;
    }

    /// Add a library, replacing any declared library with the same identity
    pub fn add_library(&mut self, state: LibraryInstallationState) {
        let identity = state.identity();
        match self.libraries.iter().position(|s| s.identity() == identity) {
            Some(index) => self.libraries[index] = state,
            None => self.libraries.push(state),
        }
    }

    /// Remove a library by identity, returning it if it was declared
    pub fn remove_library(&mut self, state: &LibraryInstallationState) -> Option<LibraryInstallationState> {
        let identity = state.identity();
        let index = self.libraries.iter().position(|s| s.identity() == identity)?;
        Some(self.libraries.remove(index))
    }

    /// Library id of a declared state under its provider's naming scheme
    pub fn library_id(&self, state: &LibraryInstallationState) -> String {
        self.deps
            .naming()
            .get_id(&state.name, &state.version, state.provider_id.as_deref())
    }

    /// Indexes of declared libraries matching a library id
    ///
    /// An id without a version matches every version of that name.
    pub fn find_libraries(&self, library_id: &str, provider_id: Option<&str>) -> Vec<usize> {
        let scheme_provider = provider_id.or(self.default_provider.as_deref());
        let (name, version) = self.deps.naming().get_name_and_version(library_id, scheme_provider);
        self.libraries
            .iter()
            .enumerate()
            .filter(|(_, s)| s.name == name || (s.version.is_empty() && s.name == library_id))
            .filter(|(_, s)| version.is_empty() || s.version == version)
            .filter(|(_, s)| provider_id.is_none_or(|p| s.provider() == p))
            .map(|(i, _)| i)
            .collect()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Validate the manifest and then every declared library
    pub async fn get_validation_results(&self, cancel: &CancellationToken) -> Vec<LibraryOperationResult> {
        let errors = validator::get_manifest_errors(self);
        if !errors.is_empty() {
            return vec![LibraryOperationResult::failed(None, errors)];
        }
        validator::get_libraries_errors(
            &self.libraries,
            self.default_destination.as_deref(),
            self.default_provider.as_deref(),
            &self.deps,
            cancel,
        )
        .await
    }

    /// Install a new library and declare it
    ///
    /// `provider_id` and `destination` fall back to the manifest defaults.
    /// The library is validated on its own and then together with every
    /// declared library before anything is written.
    pub async fn install_library(
        &mut self,
        library_name: &str,
        version: &str,
        provider_id: Option<&str>,
        files: Option<Vec<String>>,
        destination: Option<&str>,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState> {
        let mut desired = LibraryInstallationState {
            name: library_name.to_string(),
            version: version.to_string(),
            provider_id: provider_id.filter(|p| !p.is_empty()).map(String::from),
            destination_path: destination.filter(|d| !d.is_empty()).map(String::from),
            files,
            ..LibraryInstallationState::default()
        };
        desired.apply_defaults(self.default_provider.as_deref(), self.default_destination.as_deref());

        let errors = validator::validate_library(&desired, &self.deps);
        if !errors.is_empty() {
            return OperationResult::from_errors(errors);
        }

        let identity = desired.identity();
        let mut proposed: Vec<LibraryInstallationState> = self
            .libraries
            .iter()
            .filter(|s| s.identity() != identity)
            .cloned()
            .collect();
        proposed.push(desired.clone());

        let results = validator::get_libraries_errors(
            &proposed,
            self.default_destination.as_deref(),
            self.default_provider.as_deref(),
            &self.deps,
            cancel,
        )
        .await;
        if results.iter().any(|r| r.cancelled_result()) {
            return OperationResult::Cancelled(None);
        }
        let errors: Vec<Diagnostic> = results.iter().flat_map(|r| r.errors().iter().cloned()).collect();
        if !errors.is_empty() {
            return OperationResult::from_errors(errors);
        }

        let Some(provider) = self.deps.get_provider(desired.provider()) else {
            return OperationResult::from_error(Diagnostic::provider_unknown(desired.provider()));
        };
        let result = provider.install(&desired, cancel).await;

        if result.success() {
            if self.default_provider.is_none() {
                self.default_provider = desired.provider_id.clone();
                desired.is_using_default_provider = true;
            }
            if self.version.is_empty() {
                self.version = latest_version().to_string();
            }
            self.add_library(desired);
        }
        result
    }

    /// Install every declared library
    ///
    /// One result per library, in declaration order. A failing library does
    /// not stop the others; once cancellation is observed the remaining
    /// libraries are reported as cancelled.
    pub async fn restore(&self, cancel: &CancellationToken) -> Vec<LibraryOperationResult> {
        let mut results = Vec::with_capacity(self.libraries.len());
        for state in &self.libraries {
            if cancel.is_cancelled() {
                results.push(LibraryOperationResult::cancelled(Some(state.clone())));
                continue;
            }

            let provider = match self.provider_for(state) {
                Ok(provider) => provider,
                Err(error) => {
                    results.push(LibraryOperationResult::failed(Some(state.clone()), vec![error]));
                    continue;
                }
            };

            let result = provider.install(state, cancel).await;
            debug!("Restored {}: success={}", self.library_id(state), result.success());
            results.push(LibraryOperationResult::new(Some(state.clone()), result));
        }
        results
    }

    /// Delete a declared library's files and remove it from the manifest
    pub async fn uninstall<F, Fut>(
        &mut self,
        library_id: &str,
        provider_id: Option<&str>,
        delete_files: F,
        cancel: &CancellationToken,
    ) -> LibraryOperationResult
    where
        F: Fn(Vec<String>) -> Fut,
        Fut: Future<Output = bool>,
    {
        let matches = self.find_libraries(library_id, provider_id);
        let index = match matches.as_slice() {
            [index] => *index,
            [] => {
                return LibraryOperationResult::failed(None, vec![Diagnostic::could_not_delete_library(library_id)]);
            }
            many => {
                let candidates: Vec<String> = many
                    .iter()
                    .map(|&i| format!("{} ({})", self.library_id(&self.libraries[i]), self.libraries[i].provider()))
                    .collect();
                return LibraryOperationResult::failed(
                    None,
                    vec![Diagnostic::ambiguous_library(library_id, &candidates)],
                );
            }
        };

        let state = self.libraries[index].clone();
        let result = self.delete_library_files(&state, &delete_files, cancel).await;
        if result.success() {
            self.libraries.remove(index);
        }
        result
    }

    /// Delete the files of every declared library, keeping the declarations
    pub async fn clean<F, Fut>(&self, delete_files: F, cancel: &CancellationToken) -> Vec<LibraryOperationResult>
    where
        F: Fn(Vec<String>) -> Fut,
        Fut: Future<Output = bool>,
    {
        let mut results = Vec::with_capacity(self.libraries.len());
        for state in &self.libraries {
            if cancel.is_cancelled() {
                results.push(LibraryOperationResult::cancelled(Some(state.clone())));
                continue;
            }
            results.push(self.delete_library_files(state, &delete_files, cancel).await);
        }
        results
    }

    /// Set a new version on a declared library, returning the previous state
    pub fn replace_library_version(&mut self, index: usize, version: &str) -> Option<LibraryInstallationState> {
        let state = self.libraries.get_mut(index)?;
        let previous = state.clone();
        state.version = version.to_string();
        Some(previous)
    }

    /// Delete files installed for `previous` that this manifest no longer installs
    ///
    /// Files are compared by `(destination, version)`, so changing a
    /// library's version marks all of its old files for deletion; the
    /// following restore writes the new ones. Libraries whose old goal state
    /// cannot be computed are skipped. Returns the deleted destinations.
    pub async fn delete_unwanted_files<F, Fut>(
        &self,
        previous: &Manifest,
        delete_files: F,
        cancel: &CancellationToken,
    ) -> OperationResult<Vec<String>>
    where
        F: Fn(Vec<String>) -> Fut,
        Fut: Future<Output = bool>,
    {
        let old_files = match previous.installed_file_versions(cancel).await {
            Some(files) => files,
            None => return OperationResult::Cancelled(None),
        };
        let new_files = match self.installed_file_versions(cancel).await {
            Some(files) => files,
            None => return OperationResult::Cancelled(None),
        };

        let mut unwanted: Vec<String> = old_files
            .difference(&new_files)
            .map(|(path, _)| path.clone())
            .collect();
        unwanted.sort();
        unwanted.dedup();

        if unwanted.is_empty() {
            return OperationResult::UpToDate(Vec::new());
        }
        if cancel.is_cancelled() {
            return OperationResult::Cancelled(None);
        }
        if !delete_files(unwanted.clone()).await {
            return OperationResult::from_error(Diagnostic::new(
                ErrorCode::CouldNotDeleteLibrary,
                format!("Failed to delete files: {}", unwanted.join(", ")),
            ));
        }
        OperationResult::Success(unwanted)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn provider_for(
        &self,
        state: &LibraryInstallationState,
    ) -> Result<std::sync::Arc<dyn crate::provider::Provider>, Diagnostic> {
        let provider_id = state.provider();
        if provider_id.is_empty() {
            return Err(Diagnostic::provider_is_undefined());
        }
        self.deps
            .get_provider(provider_id)
            .ok_or_else(|| Diagnostic::provider_unknown(provider_id))
    }

    async fn delete_library_files<F, Fut>(
        &self,
        state: &LibraryInstallationState,
        delete_files: &F,
        cancel: &CancellationToken,
    ) -> LibraryOperationResult
    where
        F: Fn(Vec<String>) -> Fut,
        Fut: Future<Output = bool>,
    {
        let errors = validator::validate_library(state, &self.deps);
        if !errors.is_empty() {
            return LibraryOperationResult::failed(Some(state.clone()), errors);
        }
        let provider = match self.provider_for(state) {
            Ok(provider) => provider,
            Err(error) => return LibraryOperationResult::failed(Some(state.clone()), vec![error]),
        };

        let goal = match provider.get_installation_goal_state(state, cancel).await {
            OperationResult::Success(goal) | OperationResult::UpToDate(goal) => goal,
            OperationResult::Cancelled(_) => return LibraryOperationResult::cancelled(Some(state.clone())),
            OperationResult::Failed(errors) => return LibraryOperationResult::failed(Some(state.clone()), errors),
        };

        let files: Vec<String> = goal.installed_files.keys().cloned().collect();
        if !delete_files(files).await {
            return LibraryOperationResult::failed(
                Some(state.clone()),
                vec![Diagnostic::could_not_delete_library(&self.library_id(state))],
            );
        }
        LibraryOperationResult::new(Some(state.clone()), OperationResult::Success(goal))
    }

    /// `(destination, version)` for every file this manifest installs
    ///
    /// `None` when cancelled.
    async fn installed_file_versions(&self, cancel: &CancellationToken) -> Option<HashSet<(String, String)>> {
        let mut files = HashSet::new();
        for state in &self.libraries {
            if cancel.is_cancelled() {
                return None;
            }
            let Ok(provider) = self.provider_for(state) else {
                continue;
            };
            match provider.get_installation_goal_state(state, cancel).await {
                OperationResult::Success(goal) | OperationResult::UpToDate(goal) => {
                    files.extend(
                        goal.installed_files
                            .into_keys()
                            .map(|path| (path, state.version.clone())),
                    );
                }
                OperationResult::Cancelled(_) => return None,
                OperationResult::Failed(errors) => {
                    debug!(
                        "Skipping {} while collecting files: {}",
                        self.library_id(state),
                        errors.first().map(|e| e.to_string()).unwrap_or_default()
                    );
                }
            }
        }
        Some(files)
    }
}

fn latest_version() -> &'static str {
    SUPPORTED_VERSIONS.last().copied().unwrap_or("1.0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheService, HttpDownloader};
    use crate::host::{FileSystemHost, HostInteraction, MemoryLogger};
    use crate::settings::Settings;
    use std::sync::Arc;

    fn deps(root: &Path) -> Dependencies {
        let host: Arc<dyn HostInteraction> = Arc::new(FileSystemHost::new(
            root,
            root.join(".cache"),
            Arc::new(MemoryLogger::new()),
            Settings::in_memory(),
        ));
        let cache = Arc::new(CacheService::new(root.join(".cache"), Arc::new(HttpDownloader::new().unwrap())));
        Dependencies::with_default_providers(host, cache)
    }

    const SAMPLE: &str = r#"{
        "version": "1.0",
        "defaultProvider": "cdnjs",
        "defaultDestination": "lib",
        "libraries": [
            { "library": "jquery@3.1.1", "files": ["jquery.js"] },
            { "library": "@angular/core@17.0.0", "provider": "unpkg", "destination": "lib/angular" },
            { "library": "../shared/util.js", "provider": "filesystem" }
        ]
    }"#;

    #[test]
    fn test_from_json_applies_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(SAMPLE, deps(temp.path())).unwrap();

        assert_eq!(manifest.version(), "1.0");
        let libs = manifest.libraries();
        assert_eq!(libs.len(), 3);

        assert_eq!(libs[0].name, "jquery");
        assert_eq!(libs[0].version, "3.1.1");
        assert_eq!(libs[0].provider(), "cdnjs");
        assert!(libs[0].is_using_default_provider);
        assert!(libs[0].is_using_default_destination);

        assert_eq!(libs[1].name, "@angular/core");
        assert_eq!(libs[1].version, "17.0.0");
        assert!(!libs[1].is_using_default_provider);
        assert_eq!(libs[1].files, None);

        assert_eq!(libs[2].name, "../shared/util.js");
        assert_eq!(libs[2].version, "");
        assert_eq!(libs[2].destination(), "lib");
    }

    #[test]
    fn test_to_json_omits_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(SAMPLE, deps(temp.path())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&manifest.to_json()).unwrap();

        let first = &value["libraries"][0];
        assert_eq!(first["library"], "jquery@3.1.1");
        assert!(first.get("provider").is_none());
        assert!(first.get("destination").is_none());
        assert_eq!(first["files"][0], "jquery.js");

        let second = &value["libraries"][1];
        assert_eq!(second["provider"], "unpkg");
        assert_eq!(second["destination"], "lib/angular");
        assert!(second.get("files").is_none());
        assert_eq!(value["defaultProvider"], "cdnjs");
    }

    #[test]
    fn test_malformed_json_is_lib004() {
        let temp = tempfile::tempdir().unwrap();
        let error = Manifest::from_json("{ \"version\": ", deps(temp.path())).unwrap_err();
        assert_eq!(error.code, ErrorCode::ManifestMalformed);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_file(&temp.path().join(MANIFEST_FILE_NAME), deps(temp.path()))
            .await
            .unwrap();
        assert!(manifest.libraries().is_empty());
        assert_eq!(manifest.version(), "");
    }

    #[tokio::test]
    async fn test_unsupported_version_fails_validation() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(r#"{"version":"9.0","libraries":[]}"#, deps(temp.path())).unwrap();
        let results = manifest.get_validation_results(&CancellationToken::new()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].errors()[0].code, ErrorCode::VersionIsNotSupported);
    }

    #[test]
    fn test_set_default_provider_moves_libraries() {
        let temp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::from_json(SAMPLE, deps(temp.path())).unwrap();
        manifest.set_default_provider(Some("jsdelivr".to_string()));
        assert_eq!(manifest.libraries()[0].provider(), "jsdelivr");
        assert_eq!(manifest.libraries()[1].provider(), "unpkg");
    }

    #[test]
    fn test_find_and_replace_version() {
        let temp = tempfile::tempdir().unwrap();
        let mut manifest = Manifest::from_json(SAMPLE, deps(temp.path())).unwrap();
        assert_eq!(manifest.find_libraries("jquery", None), vec![0]);
        assert_eq!(manifest.find_libraries("jquery@3.1.1", Some("cdnjs")), vec![0]);
        assert!(manifest.find_libraries("jquery@2.0.0", None).is_empty());

        let previous = manifest.replace_library_version(0, "3.7.1").unwrap();
        assert_eq!(previous.version, "3.1.1");
        assert_eq!(manifest.libraries()[0].version, "3.7.1");
        assert!(manifest.replace_library_version(7, "1.0.0").is_none());
    }
}
