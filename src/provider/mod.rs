// src/provider/mod.rs

//! Library providers
//!
//! A provider resolves declared libraries against one source (a CDN, an npm
//! mirror, the local file system) and reconciles the project directory with
//! the result. The engine only talks to the [`Provider`] trait; providers are
//! registered in a [`ProviderRegistry`] under their string id, so adding a
//! source means registering a new implementation.
//!
//! Providers never fail with `Err` for expected problems. Unknown libraries,
//! bad destinations and download failures come back as
//! [`OperationResult::Failed`] with coded diagnostics.

mod base;
mod catalog;
mod cdnjs;
mod filesystem;
mod jsdelivr;
mod unpkg;

pub use base::{check_destination, CdnCatalog, CdnProvider};
pub use catalog::{select_latest, Library, LibraryCatalog};
pub use cdnjs::{CdnjsCatalog, CDNJS_PROVIDER_ID};
pub use filesystem::{FileSystemCatalog, FileSystemProvider, FILESYSTEM_PROVIDER_ID};
pub use jsdelivr::{JsDelivrCatalog, JSDELIVR_PROVIDER_ID};
pub use unpkg::{UnpkgCatalog, UNPKG_PROVIDER_ID};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cache::CacheService;
use crate::host::HostInteraction;
use crate::library::{LibraryInstallationGoalState, LibraryInstallationState};
use crate::naming::LibraryNamingScheme;
use crate::operation::OperationResult;

/// A pluggable source of libraries
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable id used in manifests (`cdnjs`, `filesystem`)
    fn id(&self) -> &str;

    /// Whether library ids carry a version
    fn supports_library_versions(&self) -> bool;

    fn naming_scheme(&self) -> &dyn LibraryNamingScheme;

    /// Compute the destination-to-source map without touching the project
    async fn get_installation_goal_state(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState>;

    /// Bring the destination in line with the goal state
    ///
    /// Reports `UpToDate` when nothing had to be copied. Safe to call
    /// repeatedly; every file write is atomic.
    async fn install(
        &self,
        state: &LibraryInstallationState,
        cancel: &CancellationToken,
    ) -> OperationResult<LibraryInstallationGoalState>;

    fn get_catalog(&self) -> &dyn LibraryCatalog;

    /// Destination offered when the user gave none
    fn get_suggested_destination(&self, library: &Library) -> String {
        format!("lib/{}", library.name)
    }
}

/// Providers keyed by id
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers.keys()).finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in providers: cdnjs, unpkg, jsdelivr and filesystem
    pub fn with_defaults(host: Arc<dyn HostInteraction>, cache: Arc<CacheService>) -> Self {
        let settings = host.settings();
        let url = |id: &str, key: &str| settings.get(&format!("providers.{id}.{key}"));

        let mut cdnjs = CdnjsCatalog::new(cache.clone());
        if let Some(api) = url(CDNJS_PROVIDER_ID, "url") {
            cdnjs = cdnjs.with_api_url(api);
        }
        if let Some(cdn) = url(CDNJS_PROVIDER_ID, "cdnUrl") {
            cdnjs = cdnjs.with_cdn_url(cdn);
        }

        let mut unpkg = UnpkgCatalog::new(cache.clone());
        if let Some(registry) = url(UNPKG_PROVIDER_ID, "url") {
            unpkg = unpkg.with_registry_url(registry);
        }
        if let Some(cdn) = url(UNPKG_PROVIDER_ID, "cdnUrl") {
            unpkg = unpkg.with_cdn_url(cdn);
        }

        let mut jsdelivr = JsDelivrCatalog::new(cache.clone());
        if let Some(data) = url(JSDELIVR_PROVIDER_ID, "url") {
            jsdelivr = jsdelivr.with_data_url(data);
        }
        if let Some(cdn) = url(JSDELIVR_PROVIDER_ID, "cdnUrl") {
            jsdelivr = jsdelivr.with_cdn_url(cdn);
        }

        let mut registry = Self::new();
        registry.register(Arc::new(CdnProvider::new(CDNJS_PROVIDER_ID, cdnjs, host.clone(), cache.clone())));
        registry.register(Arc::new(CdnProvider::new(UNPKG_PROVIDER_ID, unpkg, host.clone(), cache.clone())));
        registry.register(Arc::new(CdnProvider::new(JSDELIVR_PROVIDER_ID, jsdelivr, host.clone(), cache.clone())));
        registry.register(Arc::new(FileSystemProvider::new(host, cache)));
        registry
    }

    /// Register a provider, replacing any provider with the same id
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.id().to_string(), provider);
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(provider_id).cloned()
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.providers.contains_key(provider_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.values()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
