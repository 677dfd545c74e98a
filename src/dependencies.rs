// src/dependencies.rs

//! Collaborators shared by every operation
//!
//! [`Dependencies`] bundles the host, the provider registry and the naming
//! registry derived from it. It is built once per command and handed to the
//! manifest and validator by reference.

use std::sync::Arc;

use crate::cache::CacheService;
use crate::host::HostInteraction;
use crate::naming::NamingRegistry;
use crate::provider::{Provider, ProviderRegistry};

#[derive(Clone)]
pub struct Dependencies {
    host: Arc<dyn HostInteraction>,
    providers: ProviderRegistry,
    naming: NamingRegistry,
}

impl Dependencies {
    /// Bundle a host with an explicit provider set
    pub fn new(host: Arc<dyn HostInteraction>, providers: ProviderRegistry) -> Self {
        let naming = NamingRegistry::from_providers(&providers);
        Self {
            host,
            providers,
            naming,
        }
    }

    /// Bundle a host with the built-in providers
    pub fn with_default_providers(host: Arc<dyn HostInteraction>, cache: Arc<CacheService>) -> Self {
        let providers = ProviderRegistry::with_defaults(host.clone(), cache);
        Self::new(host, providers)
    }

    pub fn host(&self) -> &dyn HostInteraction {
        self.host.as_ref()
    }

    pub fn host_arc(&self) -> Arc<dyn HostInteraction> {
        self.host.clone()
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn naming(&self) -> &NamingRegistry {
        &self.naming
    }

    /// Look up a provider by id
    pub fn get_provider(&self, provider_id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(provider_id)
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("working_directory", &self.host.working_directory())
            .field("providers", &self.providers)
            .finish()
    }
}
