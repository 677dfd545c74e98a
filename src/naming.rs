// src/naming.rs

//! Library naming schemes
//!
//! A library id is the single string a user writes in the manifest
//! (`jquery@3.1.1`, `@angular/core@17.0.0`, `../shared/util.js`). Each
//! provider encodes name and version into that string by one of two
//! conventions:
//!
//! - **Simple**: the id is the name; there is no version. Used by
//!   versionless sources such as the local filesystem.
//! - **Versioned**: `name@version`, split on the last `@`. Ids beginning
//!   with `@` follow the npm scoped-package convention, so the scope segment
//!   is skipped before searching for the separator.
//!
//! [`NamingRegistry`] maps provider ids to schemes. It is built once from the
//! active providers and passed to every component that needs to split ids.

use std::collections::HashMap;
use std::sync::Arc;

use crate::provider::ProviderRegistry;

/// Conversion between library ids and (name, version) pairs
pub trait LibraryNamingScheme: Send + Sync {
    /// Whether `library_id` is well-formed under this scheme
    fn is_valid_library_id(&self, library_id: &str) -> bool;

    /// Split an id into name and version
    fn get_name_and_version(&self, library_id: &str) -> (String, String);

    /// Join a name and version into an id
    fn get_id(&self, name: &str, version: &str) -> String;
}

/// Versionless scheme: the id is the name
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleLibraryNamingScheme;

impl LibraryNamingScheme for SimpleLibraryNamingScheme {
    fn is_valid_library_id(&self, library_id: &str) -> bool {
        !library_id.trim().is_empty()
    }

    fn get_name_and_version(&self, library_id: &str) -> (String, String) {
        (library_id.to_string(), String::new())
    }

    fn get_id(&self, name: &str, _version: &str) -> String {
        name.to_string()
    }
}

/// `name@version` scheme with npm scope support
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionedLibraryNamingScheme;

impl LibraryNamingScheme for VersionedLibraryNamingScheme {
    fn is_valid_library_id(&self, library_id: &str) -> bool {
        let (name, version) = self.get_name_and_version(library_id);
        !name.is_empty() && !version.is_empty()
    }

    fn get_name_and_version(&self, library_id: &str) -> (String, String) {
        if library_id.is_empty() {
            return (String::new(), String::new());
        }

        // `@scope/pkg@1.0.0`: search after the scope segment
        let search_start = if library_id.starts_with('@') {
            match library_id.find('/') {
                Some(slash) => slash + 1,
                None => 1,
            }
        } else {
            0
        };

        let remainder = &library_id[search_start..];
        match remainder.rfind('@') {
            Some(at) if at > 0 && at < remainder.len() - 1 => {
                let split = search_start + at;
                (
                    library_id[..split].to_string(),
                    library_id[split + 1..].to_string(),
                )
            }
            _ => (library_id.to_string(), String::new()),
        }
    }

    fn get_id(&self, name: &str, version: &str) -> String {
        if version.is_empty() {
            name.to_string()
        } else {
            format!("{name}@{version}")
        }
    }
}

/// Provider id to naming scheme lookup
///
/// Immutable once built. When the active provider set changes, build a new
/// registry from the new [`ProviderRegistry`].
#[derive(Clone)]
pub struct NamingRegistry {
    schemes: HashMap<String, Arc<dyn LibraryNamingScheme>>,
    fallback: Arc<dyn LibraryNamingScheme>,
}

impl Default for NamingRegistry {
    fn default() -> Self {
        Self {
            schemes: HashMap::new(),
            fallback: Arc::new(SimpleLibraryNamingScheme),
        }
    }
}

impl std::fmt::Debug for NamingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&String> = self.schemes.keys().collect();
        ids.sort();
        f.debug_struct("NamingRegistry").field("providers", &ids).finish()
    }
}

impl NamingRegistry {
    /// Build the registry from the registered providers
    pub fn from_providers(providers: &ProviderRegistry) -> Self {
        let mut registry = Self::default();
        for provider in providers.iter() {
            registry.register(provider.id(), provider.supports_library_versions());
        }
        registry
    }

    /// Register the scheme for a provider id
    pub fn register(&mut self, provider_id: &str, supports_versions: bool) {
        let scheme: Arc<dyn LibraryNamingScheme> = if supports_versions {
            Arc::new(VersionedLibraryNamingScheme)
        } else {
            Arc::new(SimpleLibraryNamingScheme)
        };
        self.schemes.insert(provider_id.to_string(), scheme);
    }

    /// Scheme for `provider_id`, or the simple scheme when unknown
    pub fn scheme_for(&self, provider_id: Option<&str>) -> &dyn LibraryNamingScheme {
        provider_id
            .and_then(|id| self.schemes.get(id))
            .unwrap_or(&self.fallback)
            .as_ref()
    }

    pub fn get_name_and_version(&self, library_id: &str, provider_id: Option<&str>) -> (String, String) {
        self.scheme_for(provider_id).get_name_and_version(library_id)
    }

    pub fn get_id(&self, name: &str, version: &str, provider_id: Option<&str>) -> String {
        self.scheme_for(provider_id).get_id(name, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_scheme() {
        let scheme = SimpleLibraryNamingScheme;
        assert_eq!(
            scheme.get_name_and_version("lib/jquery@3.js"),
            ("lib/jquery@3.js".to_string(), String::new())
        );
        assert_eq!(scheme.get_id("file.js", "1.0"), "file.js");
        assert!(scheme.is_valid_library_id("file.js"));
        assert!(!scheme.is_valid_library_id("  "));
    }

    #[test]
    fn test_versioned_split() {
        let scheme = VersionedLibraryNamingScheme;
        assert_eq!(
            scheme.get_name_and_version("jquery@3.1.1"),
            ("jquery".to_string(), "3.1.1".to_string())
        );
        assert_eq!(
            scheme.get_name_and_version("@scope/pkg@1.0.0"),
            ("@scope/pkg".to_string(), "1.0.0".to_string())
        );
        assert_eq!(
            scheme.get_name_and_version("@scope/pkg"),
            ("@scope/pkg".to_string(), String::new())
        );
    }

    #[test]
    fn test_versioned_edge_cases() {
        let scheme = VersionedLibraryNamingScheme;
        assert_eq!(scheme.get_name_and_version("jquery@"), ("jquery@".to_string(), String::new()));
        assert_eq!(scheme.get_name_and_version("@jquery"), ("@jquery".to_string(), String::new()));
        assert_eq!(scheme.get_name_and_version("@scope/@1.0"), ("@scope/@1.0".to_string(), String::new()));
        assert_eq!(scheme.get_name_and_version(""), (String::new(), String::new()));
        assert!(!scheme.is_valid_library_id("jquery"));
        assert!(scheme.is_valid_library_id("jquery@1.0"));
    }

    #[test]
    fn test_versioned_round_trip() {
        let scheme = VersionedLibraryNamingScheme;
        for (name, version) in [
            ("jquery", "3.1.1"),
            ("@angular/core", "17.0.0-rc.1"),
            ("twitter-bootstrap", "5.3.2"),
            ("lodash.debounce", "4.0.8"),
        ] {
            let id = scheme.get_id(name, version);
            assert_eq!(scheme.get_name_and_version(&id), (name.to_string(), version.to_string()));
        }

        let id = scheme.get_id("jquery", "");
        assert_eq!(id, "jquery");
        assert_eq!(scheme.get_name_and_version(&id), ("jquery".to_string(), String::new()));
    }

    #[test]
    fn test_registry_fallback() {
        let mut registry = NamingRegistry::default();
        registry.register("cdnjs", true);
        registry.register("filesystem", false);

        assert_eq!(
            registry.get_name_and_version("jquery@3.1.1", Some("cdnjs")),
            ("jquery".to_string(), "3.1.1".to_string())
        );
        assert_eq!(
            registry.get_name_and_version("jquery@3.1.1", Some("filesystem")).1,
            ""
        );
        assert_eq!(
            registry.get_name_and_version("jquery@3.1.1", Some("unknown")).0,
            "jquery@3.1.1"
        );
        assert_eq!(registry.get_name_and_version("jquery@3.1.1", None).1, "");
    }
}
