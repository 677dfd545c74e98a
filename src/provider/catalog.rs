// src/provider/catalog.rs

//! Read-only library catalogs
//!
//! A catalog answers "which versions exist" and "which files does this
//! version contain". Catalog responses are cached through the
//! [`CacheService`](crate::cache::CacheService), so repeated lookups within
//! the freshness window stay offline.

use async_trait::async_trait;
use semver::Version;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::paths;

/// A resolved library version and its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub version: String,
    pub provider_id: String,
    /// Files relative to the library root, `/`-separated and sorted
    pub files: Vec<String>,
}

impl Library {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        provider_id: impl Into<String>,
        files: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            provider_id: provider_id.into(),
            files: sanitize_files(files),
        }
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.binary_search_by(|f| f.as_str().cmp(file)).is_ok()
    }
}

/// Version and file lookup for one provider
#[async_trait]
pub trait LibraryCatalog: Send + Sync {
    /// Resolve one version of a library
    ///
    /// Returns `Error::NotFoundError` when the name or version is unknown.
    async fn get_library(&self, name: &str, version: &str, cancel: &CancellationToken) -> Result<Library>;

    /// All published versions, in catalog order
    async fn get_versions(&self, name: &str, cancel: &CancellationToken) -> Result<Vec<String>>;

    /// Latest version, optionally including pre-releases
    async fn get_latest_version(
        &self,
        name: &str,
        include_pre_release: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let versions = self.get_versions(name, cancel).await?;
        Ok(select_latest(&versions, include_pre_release))
    }
}

/// Highest version by semver precedence
///
/// Versions that are not valid semver (`1.10`, `r123`) are ignored unless
/// nothing parses, in which case the last listed version wins.
pub fn select_latest(versions: &[String], include_pre_release: bool) -> Option<String> {
    versions
        .iter()
        .filter_map(|raw| Version::parse(raw.trim_start_matches('v')).ok().map(|v| (v, raw)))
        .filter(|(v, _)| include_pre_release || v.pre.is_empty())
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw.clone())
        .or_else(|| {
            let any_semver = versions
                .iter()
                .any(|raw| Version::parse(raw.trim_start_matches('v')).is_ok());
            if any_semver { None } else { versions.last().cloned() }
        })
}

/// Normalize remote file listings: strip leading `/`, drop unsafe entries
fn sanitize_files(files: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut clean: Vec<String> = files
        .into_iter()
        .filter_map(|file| {
            let trimmed = file.trim_start_matches('/');
            if trimmed.is_empty() || paths::has_invalid_path_chars(trimmed) {
                return None;
            }
            paths::normalize_relative(trimmed).filter(|f| !f.is_empty())
        })
        .collect();
    clean.sort();
    clean.dedup();
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_latest_stable() {
        let list = versions(&["3.1.1", "3.7.1", "4.0.0-beta.2", "3.10.0"]);
        assert_eq!(select_latest(&list, false).as_deref(), Some("3.10.0"));
        assert_eq!(select_latest(&list, true).as_deref(), Some("4.0.0-beta.2"));
    }

    #[test]
    fn test_select_latest_only_prereleases() {
        let list = versions(&["1.0.0-rc.1"]);
        assert_eq!(select_latest(&list, false), None);
        assert_eq!(select_latest(&list, true).as_deref(), Some("1.0.0-rc.1"));
    }

    #[test]
    fn test_select_latest_non_semver_fallback() {
        let list = versions(&["1.9", "1.10"]);
        assert_eq!(select_latest(&list, false).as_deref(), Some("1.10"));
        assert_eq!(select_latest(&[], false), None);
    }

    #[test]
    fn test_library_files_sanitized() {
        let library = Library::new(
            "jquery",
            "3.1.1",
            "cdnjs",
            versions(&["/jquery.js", "jquery.min.js", "../../etc/passwd", "", "jquery.js"]),
        );
        assert_eq!(library.files, vec!["jquery.js", "jquery.min.js"]);
        assert!(library.contains("jquery.min.js"));
        assert!(!library.contains("passwd"));
    }
}
