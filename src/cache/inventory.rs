// src/cache/inventory.rs

//! Listing and cleaning cache contents

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::CacheService;
use crate::error::{Error, Result};

/// A cached library version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLibrary {
    pub name: String,
    pub version: String,
    /// Files relative to the version directory, `/`-separated and sorted
    pub files: Vec<String>,
    pub last_modified: Option<DateTime<Local>>,
}

/// Everything cached for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProvider {
    pub provider_id: String,
    pub libraries: Vec<CachedLibrary>,
}

impl CacheService {
    /// List cached libraries, for all providers or for one
    ///
    /// A library directory may be one level (`jquery`) or two levels for
    /// scoped names (`@angular/core`); versions are the directories below it.
    pub fn list(&self, provider_id: Option<&str>) -> Result<Vec<CachedProvider>> {
        let mut providers = Vec::new();
        for provider_dir in sorted_subdirs(self.root())? {
            let id = dir_name(&provider_dir);
            if provider_id.is_some_and(|wanted| wanted != id) {
                continue;
            }

            let mut libraries = Vec::new();
            for library_dir in sorted_subdirs(&provider_dir)? {
                let name = dir_name(&library_dir);
                if name.starts_with('@') {
                    for scoped in sorted_subdirs(&library_dir)? {
                        let scoped_name = format!("{}/{}", name, dir_name(&scoped));
                        collect_versions(&scoped, &scoped_name, &mut libraries)?;
                    }
                } else {
                    collect_versions(&library_dir, &name, &mut libraries)?;
                }
            }

            providers.push(CachedProvider {
                provider_id: id,
                libraries,
            });
        }
        Ok(providers)
    }

    /// Remove the whole cache, or only one provider's entries
    ///
    /// Returns false when there was nothing to remove.
    pub fn clean(&self, provider_id: Option<&str>) -> Result<bool> {
        let target = match provider_id {
            Some(id) if !id.is_empty() => {
                if !is_single_segment(id) {
                    return Err(Error::InvalidPath(format!("Invalid provider id \"{id}\"")));
                }
                self.provider_dir(id)
            }
            _ => self.root().to_path_buf(),
        };

        if !target.exists() {
            debug!("Nothing to clean at {}", target.display());
            return Ok(false);
        }

        fs::remove_dir_all(&target)
            .map_err(|e| Error::IoError(format!("Failed to remove {}: {e}", target.display())))?;
        info!("Removed cache directory {}", target.display());
        Ok(true)
    }
}

fn collect_versions(library_dir: &Path, name: &str, out: &mut Vec<CachedLibrary>) -> Result<()> {
    for version_dir in sorted_subdirs(library_dir)? {
        let mut files: Vec<String> = WalkDir::new(&version_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&version_dir)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.sort();

        let last_modified = fs::metadata(&version_dir)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from);

        out.push(CachedLibrary {
            name: name.to_string(),
            version: dir_name(&version_dir),
            files,
            last_modified,
        });
    }
    Ok(())
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::IoError(format!("Failed to read {}: {e}", dir.display()))),
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// A provider id must name exactly one directory below the cache root
fn is_single_segment(id: &str) -> bool {
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !id.contains(['/', '\\'])
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::HttpDownloader;
    use std::sync::Arc;

    fn seed(root: &Path) {
        for file in [
            "cdnjs/jquery/3.1.1/jquery.js",
            "cdnjs/jquery/3.1.1/jquery.min.js",
            "unpkg/@angular/core/17.0.0/bundles/core.umd.js",
        ] {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "x").unwrap();
        }
        fs::write(root.join("cdnjs/jquery/metadata.json"), "{}").unwrap();
    }

    #[test]
    fn test_list_groups_by_provider_and_version() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let cache = CacheService::new(temp.path(), Arc::new(HttpDownloader::new().unwrap()));

        let providers = cache.list(None).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].provider_id, "cdnjs");
        assert_eq!(providers[0].libraries[0].name, "jquery");
        assert_eq!(providers[0].libraries[0].version, "3.1.1");
        assert_eq!(providers[0].libraries[0].files, vec!["jquery.js", "jquery.min.js"]);
        assert_eq!(providers[1].libraries[0].name, "@angular/core");
        assert_eq!(providers[1].libraries[0].files, vec!["bundles/core.umd.js"]);

        let only_unpkg = cache.list(Some("unpkg")).unwrap();
        assert_eq!(only_unpkg.len(), 1);
    }

    #[test]
    fn test_clean_single_provider() {
        let temp = tempfile::tempdir().unwrap();
        seed(temp.path());
        let cache = CacheService::new(temp.path(), Arc::new(HttpDownloader::new().unwrap()));

        assert!(cache.clean(Some("cdnjs")).unwrap());
        assert!(!temp.path().join("cdnjs").exists());
        assert!(temp.path().join("unpkg").exists());
        assert!(!cache.clean(Some("cdnjs")).unwrap());

        assert!(cache.clean(None).unwrap());
        assert!(!temp.path().exists());
    }

    #[test]
    fn test_clean_rejects_ids_outside_cache() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("cache");
        seed(&root);
        let sibling = temp.path().join("precious.txt");
        fs::write(&sibling, "keep").unwrap();
        let cache = CacheService::new(&root, Arc::new(HttpDownloader::new().unwrap()));

        for id in ["..", "/", "cdnjs/../..", "./cdnjs", "a/b", "a\\b"] {
            assert!(
                matches!(cache.clean(Some(id)), Err(Error::InvalidPath(_))),
                "{id} should be rejected"
            );
        }
        assert!(sibling.exists());
        assert!(root.join("cdnjs").exists());
    }
}
