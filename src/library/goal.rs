// src/library/goal.rs

//! Computed goal state of a library
//!
//! Goal states are recomputed for every operation and never persisted: they
//! depend on live provider catalogs and on what is in the cache right now.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::state::LibraryInstallationState;
use crate::paths;

/// Destination-to-source file mapping for one declared library
///
/// Keys are destination files relative to `working_directory` with `/`
/// separators (`lib/jquery.js`). Values are absolute local paths (usually in
/// the cache) or remote URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInstallationGoalState {
    pub installation_state: LibraryInstallationState,
    pub working_directory: PathBuf,
    pub installed_files: BTreeMap<String, String>,
}

impl LibraryInstallationGoalState {
    pub fn new(
        installation_state: LibraryInstallationState,
        working_directory: impl Into<PathBuf>,
        installed_files: BTreeMap<String, String>,
    ) -> Self {
        Self {
            installation_state,
            working_directory: working_directory.into(),
            installed_files,
        }
    }

    /// Goal state with no files, used for validation-only results
    pub fn empty(installation_state: LibraryInstallationState) -> Self {
        Self::new(installation_state, PathBuf::new(), BTreeMap::new())
    }

    /// Absolute path of a destination key
    pub fn destination_path(&self, destination: &str) -> PathBuf {
        paths::resolve(&self.working_directory, destination)
    }

    /// Whether the destination already matches every mapped source
    ///
    /// True only if no source is a remote URI and, for every file, both ends
    /// exist with equal size and the destination is not older than the
    /// source. Content is not hashed: a same-size edit made within the
    /// timestamp resolution of the source is not detected.
    pub fn is_achieved(&self) -> bool {
        self.installed_files.iter().all(|(destination, source)| {
            if paths::is_remote_uri(source) {
                return false;
            }
            file_matches(&self.destination_path(destination), Path::new(source))
        })
    }
}

fn file_matches(destination: &Path, source: &Path) -> bool {
    let (Ok(dest_meta), Ok(source_meta)) = (fs::metadata(destination), fs::metadata(source)) else {
        return false;
    };
    if !dest_meta.is_file() || !source_meta.is_file() || dest_meta.len() != source_meta.len() {
        return false;
    }
    match (dest_meta.modified(), source_meta.modified()) {
        (Ok(dest_time), Ok(source_time)) => dest_time >= source_time,
        _ => false,
    }
}

/// A destination file claimed by more than one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConflict {
    pub file: String,
    pub libraries: Vec<LibraryInstallationState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};

    fn goal_for(root: &Path, source: &str) -> LibraryInstallationGoalState {
        let state = LibraryInstallationState::new("jquery", "3.1.1")
            .with_provider("cdnjs")
            .with_destination("lib");
        let mut files = BTreeMap::new();
        files.insert("lib/jquery.js".to_string(), source.to_string());
        LibraryInstallationGoalState::new(state, root, files)
    }

    #[test]
    fn test_remote_source_never_achieved() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("lib/jquery.js"), b"jquery").unwrap();

        let goal = goal_for(temp.path(), "https://code.jquery.com/jquery-3.1.1.js");
        assert!(!goal.is_achieved());
    }

    #[test]
    fn test_achieved_when_copy_is_current() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("cache/jquery.js");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"jquery").unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("lib/jquery.js"), b"jquery").unwrap();

        let goal = goal_for(temp.path(), source.to_str().unwrap());
        assert!(goal.is_achieved());
    }

    #[test]
    fn test_not_achieved_on_size_mismatch_or_missing() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("cache/jquery.js");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, b"jquery").unwrap();

        let goal = goal_for(temp.path(), source.to_str().unwrap());
        assert!(!goal.is_achieved());

        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("lib/jquery.js"), b"jq").unwrap();
        assert!(!goal.is_achieved());
    }

    #[test]
    fn test_not_achieved_when_destination_older() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("cache/jquery.js");
        let dest = temp.path().join("lib/jquery.js");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&source, b"jquery").unwrap();
        fs::write(&dest, b"jquery").unwrap();

        set_file_mtime(&dest, FileTime::from_unix_time(1_000_000, 0)).unwrap();
        set_file_mtime(&source, FileTime::from_unix_time(2_000_000, 0)).unwrap();

        let goal = goal_for(temp.path(), source.to_str().unwrap());
        assert!(!goal.is_achieved());
    }
}
