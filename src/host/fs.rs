// src/host/fs.rs

//! Local file system host
//!
//! All writes land in a temporary file next to the target and are renamed
//! into place, so a concurrent reader never observes a truncated file and a
//! failed or cancelled write leaves the previous state untouched.

use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{HostInteraction, Logger};
use crate::error::{Error, Result};
use crate::paths;
use crate::settings::Settings;

const FILE_MODE: u32 = 0o644;

/// Write `content` to `path` atomically, creating parent directories
pub async fn write_atomic(path: &Path, content: Vec<u8>) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        persist_with(&path, FILE_MODE, |temp| {
            temp.write_all(&content)
                .map_err(|e| Error::IoError(format!("Failed to write data: {e}")))
        })
    })
    .await
    .map_err(|e| Error::IoError(format!("Write task failed: {e}")))?
}

/// Copy `source` to `destination` atomically, creating parent directories
pub async fn copy_atomic(source: &Path, destination: &Path) -> Result<()> {
    let source = source.to_path_buf();
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut input = File::open(&source).map_err(|e| {
            Error::IoError(format!("Failed to open {}: {e}", source.display()))
        })?;
        persist_with(&destination, FILE_MODE, |temp| {
            io::copy(&mut input, temp)
                .map(|_| ())
                .map_err(|e| Error::IoError(format!("Failed to copy {}: {e}", source.display())))
        })
    })
    .await
    .map_err(|e| Error::IoError(format!("Copy task failed: {e}")))?
}

/// Synchronous [`write_atomic`] with explicit Unix permissions
///
/// The mode is applied to the temporary file before it is renamed, so the
/// target never exists with looser permissions.
pub fn write_atomic_blocking(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    persist_with(path, mode, |temp| {
        temp.write_all(content)
            .map_err(|e| Error::IoError(format!("Failed to write data: {e}")))
    })
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn persist_with(
    path: &Path,
    mode: u32,
    fill: impl FnOnce(&mut NamedTempFile) -> Result<()>,
) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| Error::InvalidPath(format!("{} has no parent directory", path.display())))?;

    fs::create_dir_all(parent).map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
    })?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| {
        Error::IoError(format!("Failed to create temp file in {}: {e}", parent.display()))
    })?;

    fill(&mut temp)?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::IoError(format!("Failed to flush {}: {e}", path.display())))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| Error::IoError(format!("Failed to set permissions: {e}")))?;
    }

    temp.persist(path).map_err(|e| {
        Error::IoError(format!("Failed to move temp file to {}: {}", path.display(), e.error))
    })?;

    debug!("Wrote {}", path.display());
    Ok(())
}

/// Host backed by the local file system
pub struct FileSystemHost {
    working_directory: PathBuf,
    cache_directory: PathBuf,
    logger: Arc<dyn Logger>,
    settings: Settings,
}

impl FileSystemHost {
    pub fn new(
        working_directory: impl Into<PathBuf>,
        cache_directory: impl Into<PathBuf>,
        logger: Arc<dyn Logger>,
        settings: Settings,
    ) -> Self {
        Self {
            working_directory: working_directory.into(),
            cache_directory: cache_directory.into(),
            logger,
            settings,
        }
    }

    /// Resolve a relative path, rejecting anything outside the working directory
    fn resolve_inside(&self, path: &str) -> Result<PathBuf> {
        if !paths::is_under_working_directory(path, &self.working_directory) {
            return Err(Error::InvalidPath(format!(
                "{} is outside {}",
                path,
                self.working_directory.display()
            )));
        }
        Ok(paths::normalize_path(&paths::resolve(&self.working_directory, path)))
    }

    /// Remove empty directories from `dir` upward, stopping at the working directory
    fn prune_empty_dirs(&self, mut dir: Option<&Path>) {
        let root = paths::normalize_path(&self.working_directory);
        while let Some(current) = dir {
            if current == root || !current.starts_with(&root) {
                break;
            }
            let is_empty = fs::read_dir(current)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty || fs::remove_dir(current).is_err() {
                break;
            }
            debug!("Removed empty directory {}", current.display());
            dir = current.parent();
        }
    }
}

#[async_trait]
impl HostInteraction for FileSystemHost {
    fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn write_file(&self, path: &str, content: Vec<u8>, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let target = self.resolve_inside(path)?;
        write_atomic(&target, content).await
    }

    async fn copy_file(&self, source: &Path, destination: &str, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let target = self.resolve_inside(destination)?;
        copy_atomic(source, &target).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let target = self.resolve_inside(path)?;
        tokio::fs::read(&target).await.map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::NotFoundError(target.display().to_string())
            } else {
                Error::IoError(format!("Failed to read {}: {e}", target.display()))
            }
        })
    }

    async fn delete_files(&self, paths: &[String]) -> bool {
        let mut all_deleted = true;
        for path in paths {
            let target = match self.resolve_inside(path) {
                Ok(target) => target,
                Err(e) => {
                    warn!("Refusing to delete {}: {}", path, e);
                    all_deleted = false;
                    continue;
                }
            };

            match tokio::fs::remove_file(&target).await {
                Ok(()) => debug!("Deleted {}", target.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to delete {}: {}", target.display(), e);
                    all_deleted = false;
                    continue;
                }
            }
            self.prune_empty_dirs(target.parent());
        }
        all_deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryLogger;

    fn host(root: &Path) -> FileSystemHost {
        FileSystemHost::new(
            root,
            root.join(".cache"),
            Arc::new(MemoryLogger::new()),
            Settings::in_memory(),
        )
    }

    #[tokio::test]
    async fn test_write_and_read_relative() {
        let temp = tempfile::tempdir().unwrap();
        let host = host(temp.path());
        let cancel = CancellationToken::new();

        host.write_file("lib/a/b.js", b"content".to_vec(), &cancel).await.unwrap();
        assert_eq!(host.read_file("lib/a/b.js").await.unwrap(), b"content");
        assert!(temp.path().join("lib/a/b.js").is_file());
    }

    #[tokio::test]
    async fn test_write_outside_root_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let host = host(&temp.path().join("project"));
        let cancel = CancellationToken::new();

        let result = host.write_file("../escape.js", b"x".to_vec(), &cancel).await;
        assert!(matches!(result, Err(Error::InvalidPath(_))));
        assert!(!temp.path().join("escape.js").exists());
    }

    #[tokio::test]
    async fn test_cancelled_write_leaves_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let host = host(temp.path());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = host.write_file("lib/a.js", b"x".to_vec(), &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(!temp.path().join("lib").exists());
    }

    #[tokio::test]
    async fn test_delete_prunes_empty_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let host = host(temp.path());
        let cancel = CancellationToken::new();

        host.write_file("lib/jquery/jquery.js", b"a".to_vec(), &cancel).await.unwrap();
        host.write_file("lib/keep.js", b"b".to_vec(), &cancel).await.unwrap();

        assert!(host.delete_files(&["lib/jquery/jquery.js".to_string()]).await);
        assert!(!temp.path().join("lib/jquery").exists());
        assert!(temp.path().join("lib/keep.js").exists());

        // Missing files are not an error
        assert!(host.delete_files(&["lib/missing.js".to_string()]).await);
    }

    #[tokio::test]
    async fn test_copy_atomic_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let source = temp.path().join("source.js");
        let dest = temp.path().join("out/dest.js");
        fs::write(&source, b"new").unwrap();
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&dest, b"old content").unwrap();

        copy_atomic(&source, &dest).await.unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"new");
    }
}
