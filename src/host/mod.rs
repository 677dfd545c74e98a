// src/host/mod.rs

//! Host collaborators consumed by the engine
//!
//! The engine never touches the project directory directly. Reads, writes,
//! copies and deletes go through a [`HostInteraction`], which resolves paths
//! relative to the working directory and guarantees that every observable
//! write is temp-file-then-rename. Progress and errors are reported through
//! a [`Logger`].

mod fs;
mod logger;

pub use fs::{copy_atomic, write_atomic, write_atomic_blocking, FileSystemHost};
pub use logger::{ConsoleLogger, LogLevel, Logger, MemoryLogger};

use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::settings::Settings;

/// File system and environment access supplied by the host
#[async_trait]
pub trait HostInteraction: Send + Sync {
    /// Project root; manifest destinations are relative to it
    fn working_directory(&self) -> &Path;

    /// Root of the shared on-disk cache
    fn cache_directory(&self) -> &Path;

    fn logger(&self) -> &dyn Logger;

    fn settings(&self) -> &Settings;

    /// Write `content` to a path relative to the working directory
    async fn write_file(&self, path: &str, content: Vec<u8>, cancel: &CancellationToken) -> Result<()>;

    /// Copy an absolute source file to a path relative to the working directory
    async fn copy_file(&self, source: &Path, destination: &str, cancel: &CancellationToken) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete files relative to the working directory
    ///
    /// Directories left empty inside the working directory are removed.
    /// Returns false if any file could not be deleted.
    async fn delete_files(&self, paths: &[String]) -> bool;
}
