// src/lib.rs

//! libdrop - declarative client-side library acquisition
//!
//! A project declares the third-party files it needs in `libdrop.json`
//! (library id, provider, destination, file subset). libdrop resolves each
//! library through a pluggable provider, computes which source file maps to
//! which destination, rejects conflicting declarations, and reconciles the
//! project directory and a shared local cache with that declaration.
//!
//! # Architecture
//!
//! - Manifest: ordered declared state, loaded and saved as JSON
//! - Providers: cdnjs, unpkg, jsDelivr and the local file system behind one trait
//! - Goal states: destination-to-source maps recomputed on every operation
//! - Validator: property, duplicate, goal-state and file-conflict stages
//! - Cache: TTL-gated catalogs and immutable library files, atomic writes only

pub mod cache;
pub mod dependencies;
pub mod diagnostics;
mod error;
pub mod host;
pub mod library;
pub mod manifest;
pub mod naming;
pub mod operation;
pub mod paths;
pub mod provider;
pub mod settings;
pub mod validator;

pub use cache::{CacheService, CacheServiceMetadata, HttpDownloader, ResourceDownloader};
pub use dependencies::Dependencies;
pub use diagnostics::{Diagnostic, ErrorCode};
pub use error::{Error, Result};
pub use host::{ConsoleLogger, FileSystemHost, HostInteraction, LogLevel, Logger};
pub use library::{FileConflict, LibraryInstallationGoalState, LibraryInstallationState};
pub use manifest::{Manifest, MANIFEST_FILE_NAME, SUPPORTED_VERSIONS};
pub use naming::{LibraryNamingScheme, NamingRegistry, SimpleLibraryNamingScheme, VersionedLibraryNamingScheme};
pub use operation::{LibraryOperationResult, OperationResult};
pub use provider::{Library, LibraryCatalog, Provider, ProviderRegistry};
pub use settings::Settings;
