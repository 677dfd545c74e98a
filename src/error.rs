// src/error.rs

//! Internal error type
//!
//! These errors describe faults inside the engine (I/O, network, parsing).
//! They never reach the user directly from provider operations: providers
//! convert them into coded [`Diagnostic`](crate::Diagnostic) values at their
//! boundary.

use thiserror::Error;

/// Errors raised by cache, host and provider internals
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    IoError(String),

    /// Network fetch failed
    #[error("Download failed: {0}")]
    DownloadError(String),

    /// Remote or local content could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A path, library or cache entry does not exist
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// A component could not be initialized
    #[error("Initialization failed: {0}")]
    InitError(String),

    /// A path is malformed or escapes its root
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The operation observed a cancelled token
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
