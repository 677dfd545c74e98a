// src/diagnostics.rs

//! Coded, user-facing diagnostics
//!
//! Every failure reported to a user carries a stable short code (`LIB002`)
//! and a message embedding the library id, provider id or path involved.
//! Codes never change meaning between releases; hosts and scripts match on
//! them.

use std::fmt;
use strum_macros::{EnumString, IntoStaticStr};

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum ErrorCode {
    #[strum(serialize = "LIB000")]
    UnknownException,
    #[strum(serialize = "LIB001")]
    ProviderUnknown,
    #[strum(serialize = "LIB002")]
    UnableToResolveSource,
    #[strum(serialize = "LIB003")]
    CouldNotWriteFile,
    #[strum(serialize = "LIB004")]
    ManifestMalformed,
    #[strum(serialize = "LIB005")]
    PathIsUndefined,
    #[strum(serialize = "LIB006")]
    LibraryIdIsUndefined,
    #[strum(serialize = "LIB007")]
    ProviderIsUndefined,
    #[strum(serialize = "LIB008")]
    PathOutsideWorkingDirectory,
    #[strum(serialize = "LIB009")]
    VersionIsNotSupported,
    #[strum(serialize = "LIB010")]
    FailedToDownloadResource,
    #[strum(serialize = "LIB011")]
    CouldNotDeleteLibrary,
    #[strum(serialize = "LIB012")]
    LibraryAlreadyInstalled,
    #[strum(serialize = "LIB013")]
    UpdateVersionConflict,
    #[strum(serialize = "LIB014")]
    UpdateFilesConflict,
    #[strum(serialize = "LIB015")]
    InvalidLibraryId,
    #[strum(serialize = "LIB016")]
    ConflictingFilesInManifest,
    #[strum(serialize = "LIB017")]
    FileNameMustNotBeEmpty,
    #[strum(serialize = "LIB018")]
    DuplicateLibrariesInManifest,
    #[strum(serialize = "LIB019")]
    DestinationPathHasInvalidCharacters,
    #[strum(serialize = "LIB020")]
    InvalidFilesInLibrary,
}

impl ErrorCode {
    /// The `LIBnnn` form of the code
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded error reported by an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.code, self.message)
    }
}

impl Diagnostic {
    /// Create a diagnostic with an explicit code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unknown_exception() -> Self {
        Self::new(
            ErrorCode::UnknownException,
            "An unknown exception occurred. Run with --verbose for details",
        )
    }

    pub fn provider_unknown(provider_id: &str) -> Self {
        Self::new(
            ErrorCode::ProviderUnknown,
            format!("The \"{provider_id}\" provider could not be found"),
        )
    }

    pub fn unable_to_resolve_source(library_id: &str, provider_id: &str) -> Self {
        Self::new(
            ErrorCode::UnableToResolveSource,
            format!(
                "The \"{library_id}\" library could not be resolved by the \"{provider_id}\" provider"
            ),
        )
    }

    pub fn could_not_write_file(file: &str) -> Self {
        Self::new(
            ErrorCode::CouldNotWriteFile,
            format!("The file \"{file}\" could not be written to disk"),
        )
    }

    pub fn manifest_malformed(detail: &str) -> Self {
        Self::new(
            ErrorCode::ManifestMalformed,
            format!("The manifest file contains syntax errors: {detail}"),
        )
    }

    pub fn path_is_undefined() -> Self {
        Self::new(
            ErrorCode::PathIsUndefined,
            "The \"destination\" property is undefined and no \"defaultDestination\" is set",
        )
    }

    pub fn library_id_is_undefined() -> Self {
        Self::new(
            ErrorCode::LibraryIdIsUndefined,
            "The \"library\" property cannot be empty",
        )
    }

    pub fn provider_is_undefined() -> Self {
        Self::new(
            ErrorCode::ProviderIsUndefined,
            "The \"provider\" property is undefined and no \"defaultProvider\" is set",
        )
    }

    pub fn path_outside_working_directory(path: &str) -> Self {
        Self::new(
            ErrorCode::PathOutsideWorkingDirectory,
            format!("The destination \"{path}\" must be inside the working directory"),
        )
    }

    pub fn version_is_not_supported(version: &str) -> Self {
        Self::new(
            ErrorCode::VersionIsNotSupported,
            format!("The manifest version \"{version}\" is not supported"),
        )
    }

    pub fn failed_to_download_resource(library_id: &str, detail: &str) -> Self {
        Self::new(
            ErrorCode::FailedToDownloadResource,
            format!("Failed to download files for \"{library_id}\": {detail}"),
        )
    }

    pub fn could_not_delete_library(library_id: &str) -> Self {
        Self::new(
            ErrorCode::CouldNotDeleteLibrary,
            format!("The library \"{library_id}\" could not be deleted"),
        )
    }

    /// Several declarations match an uninstall request; nothing is deleted
    pub fn ambiguous_library(library_id: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::CouldNotDeleteLibrary,
            format!(
                "The library \"{library_id}\" could not be deleted: it matches {}. Specify the version or provider",
                candidates.join(", ")
            ),
        )
    }

    pub fn library_already_installed(library_id: &str, provider_id: &str) -> Self {
        Self::new(
            ErrorCode::LibraryAlreadyInstalled,
            format!(
                "The library \"{library_id}\" is already installed from \"{provider_id}\". Use the update command to change its version"
            ),
        )
    }

    pub fn update_version_conflict(library_name: &str, candidates: &[String]) -> Self {
        Self::new(
            ErrorCode::UpdateVersionConflict,
            format!(
                "More than one library named \"{library_name}\" is declared: {}. Specify the provider to disambiguate",
                candidates.join(", ")
            ),
        )
    }

    pub fn update_files_conflict(library_id: &str, missing: &[String]) -> Self {
        Self::new(
            ErrorCode::UpdateFilesConflict,
            format!(
                "The library \"{library_id}\" does not contain the declared files: {}",
                missing.join(", ")
            ),
        )
    }

    pub fn invalid_library_id(library_id: &str, provider_id: &str) -> Self {
        Self::new(
            ErrorCode::InvalidLibraryId,
            format!("\"{library_id}\" is not a valid library id for the \"{provider_id}\" provider"),
        )
    }

    pub fn conflicting_files_in_manifest(file: &str, library_ids: &[String]) -> Self {
        Self::new(
            ErrorCode::ConflictingFilesInManifest,
            format!(
                "Cannot restore. Multiple libraries install \"{file}\": {}",
                library_ids.join(", ")
            ),
        )
    }

    pub fn file_name_must_not_be_empty(library_id: &str) -> Self {
        Self::new(
            ErrorCode::FileNameMustNotBeEmpty,
            format!("The library \"{library_id}\" lists a file with an empty name"),
        )
    }

    pub fn duplicate_libraries_in_manifest(library_id: &str) -> Self {
        Self::new(
            ErrorCode::DuplicateLibrariesInManifest,
            format!("The library \"{library_id}\" is declared more than once"),
        )
    }

    pub fn destination_path_has_invalid_characters(path: &str) -> Self {
        Self::new(
            ErrorCode::DestinationPathHasInvalidCharacters,
            format!("The destination \"{path}\" contains invalid characters"),
        )
    }

    pub fn invalid_files_in_library(library_id: &str, missing: &[String], available: usize) -> Self {
        Self::new(
            ErrorCode::InvalidFilesInLibrary,
            format!(
                "The library \"{library_id}\" does not contain: {} ({available} files available)",
                missing.join(", ")
            ),
        )
    }
}
