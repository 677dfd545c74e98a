// src/library/state.rs

//! Declared installation state of a single library

use std::fmt;

/// Identity used for de-duplication: `(name, version, provider)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryIdentity {
    pub name: String,
    pub version: String,
    pub provider_id: String,
}

impl fmt::Display for LibraryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{} ({})", self.name, self.provider_id)
        } else {
            write!(f, "{}@{} ({})", self.name, self.version, self.provider_id)
        }
    }
}

/// A library as declared in the manifest
///
/// `provider_id` and `destination_path` are `None` when neither the entry nor
/// the manifest supplies them. When a manifest default was substituted, the
/// matching `is_using_default_*` flag is set so the field is omitted again on
/// save. `files == None` selects the provider's default file set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryInstallationState {
    pub name: String,
    pub version: String,
    pub provider_id: Option<String>,
    pub destination_path: Option<String>,
    pub files: Option<Vec<String>>,
    pub is_using_default_provider: bool,
    pub is_using_default_destination: bool,
}

impl LibraryInstallationState {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination_path = Some(destination.into());
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Provider id, or an empty string when undefined
    pub fn provider(&self) -> &str {
        self.provider_id.as_deref().unwrap_or_default()
    }

    /// Destination path, or an empty string when undefined
    pub fn destination(&self) -> &str {
        self.destination_path.as_deref().unwrap_or_default()
    }

    pub fn identity(&self) -> LibraryIdentity {
        LibraryIdentity {
            name: self.name.clone(),
            version: self.version.clone(),
            provider_id: self.provider().to_string(),
        }
    }

    /// Fill in missing provider and destination from manifest defaults
    pub fn apply_defaults(&mut self, default_provider: Option<&str>, default_destination: Option<&str>) {
        if self.provider_id.as_deref().is_none_or(str::is_empty)
            && let Some(provider) = default_provider.filter(|p| !p.is_empty())
        {
            self.provider_id = Some(provider.to_string());
            self.is_using_default_provider = true;
        }

        if self.destination_path.as_deref().is_none_or(str::is_empty)
            && let Some(destination) = default_destination.filter(|d| !d.is_empty())
        {
            self.destination_path = Some(destination.to_string());
            self.is_using_default_destination = true;
        }
    }
}
