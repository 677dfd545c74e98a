// src/manifest/json.rs

//! On-disk manifest format
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "defaultProvider": "cdnjs",
//!   "defaultDestination": "wwwroot/lib",
//!   "libraries": [
//!     { "library": "jquery@3.1.1", "files": ["jquery.js"] },
//!     { "library": "../shared/util.js", "provider": "filesystem", "destination": "lib/util" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ManifestDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_destination: Option<String>,

    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(super) struct LibraryEntry {
    #[serde(default)]
    pub library: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

/// Treat empty strings in optional fields as absent
pub(super) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
