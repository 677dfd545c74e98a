// src/paths.rs

//! Path helpers shared by validation, providers and the host
//!
//! Destination paths in a manifest are relative to the working directory and
//! use `/` separators. Keys in a goal state are produced by
//! [`join_destination`] so that two libraries writing the same file always
//! produce the same key; [`conflict_key`] additionally folds case on
//! platforms with case-insensitive filesystems.

use std::path::{Component, Path, PathBuf};
use url::Url;

/// Characters rejected in destination paths on every platform
const INVALID_PATH_CHARS: &[char] = &['<', '>', '"', '|', '?', '*', '\0'];

/// Whether `source` is an http(s) or ftp URL rather than a local path
pub fn is_remote_uri(source: &str) -> bool {
    match Url::parse(source) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "ftp"),
        Err(_) => false,
    }
}

/// Whether `path` contains characters that cannot appear in a file path
pub fn has_invalid_path_chars(path: &str) -> bool {
    path.chars()
        .any(|c| INVALID_PATH_CHARS.contains(&c) || c.is_control())
        || has_drive_colon_misuse(path)
}

/// A `:` is only legal as the drive separator of an absolute Windows path
fn has_drive_colon_misuse(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.char_indices().any(|(i, c)| {
        c == ':' && !(i == 1 && bytes[0].is_ascii_alphabetic())
    })
}

/// Normalize a relative path: `/` separators, no `.` segments, `..` resolved
///
/// Returns `None` when `..` would climb above the start of the path.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Join a destination folder and a library file into a goal-state key
pub fn join_destination(destination: &str, file: &str) -> String {
    let joined = format!("{}/{}", destination.trim_end_matches(['/', '\\']), file);
    normalize_relative(&joined).unwrap_or(joined)
}

/// Express a destination relative to the working directory
///
/// Absolute destinations inside the working directory lose the root prefix;
/// relative destinations and anything outside the root are returned as given.
pub fn relative_destination(destination: &str, working_directory: &Path) -> String {
    let path = Path::new(destination);
    if !path.is_absolute() {
        return destination.to_string();
    }
    let root = normalize_path(working_directory);
    match normalize_path(path).strip_prefix(&root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => destination.to_string(),
    }
}

/// Key used to detect two libraries writing the same file
pub fn conflict_key(destination_file: &str) -> String {
    let normalized =
        normalize_relative(destination_file).unwrap_or_else(|| destination_file.to_string());
    if cfg!(any(windows, target_os = "macos")) {
        normalized.to_lowercase()
    } else {
        normalized
    }
}

/// Lexically normalize an absolute or relative `PathBuf`
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push("..");
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

/// Whether `destination` resolves inside `working_directory`
///
/// Purely lexical: symlinks are not followed, so the check works for
/// destinations that do not exist yet.
pub fn is_under_working_directory(destination: &str, working_directory: &Path) -> bool {
    let destination = Path::new(destination);
    let root = normalize_path(working_directory);
    let full = if destination.is_absolute() {
        normalize_path(destination)
    } else {
        normalize_path(&root.join(destination))
    };
    full.starts_with(&root)
}

/// Resolve a relative destination file against the working directory
pub fn resolve(working_directory: &Path, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_directory.join(relative)
    }
}

/// Last segment of a path or URL
pub fn file_name_of(source: &str) -> String {
    let trimmed = match Url::parse(source) {
        Ok(url) if is_remote_uri(source) => url.path().to_string(),
        _ => source.to_string(),
    };
    trimmed
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string()
}
