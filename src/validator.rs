// src/validator.rs

//! Library validation pipeline
//!
//! Declared libraries go through four stages, each of which stops the
//! pipeline when it fails:
//!
//! 1. Property validation of every library on its own. All per-library
//!    results are returned, in declaration order, if any of them failed.
//! 2. Duplicate detection over the `(name, version, provider)` identity
//!    after manifest defaults are applied.
//! 3. Goal-state expansion through each library's provider. The first
//!    failure is returned alone.
//! 4. File-conflict detection across all expanded goal states, reported as
//!    one aggregate result.

use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::dependencies::Dependencies;
use crate::diagnostics::Diagnostic;
use crate::library::{FileConflict, LibraryIdentity, LibraryInstallationGoalState, LibraryInstallationState};
use crate::manifest::{Manifest, SUPPORTED_VERSIONS};
use crate::operation::{LibraryOperationResult, OperationResult};
use crate::paths;
use crate::provider::check_destination;

/// Manifest-level checks: the schema version must be present and supported
pub fn get_manifest_errors(manifest: &Manifest) -> Vec<Diagnostic> {
    let version = manifest.version();
    if version.trim().is_empty() || !SUPPORTED_VERSIONS.contains(&version) {
        return vec![Diagnostic::version_is_not_supported(version)];
    }
    Vec::new()
}

/// Property checks for one library, defaults already applied
///
/// Reports the first problem found, checking in this order: library id,
/// provider, destination, provider-specific id and file names.
pub fn validate_library(state: &LibraryInstallationState, deps: &Dependencies) -> Vec<Diagnostic> {
    if state.name.trim().is_empty() {
        return vec![Diagnostic::library_id_is_undefined()];
    }

    let provider_id = state.provider();
    if provider_id.is_empty() {
        return vec![Diagnostic::provider_is_undefined()];
    }
    let Some(provider) = deps.get_provider(provider_id) else {
        return vec![Diagnostic::provider_unknown(provider_id)];
    };

    if let Some(error) = check_destination(state.destination_path.as_deref(), deps.host().working_directory()) {
        return vec![error];
    }

    let scheme = provider.naming_scheme();
    let library_id = scheme.get_id(&state.name, &state.version);
    if !scheme.is_valid_library_id(&library_id) {
        return vec![Diagnostic::invalid_library_id(&library_id, provider_id)];
    }
    if state
        .files
        .as_ref()
        .is_some_and(|files| files.iter().any(|f| f.trim().is_empty()))
    {
        return vec![Diagnostic::file_name_must_not_be_empty(&library_id)];
    }

    Vec::new()
}

/// Run the full pipeline over `libraries`
///
/// On success the result holds one successful entry per library carrying
/// its goal state, in declaration order.
pub async fn get_libraries_errors(
    libraries: &[LibraryInstallationState],
    default_destination: Option<&str>,
    default_provider: Option<&str>,
    deps: &Dependencies,
    cancel: &CancellationToken,
) -> Vec<LibraryOperationResult> {
    let states: Vec<LibraryInstallationState> = libraries
        .iter()
        .cloned()
        .map(|mut state| {
            state.apply_defaults(default_provider, default_destination);
            state
        })
        .collect();

    // Stage 1: properties
    let validated: Vec<LibraryOperationResult> = states
        .iter()
        .map(|state| {
            let errors = validate_library(state, deps);
            if errors.is_empty() {
                LibraryOperationResult::validated(state.clone())
            } else {
                LibraryOperationResult::failed(Some(state.clone()), errors)
            }
        })
        .collect();
    if validated.iter().any(|r| !r.success()) {
        debug!("Property validation failed");
        return validated;
    }

    // Stage 2: duplicates
    let duplicates = get_duplicate_libraries(&states);
    if !duplicates.is_empty() {
        let errors = duplicates
            .iter()
            .map(|identity| {
                let library_id =
                    deps.naming()
                        .get_id(&identity.name, &identity.version, Some(&identity.provider_id));
                Diagnostic::duplicate_libraries_in_manifest(&library_id)
            })
            .collect();
        return vec![LibraryOperationResult::failed(None, errors)];
    }

    // Stage 3: goal states
    let mut goal_states = Vec::with_capacity(states.len());
    for state in &states {
        if cancel.is_cancelled() {
            return vec![LibraryOperationResult::cancelled(Some(state.clone()))];
        }
        let Some(provider) = deps.get_provider(state.provider()) else {
            return vec![LibraryOperationResult::failed(
                Some(state.clone()),
                vec![Diagnostic::provider_unknown(state.provider())],
            )];
        };
        match provider.get_installation_goal_state(state, cancel).await {
            OperationResult::Success(goal) | OperationResult::UpToDate(goal) => goal_states.push(goal),
            OperationResult::Cancelled(_) => {
                return vec![LibraryOperationResult::cancelled(Some(state.clone()))];
            }
            OperationResult::Failed(errors) => {
                return vec![LibraryOperationResult::failed(Some(state.clone()), errors)];
            }
        }
    }

    // Stage 4: conflicts
    let conflicts = get_file_conflicts(&goal_states);
    if !conflicts.is_empty() {
        let errors = conflicts
            .iter()
            .map(|conflict| {
                let ids: Vec<String> = conflict
                    .libraries
                    .iter()
                    .map(|state| deps.naming().get_id(&state.name, &state.version, state.provider_id.as_deref()))
                    .collect();
                Diagnostic::conflicting_files_in_manifest(&conflict.file, &ids)
            })
            .collect();
        return vec![LibraryOperationResult::failed(None, errors)];
    }

    goal_states
        .into_iter()
        .map(|goal| LibraryOperationResult::new(Some(goal.installation_state.clone()), OperationResult::Success(goal)))
        .collect()
}

/// Identities declared more than once, each reported once, in first-seen order
pub fn get_duplicate_libraries(libraries: &[LibraryInstallationState]) -> Vec<LibraryIdentity> {
    let mut seen: Vec<(LibraryIdentity, usize)> = Vec::new();
    for state in libraries {
        let identity = state.identity();
        match seen.iter_mut().find(|(known, _)| *known == identity) {
            Some((_, count)) => *count += 1,
            None => seen.push((identity, 1)),
        }
    }
    seen.into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(identity, _)| identity)
        .collect()
}

/// Destination files written by more than one goal state
///
/// Keys are compared after path normalization and, on case-insensitive
/// platforms, case folding. Conflicts are ordered by file.
pub fn get_file_conflicts(goal_states: &[LibraryInstallationGoalState]) -> Vec<FileConflict> {
    let mut writers: BTreeMap<String, (String, Vec<usize>)> = BTreeMap::new();
    for (index, goal) in goal_states.iter().enumerate() {
        for destination in goal.installed_files.keys() {
            let (_, owners) = writers
                .entry(paths::conflict_key(destination))
                .or_insert_with(|| (destination.clone(), Vec::new()));
            if !owners.contains(&index) {
                owners.push(index);
            }
        }
    }

    writers
        .into_values()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(file, owners)| FileConflict {
            file,
            libraries: owners
                .into_iter()
                .map(|i| goal_states[i].installation_state.clone())
                .collect(),
        })
        .collect()
}
