// src/operation.rs

//! Uniform result type for engine operations
//!
//! Every provider and manifest operation reports one of four outcomes. The
//! variants make contradictory states (cancelled yet successful, failed
//! without errors) unrepresentable:
//!
//! | Variant | `success()` | `up_to_date()` | `cancelled()` |
//! |---------|-------------|----------------|---------------|
//! | `Success(T)` | true | false | false |
//! | `UpToDate(T)` | true | true | false |
//! | `Cancelled(Option<T>)` | false | false | true |
//! | `Failed(errors)` | false | false | false |

use crate::diagnostics::Diagnostic;
use crate::library::{LibraryInstallationGoalState, LibraryInstallationState};

/// Outcome of an operation producing a `T`
#[derive(Debug, Clone)]
pub enum OperationResult<T> {
    /// Completed and produced a result
    Success(T),
    /// Completed without changes because the goal was already achieved
    UpToDate(T),
    /// Stopped by a cancellation token, possibly with a partial result
    Cancelled(Option<T>),
    /// Failed with at least one coded error
    Failed(Vec<Diagnostic>),
}

impl<T> OperationResult<T> {
    /// Build a failure from a single diagnostic
    pub fn from_error(error: Diagnostic) -> Self {
        OperationResult::Failed(vec![error])
    }

    /// Build a failure from many diagnostics
    ///
    /// An empty list is promoted to an unknown-exception failure so that a
    /// `Failed` value always carries at least one error.
    pub fn from_errors(errors: Vec<Diagnostic>) -> Self {
        if errors.is_empty() {
            OperationResult::Failed(vec![Diagnostic::unknown_exception()])
        } else {
            OperationResult::Failed(errors)
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, OperationResult::Success(_) | OperationResult::UpToDate(_))
    }

    pub fn up_to_date(&self) -> bool {
        matches!(self, OperationResult::UpToDate(_))
    }

    pub fn cancelled(&self) -> bool {
        matches!(self, OperationResult::Cancelled(_))
    }

    /// Errors carried by a failure; empty for every other outcome
    pub fn errors(&self) -> &[Diagnostic] {
        match self {
            OperationResult::Failed(errors) => errors,
            _ => &[],
        }
    }

    /// The produced value, if any
    pub fn result(&self) -> Option<&T> {
        match self {
            OperationResult::Success(value) | OperationResult::UpToDate(value) => Some(value),
            OperationResult::Cancelled(partial) => partial.as_ref(),
            OperationResult::Failed(_) => None,
        }
    }

    pub fn into_result(self) -> Option<T> {
        match self {
            OperationResult::Success(value) | OperationResult::UpToDate(value) => Some(value),
            OperationResult::Cancelled(partial) => partial,
            OperationResult::Failed(_) => None,
        }
    }

    /// Transform the carried value, preserving the outcome
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        match self {
            OperationResult::Success(value) => OperationResult::Success(f(value)),
            OperationResult::UpToDate(value) => OperationResult::UpToDate(f(value)),
            OperationResult::Cancelled(partial) => OperationResult::Cancelled(partial.map(f)),
            OperationResult::Failed(errors) => OperationResult::Failed(errors),
        }
    }
}

/// Per-library entry in a batch result list
///
/// Batch operations return one entry per declared library, in declaration
/// order, so callers can correlate results with `Manifest::libraries()` by
/// position. Whole-manifest failures (duplicates, file conflicts) use an
/// entry with no installation state.
#[derive(Debug, Clone)]
pub struct LibraryOperationResult {
    pub installation_state: Option<LibraryInstallationState>,
    pub result: OperationResult<LibraryInstallationGoalState>,
}

impl LibraryOperationResult {
    pub fn new(
        installation_state: Option<LibraryInstallationState>,
        result: OperationResult<LibraryInstallationGoalState>,
    ) -> Self {
        Self {
            installation_state,
            result,
        }
    }

    /// Successful validation of a library that has no goal state yet
    pub fn validated(state: LibraryInstallationState) -> Self {
        let goal = LibraryInstallationGoalState::empty(state.clone());
        Self::new(Some(state), OperationResult::Success(goal))
    }

    pub fn failed(state: Option<LibraryInstallationState>, errors: Vec<Diagnostic>) -> Self {
        Self::new(state, OperationResult::from_errors(errors))
    }

    pub fn cancelled(state: Option<LibraryInstallationState>) -> Self {
        Self::new(state, OperationResult::Cancelled(None))
    }

    pub fn success(&self) -> bool {
        self.result.success()
    }

    pub fn up_to_date(&self) -> bool {
        self.result.up_to_date()
    }

    pub fn cancelled_result(&self) -> bool {
        self.result.cancelled()
    }

    pub fn errors(&self) -> &[Diagnostic] {
        self.result.errors()
    }

    pub fn goal_state(&self) -> Option<&LibraryInstallationGoalState> {
        self.result.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorCode;

    #[test]
    fn test_flags_per_variant() {
        let ok: OperationResult<u32> = OperationResult::Success(1);
        assert!(ok.success() && !ok.up_to_date() && !ok.cancelled());

        let current: OperationResult<u32> = OperationResult::UpToDate(1);
        assert!(current.success() && current.up_to_date());

        let stopped: OperationResult<u32> = OperationResult::Cancelled(Some(3));
        assert!(!stopped.success() && stopped.cancelled());
        assert_eq!(stopped.result(), Some(&3));
        assert!(stopped.errors().is_empty());
    }

    #[test]
    fn test_failed_is_never_empty() {
        let failed: OperationResult<u32> = OperationResult::from_errors(Vec::new());
        assert_eq!(failed.errors().len(), 1);
        assert_eq!(failed.errors()[0].code, ErrorCode::UnknownException);
        assert!(failed.result().is_none());
    }

    #[test]
    fn test_map_preserves_outcome() {
        let current: OperationResult<u32> = OperationResult::UpToDate(2);
        let mapped = current.map(|v| v * 10);
        assert!(mapped.up_to_date());
        assert_eq!(mapped.into_result(), Some(20));
    }
}
