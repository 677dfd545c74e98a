// src/library/mod.rs

//! Declared and computed library state
//!
//! - [`LibraryInstallationState`]: what the user declared for one library
//! - [`LibraryInstallationGoalState`]: the destination-to-source file map a
//!   provider computed for that declaration
//! - [`FileConflict`]: a destination file claimed by more than one library

mod goal;
mod state;

pub use goal::{FileConflict, LibraryInstallationGoalState};
pub use state::{LibraryIdentity, LibraryInstallationState};
