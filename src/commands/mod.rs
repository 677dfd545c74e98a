// src/commands/mod.rs
//! Command implementations for libdrop

mod cache;
mod clean;
mod common;
mod config;
mod init;
mod install;
mod restore;
mod uninstall;
mod update;

pub use cache::{cmd_cache_clean, cmd_cache_list};
pub use clean::cmd_clean;
pub use common::Context;
pub use config::cmd_config;
pub use init::cmd_init;
pub use install::cmd_install;
pub use restore::cmd_restore;
pub use uninstall::cmd_uninstall;
pub use update::cmd_update;
