// src/cli/mod.rs
//! CLI definitions for libdrop
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.
//!
//! Manifest commands:
//! - `init` - Create libdrop.json
//! - `install` - Add a library and install its files
//! - `uninstall` - Delete a library's files and remove it
//! - `restore` - Install every declared library
//! - `clean` - Delete every declared library's files
//! - `update` - Move a library to another version
//!
//! Management contexts:
//! - `cache` - Inspect or clear the shared cache
//! - `config` - Read and write user settings

use clap::{Parser, Subcommand};

mod cache;

pub use cache::CacheCommands;

#[derive(Parser)]
#[command(name = "libdrop")]
#[command(author = "Libdrop Contributors")]
#[command(version)]
#[command(about = "Declarative client-side library acquisition", long_about = None)]
pub struct Cli {
    /// Project directory containing libdrop.json
    #[arg(long, global = true, default_value = ".")]
    pub root: String,

    /// Show per-file progress and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // =========================================================================
    // Manifest Commands
    // =========================================================================
    /// Create libdrop.json in the project directory
    Init {
        /// Provider used when a library names none
        #[arg(long)]
        default_provider: Option<String>,

        /// Destination used when a library names none
        #[arg(long)]
        default_destination: Option<String>,

        /// Accept defaults without prompting
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Add a library to libdrop.json and install it
    Install {
        /// Library id, e.g. jquery@3.7.1 (latest version when omitted)
        library: String,

        /// Provider to resolve the library with
        #[arg(long)]
        provider: Option<String>,

        /// Destination folder relative to the project
        #[arg(short, long)]
        destination: Option<String>,

        /// Install only these files (repeatable)
        #[arg(long = "files", value_name = "FILE")]
        files: Vec<String>,
    },

    /// Delete a library's files and remove it from libdrop.json
    Uninstall {
        /// Library id, e.g. jquery@3.7.1
        library: String,

        /// Provider of the library when several match
        #[arg(long)]
        provider: Option<String>,
    },

    /// Install every library declared in libdrop.json
    Restore,

    /// Delete the files of every declared library
    Clean,

    /// Update a declared library to another version
    Update {
        /// Library name, e.g. jquery
        library: String,

        /// Provider of the library when several match
        #[arg(long)]
        provider: Option<String>,

        /// Target version (latest when omitted)
        #[arg(long)]
        to: Option<String>,

        /// Consider pre-release versions when looking for the latest
        #[arg(long)]
        pre: bool,

        /// Show what would change without changing anything
        #[arg(long)]
        whatif: bool,
    },

    // =========================================================================
    // Management
    // =========================================================================
    /// Inspect or clear the shared cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Read or write user settings
    Config {
        /// Setting to print
        key: Option<String>,

        /// Store a value (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Store an encrypted value (repeatable)
        #[arg(long = "setEncrypted", value_name = "KEY=VALUE")]
        set_encrypted: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_with_files() {
        let cli = Cli::parse_from([
            "libdrop", "install", "jquery@3.7.1", "--provider", "cdnjs", "-d", "lib/jquery",
            "--files", "jquery.js", "--files", "jquery.min.js",
        ]);
        match cli.command {
            Some(Commands::Install { library, provider, destination, files }) => {
                assert_eq!(library, "jquery@3.7.1");
                assert_eq!(provider.as_deref(), Some("cdnjs"));
                assert_eq!(destination.as_deref(), Some("lib/jquery"));
                assert_eq!(files, vec!["jquery.js", "jquery.min.js"]);
            }
            _ => panic!("expected install"),
        }
    }

    #[test]
    fn test_parse_config_set_encrypted() {
        let cli = Cli::parse_from(["libdrop", "--root", "site", "config", "--setEncrypted", "a=b"]);
        assert_eq!(cli.root, "site");
        match cli.command {
            Some(Commands::Config { key, set, set_encrypted }) => {
                assert!(key.is_none());
                assert!(set.is_empty());
                assert_eq!(set_encrypted, vec!["a=b"]);
            }
            _ => panic!("expected config"),
        }
    }
}
