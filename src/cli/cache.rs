// src/cli/cache.rs
//! Cache management commands

use clap::Subcommand;

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Delete cached catalogs and files
    Clean {
        /// Only clear this provider's entries
        provider: Option<String>,
    },

    /// List cached libraries
    List {
        /// Also list every cached file
        #[arg(long)]
        files: bool,

        /// Only list this provider's entries
        #[arg(long)]
        provider: Option<String>,
    },
}
