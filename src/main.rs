// src/main.rs

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod cli;
mod commands;

use cli::{CacheCommands, Cli, Commands};
use commands::Context;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr; user-facing results are printed by the commands
    let default_filter = if cli.verbose { "libdrop=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("libdrop v{}", env!("CARGO_PKG_VERSION"));
        println!("Run 'libdrop --help' for usage information");
        return Ok(());
    };

    // Settings need no project or cache
    if let Commands::Config { key, set, set_encrypted } = &command {
        return commands::cmd_config(key.as_deref(), set, set_encrypted);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(command, &cli.root, cli.verbose))
}

async fn run(command: Commands, root: &str, verbose: bool) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let ctx = Context::open(root, verbose, cancel)?;
    debug!("Manifest: {}", ctx.manifest_path.display());

    match command {
        Commands::Init {
            default_provider,
            default_destination,
            yes,
        } => {
            commands::cmd_init(
                &ctx,
                default_provider.as_deref(),
                default_destination.as_deref(),
                yes,
            )
            .await
        }
        Commands::Install {
            library,
            provider,
            destination,
            files,
        } => {
            commands::cmd_install(&ctx, &library, provider.as_deref(), destination.as_deref(), files)
                .await
        }
        Commands::Uninstall { library, provider } => {
            commands::cmd_uninstall(&ctx, &library, provider.as_deref()).await
        }
        Commands::Restore => commands::cmd_restore(&ctx).await,
        Commands::Clean => commands::cmd_clean(&ctx).await,
        Commands::Update {
            library,
            provider,
            to,
            pre,
            whatif,
        } => {
            commands::cmd_update(&ctx, &library, provider.as_deref(), to.as_deref(), pre, whatif)
                .await
        }
        Commands::Cache(CacheCommands::List { files, provider }) => {
            commands::cmd_cache_list(&ctx, files, provider.as_deref())
        }
        Commands::Cache(CacheCommands::Clean { provider }) => {
            commands::cmd_cache_clean(&ctx, provider.as_deref())
        }
        Commands::Config {
            key,
            set,
            set_encrypted,
        } => commands::cmd_config(key.as_deref(), &set, &set_encrypted),
    }
}
