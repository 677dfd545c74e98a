// src/commands/init.rs

//! Init command: create an empty libdrop.json

use anyhow::Result;

use super::common::{prompt, Context};
use libdrop::provider::CDNJS_PROVIDER_ID;
use libdrop::{Diagnostic, LogLevel, Manifest};

const DEFAULT_DESTINATION: &str = "lib";

pub async fn cmd_init(
    ctx: &Context,
    default_provider: Option<&str>,
    default_destination: Option<&str>,
    yes: bool,
) -> Result<()> {
    let logger = ctx.logger();
    if ctx.manifest_path.exists() {
        anyhow::bail!("{} already exists", ctx.manifest_path.display());
    }

    let provider = match default_provider {
        Some(provider) => provider.to_string(),
        None if yes => CDNJS_PROVIDER_ID.to_string(),
        None => {
            let known: Vec<&str> = ctx.deps.providers().ids().collect();
            prompt(
                &format!("Default provider ({})", known.join(", ")),
                CDNJS_PROVIDER_ID,
            )?
        }
    };
    if !ctx.deps.providers().contains(&provider) {
        logger.log(&Diagnostic::provider_unknown(&provider).to_string(), LogLevel::Error);
        anyhow::bail!("Unknown provider '{}'", provider);
    }

    let destination = match default_destination {
        Some(destination) => destination.to_string(),
        None if yes => DEFAULT_DESTINATION.to_string(),
        None => prompt("Default destination", DEFAULT_DESTINATION)?,
    };
    let working_directory = ctx.deps.host().working_directory();
    if let Some(error) = libdrop::provider::check_destination(Some(&destination), working_directory) {
        logger.log(&error.to_string(), LogLevel::Error);
        anyhow::bail!("Invalid default destination '{}'", destination);
    }

    let mut manifest = Manifest::new(ctx.deps.clone());
    manifest.set_default_provider(Some(provider.clone()));
    manifest.set_default_destination(Some(destination.clone()));
    ctx.save_manifest(&manifest).await?;

    logger.log(
        &format!(
            "Created {} (provider: {}, destination: {})",
            ctx.manifest_path.display(),
            provider,
            destination
        ),
        LogLevel::Operation,
    );
    Ok(())
}
