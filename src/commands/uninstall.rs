// src/commands/uninstall.rs

//! Uninstall command

use anyhow::Result;

use super::common::Context;
use libdrop::LogLevel;

pub async fn cmd_uninstall(ctx: &Context, library: &str, provider: Option<&str>) -> Result<()> {
    let logger = ctx.logger();
    let mut manifest = ctx.load_manifest().await?;

    let result = manifest
        .uninstall(library, provider, ctx.file_deleter(), &ctx.cancel)
        .await;

    if result.cancelled_result() {
        logger.log("Uninstall cancelled", LogLevel::Operation);
        return Ok(());
    }
    if !result.success() {
        for error in result.errors() {
            logger.log(&error.to_string(), LogLevel::Error);
        }
        anyhow::bail!("Failed to uninstall '{}'", library);
    }

    ctx.save_manifest(&manifest).await?;
    let removed = result
        .installation_state
        .as_ref()
        .map(|state| manifest.library_id(state))
        .unwrap_or_else(|| library.to_string());
    logger.log(&format!("Uninstalled library \"{}\"", removed), LogLevel::Operation);
    Ok(())
}
