// src/commands/clean.rs

//! Clean command: delete installed files, keep the declarations

use anyhow::Result;

use super::common::{report_results, Context};
use libdrop::LogLevel;

pub async fn cmd_clean(ctx: &Context) -> Result<()> {
    let logger = ctx.logger();
    if !ctx.manifest_path.exists() {
        logger.log("No libdrop.json found, nothing to clean", LogLevel::Operation);
        return Ok(());
    }
    let manifest = ctx.load_manifest().await?;

    let results = manifest.clean(ctx.file_deleter(), &ctx.cancel).await;
    let failed = report_results(logger, &manifest, &results, "Cleaned");

    let summary = if failed > 0 {
        format!("Clean completed with errors: {} of {} libraries failed", failed, results.len())
    } else {
        format!("Cleaned {} libraries", results.len())
    };
    logger.log(&summary, LogLevel::Operation);
    Ok(())
}
