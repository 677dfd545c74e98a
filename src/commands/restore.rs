// src/commands/restore.rs

//! Restore command: install every declared library

use anyhow::Result;
use std::time::Instant;
use tracing::debug;

use super::common::{report_results, Context};
use libdrop::LogLevel;

pub async fn cmd_restore(ctx: &Context) -> Result<()> {
    let logger = ctx.logger();
    if !ctx.manifest_path.exists() {
        logger.log("No libdrop.json found, nothing to restore", LogLevel::Operation);
        return Ok(());
    }
    let manifest = ctx.load_manifest().await?;
    let started = Instant::now();

    let validation = manifest.get_validation_results(&ctx.cancel).await;
    if validation.iter().any(|r| r.cancelled_result()) {
        logger.log("Restore cancelled", LogLevel::Operation);
        return Ok(());
    }
    if validation.iter().any(|r| !r.success()) {
        report_results(logger, &manifest, &validation, "Validated");
        logger.log(
            "libdrop.json has errors, no libraries were restored",
            LogLevel::Operation,
        );
        return Ok(());
    }
    debug!("Validated {} libraries", manifest.libraries().len());

    let results = manifest.restore(&ctx.cancel).await;
    let failed = report_results(logger, &manifest, &results, "Restored");
    let cancelled = results.iter().filter(|r| r.cancelled_result()).count();
    let elapsed = started.elapsed().as_secs_f64();

    let summary = if cancelled > 0 {
        format!("Restore cancelled after {:.2}s", elapsed)
    } else if failed > 0 {
        format!(
            "Restore completed with errors: {} of {} libraries failed ({:.2}s)",
            failed,
            results.len(),
            elapsed
        )
    } else {
        format!("Restored {} libraries in {:.2}s", results.len(), elapsed)
    };
    logger.log(&summary, LogLevel::Operation);
    Ok(())
}
