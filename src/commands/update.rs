// src/commands/update.rs

//! Update command
//!
//! Moves one declared library to another version. The manifest is rewritten
//! first, files that only the old version installed are deleted, and then
//! the whole manifest is restored.

use anyhow::Result;
use tracing::{debug, info};

use super::common::{report_results, Context};
use libdrop::{Diagnostic, LogLevel, OperationResult};

pub async fn cmd_update(
    ctx: &Context,
    library: &str,
    provider: Option<&str>,
    to: Option<&str>,
    pre: bool,
    whatif: bool,
) -> Result<()> {
    let logger = ctx.logger();
    let mut manifest = ctx.load_manifest().await?;

    let index = match manifest.find_libraries(library, provider).as_slice() {
        [index] => *index,
        [] => anyhow::bail!("Library '{}' is not declared in libdrop.json", library),
        many => {
            let candidates: Vec<String> = many
                .iter()
                .map(|&i| {
                    let state = &manifest.libraries()[i];
                    format!("{} ({})", manifest.library_id(state), state.provider())
                })
                .collect();
            let error = Diagnostic::update_version_conflict(library, &candidates);
            logger.log(&error.to_string(), LogLevel::Error);
            anyhow::bail!("'{}' matches more than one library, pass --provider", library);
        }
    };

    let state = manifest.libraries()[index].clone();
    let current_id = manifest.library_id(&state);
    let Some(provider_impl) = ctx.deps.get_provider(state.provider()) else {
        logger.log(&Diagnostic::provider_unknown(state.provider()).to_string(), LogLevel::Error);
        anyhow::bail!("Unknown provider '{}'", state.provider());
    };
    if !provider_impl.supports_library_versions() {
        anyhow::bail!("Provider '{}' does not version its libraries", provider_impl.id());
    }
    let catalog = provider_impl.get_catalog();

    let target = match to {
        Some(version) => version.to_string(),
        None => match catalog.get_latest_version(&state.name, pre, &ctx.cancel).await {
            Ok(Some(latest)) => latest,
            Ok(None) => anyhow::bail!("No versions published for '{}'", state.name),
            Err(e) => {
                let error = Diagnostic::unable_to_resolve_source(&current_id, state.provider());
                logger.log(&error.to_string(), LogLevel::Error);
                anyhow::bail!("Could not determine the latest version of '{}': {}", state.name, e);
            }
        },
    };

    if target == state.version {
        logger.log(&format!("{} is already up to date", current_id), LogLevel::Operation);
        return Ok(());
    }
    let target_id = provider_impl.naming_scheme().get_id(&state.name, &target);

    if let Some(files) = &state.files {
        let resolved = match catalog.get_library(&state.name, &target, &ctx.cancel).await {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Failed to resolve {}: {}", target_id, e);
                let error = Diagnostic::unable_to_resolve_source(&target_id, state.provider());
                logger.log(&error.to_string(), LogLevel::Error);
                anyhow::bail!("Failed to update '{}'", current_id);
            }
        };
        let missing: Vec<String> = files.iter().filter(|f| !resolved.contains(f)).cloned().collect();
        if !missing.is_empty() {
            let error = Diagnostic::update_files_conflict(&target_id, &missing);
            logger.log(&error.to_string(), LogLevel::Error);
            anyhow::bail!("Failed to update '{}'", current_id);
        }
    }

    if whatif {
        logger.log(
            &format!("Would update {} to {}", current_id, target_id),
            LogLevel::Operation,
        );
        return Ok(());
    }

    let previous = manifest.clone();
    manifest.replace_library_version(index, &target);

    let validation = manifest.get_validation_results(&ctx.cancel).await;
    if validation.iter().any(|r| r.cancelled_result()) {
        logger.log("Update cancelled", LogLevel::Operation);
        return Ok(());
    }
    if validation.iter().any(|r| !r.success()) {
        report_results(logger, &manifest, &validation, "Validated");
        anyhow::bail!("Failed to update '{}'", current_id);
    }

    ctx.save_manifest(&manifest).await?;
    info!("Updated {} to {} in libdrop.json", current_id, target_id);

    match manifest
        .delete_unwanted_files(&previous, ctx.file_deleter(), &ctx.cancel)
        .await
    {
        OperationResult::Success(deleted) => debug!("Deleted {} stale file(s)", deleted.len()),
        OperationResult::Failed(errors) => {
            for error in &errors {
                logger.log(&error.to_string(), LogLevel::Error);
            }
        }
        OperationResult::UpToDate(_) | OperationResult::Cancelled(_) => {}
    }

    let results = manifest.restore(&ctx.cancel).await;
    let failed = report_results(logger, &manifest, &results, "Restored");
    if failed > 0 {
        anyhow::bail!("Updated libdrop.json but {} libraries failed to restore", failed);
    }
    logger.log(
        &format!("Updated {} to {}", current_id, target_id),
        LogLevel::Operation,
    );
    Ok(())
}
