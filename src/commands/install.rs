// src/commands/install.rs

//! Install command
//!
//! Adds one library to libdrop.json and installs its files. A library id
//! without a version resolves to the provider's latest stable version. The
//! destination falls back to the manifest default and then to the provider's
//! suggestion.

use anyhow::Result;
use tracing::info;

use super::common::Context;
use libdrop::provider::CDNJS_PROVIDER_ID;
use libdrop::{Diagnostic, LogLevel, OperationResult};

pub async fn cmd_install(
    ctx: &Context,
    library: &str,
    provider: Option<&str>,
    destination: Option<&str>,
    files: Vec<String>,
) -> Result<()> {
    let logger = ctx.logger();
    let mut manifest = ctx.load_manifest().await?;

    let provider_id = provider
        .or(manifest.default_provider())
        .unwrap_or(CDNJS_PROVIDER_ID)
        .to_string();
    let Some(provider_impl) = ctx.deps.get_provider(&provider_id) else {
        logger.log(&Diagnostic::provider_unknown(&provider_id).to_string(), LogLevel::Error);
        anyhow::bail!("Unknown provider '{}'", provider_id);
    };

    let (name, mut version) = provider_impl.naming_scheme().get_name_and_version(library);
    let catalog = provider_impl.get_catalog();
    if provider_impl.supports_library_versions() && version.is_empty() {
        match catalog.get_latest_version(&name, false, &ctx.cancel).await {
            Ok(Some(latest)) => {
                info!("Resolved {} to version {}", name, latest);
                version = latest;
            }
            _ => {
                let error = Diagnostic::unable_to_resolve_source(library, &provider_id);
                logger.log(&error.to_string(), LogLevel::Error);
                anyhow::bail!("Could not determine the latest version of '{}'", name);
            }
        }
    }
    let library_id = provider_impl.naming_scheme().get_id(&name, &version);

    if manifest
        .libraries()
        .iter()
        .any(|s| s.name == name && s.provider() == provider_id)
    {
        let error = Diagnostic::library_already_installed(&library_id, &provider_id);
        logger.log(&error.to_string(), LogLevel::Error);
        anyhow::bail!("'{}' is already declared", name);
    }

    let destination = match (destination, manifest.default_destination()) {
        (Some(explicit), _) => Some(explicit.to_string()),
        (None, Some(_)) => None,
        (None, None) => match catalog.get_library(&name, &version, &ctx.cancel).await {
            Ok(resolved) => Some(provider_impl.get_suggested_destination(&resolved)),
            Err(e) => {
                info!("Could not resolve {} for a suggested destination: {}", library_id, e);
                let error = Diagnostic::unable_to_resolve_source(&library_id, &provider_id);
                logger.log(&error.to_string(), LogLevel::Error);
                anyhow::bail!("Failed to install '{}'", library_id);
            }
        },
    };

    let explicit_provider = provider.map(String::from).or_else(|| {
        manifest
            .default_provider()
            .is_none()
            .then(|| provider_id.clone())
    });
    let files = (!files.is_empty()).then_some(files);

    let result = manifest
        .install_library(
            &name,
            &version,
            explicit_provider.as_deref(),
            files,
            destination.as_deref(),
            &ctx.cancel,
        )
        .await;

    match result {
        OperationResult::Success(goal) | OperationResult::UpToDate(goal) => {
            ctx.save_manifest(&manifest).await?;
            logger.log(
                &format!(
                    "Installed library \"{}\" to \"{}\" ({} file(s))",
                    library_id,
                    goal.installation_state.destination(),
                    goal.installed_files.len()
                ),
                LogLevel::Operation,
            );
            Ok(())
        }
        OperationResult::Cancelled(_) => {
            logger.log("Installation cancelled", LogLevel::Operation);
            Ok(())
        }
        OperationResult::Failed(errors) => {
            for error in &errors {
                logger.log(&error.to_string(), LogLevel::Error);
            }
            anyhow::bail!("Failed to install '{}'", library_id)
        }
    }
}
