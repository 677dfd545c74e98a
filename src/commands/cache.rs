// src/commands/cache.rs

//! Cache inspection and cleanup

use anyhow::Result;

use super::common::Context;
use libdrop::{Diagnostic, LogLevel};

pub fn cmd_cache_list(ctx: &Context, files: bool, provider: Option<&str>) -> Result<()> {
    let providers = ctx.cache.list(provider)?;
    if providers.iter().all(|p| p.libraries.is_empty()) {
        println!("Cache is empty ({})", ctx.cache.root().display());
        return Ok(());
    }

    println!("Cache: {}", ctx.cache.root().display());
    for cached in &providers {
        println!();
        println!("{}:", cached.provider_id);
        if cached.libraries.is_empty() {
            println!("  (no libraries)");
            continue;
        }
        for library in &cached.libraries {
            let modified = library
                .last_modified
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {}@{}  {} file(s)  {}",
                library.name,
                library.version,
                library.files.len(),
                modified
            );
            if files {
                for file in &library.files {
                    println!("      {}", file);
                }
            }
        }
    }
    Ok(())
}

pub fn cmd_cache_clean(ctx: &Context, provider: Option<&str>) -> Result<()> {
    if let Some(id) = provider
        && !ctx.deps.providers().contains(id)
    {
        ctx.logger().log(&Diagnostic::provider_unknown(id).to_string(), LogLevel::Error);
        anyhow::bail!("Unknown provider '{}'", id);
    }
    let removed = ctx.cache.clean(provider)?;
    let what = match provider {
        Some(id) => format!("cache for provider '{}'", id),
        None => "cache".to_string(),
    };
    let message = if removed {
        format!("Cleared {}", what)
    } else {
        format!("The {} is already empty", what)
    };
    ctx.logger().log(&message, LogLevel::Operation);
    Ok(())
}
