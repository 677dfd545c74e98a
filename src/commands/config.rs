// src/commands/config.rs

//! User settings
//!
//! Values live in `settings.json` under the libdrop config directory.
//! Encrypted values are stored obfuscated with a per-user key and are never
//! printed back in clear text by a bare listing.

use anyhow::Result;

use super::common::parse_key_value;
use libdrop::Settings;

pub fn cmd_config(key: Option<&str>, set: &[String], set_encrypted: &[String]) -> Result<()> {
    let mut settings = Settings::load_default()?;

    if !set.is_empty() || !set_encrypted.is_empty() {
        for arg in set {
            let (k, v) = parse_key_value(arg)?;
            settings.set(k, v);
        }
        for arg in set_encrypted {
            let (k, v) = parse_key_value(arg)?;
            settings.set_encrypted(k, v)?;
        }
        settings.save()?;
        println!("Saved {} setting(s)", set.len() + set_encrypted.len());
    }

    match key {
        Some(key) => match settings.get(key) {
            Some(value) => println!("{}", value),
            None => anyhow::bail!("Setting '{}' is not defined", key),
        },
        None if set.is_empty() && set_encrypted.is_empty() => {
            let keys: Vec<&str> = settings.keys().collect();
            if keys.is_empty() {
                println!("No settings defined");
            }
            for key in keys {
                if settings.is_encrypted(key) {
                    println!("{} = <encrypted>", key);
                } else {
                    println!("{} = {}", key, settings.get(key).unwrap_or_default());
                }
            }
        }
        None => {}
    }
    Ok(())
}
