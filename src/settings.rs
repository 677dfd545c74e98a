// src/settings.rs

//! User settings store
//!
//! Provider-specific configuration lives in a flat JSON key/value file at
//! `<config_dir>/libdrop/settings.json`. Values written with
//! [`Settings::set_encrypted`] are sealed with AES-256-GCM under a random
//! per-user key file kept next to the settings, readable only by its owner
//! on Unix. Both files are replaced atomically.
//!
//! Well-known keys:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `cache.root` | Cache directory override |
//! | `cache.catalogExpiryHours` | Catalog freshness window (default 24) |
//! | `providers.<id>.url` | Catalog API base URL override for a provider |
//! | `providers.<id>.cdnUrl` | File download base URL override for a provider |

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::host::write_atomic_blocking;

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Key file used for encrypted values
pub const KEY_FILE: &str = "settings.key";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "LIBDROP_CONFIG_DIR";

pub const CACHE_ROOT_KEY: &str = "cache.root";
pub const CATALOG_EXPIRY_KEY: &str = "cache.catalogExpiryHours";

const ENCRYPTED_PREFIX: &str = "enc:";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const SETTINGS_MODE: u32 = 0o644;
const KEY_MODE: u32 = 0o600;

/// Flat key/value settings with optional encrypted values
#[derive(Debug, Clone, Default)]
pub struct Settings {
    dir: Option<PathBuf>,
    values: BTreeMap<String, String>,
    key: Option<Vec<u8>>,
}

impl Settings {
    /// Default config directory: `$LIBDROP_CONFIG_DIR` or `<config_dir>/libdrop`
    pub fn default_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
            && !dir.is_empty()
        {
            return Some(PathBuf::from(dir));
        }
        dirs::config_dir().map(|dir| dir.join("libdrop"))
    }

    /// Settings that are never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load settings from `dir`, starting empty if the file does not exist
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(SETTINGS_FILE);
        let values = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => serde_json::from_str(&text).map_err(|e| {
                Error::ParseError(format!("Invalid settings file {}: {e}", path.display()))
            })?,
            Ok(_) => BTreeMap::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(Error::IoError(format!("Failed to read {}: {e}", path.display())));
            }
        };

        debug!("Loaded {} settings from {}", values.len(), path.display());
        Ok(Self {
            dir: Some(dir),
            values,
            key: None,
        })
    }

    /// Load from [`Settings::default_dir`], or use in-memory settings
    pub fn load_default() -> Result<Self> {
        match Self::default_dir() {
            Some(dir) => Self::load(dir),
            None => Ok(Self::in_memory()),
        }
    }

    /// Value for `key`, decrypting it if it was stored encrypted
    pub fn get(&self, key: &str) -> Option<String> {
        let raw = self.values.get(key)?;
        match raw.strip_prefix(ENCRYPTED_PREFIX) {
            Some(encoded) => self.decrypt(encoded),
            None => Some(raw.clone()),
        }
    }

    /// Whether the stored value for `key` is encrypted
    pub fn is_encrypted(&self, key: &str) -> bool {
        self.values
            .get(key)
            .is_some_and(|v| v.starts_with(ENCRYPTED_PREFIX))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Store `value` as `enc:` + base64 of `nonce || ciphertext`
    pub fn set_encrypted(&mut self, key: impl Into<String>, value: &str) -> Result<()> {
        let key = key.into();
        let secret = self.load_or_create_key()?;
        let cipher = Aes256Gcm::new_from_slice(&secret)
            .map_err(|e| Error::InitError(format!("Invalid settings key: {e}")))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), value.as_bytes())
            .map_err(|e| Error::InitError(format!("Failed to encrypt {key}: {e}")))?;

        let mut payload = nonce.to_vec();
        payload.extend(ciphertext);
        self.values
            .insert(key, format!("{ENCRYPTED_PREFIX}{}", BASE64.encode(payload)));
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Persist to disk; a no-op for in-memory settings
    pub fn save(&self) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(&self.values)?;
        write_atomic_blocking(&dir.join(SETTINGS_FILE), text.as_bytes(), SETTINGS_MODE)
    }

    /// `None` when the key is missing or the value fails authentication
    fn decrypt(&self, encoded: &str) -> Option<String> {
        let secret = self.read_key()?;
        let payload = BASE64.decode(encoded).ok()?;
        if payload.len() < NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&secret).ok()?;
        let plain = cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()?;
        String::from_utf8(plain).ok()
    }

    fn read_key(&self) -> Option<Vec<u8>> {
        if let Some(key) = &self.key {
            return Some(key.clone());
        }
        let dir = self.dir.as_ref()?;
        fs::read(dir.join(KEY_FILE)).ok().filter(|k| k.len() == KEY_LEN)
    }

    fn load_or_create_key(&mut self) -> Result<Vec<u8>> {
        if let Some(key) = self.read_key() {
            self.key = Some(key.clone());
            return Ok(key);
        }

        let mut key = vec![0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);

        if let Some(dir) = &self.dir {
            write_atomic_blocking(&dir.join(KEY_FILE), &key, KEY_MODE)?;
        }

        self.key = Some(key.clone());
        Ok(key)
    }
}
