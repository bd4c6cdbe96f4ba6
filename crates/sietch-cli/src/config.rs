//! Configuration file support for the sietch CLI.
//!
//! Configuration and templates live in `~/.config/sietch/` on every platform,
//! or in `$SIETCH_CONFIG_DIR` when that is set.
//!
//! # Example configuration
//!
//! ```toml
//! [defaults]
//! author = "Jane Doe <jane@example.com>"
//! verbosity = 1
//!
//! [keys]
//! scrypt_n = 32768
//! scrypt_r = 8
//! scrypt_p = 1
//! rsa_key_size = 4096
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sietch_core::crypto::KeyGenParams;
use sietch_core::layout::{
    DEFAULT_PBKDF2_ITERATIONS, DEFAULT_RSA_KEY_SIZE, DEFAULT_SCRYPT_N, DEFAULT_SCRYPT_P,
    DEFAULT_SCRYPT_R,
};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "SIETCH_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    /// Cost parameters for key material in new vaults
    #[serde(default)]
    pub keys: KeySettings,
}

/// Default settings
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Defaults {
    /// Author recorded in new vaults when `--author` is not given
    pub author: Option<String>,

    /// Default verbosity level (0-3)
    pub verbosity: Option<u8>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct KeySettings {
    pub scrypt_n: Option<u64>,
    pub scrypt_r: Option<u32>,
    pub scrypt_p: Option<u32>,
    pub pbkdf2_iterations: Option<u32>,
    pub rsa_key_size: Option<usize>,
}

impl KeySettings {
    /// Symmetric key parameters for scaffolded vaults.
    pub fn key_params(&self) -> KeyGenParams {
        KeyGenParams {
            pbkdf2_iterations: self.pbkdf2_iterations.unwrap_or(DEFAULT_PBKDF2_ITERATIONS),
            ..KeyGenParams::scaffold(
                self.scrypt_n.unwrap_or(DEFAULT_SCRYPT_N),
                self.scrypt_r.unwrap_or(DEFAULT_SCRYPT_R),
                self.scrypt_p.unwrap_or(DEFAULT_SCRYPT_P),
            )
        }
    }

    pub fn rsa_key_size(&self) -> usize {
        self.rsa_key_size.unwrap_or(DEFAULT_RSA_KEY_SIZE)
    }
}

impl Config {
    /// Load configuration from the config directory, or return empty config if not found.
    pub fn load() -> Result<Self> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

/// Directory holding `config.toml` and `templates/`.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let base_dirs = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(base_dirs.home_dir().join(".config").join("sietch"))
}

/// Get the path to the configuration file.
pub fn config_path() -> Result<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}
