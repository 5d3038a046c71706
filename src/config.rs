//! Ambient configuration (§A.3): an optional, on-disk override for the
//! defaults a caller would otherwise pass to [`crate::patcher::Patcher`]
//! directly.
//!
//! Grounded in `config/mod.rs`'s `directories::ProjectDirs`-rooted,
//! `toml`-backed, `#[serde(deny_unknown_fields)]` layout. Unlike the
//! teacher's config, there is no `region`/`bucket`/`endpoint`/`profile` —
//! those are S3-backend concerns this engine has no counterpart for.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::digest::DigestAlgorithm;
use crate::error::{PatchlineError, Result};

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "patchline";
const APPLICATION: &str = "patchline";
const CONFIG_FILE_NAME: &str = "config.toml";

/// On-disk overrides for the engine's defaults. Every field is optional;
/// a caller that never writes a config file gets the builtin defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub cache_dir_name: Option<String>,
    pub remote_timeout_secs: Option<u64>,
    pub default_algorithm: Option<DigestAlgorithm>,
}

impl Config {
    /// Loads the config file from the platform's standard config
    /// directory, returning the default (empty) config if it does not
    /// exist.
    pub fn load() -> Result<Self> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(Self::default()),
        };
        if !path.is_file() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.cache_dir_name {
            if name.is_empty() || name.contains('/') || name.contains('\\') {
                return Err(PatchlineError::InvalidState(format!(
                    "cache_dir_name must be a single path segment: {name}"
                )));
            }
        }
        if self.remote_timeout_secs == Some(0) {
            return Err(PatchlineError::InvalidState(
                "remote_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
