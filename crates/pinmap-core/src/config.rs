//! Application configuration management.
//!
//! The only setting the client needs is the API origin. It is resolved
//! once at start-up: an explicit override (the CLI flag) wins, then the
//! `PINMAP_API_BASE_URL` environment variable, then `api_base_url` from the
//! config file, then the local default.
//!
//! Configuration is stored at `~/.config/pinmap/config.json`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "pinmap";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable that overrides the API origin
pub const BASE_URL_ENV: &str = "PINMAP_API_BASE_URL";

/// API origin used when nothing is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Resolve the API origin. An explicit `override_url` (a command-line
    /// flag) wins over the environment, which wins over this config.
    pub fn api_base_url(&self, override_url: Option<&str>) -> Result<String> {
        let from_env = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url(&[override_url, from_env.as_deref(), self.api_base_url.as_deref()])
    }
}

/// Pick the first non-blank candidate, strip a trailing `/`, and check it
/// is an absolute http(s) URL.
fn resolve_base_url(candidates: &[Option<&str>]) -> Result<String> {
    let raw = candidates
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BASE_URL);
    let base = raw.trim_end_matches('/');

    let url = Url::parse(base).with_context(|| format!("Invalid API base URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("API base URL must use http or https: {}", raw);
    }
    Ok(base.to_string())
}
