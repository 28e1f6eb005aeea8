//! Adapter configuration
//!
//! Supplied by the host at initialization, or loaded from TOML. Field names
//! are snake_case; the host's camelCase names are accepted as aliases.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Path to the project document. Required.
    pub filename: PathBuf,
    /// Model-access key, forwarded to the engine untouched.
    #[serde(alias = "apiKey", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model endpoint, forwarded to the engine untouched.
    #[serde(alias = "endpointUrl", skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Step-by-step logging at info level. No behavioural effect.
    pub verbose: bool,
    pub watch: WatchConfig,
}

/// Polling parameters for the project file watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
    /// How long the file must stay unchanged before a change is reported.
    pub stability_threshold_ms: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            filename: PathBuf::new(),
            api_key: None,
            endpoint_url: None,
            verbose: false,
            watch: WatchConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 100,
            stability_threshold_ms: 2_000,
        }
    }
}

impl AdapterConfig {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Load config from a TOML file. Unlike optional settings files, a missing
    /// or unparsable file is an error: there is no usable default project path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.filename.as_os_str().is_empty() {
            return Err(Error::config("`filename` is required"));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(Error::config("`watch.poll_interval_ms` must be positive"));
        }
        Ok(())
    }

    /// Write the current config as TOML (for generating a config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Consecutive unchanged polls required before a change counts as settled.
    pub fn stable_polls(&self) -> u32 {
        let poll = self.poll_interval_ms.max(1);
        let polls = self.stability_threshold_ms.div_ceil(poll);
        polls.clamp(1, u32::MAX as u64) as u32
    }
}
