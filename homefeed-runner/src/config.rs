//! Poller configuration: TOML file with one table per concern.
//!
//! Every field has a default, so an empty file (or no file) gives the
//! reference behaviour: the public homefeed, 1 s between pages, 5 min
//! between cycles, CSV snapshots in the working directory.

use homefeed_core::feed::http::{default_headers, FeedClientConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete poller configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub feed: FeedSection,
    pub timing: TimingSection,
    pub export: ExportSection,
}

/// Where and how to fetch pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub base_url: String,
    pub timeout_secs: u64,
    pub headers: BTreeMap<String, String>,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            headers: default_headers().into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    /// Pause before each page after the first.
    pub page_delay_ms: u64,
    /// Pause after each cycle, successful or not.
    pub cycle_interval_secs: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            page_delay_ms: 1_000,
            cycle_interval_secs: 300,
        }
    }
}

impl TimingSection {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub output_dir: PathBuf,
    pub file_prefix: String,
    /// Also write a JSON manifest next to each CSV.
    pub write_manifest: bool,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_prefix: "homefeed_data".to_string(),
            write_manifest: false,
        }
    }
}

impl PollerConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("feed.base_url is empty".into()));
        }
        if self.feed.timeout_secs == 0 {
            return Err(ConfigError::Invalid("feed.timeout_secs must be positive".into()));
        }
        let prefix = self.export.file_prefix.trim();
        if prefix.is_empty() {
            return Err(ConfigError::Invalid("export.file_prefix is empty".into()));
        }
        if prefix.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "export.file_prefix {prefix:?} must not contain path separators"
            )));
        }
        Ok(())
    }

    /// Connection settings for the HTTP provider.
    pub fn client_config(&self) -> FeedClientConfig {
        FeedClientConfig {
            base_url: self.feed.base_url.clone(),
            timeout: Duration::from_secs(self.feed.timeout_secs),
            headers: self
                .feed
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}
