// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration management.
//!
//! Configuration is read from a TOML file, searched in order:
//! - the path given with `--config` (must exist)
//! - `./outpost.toml`
//! - `$XDG_CONFIG_HOME/outpost/config.toml`
//!
//! A missing file means all defaults. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::connectivity::{MonitorConfig, DEFAULT_PROBE_URL};
use crate::error::{Error, Result};
use crate::sync::SyncConfig;

const LOCAL_CONFIG_FILE: &str = "outpost.toml";
const APP_DIR_NAME: &str = "outpost";
const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "store.db";
/// One hour.
const MAX_RETRY_STEP_MS: u64 = 3_600_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Append logs to this file instead of stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Base for relative request urls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_probe_url() -> String {
    DEFAULT_PROBE_URL.to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_probe_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            base_url: None,
            probe_url: default_probe_url(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_interval_secs: default_probe_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

fn default_max_age_secs() -> u64 {
    24 * 60 * 60
}

impl Default for CacheSection {
    fn default() -> Self {
        CacheSection {
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_step_ms")]
    pub retry_step_ms: u64,
    /// 0 disables the periodic re-flush.
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_step_ms() -> u64 {
    2000
}

fn default_resync_interval_secs() -> u64 {
    60
}

impl Default for SyncSection {
    fn default() -> Self {
        SyncSection {
            auto_sync: true,
            max_retries: default_max_retries(),
            retry_step_ms: default_retry_step_ms(),
            resync_interval_secs: default_resync_interval_secs(),
        }
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file. Defaults to the XDG data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Byte limit for everything stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

impl Config {
    /// Load configuration, falling back to defaults when no file is found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match find_config_file(explicit)? {
            Some(path) => Self::from_file(&path),
            None => Ok(Config::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.network.probe_url.trim().is_empty() {
            return Err(Error::Config("network.probe_url must not be empty".into()));
        }
        if self.network.probe_timeout_ms == 0 {
            return Err(Error::Config(
                "network.probe_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.network.probe_interval_secs == 0 {
            return Err(Error::Config(
                "network.probe_interval_secs must be greater than 0".into(),
            ));
        }
        if self.sync.retry_step_ms > MAX_RETRY_STEP_MS {
            return Err(Error::Config(format!(
                "sync.retry_step_ms must be at most {MAX_RETRY_STEP_MS}"
            )));
        }
        Ok(())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            probe_url: self.network.probe_url.clone(),
            probe_timeout: Duration::from_millis(self.network.probe_timeout_ms),
            probe_interval: Duration::from_secs(self.network.probe_interval_secs),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_age: Duration::from_secs(self.cache.max_age_secs),
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            auto_sync: self.sync.auto_sync,
            max_retries: self.sync.max_retries,
            retry_step: Duration::from_millis(self.sync.retry_step_ms),
            resync_interval: Duration::from_secs(self.sync.resync_interval_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }

    /// Location of the SQLite store.
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage.path {
            Some(path) => path.clone(),
            None => default_data_dir().join(STORE_FILE_NAME),
        }
    }
}

/// Find the config file to use, if any.
///
/// An explicit path must exist; the implicit locations are optional.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(Error::ConfigNotFound(path.display().to_string()));
        }
        return Ok(Some(path.to_path_buf()));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file()))
}

/// `$XDG_DATA_HOME/outpost`, or `./.outpost` when there is no data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".outpost"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
