//! Uploader configuration.
//!
//! Storages are listed as TOML tables:
//!
//! ```toml
//! [[storage]]
//! name = "archive"
//! base_path = "/saveany"
//! receiver_url = "http://recv:8000"
//! ```
//!
//! Default location:
//! - Linux: `~/.config/chunkrelay/uploader.toml`
//! - Windows: `%APPDATA%/chunkrelay/uploader.toml`

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chunkrelay_upload::ChunkedStorageConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: Vec<ChunkedStorageConfig>,
}

impl Config {
    /// Loads `path`, or the default config file when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        tracing::debug!(path = %path.display(), storages = config.storage.len(), "configuration loaded");
        Ok(config)
    }

    /// Returns the storage named `name`, or the only configured storage.
    pub fn storage(&self, name: Option<&str>) -> anyhow::Result<&ChunkedStorageConfig> {
        match name {
            Some(name) => self
                .storage
                .iter()
                .find(|s| s.name == name)
                .with_context(|| format!("storage {name:?} not found in config")),
            None => match self.storage.as_slice() {
                [only] => Ok(only),
                [] => bail!("no storage configured"),
                _ => bail!("several storages configured; pick one with --storage"),
            },
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("chunkrelay").join("uploader.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("chunkrelay")
            .join("uploader.toml")
    }
}
