//! Configuration management for Nostalgia
//!
//! Handles config file loading/saving and the media server URL.
//! Config is stored at ~/.config/nostalgia/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::download::AppDirectory;
use crate::storage::FileStorage;
use crate::watchlist::WatchlistFile;

/// Environment variable that overrides the configured server URL
pub const SERVER_URL_ENV: &str = "NOSTALGIA_SERVER_URL";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5173";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Server URL is not configured (set server_url in config or NOSTALGIA_SERVER_URL)")]
    MissingServerUrl,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the media server (e.g. http://192.168.1.10:3000)
    pub server_url: Option<String>,
    /// Directory for persisted state and downloads
    pub data_dir: Option<PathBuf>,
    /// CSV file backing the watchlist server
    pub watchlist_file: Option<PathBuf>,
    /// Show download notifications
    pub notifications: bool,
    /// Address the watchlist server binds to
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            data_dir: None,
            watchlist_file: None,
            notifications: true,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Get config file path (~/.config/nostalgia/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nostalgia").join("config.toml"))
    }

    /// Load config from the default file, or return default if not found
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load config from `path`; missing or invalid files give the defaults
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring invalid config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save config to the default file
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Server URL with fallback chain:
    /// 1. Environment variable NOSTALGIA_SERVER_URL, unless blank
    /// 2. `server_url` from the config file
    pub fn server_url(&self) -> Option<String> {
        Self::resolve_server_url(std::env::var(SERVER_URL_ENV).ok(), self.server_url.clone())
    }

    fn resolve_server_url(env: Option<String>, configured: Option<String>) -> Option<String> {
        let normalize = |url: String| {
            let url = url.trim().trim_end_matches('/').to_string();
            (!url.is_empty()).then_some(url)
        };
        env.and_then(normalize).or_else(|| configured.and_then(normalize))
    }

    /// Server URL, or an error when none is configured
    pub fn require_server_url(&self) -> Result<String, ConfigError> {
        self.server_url().ok_or(ConfigError::MissingServerUrl)
    }

    /// Root directory for app data (~/.local/share/nostalgia on Linux)
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("nostalgia")
        })
    }

    pub fn storage_path(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.join("storage.json"),
            None => FileStorage::default_path().unwrap_or_else(|| self.data_dir().join("storage.json")),
        }
    }

    pub fn downloads_dir(&self) -> AppDirectory {
        AppDirectory::new(self.data_dir().join("downloads"))
    }

    pub fn watchlist_file(&self) -> WatchlistFile {
        match &self.watchlist_file {
            Some(path) => WatchlistFile::new(path),
            None if self.data_dir.is_some() => {
                WatchlistFile::new(self.data_dir().join("data").join("watchlist.csv"))
            }
            None => WatchlistFile::new(WatchlistFile::default_path()),
        }
    }
}
