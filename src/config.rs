use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::provider::query::DEFAULT_LIMIT;

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the config file is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Music provider API settings.
    pub provider: ProviderConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Number of catalog tracks returned when falling back.
    pub fallback_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            server: ServerConfig::default(),
            fallback_limit: 6,
        }
    }
}

/// Provider (Spotify Web API) configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_url: String,
    /// Timeout for every outbound call, in seconds.
    pub timeout_secs: u64,
    /// Tracks requested per recommendation query.
    pub limit: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
            timeout_secs: 5,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Both halves of the client credentials are present.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/moodtune/config.toml`, then apply
    /// environment overrides. Returns defaults if the file doesn't exist.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::debug!("No config directory available, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load from an explicit path. Logs a warning and falls back to defaults
    /// if the file exists but can't be read or parsed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!(
                        "Failed to parse {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!(
                    "Failed to read {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Override credentials and bind address from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("SPOTIFY_CLIENT_ID").filter(|v| !v.is_empty()) {
            self.provider.client_id = id;
        }
        if let Some(secret) = lookup("SPOTIFY_CLIENT_SECRET").filter(|v| !v.is_empty()) {
            self.provider.client_secret = secret;
        }
        if let Some(bind) = lookup("MOODTUNE_BIND").filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
