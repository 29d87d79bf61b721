use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::url::normalize_base_url;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAP_PAGE: &str = "default_map.html";

/// Environment override for the backend base URL.
pub const BASE_URL_ENV: &str = "CITYTALK_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Backend base URL (e.g., "http://127.0.0.1:5000")
    pub base_url: Option<String>,
    /// Maximum seconds a streaming session may run before the client
    /// gives up on it
    pub stream_timeout_secs: Option<u64>,
    /// Map document served under /maps/
    pub map_page: Option<String>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("org", "citytalk", "citytalk")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }

    /// Resolve the backend base URL: CLI flag, then environment, then
    /// config file, then the local default. Trailing slashes are stripped
    /// so endpoint construction stays uniform.
    pub fn resolve_base_url(&self, cli_override: Option<&str>) -> String {
        if let Some(url) = cli_override {
            return normalize_base_url(url);
        }
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                return normalize_base_url(trimmed);
            }
        }
        match &self.base_url {
            Some(url) => normalize_base_url(url),
            None => DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Resolve the watchdog deadline duration. Clamped to at least one
    /// second so a stray zero cannot kill sessions on arrival.
    pub fn resolve_stream_timeout(&self, cli_override: Option<u64>) -> Duration {
        let secs = cli_override
            .or(self.stream_timeout_secs)
            .unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS);
        Duration::from_secs(secs.max(1))
    }

    pub fn resolve_map_page(&self) -> &str {
        self.map_page.as_deref().unwrap_or(DEFAULT_MAP_PAGE)
    }
}
