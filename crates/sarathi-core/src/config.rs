use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result, anyhow};

pub const DEFAULT_ENV_SOURCE: &str = "env.json";
pub const DEFAULT_VERSES_SOURCE: &str = "verses.json";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_VERSE_REFRESH_SECS: u64 = 3600;

/// User settings, read from `<config_dir>/sarathi/config.json`.
///
/// Every field is optional; an absent file means all defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Path or URL of the endpoint document (`{"API_URL": ...}`)
    pub env_source: Option<String>,
    /// Path or URL of the verses document
    pub verses_source: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub verse_refresh_secs: Option<u64>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let settings: Settings = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        Ok(settings)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("sarathi").join("config.json"))
    }

    pub fn env_source(&self) -> &str {
        self.env_source.as_deref().unwrap_or(DEFAULT_ENV_SOURCE)
    }

    pub fn verses_source(&self) -> &str {
        self.verses_source.as_deref().unwrap_or(DEFAULT_VERSES_SOURCE)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS).max(1))
    }

    pub fn verse_refresh(&self) -> Duration {
        Duration::from_secs(self.verse_refresh_secs.unwrap_or(DEFAULT_VERSE_REFRESH_SECS).max(1))
    }
}
