use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://uploader.kinescope.io/v2/video";
pub const DEFAULT_API_BASE_URL: &str = "https://api.kinescope.io/v1";
pub const DEFAULT_EMBED_BASE_URL: &str = "https://kinescope.io/embed";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recording: RecordingConfig,
    pub upload: UploadConfig,
    pub poller: PollerConfig,
}

/// Defaults applied to every new recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub frame_rate: u32,
    /// PIP width as a fraction of the canvas width
    pub pip_size_ratio: f32,
    pub pip_margin_px: u32,
    pub chunk_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Base URL of the application backend. When set, every video host call
    /// goes through the backend and `api_key` is never used.
    pub storage_base_url: Option<String>,
    /// Video host API key for direct uploads. Only for personal deployments.
    pub api_key: Option<String>,
    /// Project (folder) the host files direct uploads under
    pub parent_id: Option<String>,
    pub upload_endpoint: String,
    pub api_base_url: String,
    pub embed_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_seconds: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            pip_size_ratio: 0.15,
            pip_margin_px: 20,
            chunk_interval_ms: 1000,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            storage_base_url: None,
            api_key: None,
            parent_id: None,
            upload_endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            embed_base_url: DEFAULT_EMBED_BASE_URL.to_string(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 10,
        }
    }
}

impl RecordingConfig {
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_interval_ms.max(1))
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl UploadConfig {
    /// Whether uploads go through the application backend.
    pub fn uses_proxy(&self) -> bool {
        self.storage_base_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config = Self::parse(&content)?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
