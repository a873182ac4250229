use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Overrides `server.base_url` when set.
pub const SERVER_URL_ENV: &str = "MEDIA_BROWSER_SERVER_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub slideshow: SlideshowConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Position in the video the preview frame is taken from
    #[serde(default = "default_time_offset")]
    pub time_offset_ms: u64,

    /// 0.0 (worst) to 1.0 (best)
    #[serde(default = "default_quality")]
    pub quality: f32,

    /// 0 disables the bound
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideshowConfig {
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    #[serde(default = "default_swipe_threshold")]
    pub swipe_threshold: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::read(&config_path)?
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save_to(&config_path)?;
            config
        };
        config.apply_env();
        Ok(config)
    }

    /// Load an explicit file. A missing file is an error here.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.apply_env();
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        info!("Config loaded successfully");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(SERVER_URL_ENV)
            && !url.is_empty()
        {
            debug!("Server URL overridden by {}", SERVER_URL_ENV);
            self.server.base_url = url;
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", config_path);
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("media-browser").join("config.toml"))
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ThumbnailConfig {
    pub fn time_offset(&self) -> Duration {
        Duration::from_millis(self.time_offset_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured cache directory, or the platform cache dir.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("media-browser")
                .join("thumbnails")
        })
    }
}

impl SlideshowConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_timeout(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            time_offset_ms: default_time_offset(),
            quality: default_quality(),
            max_concurrent: default_max_concurrent(),
            timeout_secs: default_timeout(),
            ffmpeg_path: default_ffmpeg(),
            cache_dir: None,
        }
    }
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            swipe_threshold: default_swipe_threshold(),
        }
    }
}

// Default value functions
fn default_base_url() -> String { "http://localhost:8000".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_time_offset() -> u64 { 1000 }
fn default_quality() -> f32 { 0.8 }
fn default_max_concurrent() -> usize { 4 }
fn default_ffmpeg() -> String { "ffmpeg".to_string() }
fn default_interval() -> u64 { 30_000 }
fn default_swipe_threshold() -> f64 { 50.0 }
