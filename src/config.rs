use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TimelineError};

/// Configuration for the Titantron timeline client
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Backend connection settings
    pub server: ServerConfig,

    /// Analysis job polling settings
    pub polling: PollingConfig,

    /// Timeline layout settings
    pub timeline: TimelineConfig,

    /// Logging and output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Backend base URL
    pub base_url: String,

    /// Path prefix in front of every API route
    pub api_prefix: String,

    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Milliseconds between status polls
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// On-screen width of one thumbnail at 1x zoom
    pub thumb_width: f64,

    /// Visible timeline width when nothing measured it yet
    pub container_width: f64,

    /// Height of the visual marker lane
    pub visual_lane_height: f64,

    /// Height of the audio lane (spectrum curve or markers)
    pub audio_lane_height: f64,

    /// Height of the chapter lane
    pub chapter_lane_height: f64,

    /// Zoom ceiling for the inline timeline
    pub max_zoom: u32,

    /// Zoom ceiling for the dedicated detail view
    pub detail_max_zoom: u32,

    /// Thumbnails kept loaded on each side of the visible range
    pub overscan: u32,

    /// Pixels kept free above a full-scale spectrum point
    pub spectrum_top_margin: f64,

    /// Horizontal slop when clicking a marker
    pub marker_hit_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Log filter used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 2000 }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            thumb_width: 160.0,
            container_width: 1200.0,
            visual_lane_height: 18.0,
            audio_lane_height: 40.0,
            chapter_lane_height: 22.0,
            max_zoom: 8,
            detail_max_zoom: 16,
            overscan: 2,
            spectrum_top_margin: 4.0,
            marker_hit_tolerance: 4.0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: "titantron_timeline=info,warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        // Try to load from various locations
        let config_paths = [
            "titantron.toml",
            "config/titantron.toml",
            "/etc/titantron/config.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::load_from(path) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("TITANTRON_SERVER_URL") {
            self.server.base_url = url;
        }

        if let Ok(prefix) = std::env::var("TITANTRON_API_PREFIX") {
            self.server.api_prefix = prefix;
        }

        if let Ok(interval) = std::env::var("TITANTRON_POLL_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => self.polling.interval_ms = ms,
                Err(_) => tracing::warn!("Ignoring invalid TITANTRON_POLL_INTERVAL_MS: {}", interval),
            }
        }

        if let Ok(log_level) = std::env::var("TITANTRON_LOG_LEVEL") {
            self.output.log_level = log_level;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.as_ref().display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(TimelineError::Configuration("server.base_url must be set".to_string()));
        }

        if self.polling.interval_ms == 0 {
            return Err(TimelineError::Configuration(
                "polling.interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.timeline.thumb_width <= 0.0 {
            return Err(TimelineError::Configuration(
                "timeline.thumb_width must be greater than 0".to_string(),
            ));
        }

        for (name, zoom) in [
            ("max_zoom", self.timeline.max_zoom),
            ("detail_max_zoom", self.timeline.detail_max_zoom),
        ] {
            if zoom == 0 || !zoom.is_power_of_two() {
                return Err(TimelineError::Configuration(format!(
                    "timeline.{} must be a power of two, got {}",
                    name, zoom
                )));
            }
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Titantron Timeline Configuration:\n\
            - Server: {}{}\n\
            - Poll Interval: {}ms\n\
            - Thumbnail Width: {}px\n\
            - Zoom Limits: {}x / {}x (detail)",
            self.server.base_url,
            self.server.api_prefix,
            self.polling.interval_ms,
            self.timeline.thumb_width,
            self.timeline.max_zoom,
            self.timeline.detail_max_zoom,
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server.base_url = url.into();
        self
    }

    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.server.api_prefix = prefix.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.polling.interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_thumb_width(mut self, width: f64) -> Self {
        self.config.timeline.thumb_width = width;
        self
    }

    pub fn with_container_width(mut self, width: f64) -> Self {
        self.config.timeline.container_width = width;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
