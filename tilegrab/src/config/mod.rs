//! Configuration file handling.
//!
//! Settings live in an INI file under the user config directory
//! (`~/.config/tilegrab/config.ini` on Linux). Environment variables
//! override the file for API credentials, and CLI arguments override both.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::geocode::DEFAULT_MAP_ZOOM;
use crate::grid::{DEFAULT_LAT_STEP, DEFAULT_LNG_STEP};
use crate::render::{DEFAULT_DELAY_SECS, DEFAULT_RENDERER_BINARY};

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "MAPTILER_API_URL";

/// Environment variable overriding the API key.
pub const ENV_API_KEY: &str = "MAPTILER_API_KEY";

/// Environment variable overriding the map style identifier.
pub const ENV_MAP_ID: &str = "MAPTILER_MAP_ID";

/// Default jobs-per-batch limit.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Default pause between batches, in seconds.
pub const DEFAULT_BATCH_DELAY_SECS: f64 = 1.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem failure reading or writing the config file.
    #[error("config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file exists but is not valid INI.
    #[error("failed to parse config file: {0}")]
    Parse(String),

    /// A key holds a value of the wrong type.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// `[api]` section: geocoding/maps provider access.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub url: String,
    pub key: String,
    pub map_id: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url: "https://api.maptiler.com".to_string(),
            key: String::new(),
            map_id: "streets-v2".to_string(),
        }
    }
}

/// `[capture]` section: renderer behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Framing zoom for captured views.
    pub zoom: f64,

    /// Settle delay before each screenshot, in seconds.
    pub delay: f64,

    /// Renderer binary name or path.
    pub renderer: String,

    /// Directory image files are written to.
    pub output_dir: PathBuf,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            zoom: DEFAULT_MAP_ZOOM,
            delay: DEFAULT_DELAY_SECS,
            renderer: DEFAULT_RENDERER_BINARY.to_string(),
            output_dir: PathBuf::from("images"),
        }
    }
}

/// `[queue]` section: batch scheduler pacing.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSettings {
    /// Jobs dispatched concurrently per batch.
    pub concurrency: usize,

    /// Pause between batches, in seconds.
    pub batch_delay_secs: f64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_delay_secs: DEFAULT_BATCH_DELAY_SECS,
        }
    }
}

/// `[grid]` section: angular step sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSettings {
    pub lat_step: f64,
    pub lng_step: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            lat_step: DEFAULT_LAT_STEP,
            lng_step: DEFAULT_LNG_STEP,
        }
    }
}

/// The full configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub api: ApiSettings,
    pub capture: CaptureSettings,
    pub queue: QueueSettings,
    pub grid: GridSettings,
}

/// Path of the user config file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilegrab")
        .join("config.ini")
}

impl ConfigFile {
    /// Loads the user config file, falling back to defaults when absent,
    /// then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Loads configuration from a specific INI file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("api")) {
            if let Some(url) = section.get("url") {
                config.api.url = url.to_string();
            }
            if let Some(key) = section.get("key") {
                config.api.key = key.to_string();
            }
            if let Some(map_id) = section.get("map_id") {
                config.api.map_id = map_id.to_string();
            }
        }

        if let Some(section) = ini.section(Some("capture")) {
            if let Some(zoom) = section.get("zoom") {
                config.capture.zoom = parse_f64("capture.zoom", zoom)?;
            }
            if let Some(delay) = section.get("delay") {
                config.capture.delay = parse_f64("capture.delay", delay)?;
            }
            if let Some(renderer) = section.get("renderer") {
                config.capture.renderer = renderer.to_string();
            }
            if let Some(dir) = section.get("output_dir") {
                config.capture.output_dir = PathBuf::from(dir);
            }
        }

        if let Some(section) = ini.section(Some("queue")) {
            if let Some(concurrency) = section.get("concurrency") {
                config.queue.concurrency = parse_usize("queue.concurrency", concurrency)?;
            }
            if let Some(delay) = section.get("batch_delay") {
                config.queue.batch_delay_secs = parse_f64("queue.batch_delay", delay)?;
            }
        }

        if let Some(section) = ini.section(Some("grid")) {
            if let Some(step) = section.get("lat_step") {
                config.grid.lat_step = parse_f64("grid.lat_step", step)?;
            }
            if let Some(step) = section.get("lng_step") {
                config.grid.lng_step = parse_f64("grid.lng_step", step)?;
            }
        }

        Ok(config)
    }

    /// Applies `MAPTILER_*` environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup (exposed for testing).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api.key = key;
        }
        if let Some(map_id) = lookup(ENV_MAP_ID) {
            self.api.map_id = map_id;
        }
    }

    /// Writes the configuration to the user config file.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes the configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("api"))
            .set("url", &self.api.url)
            .set("key", &self.api.key)
            .set("map_id", &self.api.map_id);
        ini.with_section(Some("capture"))
            .set("zoom", self.capture.zoom.to_string())
            .set("delay", self.capture.delay.to_string())
            .set("renderer", &self.capture.renderer)
            .set("output_dir", self.capture.output_dir.display().to_string());
        ini.with_section(Some("queue"))
            .set("concurrency", self.queue.concurrency.to_string())
            .set("batch_delay", self.queue.batch_delay_secs.to_string());
        ini.with_section(Some("grid"))
            .set("lat_step", self.grid.lat_step.to_string())
            .set("lng_step", self.grid.lng_step.to_string());

        ini.write_to_file(path)?;
        Ok(())
    }
}

fn parse_f64(key: &'static str, value: &str) -> Result<f64, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn parse_usize(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.api.url, "https://api.maptiler.com");
        assert_eq!(config.queue.concurrency, 2);
        assert_eq!(config.queue.batch_delay_secs, 1.0);
        assert_eq!(config.grid.lat_step, 0.03);
        assert_eq!(config.grid.lng_step, 0.06);
        assert_eq!(config.capture.output_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.api.key = "abc123".to_string();
        config.queue.concurrency = 4;
        config.capture.zoom = 14.5;
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[api]\nkey = secret\n").unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.api.key, "secret");
        assert_eq!(loaded.api.url, "https://api.maptiler.com");
        assert_eq!(loaded.queue.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_load_rejects_bad_number() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[queue]\nconcurrency = lots\n").unwrap();

        let result = ConfigFile::load_from(&path);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "queue.concurrency",
                ..
            })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConfigFile::default();
        config.apply_env_from(|key| match key {
            ENV_API_KEY => Some("from-env".to_string()),
            ENV_MAP_ID => Some("satellite".to_string()),
            _ => None,
        });

        assert_eq!(config.api.key, "from-env");
        assert_eq!(config.api.map_id, "satellite");
        // URL untouched when the variable is unset.
        assert_eq!(config.api.url, "https://api.maptiler.com");
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("config.ini");

        ConfigFile::default().save_to(&path).unwrap();
        assert!(path.exists());
    }
}
