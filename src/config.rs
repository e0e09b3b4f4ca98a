//! Configuration loaded from an optional TOML file.
//!
//! Every field has a default, so a missing file or a partial one is fine.
//! The default location is `<config_dir>/gratitude/config.toml`.

use chrono::format::{Item, StrftimeItems};
use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// chrono format string used for entry dates.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_load_timeout_secs() -> u64 {
    10
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("gratitude"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gratitude.log")
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            load_timeout_secs: default_load_timeout_secs(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl ImageConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            image: ImageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gratitude").join("config.toml"))
    }

    /// Loads `explicit` if given (it must exist), otherwise the default
    /// path if present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).wrap_err_with(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.image.load_timeout_secs == 0 {
            return Err(eyre!("image.load_timeout_secs must be at least 1"));
        }
        if self.image.max_bytes == 0 {
            return Err(eyre!("image.max_bytes must be greater than 0"));
        }
        if self.date_format.trim().is_empty() {
            return Err(eyre!("date_format must not be empty"));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(eyre!("date_format `{}` is not a valid strftime string", self.date_format));
        }
        Ok(())
    }
}
