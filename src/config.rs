use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

const APP_DIR: &str = "bili-dl";

/// Settings file contents; every key is optional.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "Settings::default_output")]
    pub output: PathBuf,
    #[serde(default = "Settings::default_threads")]
    pub threads: usize,
    #[serde(default = "Settings::default_quality")]
    pub quality: String,
    #[serde(default = "Settings::default_format")]
    pub format: String,
    #[serde(default)]
    pub verbose: bool,
}

impl Settings {
    fn default_output() -> PathBuf {
        PathBuf::from("./downloads")
    }

    fn default_threads() -> usize {
        4
    }

    fn default_quality() -> String {
        "best".to_string()
    }

    fn default_format() -> String {
        "mp4".to_string()
    }

    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)?;
        toml::from_str(&data)
            .map_err(|err| Error::Config(format!("{}: {}", path.display(), err)))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output: Self::default_output(),
            threads: Self::default_threads(),
            quality: Self::default_quality(),
            format: Self::default_format(),
            verbose: false,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn credentials_path() -> PathBuf {
    config_dir().join("cookies.json")
}
