//! Application Configuration
//! Optional JSON settings file; every field falls back to a default.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Env var overriding the settings file location
pub const CONFIG_ENV: &str = "WORM_MERGER_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "worm_merger.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sub-folder searched by the Lethargus searcher
    pub results_dir: String,
    pub lethargus_file: String,
    /// File name suggested in the save dialog
    pub default_output_name: String,
    pub sheet_name: String,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            results_dir: "results".to_string(),
            lethargus_file: "Lethargus_dataframe.csv".to_string(),
            default_output_name: "merged.xlsx".to_string(),
            sheet_name: "Sheet1".to_string(),
            window_width: 900.0,
            window_height: 520.0,
        }
    }
}

impl Config {
    /// Settings file path: `$WORM_MERGER_CONFIG` or `./worm_merger.json`.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read settings from `path`. A missing file yields the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the default location, logging and ignoring a broken file.
    pub fn load() -> Self {
        let path = Self::default_path();
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{} ignored: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, r#"{{ "results_dir": "out", "sheet_name": "Worms" }}"#).unwrap();

        let config = Config::from_file(tmp.path()).unwrap();
        assert_eq!(config.results_dir, "out");
        assert_eq!(config.sheet_name, "Worms");
        assert_eq!(config.lethargus_file, "Lethargus_dataframe.csv");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{{ not json").unwrap();
        assert!(matches!(
            Config::from_file(tmp.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
