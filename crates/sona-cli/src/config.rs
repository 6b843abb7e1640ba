//! Settings persisted between runs (`config.toml` in the platform config dir).

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{Palette, DARK_PALETTE, DEFAULT_SERVER_URL, DEFAULT_TIMEOUT_SECS, LIGHT_PALETTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Light => &LIGHT_PALETTE,
            Theme::Dark => &DARK_PALETTE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Reads the terminal's colour scheme from a `COLORFGBG` value such as `15;0`.
pub fn theme_from_colorfgbg(value: Option<&str>) -> Option<Theme> {
    let bg: u8 = value?.rsplit(';').next()?.trim().parse().ok()?;
    if matches!(bg, 7 | 9..=15) {
        Some(Theme::Light)
    } else {
        Some(Theme::Dark)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub timeout_secs: u64,
    pub language: Option<String>,
    pub theme: Option<Theme>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            language: None,
            theme: None,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("sona").join("config.toml"),
            None => PathBuf::from("sona.toml"),
        }
    }

    /// Loads the file at `path`, or defaults when it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Writes through a temp file and renames it into place.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, contents).map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;
        Ok(())
    }

    /// Saved preference, else the terminal's scheme, else light.
    pub fn effective_theme(&self) -> Theme {
        self.theme
            .or_else(|| theme_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref()))
            .unwrap_or(Theme::Light)
    }
}
