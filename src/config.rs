use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::correlate::MissingPolicy;
use crate::metadata::runs::AlbumPolicy;

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory for rebuilt files.
    pub output_dir: PathBuf,
    /// ffmpeg binary (name on PATH or absolute path).
    pub ffmpeg: PathBuf,
    /// Extension of rebuilt audio files.
    pub extension: String,
    /// How album-tagged runs reduce to one album: "strict" or "last-run".
    pub album_policy: AlbumPolicy,
    /// Tracks without metadata or audio: "abort" or "skip".
    pub on_missing: MissingPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            ffmpeg: PathBuf::from("ffmpeg"),
            extension: crate::DEFAULT_EXTENSION.to_string(),
            album_policy: AlbumPolicy::default(),
            on_missing: MissingPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/harmux/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load a specific config file, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
