use std::{fs, path::Path, path::PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::state::DEFAULT_SAVE_DEBOUNCE_TICKS;

#[derive(Debug)]
pub enum ConfigLoadError {
    NotFound,
    ParseError(String),
    IoError(String),
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigLoadError::NotFound => write!(f, "Config file not found"),
            ConfigLoadError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigLoadError::IoError(msg) => write!(f, "IO error reading config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigLoadError {}

/// Settings for the script server, read from `tickscript.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Directory containing app sources (default: <data dir>/scripts)
    #[serde(default)]
    pub apps_dir: Option<PathBuf>,

    /// Directory holding persisted app state (default: <data dir>/data)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Ticks to wait before writing global state again after a save
    #[serde(default = "default_save_debounce_ticks")]
    pub save_debounce_ticks: u32,

    /// Apps loaded when the server starts
    #[serde(default)]
    pub autoload: Vec<String>,
}

fn default_save_debounce_ticks() -> u32 {
    DEFAULT_SAVE_DEBOUNCE_TICKS
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            apps_dir: None,
            data_dir: None,
            save_debounce_ticks: DEFAULT_SAVE_DEBOUNCE_TICKS,
            autoload: Vec::new(),
        }
    }
}

impl HostSettings {
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        if !path.exists() {
            return Err(ConfigLoadError::NotFound);
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigLoadError::IoError(e.to_string()))?;
        let settings = Self::from_toml(&content)?;
        info!(target: "scripting", "Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigLoadError> {
        toml::from_str(content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))
    }

    /// Get the apps directory (use provided or default)
    pub fn apps_dir(&self) -> PathBuf {
        self.apps_dir
            .clone()
            .unwrap_or_else(|| default_base_dir().join("scripts"))
    }

    /// Get the state directory (use provided or default)
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default_base_dir().join("data"))
    }
}

fn default_base_dir() -> PathBuf {
    ProjectDirs::from("", "", "tickscript")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tickscript"))
}
