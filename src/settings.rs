//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/gridlock/settings.toml (or platform equivalent)

use crate::error::SettingsError;
use crate::room::RoomPolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub grid: GridSettings,
    pub rooms: RoomSettings,
    pub logging: LoggingSettings,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the TCP listener binds to
    pub bind: String,
    /// Maintenance tick in milliseconds
    pub tick_ms: u64,
}

/// Grid dimensions for new rooms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub width: usize,
    pub height: usize,
}

/// Room lifecycle timings, all in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    pub empty_room_delete_secs: u64,
    pub progressed_room_delete_secs: u64,
    pub reconnect_window_secs: u64,
    pub inactivity_threshold_secs: u64,
    pub sweep_interval_secs: u64,
    pub room_id_length: usize,
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Extra filter directives, e.g. "gridlock=debug"
    pub filter: String,
    /// Write daily log files here instead of stdout
    pub directory: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
            tick_ms: 1000,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width: crate::grid::GRID_WIDTH,
            height: crate::grid::GRID_HEIGHT,
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        let policy = RoomPolicy::default();
        Self {
            empty_room_delete_secs: policy.empty_room_delay.as_secs(),
            progressed_room_delete_secs: policy.progressed_room_delay.as_secs(),
            reconnect_window_secs: policy.reconnect_window.as_secs(),
            inactivity_threshold_secs: policy.inactivity_threshold.as_secs(),
            sweep_interval_secs: policy.sweep_interval.as_secs(),
            room_id_length: policy.room_id_length,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "gridlock=info".to_string(),
            directory: None,
        }
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "gridlock", "gridlock").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load from an explicit path (errors are fatal), else the default
    /// location (missing or unreadable file falls back to defaults)
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = path {
            let contents = fs::read_to_string(path)?;
            return Self::from_toml(&contents);
        }

        let Some(path) = Self::settings_path() else {
            return Ok(Self::default());
        };
        match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(contents)?)
    }

    /// Save settings to the default location, returning the path written
    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let dir = Self::config_dir().ok_or(SettingsError::NoConfigDir)?;
        let path = dir.join("settings.toml");

        fs::create_dir_all(&dir)?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;

        Ok(path)
    }

    /// Room rules derived from the `[rooms]` and `[grid]` sections
    pub fn room_policy(&self) -> RoomPolicy {
        RoomPolicy {
            empty_room_delay: Duration::from_secs(self.rooms.empty_room_delete_secs),
            progressed_room_delay: Duration::from_secs(self.rooms.progressed_room_delete_secs),
            reconnect_window: Duration::from_secs(self.rooms.reconnect_window_secs),
            inactivity_threshold: Duration::from_secs(self.rooms.inactivity_threshold_secs),
            sweep_interval: Duration::from_secs(self.rooms.sweep_interval_secs),
            room_id_length: self.rooms.room_id_length,
            grid_width: self.grid.width.max(1),
            grid_height: self.grid.height.max(1),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.server.tick_ms.max(10))
    }
}
