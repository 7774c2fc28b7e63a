//! Configuration management (config.toml)
//!
//! Handles loading, saving, and providing defaults for front-end settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::{DEFAULT_BLOCK_FRAMES, DEFAULT_CAPACITY, DEFAULT_SAMPLE_RATE};
use crate::input::KeyboardMapping;
use crate::pacer::{DEFAULT_FRAME_RATE, PacerConfig};
use crate::session::SessionConfig;

const CONFIG_FILE: &str = "config.toml";

/// Errors from reading or writing the configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Front-end configuration.
///
/// Every section and field has a default, so partial files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,
    /// Frame pacing and autosave settings
    #[serde(default)]
    pub timing: TimingConfig,
    /// Host key to button bindings
    #[serde(default)]
    pub input: KeyboardMapping,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output volume (default: 0.1, range: 0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Rate requested from sinks without a device clock (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Bridge capacity in samples (default: 16384)
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Frames pulled per block by the clocked sink (default: 128)
    #[serde(default = "default_block_frames")]
    pub block_frames: usize,
}

/// Timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Emulated refresh rate in Hz (default: 59.7)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    /// Seconds of emulated time between save-RAM autosaves, 0 disables (default: 300)
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
}

fn default_volume() -> f32 {
    0.1
}
fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}
fn default_buffer_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_block_frames() -> usize {
    DEFAULT_BLOCK_FRAMES
}
fn default_frame_rate() -> f64 {
    DEFAULT_FRAME_RATE
}
fn default_autosave_secs() -> u64 {
    300
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            sample_rate: default_sample_rate(),
            buffer_capacity: default_buffer_capacity(),
            block_frames: default_block_frames(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            autosave_secs: default_autosave_secs(),
        }
    }
}

impl Config {
    /// Read a config file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Write a config file, creating its parent directory
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn pacer_config(&self) -> PacerConfig {
        PacerConfig::for_frame_rate(self.timing.frame_rate)
            .with_autosave_interval(Duration::from_secs(self.timing.autosave_secs))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            pacer: self.pacer_config(),
            buffer_capacity: self.audio.buffer_capacity,
            volume: self.audio.volume.clamp(0.0, 1.0),
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Retroglue\config`
/// On macOS: `~/Library/Application Support/io.retroglue.Retroglue`
/// On Linux: `~/.config/retroglue`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.retroglue", "", "Retroglue")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory, where save RAM is stored.
///
/// Returns `None` if the home directory cannot be determined.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.retroglue", "", "Retroglue")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

/// Path of the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Loads the configuration from disk.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_or_default(&path)
}

/// Loads `path`, falling back to defaults (with a warning for a broken file)
pub fn load_or_default(path: &Path) -> Config {
    match Config::load_from(path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            Config::default()
        }
    }
}

/// Configuration with change tracking
///
/// The file is only rewritten when a setting actually changed.
#[derive(Debug, Clone)]
pub struct Settings {
    config: Config,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Settings {
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        Self {
            config,
            path,
            dirty: false,
        }
    }

    /// Load from `path`, or from the platform config file when `None`
    pub fn load(path: Option<PathBuf>) -> Self {
        let path = path.or_else(config_path);
        let config = path.as_deref().map(load_or_default).unwrap_or_default();
        Self::new(config, path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn volume(&self) -> f32 {
        self.config.audio.volume
    }

    /// Volume as a whole percentage
    pub fn volume_percent(&self) -> u32 {
        (self.config.audio.volume * 100.0).round() as u32
    }

    /// Set the volume, clamped to 0.0-1.0; marks the settings dirty on change
    pub fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        if self.config.audio.volume != volume {
            self.config.audio.volume = volume;
            self.dirty = true;
        }
    }

    pub fn set_volume_percent(&mut self, percent: u32) {
        self.set_volume(percent as f32 / 100.0);
    }

    /// Write the config if anything changed; returns whether it was written
    pub fn save_if_dirty(&mut self) -> Result<bool, ConfigError> {
        if !self.dirty {
            return Ok(false);
        }
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        self.config.save_to(path)?;
        self.dirty = false;
        debug!("Saved config to {}", path.display());
        Ok(true)
    }
}
