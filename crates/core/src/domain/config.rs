//! Configuration management for Murmur
//!
//! This module provides:
//! - Configuration structs for the application and the SFX mixer
//! - TOML serialization with async load/save
//! - A config manager that falls back to factory defaults

use crate::domain::audio::SampleRate;
use crate::domain::mixer::{GateSettings, MixerSettings, TrackSettings, VolumeDecibels};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Samples per processed block
    pub block_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { block_size: 512 }
    }
}

/// Voice-activity gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Primary RMS level (dBFS) that opens the gate; absent = no gating
    #[serde(default)]
    pub threshold_db: Option<f32>,

    /// Milliseconds the gate stays open after the level drops
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u32,
}

fn default_hold_ms() -> u32 {
    GateSettings::default().hold_ms
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold_db: None,
            hold_ms: default_hold_ms(),
        }
    }
}

/// Per-file track configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackConfig {
    pub file: String,
    #[serde(default)]
    pub gain_db: f32,
    #[serde(default)]
    pub muted: bool,
}

impl TrackConfig {
    pub fn to_settings(&self) -> TrackSettings {
        TrackSettings {
            volume: VolumeDecibels::new(self.gain_db),
            muted: self.muted,
        }
    }
}

/// Background sound configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SfxConfig {
    pub enabled: bool,

    /// Rate every track is resampled to
    pub output_sample_rate: u32,

    /// Directory scanned for `.wav` files
    pub source_dir: PathBuf,

    #[serde(default)]
    pub master_gain_db: f32,

    /// Reload automatically when the source directory changes
    #[serde(default)]
    pub watch: bool,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub tracks: Vec<TrackConfig>,
}

impl Default for SfxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_sample_rate: 48000,
            source_dir: PathBuf::from("sfx"),
            master_gain_db: 0.0,
            watch: false,
            gate: GateConfig::default(),
            tracks: Vec::new(),
        }
    }
}

impl SfxConfig {
    pub fn sample_rate(&self) -> SampleRate {
        SampleRate::from_hz(self.output_sample_rate)
    }

    /// Track settings keyed by file name
    pub fn track_settings(&self) -> HashMap<String, TrackSettings> {
        self.tracks
            .iter()
            .map(|track| (track.file.clone(), track.to_settings()))
            .collect()
    }

    pub fn mixer_settings(&self, block_size: usize) -> MixerSettings {
        MixerSettings {
            enabled: self.enabled,
            sample_rate: self.sample_rate(),
            block_size,
            master_gain: VolumeDecibels::new(self.master_gain_db),
            gate: self.gate.threshold_db.map(|threshold_db| GateSettings {
                threshold_db,
                hold_ms: self.gate.hold_ms,
            }),
        }
    }
}

/// Complete Murmur configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MurmurConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub sfx: SfxConfig,
}

impl MurmurConfig {
    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    /// Reject values the mixer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sfx.output_sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "sfx.output_sample_rate must be positive".to_string(),
            ));
        }
        if self.app.block_size == 0 {
            return Err(ConfigError::Invalid(
                "app.block_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Create factory default configuration
    pub fn factory_default() -> Self {
        Self::default()
    }

    pub fn mixer_settings(&self) -> MixerSettings {
        self.sfx.mixer_settings(self.app.block_size)
    }
}

/// Configuration manager for the main Murmur config
///
/// Manages the main configuration file at `~/.config/murmur/config.toml`.
pub struct ConfigManager {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        let config_path = config_dir.join("config.toml");

        Self {
            config_dir,
            config_path,
        }
    }

    /// Get the default config directory path
    ///
    /// Returns `~/.config/murmur` on Linux/Mac
    /// Returns `%APPDATA%\murmur` on Windows
    pub fn default_config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("murmur"))
            .ok_or_else(|| ConfigError::Invalid("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file
    ///
    /// If the config file doesn't exist, returns factory default.
    /// If the config file is corrupt, logs an error and returns factory default.
    #[instrument(skip(self))]
    pub async fn load(&self) -> MurmurConfig {
        if !self.config_path.exists() {
            info!(
                path = %self.config_path.display(),
                "Config file not found, creating factory default"
            );

            let config = MurmurConfig::factory_default();

            // Save the factory default for next time
            if let Err(e) = config.save_to_file(&self.config_path).await {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to save factory default config"
                );
            }

            return config;
        }

        match MurmurConfig::load_from_file(&self.config_path).await {
            Ok(config) => config,
            Err(e) => {
                error!(
                    path = %self.config_path.display(),
                    error = %e,
                    "Failed to load config, using factory default"
                );

                // Backup the corrupt config
                let backup_path = self.config_path.with_extension("toml.corrupt");
                if let Err(copy_err) = fs::copy(&self.config_path, &backup_path).await {
                    error!(
                        path = %backup_path.display(),
                        error = %copy_err,
                        "Failed to backup corrupt config"
                    );
                }

                MurmurConfig::factory_default()
            }
        }
    }

    /// Save configuration to file
    #[instrument(skip(self, config))]
    pub async fn save(&self, config: &MurmurConfig) -> Result<()> {
        fs::create_dir_all(&self.config_dir).await?;

        config.save_to_file(&self.config_path).await
    }

    /// Check if config file exists
    pub fn exists(&self) -> bool {
        self.config_path.exists()
    }
}
