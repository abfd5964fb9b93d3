//! Viewer configuration
//!
//! Configuration is stored as YAML in the user's config directory.
//! Default location: ~/.config/waveviewer/config.yaml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ViewerConfig {
    pub assets: AssetConfig,
    pub playback: PlaybackConfig,
    pub waveform: WaveformConfig,
}

/// Where bundled sample audio lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding the bundled assets
    pub root: PathBuf,
    /// Bundled asset names, loaded in this order by "next sample"
    pub defaults: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            defaults: vec![
                "music_mono_44100Hz_16bit.wav".to_string(),
                "gravitational_wave_mono_44100Hz_16bit.wav".to_string(),
                "whistle_mono_44100Hz_16bit.wav".to_string(),
            ],
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Position refresh interval while playing (17 ms is roughly 60 Hz)
    pub refresh_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 17,
        }
    }
}

impl PlaybackConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

/// Waveform drawing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Raw samples per drawn point
    pub stride: usize,
    /// Length of the reveal animation
    pub animation_ms: u64,
    /// Left and right padding in pixels
    pub horizontal_inset: f32,
    /// Top and bottom padding in pixels
    pub vertical_inset: f32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            stride: 2000,
            animation_ms: 1000,
            horizontal_inset: 45.0,
            vertical_inset: 50.0,
        }
    }
}

impl WaveformConfig {
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_ms)
    }
}

/// Get the default config file path
///
/// Returns: ~/.config/waveviewer/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("waveviewer")
        .join("config.yaml")
}

/// Load configuration from a YAML file
///
/// If the file doesn't exist, returns default config.
/// If the file exists but is invalid, logs a warning and returns default config.
pub fn load_config(path: &Path) -> ViewerConfig {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return ViewerConfig::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<ViewerConfig>(&contents) {
            Ok(config) => {
                log::info!(
                    "load_config: Loaded config - asset root: {:?}, stride: {}, refresh: {} ms",
                    config.assets.root,
                    config.waveform.stride,
                    config.playback.refresh_interval_ms
                );
                config
            }
            Err(e) => {
                log::warn!("load_config: Failed to parse config: {}, using defaults", e);
                ViewerConfig::default()
            }
        },
        Err(e) => {
            log::warn!(
                "load_config: Failed to read config file: {}, using defaults",
                e
            );
            ViewerConfig::default()
        }
    }
}

/// Save configuration to a YAML file
///
/// Creates parent directories if they don't exist.
pub fn save_config(config: &ViewerConfig, path: &Path) -> Result<()> {
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Config saved successfully");
    Ok(())
}
