// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/quakewatch

//! Configuration module

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{QuakeError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Waveform buffer configuration
    pub buffer: BufferConfig,

    /// Hypocenter finder configuration
    pub finder: FinderSettings,

    /// Analysis cycle configuration
    pub analysis: AnalysisConfig,

    /// Synthetic scenario used by the playground binary
    pub playground: PlaygroundConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("quakewatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.buffer.sample_rate > 0.0) {
            return Err(QuakeError::config("buffer.sample_rate must be positive"));
        }
        if !(self.buffer.seconds > 0.0) {
            return Err(QuakeError::config("buffer.seconds must be positive"));
        }
        if !(0.0..=100.0).contains(&self.finder.resolution) {
            return Err(QuakeError::config("finder.resolution must be within 0..=100"));
        }
        if !(0.0..=100.0).contains(&self.finder.correctness_threshold) {
            return Err(QuakeError::config(
                "finder.correctness_threshold must be within 0..=100",
            ));
        }
        if !(self.finder.p_wave_inaccuracy_threshold > 0.0) {
            return Err(QuakeError::config(
                "finder.p_wave_inaccuracy_threshold must be positive",
            ));
        }
        if self.playground.station_count == 0 {
            return Err(QuakeError::config("playground.station_count must be at least 1"));
        }
        Ok(())
    }
}

/// Per-station waveform buffer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Sample rate in Hz
    pub sample_rate: f64,

    /// Seconds of history kept per station
    pub seconds: f64,

    /// Skip the raw and filtered channels
    pub server_mode: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            sample_rate: 20.0,
            seconds: 300.0,
            server_mode: false,
        }
    }
}

/// Hypocenter finder tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderSettings {
    /// Largest P-wave timing error still counted as correct, ms
    pub p_wave_inaccuracy_threshold: f64,

    /// Percentage of correct selected picks required to commit
    pub correctness_threshold: f64,

    /// Search resolution, 0 (coarse) to 100 (fine)
    pub resolution: f64,
}

impl Default for FinderSettings {
    fn default() -> Self {
        Self {
            p_wave_inaccuracy_threshold: 1000.0,
            correctness_threshold: 40.0,
            resolution: 40.0,
        }
    }
}

impl FinderSettings {
    /// Scale applied to every sweep step: about 0.27 at resolution 0, 1.0 at 40, about 4.82 at 100
    pub fn universal_multiplier(&self) -> f64 {
        let x = self.resolution;
        (x * x + 600.0) / 2200.0
    }

    /// Extra ternary iterations relative to the default resolution
    pub fn iterations_difference(&self) -> i32 {
        ((self.resolution - 40.0) / 14.0).round() as i32
    }
}

/// Analysis cycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Worker threads for the analysis pool (0 = one per core)
    pub worker_threads: usize,

    /// Delay between analysis cycles in milliseconds
    pub cycle_interval_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            cycle_interval_ms: 1000,
        }
    }
}

/// Synthetic earthquake scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Number of simulated stations
    pub station_count: usize,

    /// Stations are scattered within this distance of the epicenter, km
    pub network_radius_km: f64,

    /// RNG seed
    pub seed: u64,

    pub lat: f64,
    pub lon: f64,
    pub depth: f64,
    pub magnitude: f64,

    /// Simulated sample rate in Hz
    pub sample_rate: f64,

    /// Background noise standard deviation, counts
    pub noise: f64,

    /// Seconds simulated after the origin
    pub duration_secs: f64,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            station_count: 24,
            network_radius_km: 300.0,
            seed: 42,
            lat: 35.0,
            lon: 139.0,
            depth: 15.0,
            magnitude: 5.5,
            sample_rate: 20.0,
            noise: 100.0,
            duration_secs: 180.0,
        }
    }
}
