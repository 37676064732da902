//! Configuration for Urja-Guard
//!
//! Loads configuration from a TOML file. Every numeric threshold and
//! duration in the protection protocol is configuration, not a hardcoded
//! constant; the embedded defaults match the reference hardware (Raspberry
//! Pi with a MAX17040 on I2C bus 3, charge detect on GPIO 4).

use crate::error::Result;
use crate::gauge::{ChipProfile, ChipVariant};
use crate::monitor::Thresholds;
use crate::validate::ValidatorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub chip: ChipConfig,
    pub validation: ValidatorConfig,
    pub recovery: RecoveryConfig,
    pub charging: ChargingConfig,
    pub thresholds: Thresholds,
    pub monitor: MonitorConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig,
}

/// Fuel gauge chip and bus configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChipConfig {
    /// Chip variant (selects scale constants and command support)
    pub variant: ChipVariant,
    /// I2C bus number (e.g., 3 for /dev/i2c-3)
    pub i2c_bus: u8,
    /// 7-bit device address
    pub i2c_address: u16,
    /// Override the usable-capacity remap floor (raw percent)
    pub percent_floor: Option<f64>,
    /// Override the usable-capacity remap gain
    pub percent_gain: Option<f64>,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            variant: ChipVariant::Max17040,
            i2c_bus: 3,
            i2c_address: 0x36,
            percent_floor: None,
            percent_gain: None,
        }
    }
}

impl ChipConfig {
    /// Resolve the chip profile, applying any remap overrides
    pub fn profile(&self) -> ChipProfile {
        let mut profile = ChipProfile::for_variant(self.variant);
        if let Some(floor) = self.percent_floor {
            profile.percent_floor = floor;
        }
        if let Some(gain) = self.percent_gain {
            profile.percent_gain = gain;
        }
        profile
    }
}

/// Recovery policy configuration
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Consecutive bad readings before recovery is attempted
    pub bad_reading_threshold: u32,
    /// Minimum seconds between chip resets
    pub reset_cooldown_secs: u64,
    /// Minimum seconds between quick-starts
    pub quick_start_cooldown_secs: u64,
    /// Settle time after a recovery command before the re-read
    pub stabilize_delay_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            bad_reading_threshold: 3,
            reset_cooldown_secs: 300,
            quick_start_cooldown_secs: 300,
            stabilize_delay_secs: 1,
        }
    }
}

/// Charge detection and window configuration
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ChargingConfig {
    /// GPIO pin carrying the charge-detect signal (high = charging)
    pub charge_detect_gpio: u8,
    /// Seconds the validation window stays open after charging stops
    pub window_secs: u64,
}

impl Default for ChargingConfig {
    fn default() -> Self {
        Self {
            charge_detect_gpio: 4,
            window_secs: 300,
        }
    }
}

/// Shutdown monitor configuration
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between status polls
    pub poll_interval_secs: u64,
    /// Minimum seconds between repeated warnings
    pub renotify_interval_secs: u64,
    /// One-second ticks in the shutdown countdown
    pub countdown_ticks: u32,
    /// Ticks to pause between the final alert and the shutdown command
    pub final_pause_ticks: u32,
    /// Maximum status record age before it is treated as unknown
    pub status_max_age_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            renotify_interval_secs: 300,
            countdown_ticks: 15,
            final_pause_ticks: 2,
            status_max_age_secs: 180,
        }
    }
}

/// Locations of the published record and persisted state
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Published status record (read by monitor, tray and LED consumers)
    pub status: PathBuf,
    /// Persisted recovery bookkeeping
    pub recovery_state: PathBuf,
    /// Persisted charging window state
    pub charging_state: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            status: PathBuf::from("/tmp/battery_status.json"),
            recovery_state: PathBuf::from("/var/lib/urja-guard/recovery.json"),
            charging_state: PathBuf::from("/var/lib/urja-guard/charging.json"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
