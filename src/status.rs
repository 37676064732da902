//! Status publisher
//!
//! Serializes the latest reading plus validation/recovery metadata into the
//! canonical status record consumed by the shutdown monitor, the tray
//! widget and the LED driver. The record is replaced atomically
//! (write-to-temp-then-rename) so readers never observe a partial write;
//! staleness is detected by timestamp age, never by absence.

use crate::error::{Error, Result};
use crate::gauge::BatteryReading;
use crate::recovery::ResetInfo;
use crate::validate::Verdict;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Validation annotations carried on the status record
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationInfo {
    pub bad: bool,
    pub reasons: Vec<String>,
}

impl From<&Verdict> for ValidationInfo {
    fn from(verdict: &Verdict) -> Self {
        ValidationInfo {
            bad: verdict.is_bad,
            reasons: verdict.reasons.clone(),
        }
    }
}

/// Battery fields of the published record
///
/// Optional fields are omitted when unknown; readers must treat absence as
/// "unknown", not zero.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct BatteryFields {
    pub voltage: f64,
    pub percent_user: f64,
    pub percent_raw: f64,
    /// Epoch seconds of the sample (or of the failed cycle)
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub charging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub validation: Option<ValidationInfo>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reset_info: Option<ResetInfo>,
}

/// The externally published snapshot
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StatusRecord {
    pub battery: BatteryFields,
}

impl StatusRecord {
    /// Build a record from a decoded reading and its annotations
    pub fn from_reading(
        reading: &BatteryReading,
        verdict: Option<&Verdict>,
        reset_info: Option<ResetInfo>,
    ) -> Self {
        StatusRecord {
            battery: BatteryFields {
                voltage: reading.voltage,
                percent_user: reading.percent_user,
                percent_raw: reading.percent_raw,
                timestamp: reading.timestamp,
                charging: Some(reading.charging),
                error: None,
                validation: verdict.map(ValidationInfo::from),
                reset_info,
            },
        }
    }

    /// Build an error-flagged record for a cycle that produced no reading.
    ///
    /// Published instead of silently leaving the previous record in place;
    /// the fresh timestamp keeps age checks meaningful.
    pub fn from_error(message: String, timestamp: u64) -> Self {
        StatusRecord {
            battery: BatteryFields {
                timestamp,
                error: Some(message),
                ..Default::default()
            },
        }
    }

    /// Atomically replace the status record on disk
    pub fn publish(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, path)?;
        log::debug!("Published status to {}", path.display());
        Ok(())
    }

    /// Read the current record back
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Persistence(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Seconds since the record's sample was taken
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.battery.timestamp)
    }
}
