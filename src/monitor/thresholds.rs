//! Layered threshold evaluation
//!
//! Ordered voltage/percentage thresholds: critical checks always take
//! precedence over warnings, and voltage outranks percentage within each
//! layer.

use crate::status::BatteryFields;
use serde::{Deserialize, Serialize};

/// Warning and critical thresholds on voltage and usable percent
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    pub warning_voltage: f64,
    pub critical_voltage: f64,
    pub warning_percent: f64,
    pub critical_percent: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning_voltage: 3.3,
            critical_voltage: 3.2,
            warning_percent: 5.0,
            critical_percent: 1.0,
        }
    }
}

/// Outcome of evaluating one status record against the thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Ok,
    WarningVoltage,
    WarningPercentage,
    CriticalVoltage,
    CriticalPercentage,
}

impl Condition {
    pub fn is_critical(&self) -> bool {
        matches!(self, Condition::CriticalVoltage | Condition::CriticalPercentage)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Condition::WarningVoltage | Condition::WarningPercentage)
    }
}

/// Evaluate a battery snapshot in fixed priority order
pub fn evaluate_condition(battery: &BatteryFields, thresholds: &Thresholds) -> Condition {
    let v = battery.voltage;
    let p = battery.percent_user;

    if v > 0.0 && v <= thresholds.critical_voltage {
        Condition::CriticalVoltage
    } else if p <= thresholds.critical_percent {
        Condition::CriticalPercentage
    } else if v > 0.0 && v <= thresholds.warning_voltage {
        Condition::WarningVoltage
    } else if p <= thresholds.warning_percent {
        Condition::WarningPercentage
    } else {
        Condition::Ok
    }
}
