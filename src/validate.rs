//! Reading validator
//!
//! Flags physically implausible or internally inconsistent samples from the
//! fuel gauge. This chip family glitches in recognizable ways (byte-swap
//! artifacts after brownouts, stuck SOC, spurious VCELL words), and a bad
//! sample must never drive the shutdown monitor. The validator is pure: it
//! inspects a reading and recent history, and records why a reading is bad
//! without altering it.

use crate::gauge::BatteryReading;
use serde::{Deserialize, Serialize};

/// Cross-plausibility bands: high voltage paired with implausibly low
/// percent. A reading with `voltage >= .0` and `percent_raw <= .1` is bad.
const HIGH_VOLTAGE_LOW_PERCENT: [(f64, f64); 2] = [(4.05, 15.0), (3.95, 5.0)];

/// Low voltage paired with implausibly high percent:
/// `voltage <= .0` and `percent_raw >= .1` is bad.
const LOW_VOLTAGE_HIGH_PERCENT: [(f64, f64); 2] = [(3.25, 40.0), (3.45, 85.0)];

/// Validator tunables
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Absolute lower voltage bound for a single cell
    pub min_voltage: f64,
    /// Absolute upper voltage bound for a single cell
    pub max_voltage: f64,
    /// Maximum deviation from the calibration curve, in percent points
    pub curve_deviation_pct: f64,
    /// Maximum voltage change vs. the last accepted reading
    pub max_voltage_jump: f64,
    /// Tolerated excursion outside 0-100 before a percent is flagged
    pub percent_margin: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_voltage: 2.5,
            max_voltage: 4.3,
            curve_deviation_pct: 20.0,
            max_voltage_jump: 0.5,
            percent_margin: 2.0,
        }
    }
}

/// Result of validating one reading
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub is_bad: bool,
    /// Every check that fired, for diagnostics
    pub reasons: Vec<String>,
}

impl Verdict {
    fn flag(&mut self, reason: String) {
        self.is_bad = true;
        self.reasons.push(reason);
    }
}

/// Reference discharge curve: (voltage, expected percent) breakpoints in
/// descending voltage order. Constant for the process lifetime.
#[derive(Debug, Clone)]
pub struct CalibrationCurve {
    breakpoints: Vec<(f64, f64)>,
}

impl Default for CalibrationCurve {
    /// Single-cell li-ion resting discharge curve
    fn default() -> Self {
        CalibrationCurve {
            breakpoints: vec![
                (4.20, 100.0),
                (4.10, 96.0),
                (4.00, 88.0),
                (3.90, 77.0),
                (3.80, 63.0),
                (3.70, 48.0),
                (3.60, 32.0),
                (3.50, 20.0),
                (3.40, 10.0),
                (3.30, 4.0),
                (3.20, 1.0),
                (3.00, 0.0),
            ],
        }
    }
}

impl CalibrationCurve {
    /// Build a curve from breakpoints in descending voltage order
    ///
    /// # Panics
    ///
    /// Panics if `breakpoints` is empty; a curve with no reference points
    /// cannot produce an expectation.
    pub fn new(breakpoints: Vec<(f64, f64)>) -> Self {
        assert!(!breakpoints.is_empty(), "calibration curve needs at least one breakpoint");
        debug_assert!(breakpoints.windows(2).all(|w| w[0].0 > w[1].0));
        CalibrationCurve { breakpoints }
    }

    /// Expected percent at a voltage: clamped at the endpoints, linearly
    /// interpolated between adjacent breakpoints otherwise.
    pub fn expected_percent(&self, voltage: f64) -> f64 {
        let first = self.breakpoints[0];
        let last = self.breakpoints[self.breakpoints.len() - 1];
        if voltage >= first.0 {
            return first.1;
        }
        if voltage <= last.0 {
            return last.1;
        }
        for pair in self.breakpoints.windows(2) {
            let (v_hi, p_hi) = pair[0];
            let (v_lo, p_lo) = pair[1];
            if voltage <= v_hi && voltage >= v_lo {
                let t = (voltage - v_lo) / (v_hi - v_lo);
                return p_lo + t * (p_hi - p_lo);
            }
        }
        // Descending order guarantees one window matched
        last.1
    }
}

/// Plausibility validator for battery readings
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidatorConfig,
    curve: CalibrationCurve,
}

impl Validator {
    pub fn new(config: ValidatorConfig, curve: CalibrationCurve) -> Self {
        Validator { config, curve }
    }

    /// Evaluate one reading against the physical bounds, the reference
    /// curve, and the last accepted voltage. Any single failed check flags
    /// the whole reading bad.
    pub fn evaluate(&self, reading: &BatteryReading, last_voltage: Option<f64>) -> Verdict {
        let mut verdict = Verdict::default();
        let v = reading.voltage;
        let p = reading.percent_raw;

        if v < self.config.min_voltage || v > self.config.max_voltage {
            verdict.flag(format!(
                "voltage {:.3}V outside physical range {:.2}-{:.2}V",
                v, self.config.min_voltage, self.config.max_voltage
            ));
        }

        for &(v_min, p_max) in &HIGH_VOLTAGE_LOW_PERCENT {
            if v >= v_min && p <= p_max {
                verdict.flag(format!(
                    "voltage {:.3}V too high for reported charge {:.1}%",
                    v, p
                ));
                break;
            }
        }
        for &(v_max, p_min) in &LOW_VOLTAGE_HIGH_PERCENT {
            if v <= v_max && p >= p_min {
                verdict.flag(format!(
                    "voltage {:.3}V too low for reported charge {:.1}%",
                    v, p
                ));
                break;
            }
        }

        let expected = self.curve.expected_percent(v);
        if (expected - p).abs() > self.config.curve_deviation_pct {
            verdict.flag(format!(
                "charge {:.1}% deviates from curve expectation {:.1}% at {:.3}V",
                p, expected, v
            ));
        }

        if let Some(last) = last_voltage {
            if (v - last).abs() > self.config.max_voltage_jump {
                verdict.flag(format!(
                    "sudden voltage change {:.3}V -> {:.3}V",
                    last, v
                ));
            }
        }

        let lo = -self.config.percent_margin;
        let hi = 100.0 + self.config.percent_margin;
        if p < lo || p > hi || reading.percent_user < lo || reading.percent_user > hi {
            verdict.flag(format!(
                "percent out of bounds (raw {:.1}%, user {:.1}%)",
                p, reading.percent_user
            ));
        }

        if verdict.is_bad {
            log::debug!("Reading flagged bad: {}", verdict.reasons.join("; "));
        }
        verdict
    }
}
