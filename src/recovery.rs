//! Recovery controller
//!
//! Decides when a misbehaving fuel gauge gets a power-on reset or a
//! quick-start. Both commands are destructive (the chip temporarily loses
//! accuracy), so recovery runs under a cooldown and only after a run of
//! consecutive bad readings outside any charging window.

use crate::config::RecoveryConfig;
use crate::error::Result;
use crate::gauge::{BatteryReading, FuelGauge};
use crate::transport::RegisterBus;
use crate::validate::Verdict;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Persisted recovery bookkeeping
///
/// Survives process restarts (the acquisition cycle is oneshot). A missing
/// or corrupt state file defaults to "never reset, zero bad count".
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RecoveryState {
    /// Epoch seconds of the last confirmed power-on reset
    pub last_reset: u64,
    /// Consecutive bad readings outside charging windows
    pub bad_reading_count: u32,
    /// Voltage of the last accepted-good reading (jump detection reference)
    pub last_voltage: f64,
    /// Epoch seconds of the last confirmed quick-start
    pub last_quick_start: u64,
}

impl RecoveryState {
    /// Load persisted state, defaulting to zeroed state on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("Corrupt recovery state {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Persist state (last writer wins, no locking needed)
    pub fn store(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Reference voltage for jump detection, if one has been accepted yet
    pub fn last_voltage(&self) -> Option<f64> {
        if self.last_voltage > 0.0 {
            Some(self.last_voltage)
        } else {
            None
        }
    }
}

/// Structured metadata for one recovery decision, attached to the outgoing
/// status record; never alters raw readings retroactively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResetInfo {
    pub attempted: bool,
    pub performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub reason: String,
    pub timestamp: u64,
}

/// Cooldown- and charging-aware recovery policy
pub struct RecoveryController {
    config: RecoveryConfig,
}

impl RecoveryController {
    pub fn new(config: RecoveryConfig) -> Self {
        RecoveryController { config }
    }

    /// Apply the recovery policy to one validated reading.
    ///
    /// Returns the reading to publish (the post-recovery re-read when a
    /// reset was performed and the re-read succeeded) plus any recovery
    /// metadata. Mutates `state` in place; the caller persists it.
    pub fn handle<B: RegisterBus>(
        &self,
        gauge: &mut FuelGauge<B>,
        reading: BatteryReading,
        verdict: &Verdict,
        state: &mut RecoveryState,
        now: u64,
    ) -> (BatteryReading, Option<ResetInfo>) {
        if !verdict.is_bad {
            state.bad_reading_count = 0;
            state.last_voltage = reading.voltage;
            return (reading, None);
        }

        if reading.in_window {
            // Charging legitimately perturbs the curve; neither count nor
            // reset while a window is active.
            log::debug!("Bad reading inside charging window, ignored");
            return (reading, None);
        }

        state.bad_reading_count += 1;
        log::info!(
            "Bad reading {}/{}: {}",
            state.bad_reading_count,
            self.config.bad_reading_threshold,
            verdict.reasons.join("; ")
        );

        if state.bad_reading_count < self.config.bad_reading_threshold {
            return (reading, None);
        }

        self.attempt_recovery(gauge, reading, verdict, state, now)
    }

    fn attempt_recovery<B: RegisterBus>(
        &self,
        gauge: &mut FuelGauge<B>,
        reading: BatteryReading,
        verdict: &Verdict,
        state: &mut RecoveryState,
        now: u64,
    ) -> (BatteryReading, Option<ResetInfo>) {
        let reason = verdict.reasons.join("; ");

        let reset_ready = now.saturating_sub(state.last_reset) >= self.config.reset_cooldown_secs;
        let quick_start_ready = gauge.profile().supports_quick_start
            && now.saturating_sub(state.last_quick_start) >= self.config.quick_start_cooldown_secs;

        enum Method {
            Reset,
            QuickStart,
        }
        impl Method {
            fn as_str(&self) -> &'static str {
                match self {
                    Method::Reset => "reset",
                    Method::QuickStart => "quick_start",
                }
            }
        }

        let (method, outcome): (Method, Result<()>) = if reset_ready {
            (Method::Reset, gauge.reset())
        } else if quick_start_ready {
            (Method::QuickStart, gauge.quick_start())
        } else {
            log::info!("Recovery needed but cooldown active, no action");
            return (
                reading,
                Some(ResetInfo {
                    attempted: false,
                    performed: false,
                    method: None,
                    reason: format!("cooldown active ({})", reason),
                    timestamp: now,
                }),
            );
        };

        match outcome {
            Ok(()) => {
                // Cooldown stamps update only on confirmed success.
                match method {
                    Method::Reset => state.last_reset = now,
                    Method::QuickStart => state.last_quick_start = now,
                }
                state.bad_reading_count = 0;

                if self.config.stabilize_delay_secs > 0 {
                    std::thread::sleep(Duration::from_secs(self.config.stabilize_delay_secs));
                }

                let (final_reading, note) =
                    match gauge.read(now, reading.charging, reading.in_window) {
                        Ok(reread) => {
                            log::info!(
                                "Post-recovery re-read: {:.3}V {:.1}%",
                                reread.voltage,
                                reread.percent_raw
                            );
                            (reread, reason)
                        }
                        Err(e) => {
                            log::warn!("Re-read after {} failed: {}", method.as_str(), e);
                            (reading, format!("{} (re-read failed: {})", reason, e))
                        }
                    };

                (
                    final_reading,
                    Some(ResetInfo {
                        attempted: true,
                        performed: true,
                        method: Some(method.as_str().to_string()),
                        reason: note,
                        timestamp: now,
                    }),
                )
            }
            Err(e) => {
                // Non-fatal: publish the pre-recovery reading, retry on the
                // next threshold re-trigger.
                log::error!("Fuel gauge {} failed: {}", method.as_str(), e);
                (
                    reading,
                    Some(ResetInfo {
                        attempted: true,
                        performed: false,
                        method: Some(method.as_str().to_string()),
                        reason: format!("{} failed: {} ({})", method.as_str(), e, reason),
                        timestamp: now,
                    }),
                )
            }
        }
    }
}
