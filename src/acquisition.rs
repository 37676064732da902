//! Acquisition cycle
//!
//! One full pass of the protection pipeline: sample the charge-detect
//! signal, update the charging window, read and validate the gauge, apply
//! the recovery policy, and publish the status record. Designed to run to
//! completion quickly and exit (systemd-timer style); all state that must
//! survive between invocations lives in the persisted state files.
//!
//! Failure policy: transport faults are downgraded to an error-flagged
//! status record, persistence faults are logged and the cycle continues
//! with in-memory defaults. A gauge glitch must never prevent the shutdown
//! monitor from seeing a fresh (if error-flagged) record.

use crate::charging::{ChargeDetect, ChargingWindowState, GpioChargeDetect};
use crate::config::{AppConfig, PathsConfig};
use crate::error::Result;
use crate::gauge::FuelGauge;
use crate::recovery::{RecoveryController, RecoveryState};
use crate::status::StatusRecord;
use crate::transport::{I2cBus, RegisterBus};
use crate::validate::{CalibrationCurve, Validator};

/// One-shot acquisition pipeline
pub struct AcquisitionCycle<B: RegisterBus, C: ChargeDetect> {
    gauge: FuelGauge<B>,
    charge_detect: C,
    validator: Validator,
    recovery: RecoveryController,
    paths: PathsConfig,
    window_secs: u64,
}

impl AcquisitionCycle<I2cBus, GpioChargeDetect> {
    /// Build the hardware-backed pipeline from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let bus = I2cBus::open(config.chip.i2c_bus, config.chip.i2c_address)?;
        let charge_detect = GpioChargeDetect::open(config.charging.charge_detect_gpio)?;
        let mut gauge = FuelGauge::new(bus, config.chip.profile());
        match gauge.version() {
            Ok(version) => log::debug!("Fuel gauge present, version {:#06x}", version),
            Err(e) => log::warn!("Fuel gauge version probe failed: {}", e),
        }
        Ok(Self::new(gauge, charge_detect, config))
    }
}

impl<B: RegisterBus, C: ChargeDetect> AcquisitionCycle<B, C> {
    pub fn new(gauge: FuelGauge<B>, charge_detect: C, config: &AppConfig) -> Self {
        AcquisitionCycle {
            gauge,
            charge_detect,
            validator: Validator::new(config.validation, CalibrationCurve::default()),
            recovery: RecoveryController::new(config.recovery),
            paths: config.paths.clone(),
            window_secs: config.charging.window_secs,
        }
    }

    /// Run one acquisition cycle and publish the resulting record.
    ///
    /// Returns the published record; an `Err` means even the error-flagged
    /// record could not be written.
    pub fn run_once(&mut self, now: u64) -> Result<StatusRecord> {
        let charging = match self.charge_detect.is_charging() {
            Ok(charging) => charging,
            Err(e) => {
                log::warn!("Charge detect unavailable: {}, assuming not charging", e);
                false
            }
        };

        let mut window = ChargingWindowState::load(&self.paths.charging_state);
        window.observe(charging, now);
        if let Err(e) = window.store(&self.paths.charging_state) {
            log::warn!("Failed to persist charging state: {}", e);
        }
        let in_window = window.is_active(now, self.window_secs);

        let mut recovery_state = RecoveryState::load(&self.paths.recovery_state);

        let reading = match self.gauge.read(now, charging, in_window) {
            Ok(reading) => reading,
            Err(e) => {
                log::error!("Gauge read failed: {}", e);
                let record = StatusRecord::from_error(e.to_string(), now);
                record.publish(&self.paths.status)?;
                return Ok(record);
            }
        };

        let verdict = self
            .validator
            .evaluate(&reading, recovery_state.last_voltage());

        let (final_reading, reset_info) =
            self.recovery
                .handle(&mut self.gauge, reading, &verdict, &mut recovery_state, now);

        if let Err(e) = recovery_state.store(&self.paths.recovery_state) {
            log::warn!("Failed to persist recovery state: {}", e);
        }

        let record = StatusRecord::from_reading(&final_reading, Some(&verdict), reset_info);
        record.publish(&self.paths.status)?;

        log::info!(
            "Cycle complete: {:.3}V {:.1}% (charging={}, window={}, bad={})",
            final_reading.voltage,
            final_reading.percent_user,
            charging,
            in_window,
            verdict.is_bad
        );

        Ok(record)
    }
}
