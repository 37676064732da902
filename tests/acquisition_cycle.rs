//! Acquisition cycle integration tests
//!
//! Runs the full read -> validate -> recover -> publish pipeline over the
//! mock register bus with filesystem-backed state, covering:
//! - status record round-trip for good readings
//! - error-flagged publication on transport faults
//! - jump detection across consecutive cycles
//! - threshold-triggered chip reset and its metadata
//! - charging window suppression of recovery
//!
//! Run with: `cargo test --test acquisition_cycle`

use urja_guard::acquisition::AcquisitionCycle;
use urja_guard::charging::{ChargingWindowState, FixedChargeDetect};
use urja_guard::config::AppConfig;
use urja_guard::gauge::profile::{CMD_POWER_ON_RESET, REG_COMMAND, REG_SOC, REG_VCELL};
use urja_guard::gauge::FuelGauge;
use urja_guard::recovery::RecoveryState;
use urja_guard::status::StatusRecord;
use urja_guard::transport::MockBus;

/// Register word for a voltage on the single-cell profile (78.125 uV/LSB)
fn vcell_word(voltage: f64) -> u16 {
    (voltage / 0.000078125).round() as u16
}

/// Register word for a whole raw percent
fn soc_word(percent: u16) -> u16 {
    percent << 8
}

struct Harness {
    config: AppConfig,
    bus: MockBus,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.status = dir.path().join("battery_status.json");
        config.paths.recovery_state = dir.path().join("recovery.json");
        config.paths.charging_state = dir.path().join("charging.json");
        config.recovery.stabilize_delay_secs = 0;
        Harness {
            config,
            bus: MockBus::new(),
            _dir: dir,
        }
    }

    fn set_gauge(&self, voltage: f64, percent: u16) {
        self.bus.set_register(REG_VCELL, vcell_word(voltage));
        self.bus.set_register(REG_SOC, soc_word(percent));
    }

    fn cycle(&self, charging: bool) -> AcquisitionCycle<MockBus, FixedChargeDetect> {
        AcquisitionCycle::new(
            FuelGauge::new(self.bus.clone(), self.config.chip.profile()),
            FixedChargeDetect(charging),
            &self.config,
        )
    }
}

#[test]
fn test_good_reading_published_and_roundtrips() {
    let h = Harness::new();
    h.set_gauge(3.9, 77);
    let record = h.cycle(false).run_once(1_000_000).unwrap();

    assert!((record.battery.voltage - 3.9).abs() < 1e-9);
    assert!((record.battery.percent_raw - 77.0).abs() < 1e-9);
    assert_eq!(record.battery.timestamp, 1_000_000);
    assert_eq!(record.battery.charging, Some(false));
    assert!(record.battery.error.is_none());
    assert!(!record.battery.validation.as_ref().unwrap().bad);

    // Field-for-field round trip through the published file
    let loaded = StatusRecord::load(&h.config.paths.status).unwrap();
    assert_eq!(loaded, record);

    // Accepted reading became the jump reference
    let state = RecoveryState::load(&h.config.paths.recovery_state);
    assert_eq!(state.bad_reading_count, 0);
    assert!((state.last_voltage - 3.9).abs() < 1e-9);
}

#[test]
fn test_transport_fault_publishes_error_record() {
    let h = Harness::new();
    h.set_gauge(3.9, 77);
    h.bus.fail_read(REG_VCELL, "bus timeout");
    let record = h.cycle(false).run_once(2_000_000).unwrap();

    assert!(record.battery.error.is_some());
    assert_eq!(record.battery.timestamp, 2_000_000);
    // Record replaces any previous one rather than going silently stale
    let loaded = StatusRecord::load(&h.config.paths.status).unwrap();
    assert!(loaded.battery.error.is_some());
}

#[test]
fn test_sudden_voltage_jump_flagged_across_cycles() {
    let h = Harness::new();

    // 3.25V -> 3.19V is a normal sag
    h.set_gauge(3.25, 3);
    h.cycle(false).run_once(1000).unwrap();
    h.set_gauge(3.19, 2);
    let record = h.cycle(false).run_once(1060).unwrap();
    assert!(!record.battery.validation.as_ref().unwrap().bad);

    // 3.19V -> 2.60V is a 0.59V jump
    h.set_gauge(2.60, 1);
    let record = h.cycle(false).run_once(1120).unwrap();
    let validation = record.battery.validation.as_ref().unwrap();
    assert!(validation.bad);
    assert!(validation
        .reasons
        .iter()
        .any(|r| r.contains("sudden voltage change")));
    // One bad reading is below the recovery threshold: no reset
    assert!(h.bus.writes().is_empty());
}

#[test]
fn test_reset_at_threshold_records_metadata() {
    let h = Harness::new();
    // Two prior bad readings persisted, no prior reset
    RecoveryState {
        bad_reading_count: 2,
        ..Default::default()
    }
    .store(&h.config.paths.recovery_state)
    .unwrap();

    // 3.15V at 50% is implausible (voltage too low for percent)
    h.set_gauge(3.15, 50);
    let record = h.cycle(false).run_once(1_000_000).unwrap();

    let reset = record.battery.reset_info.as_ref().unwrap();
    assert!(reset.attempted);
    assert!(reset.performed);
    assert_eq!(reset.method.as_deref(), Some("reset"));
    assert!(h.bus.writes().contains(&(REG_COMMAND, CMD_POWER_ON_RESET)));

    let state = RecoveryState::load(&h.config.paths.recovery_state);
    assert_eq!(state.bad_reading_count, 0);
    assert_eq!(state.last_reset, 1_000_000);
}

#[test]
fn test_second_reset_blocked_by_cooldown() {
    let h = Harness::new();
    // Both recovery paths still cooling down
    RecoveryState {
        bad_reading_count: 2,
        last_reset: 1_000_000,
        last_quick_start: 1_000_000,
        ..Default::default()
    }
    .store(&h.config.paths.recovery_state)
    .unwrap();

    h.set_gauge(3.15, 50);
    let record = h.cycle(false).run_once(1_000_060).unwrap();

    let reset = record.battery.reset_info.as_ref().unwrap();
    assert!(!reset.attempted);
    assert!(reset.reason.contains("cooldown"));
    assert!(h.bus.writes().is_empty());
}

#[test]
fn test_charging_window_suppresses_recovery() {
    let h = Harness::new();
    RecoveryState {
        bad_reading_count: 2,
        ..Default::default()
    }
    .store(&h.config.paths.recovery_state)
    .unwrap();

    // Charging: implausible reading, but the window absorbs it
    h.set_gauge(3.15, 50);
    let record = h.cycle(true).run_once(1_000_000).unwrap();

    assert!(record.battery.validation.as_ref().unwrap().bad);
    assert!(record.battery.reset_info.is_none());
    assert!(h.bus.writes().is_empty());
    // Count neither incremented nor reset
    let state = RecoveryState::load(&h.config.paths.recovery_state);
    assert_eq!(state.bad_reading_count, 2);
}

#[test]
fn test_window_persists_after_unplug_across_restarts() {
    let h = Harness::new();
    // Charger was connected on a previous cycle
    h.set_gauge(3.8, 60);
    h.cycle(true).run_once(1_000_000).unwrap();

    // Unplugged just before this invocation; grace window still open
    RecoveryState {
        bad_reading_count: 2,
        ..Default::default()
    }
    .store(&h.config.paths.recovery_state)
    .unwrap();
    h.set_gauge(3.15, 50);
    h.cycle(false).run_once(1_000_060).unwrap();
    assert!(h.bus.writes().is_empty(), "reset issued inside grace window");

    // Well past the window the same condition does trigger recovery
    let window = ChargingWindowState::load(&h.config.paths.charging_state);
    assert!(!window.is_active(1_001_000, h.config.charging.window_secs));
    h.cycle(false).run_once(1_001_000).unwrap();
    assert!(h.bus.writes().contains(&(REG_COMMAND, CMD_POWER_ON_RESET)));
}
