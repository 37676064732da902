//! Charging window tracker
//!
//! Charging (and the minutes right after unplug) legitimately pulls the
//! cell voltage away from the resting discharge curve, so validation and
//! recovery are suppressed while a window is active. The tracker observes
//! the digital charge-detect signal each cycle and maintains a time-boxed
//! window that persists across process restarts.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Charge-detect input signal
///
/// Polled, not interrupt-driven; the acquisition cycle samples it once per
/// invocation.
pub trait ChargeDetect: Send {
    fn is_charging(&mut self) -> Result<bool>;
}

/// Charge detection via a GPIO input pin
pub struct GpioChargeDetect {
    pin: rppal::gpio::InputPin,
}

impl GpioChargeDetect {
    /// Claim the charge-detect pin (high = charger present)
    pub fn open(pin: u8) -> Result<Self> {
        let gpio = rppal::gpio::Gpio::new()?;
        let pin = gpio.get(pin)?.into_input();
        Ok(GpioChargeDetect { pin })
    }
}

impl ChargeDetect for GpioChargeDetect {
    fn is_charging(&mut self) -> Result<bool> {
        Ok(self.pin.is_high())
    }
}

/// Fixed-value charge detect for tests and chargerless setups
pub struct FixedChargeDetect(pub bool);

impl ChargeDetect for FixedChargeDetect {
    fn is_charging(&mut self) -> Result<bool> {
        Ok(self.0)
    }
}

/// Persisted window bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ChargingWindowState {
    /// Epoch seconds at which the current window started (0 = none yet)
    pub charging_window_start: u64,
    /// Charger state seen on the previous cycle
    pub last_charger_state: bool,
}

impl ChargingWindowState {
    /// Load persisted state, defaulting to "no window" on any failure
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    log::warn!("Corrupt charging state {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }

    /// Observe the charge-detect signal for this cycle and update the window.
    ///
    /// While charging, the window start is refreshed continuously so the
    /// post-charge grace period always counts from the unplug moment.
    pub fn observe(&mut self, charging: bool, now: u64) {
        if charging {
            self.charging_window_start = now;
        } else if self.last_charger_state {
            // Unplug edge: the grace window starts now
            self.charging_window_start = now;
            log::info!("Charger unplugged, validation window open");
        }
        self.last_charger_state = charging;
    }

    /// A window is active while charging or within the grace duration after
    /// charging stopped.
    pub fn is_active(&self, now: u64, window_secs: u64) -> bool {
        self.last_charger_state
            || (self.charging_window_start > 0
                && now.saturating_sub(self.charging_window_start) < window_secs)
    }
}
