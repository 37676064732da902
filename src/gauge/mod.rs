//! Fuel gauge driver
//!
//! Reads raw register words through a [`RegisterBus`] and decodes them with
//! a [`ChipProfile`]. Also issues the chip's destructive recovery commands
//! (power-on reset and quick-start); callers must apply the recovery
//! cooldown policy, these are never called from opportunistic paths.

use crate::error::{Error, Result};
use crate::transport::RegisterBus;

pub mod profile;
pub use profile::{ChipProfile, ChipVariant};

use profile::{CMD_POWER_ON_RESET, CMD_QUICK_START, REG_COMMAND, REG_MODE, REG_SOC, REG_VCELL, REG_VERSION};

/// Two register words as read from the transport, already in chip order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub vcell: u16,
    pub soc: u16,
}

/// One decoded battery sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    /// Cell voltage in volts
    pub voltage: f64,
    /// State of charge on the chip's native scale (0-100)
    pub percent_raw: f64,
    /// State of charge on the usable-capacity scale (0-100)
    pub percent_user: f64,
    /// Epoch seconds at which the sample was taken
    pub timestamp: u64,
    /// Charger detect signal at sample time
    pub charging: bool,
    /// Whether a charging window was active at sample time
    pub in_window: bool,
}

/// Fuel gauge driver over a register bus
pub struct FuelGauge<B: RegisterBus> {
    bus: B,
    profile: ChipProfile,
}

impl<B: RegisterBus> FuelGauge<B> {
    pub fn new(bus: B, profile: ChipProfile) -> Self {
        FuelGauge { bus, profile }
    }

    pub fn profile(&self) -> &ChipProfile {
        &self.profile
    }

    /// Read the VCELL and SOC registers
    pub fn read_raw(&mut self) -> Result<RawReading> {
        let vcell = self.bus.read_word(REG_VCELL)?;
        let soc = self.bus.read_word(REG_SOC)?;
        Ok(RawReading { vcell, soc })
    }

    /// Read and decode one battery sample
    pub fn read(&mut self, timestamp: u64, charging: bool, in_window: bool) -> Result<BatteryReading> {
        let raw = self.read_raw()?;
        let voltage = self.profile.decode_voltage(raw.vcell);
        let percent_raw = self.profile.decode_percent_raw(raw.soc);
        let percent_user = self.profile.percent_user(percent_raw);

        log::debug!(
            "Gauge read: {:.3}V raw={:.1}% user={:.1}% (vcell={:#06x} soc={:#06x})",
            voltage,
            percent_raw,
            percent_user,
            raw.vcell,
            raw.soc
        );

        Ok(BatteryReading {
            voltage,
            percent_raw,
            percent_user,
            timestamp,
            charging,
            in_window,
        })
    }

    /// Read the chip version register (liveness probe)
    pub fn version(&mut self) -> Result<u16> {
        self.bus.read_word(REG_VERSION)
    }

    /// Issue a power-on reset
    ///
    /// The chip loses its learned state and re-estimates charge from
    /// voltage; accuracy degrades for a short period afterwards.
    pub fn reset(&mut self) -> Result<()> {
        log::warn!("Issuing fuel gauge power-on reset");
        self.bus.write_word(REG_COMMAND, CMD_POWER_ON_RESET)
    }

    /// Issue a quick-start (forced re-estimation from current voltage)
    ///
    /// Only valid on variants that support it, and invalid near charging
    /// events where the cell voltage is not a usable charge reference.
    pub fn quick_start(&mut self) -> Result<()> {
        if !self.profile.supports_quick_start {
            return Err(Error::Recovery(format!(
                "quick-start not supported by {:?}",
                self.profile.variant
            )));
        }
        log::warn!("Issuing fuel gauge quick-start");
        self.bus.write_word(REG_MODE, CMD_QUICK_START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockBus;
    use approx::assert_relative_eq;

    fn gauge_with(vcell: u16, soc: u16) -> (FuelGauge<MockBus>, MockBus) {
        let bus = MockBus::new();
        bus.set_register(REG_VCELL, vcell);
        bus.set_register(REG_SOC, soc);
        let gauge = FuelGauge::new(bus.clone(), ChipProfile::for_variant(ChipVariant::Max17040));
        (gauge, bus)
    }

    #[test]
    fn test_read_raw() {
        let (mut gauge, _bus) = gauge_with(49920, 0x5080);
        let raw = gauge.read_raw().unwrap();
        assert_eq!(raw.vcell, 49920);
        assert_eq!(raw.soc, 0x5080);
    }

    #[test]
    fn test_read_decodes_sample() {
        let (mut gauge, _bus) = gauge_with(49920, 0x5080);
        let reading = gauge.read(1000, false, false).unwrap();
        assert_relative_eq!(reading.voltage, 3.9, epsilon = 1e-9);
        assert_relative_eq!(reading.percent_raw, 80.5);
        assert_relative_eq!(reading.percent_user, (80.5 - 15.0) * 100.0 / 85.0);
        assert_eq!(reading.timestamp, 1000);
        assert!(!reading.charging);
    }

    #[test]
    fn test_read_propagates_transport_fault() {
        let (mut gauge, bus) = gauge_with(49920, 0x5080);
        bus.fail_read(REG_SOC, "nack");
        let err = gauge.read(0, false, false).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_reset_writes_command_word() {
        let (mut gauge, bus) = gauge_with(0, 0);
        gauge.reset().unwrap();
        assert_eq!(bus.writes(), vec![(REG_COMMAND, CMD_POWER_ON_RESET)]);
    }

    #[test]
    fn test_quick_start_writes_mode_word() {
        let (mut gauge, bus) = gauge_with(0, 0);
        gauge.quick_start().unwrap();
        assert_eq!(bus.writes(), vec![(REG_MODE, CMD_QUICK_START)]);
    }

    #[test]
    fn test_quick_start_rejected_on_2cell_variant() {
        let bus = MockBus::new();
        let mut gauge = FuelGauge::new(bus.clone(), ChipProfile::for_variant(ChipVariant::Max17041));
        assert!(gauge.quick_start().is_err());
        assert!(bus.writes().is_empty());
    }
}
