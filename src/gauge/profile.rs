//! Chip profiles for supported fuel gauge variants
//!
//! The two supported parts share a register map but differ in the
//! raw-to-volt scale (single-cell vs. 2-cell input divider) and in the
//! usable-capacity remap. Everything variant-specific lives here as data;
//! the driver is written once against the profile.

use serde::{Deserialize, Serialize};

// Register map (common to both variants)
pub const REG_VCELL: u8 = 0x02; // Cell voltage, 16-bit big-endian
pub const REG_SOC: u8 = 0x04; // State of charge, 1/256 % per LSB
pub const REG_MODE: u8 = 0x06; // Mode register (quick-start command)
pub const REG_VERSION: u8 = 0x08; // Chip version, constant per part
pub const REG_COMMAND: u8 = 0xFE; // Command register (power-on reset)

// Command words (chip order)
pub const CMD_POWER_ON_RESET: u16 = 0x5400;
pub const CMD_QUICK_START: u16 = 0x4000;

/// Supported fuel gauge chip variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChipVariant {
    /// Single-cell part, 78.125 uV per VCELL LSB
    Max17040,
    /// 2-cell part, 156.25 uV per VCELL LSB
    Max17041,
}

/// Per-variant decoding and command parameters
///
/// Constructed from a [`ChipVariant`]; the usable-capacity remap can be
/// overridden from configuration for packs with a different cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipProfile {
    pub variant: ChipVariant,
    /// Volts per VCELL register LSB
    pub volts_per_lsb: f64,
    /// Raw percent at which the usable scale reads 0 (pack cutoff)
    pub percent_floor: f64,
    /// Gain of the affine raw-to-usable remap
    pub percent_gain: f64,
    /// Whether the quick-start recovery path is valid for this part
    pub supports_quick_start: bool,
}

impl ChipProfile {
    /// Profile with the factory parameters for a variant
    pub fn for_variant(variant: ChipVariant) -> Self {
        match variant {
            ChipVariant::Max17040 => ChipProfile {
                variant,
                volts_per_lsb: 0.000078125,
                // Pack cuts off around 15% raw; remap 15..100 -> 0..100
                percent_floor: 15.0,
                percent_gain: 100.0 / 85.0,
                supports_quick_start: true,
            },
            ChipVariant::Max17041 => ChipProfile {
                variant,
                volts_per_lsb: 0.00015625,
                percent_floor: 10.0,
                percent_gain: 100.0 / 90.0,
                // Quick-start assumes a single-cell reference charge; the
                // 2-cell part re-estimates per pack and must use a full reset.
                supports_quick_start: false,
            },
        }
    }

    /// Decode the VCELL register into volts
    pub fn decode_voltage(&self, vcell: u16) -> f64 {
        f64::from(vcell) * self.volts_per_lsb
    }

    /// Decode the SOC register into the chip's native percent scale
    ///
    /// High byte is whole percent, low byte is 1/256 % fractions.
    pub fn decode_percent_raw(&self, soc: u16) -> f64 {
        f64::from(soc >> 8) + f64::from(soc & 0xFF) / 256.0
    }

    /// Remap native percent onto the usable-capacity scale, clamped to 0-100
    pub fn percent_user(&self, percent_raw: f64) -> f64 {
        ((percent_raw - self.percent_floor) * self.percent_gain).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_voltage_decode_max17040() {
        let profile = ChipProfile::for_variant(ChipVariant::Max17040);
        // 49920 * 78.125uV = 3.9V
        assert_relative_eq!(profile.decode_voltage(49920), 3.9, epsilon = 1e-9);
        assert_relative_eq!(profile.decode_voltage(0), 0.0);
    }

    #[test]
    fn test_voltage_decode_max17041_scale() {
        let p40 = ChipProfile::for_variant(ChipVariant::Max17040);
        let p41 = ChipProfile::for_variant(ChipVariant::Max17041);
        // Same raw word decodes to exactly twice the voltage on the 2-cell part
        assert_relative_eq!(p41.decode_voltage(30000), 2.0 * p40.decode_voltage(30000));
    }

    #[test]
    fn test_percent_decode() {
        let profile = ChipProfile::for_variant(ChipVariant::Max17040);
        // 0x5080 = 80 + 128/256 = 80.5%
        assert_relative_eq!(profile.decode_percent_raw(0x5080), 80.5);
        assert_relative_eq!(profile.decode_percent_raw(0x0000), 0.0);
        assert_relative_eq!(profile.decode_percent_raw(0x6400), 100.0);
    }

    #[test]
    fn test_percent_user_remap_and_clamp() {
        let profile = ChipProfile::for_variant(ChipVariant::Max17040);
        assert_relative_eq!(profile.percent_user(15.0), 0.0);
        assert_relative_eq!(profile.percent_user(100.0), 100.0, epsilon = 1e-9);
        // Below the floor clamps to 0, above full clamps to 100
        assert_relative_eq!(profile.percent_user(5.0), 0.0);
        assert_relative_eq!(profile.percent_user(120.0), 100.0);
        // Midpoint maps linearly
        assert_relative_eq!(
            profile.percent_user(57.5),
            50.0,
            epsilon = 1e-9
        );
    }
}
