//! Register transport layer
//!
//! Byte-level access to 16-bit chip registers over a bus address. The fuel
//! gauge stores registers big-endian while SMBus word transfers are
//! little-endian, so every word is byte-swapped on both read and write.
//! No retries at this layer; faults propagate to the caller.

use crate::error::Result;

mod i2c;
pub use i2c::I2cBus;

mod mock;
pub use mock::MockBus;

/// Register bus trait for word-oriented device communication
///
/// Implementations return and accept values in the chip's native register
/// order; any wire-order correction happens inside the implementation.
pub trait RegisterBus: Send {
    /// Read a 16-bit register
    fn read_word(&mut self, reg: u8) -> Result<u16>;

    /// Write a 16-bit register
    fn write_word(&mut self, reg: u8, value: u16) -> Result<()>;
}

/// Swap the two bytes of a word (SMBus little-endian <-> chip big-endian)
#[inline]
pub(crate) fn swap_word(value: u16) -> u16 {
    value.rotate_left(8)
}
