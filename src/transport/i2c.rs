//! I2C/SMBus register bus implementation

use super::{swap_word, RegisterBus};
use crate::error::Result;
use rppal::i2c::I2c;

/// SMBus word transport for the fuel gauge
pub struct I2cBus {
    i2c: I2c,
}

impl I2cBus {
    /// Open an I2C bus and address the device
    ///
    /// # Arguments
    /// * `bus` - I2C bus number (e.g., 3 for `/dev/i2c-3`)
    /// * `address` - 7-bit device address (e.g., 0x36)
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;

        log::info!("Opened I2C bus {} at address {:#04x}", bus, address);

        Ok(I2cBus { i2c })
    }
}

impl RegisterBus for I2cBus {
    fn read_word(&mut self, reg: u8) -> Result<u16> {
        // SMBus delivers the word little-endian; the chip is big-endian.
        let wire = self.i2c.smbus_read_word(reg)?;
        Ok(swap_word(wire))
    }

    fn write_word(&mut self, reg: u8, value: u16) -> Result<()> {
        self.i2c.smbus_write_word(reg, swap_word(value))?;
        Ok(())
    }
}
