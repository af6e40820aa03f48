//! TI INA260 bus voltage/current monitor over `embedded-hal` I2C.
//!
//! The INA260 has an integrated 2 mΩ shunt, so no calibration is needed:
//! both the current and bus voltage registers have a fixed 1.25 unit LSB.
//!
//! | Register | Address | LSB |
//! |----------|---------|-----|
//! | Current | `0x01` | 1.25 mA (signed) |
//! | Bus voltage | `0x02` | 1.25 mV |
//! | Manufacturer ID | `0xFE` | `0x5449` ("TI") |

use crate::traits::PowerMonitor;
use embedded_hal::i2c::I2c;

const REG_CURRENT: u8 = 0x01;
const REG_BUS_VOLTAGE: u8 = 0x02;
const REG_MANUFACTURER_ID: u8 = 0xFE;

/// Expected manufacturer ID ("TI").
pub const MANUFACTURER_ID: u16 = 0x5449;

/// Address with A0 and A1 tied to ground.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// INA260 power monitor.
///
/// # Example
///
/// ```rust
/// use valve_cycler::hal::{ina260, Ina260, MockI2c};
/// use valve_cycler::traits::PowerMonitor;
///
/// let mut bus = MockI2c::new();
/// bus.set_register(0x40, 0xFE, &[0x54, 0x49]);
/// bus.set_register(0x40, 0x02, &[0x25, 0x80]); // 9600 * 1.25 mV
///
/// let mut ina = Ina260::new(bus, ina260::DEFAULT_ADDRESS);
/// assert!(ina.probe().unwrap());
/// assert_eq!(ina.read_voltage_mv().unwrap(), 12_000);
/// ```
pub struct Ina260<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Ina260<I> {
    /// Wrap a bus. No traffic until the first read.
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Returns true if the device at the address identifies as an INA260.
    pub fn probe(&mut self) -> Result<bool, I::Error> {
        Ok(self.read_register(REG_MANUFACTURER_ID)? == MANUFACTURER_ID)
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    fn read_register(&mut self, register: u8) -> Result<u16, I::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }
}

impl<I: I2c> PowerMonitor for Ina260<I> {
    type Error = I::Error;

    fn read_voltage_mv(&mut self) -> Result<i32, I::Error> {
        let raw = self.read_register(REG_BUS_VOLTAGE)?;
        Ok(i32::from(raw) * 125 / 100)
    }

    fn read_current_ma(&mut self) -> Result<i32, I::Error> {
        let raw = self.read_register(REG_CURRENT)? as i16;
        Ok(i32::from(raw) * 125 / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockI2c;

    const ADDR: u8 = DEFAULT_ADDRESS;

    fn ina(registers: &[(u8, [u8; 2])]) -> Ina260<MockI2c> {
        let mut bus = MockI2c::new();
        for (reg, bytes) in registers {
            bus.set_register(ADDR, *reg, bytes);
        }
        Ina260::new(bus, ADDR)
    }

    #[test]
    fn probe_checks_manufacturer_id() {
        assert!(ina(&[(0xFE, [0x54, 0x49])]).probe().unwrap());
        assert!(!ina(&[(0xFE, [0x12, 0x34])]).probe().unwrap());
    }

    #[test]
    fn probe_missing_device_is_error() {
        let mut ina = Ina260::new(MockI2c::new(), ADDR);
        assert!(ina.probe().is_err());
    }

    #[test]
    fn voltage_scaling() {
        // 0x2580 = 9600 counts
        let mut ina = ina(&[(0x02, [0x25, 0x80])]);
        assert_eq!(ina.read_voltage_mv().unwrap(), 12_000);
    }

    #[test]
    fn current_is_signed() {
        // 0x0140 = 320 counts = 400 mA
        assert_eq!(ina(&[(0x01, [0x01, 0x40])]).read_current_ma().unwrap(), 400);
        // 0xFEC0 = -320 counts
        assert_eq!(ina(&[(0x01, [0xFE, 0xC0])]).read_current_ma().unwrap(), -400);
    }

    #[test]
    fn bus_error_propagates() {
        let mut bus = MockI2c::new();
        bus.set_register(ADDR, 0x02, &[0x25, 0x80]);
        bus.fail = true;
        let mut ina = Ina260::new(bus, ADDR);
        assert!(ina.read_voltage_mv().is_err());
    }
}
