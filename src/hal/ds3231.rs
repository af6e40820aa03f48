//! Maxim DS3231 battery-backed real-time clock over `embedded-hal` I2C.
//!
//! Only reading is supported: the firmware syncs its wall clock from the RTC
//! once at boot and refuses to run if the RTC has lost power.

use core::fmt;
use embedded_hal::i2c::I2c;
use jiff::civil::DateTime;
use jiff::tz::Offset;
use jiff::Timestamp;

const REG_SECONDS: u8 = 0x00;
const REG_STATUS: u8 = 0x0F;

/// Oscillator-stop flag: the time registers are not trustworthy.
const STATUS_OSF: u8 = 0x80;

/// DS3231 read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcError<E> {
    /// I2C transfer failed.
    Bus(E),
    /// The oscillator stopped since the time was last set.
    OscillatorStopped,
    /// The registers do not hold a valid calendar time.
    InvalidTime,
}

impl<E: fmt::Debug> fmt::Display for RtcError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "RTC bus error: {e:?}"),
            Self::OscillatorStopped => write!(f, "RTC lost power, time not set"),
            Self::InvalidTime => write!(f, "RTC holds an invalid time"),
        }
    }
}

/// DS3231 real-time clock.
///
/// # Example
///
/// ```rust
/// use valve_cycler::hal::{Ds3231, MockI2c};
///
/// let mut bus = MockI2c::new();
/// // 2025-06-01 08:00:03, 24-hour mode
/// bus.set_register(0x68, 0x00, &[0x03, 0x00, 0x08, 0x01, 0x01, 0x06, 0x25]);
/// bus.set_register(0x68, 0x0F, &[0x00]);
///
/// let mut rtc = Ds3231::new(bus);
/// assert_eq!(rtc.read_time().unwrap().as_second(), 1_748_764_803);
/// ```
pub struct Ds3231<I> {
    i2c: I,
}

impl<I: I2c> Ds3231<I> {
    /// Fixed bus address.
    pub const ADDRESS: u8 = 0x68;

    /// Wrap a bus.
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    /// Read the current time as UTC.
    pub fn read_time(&mut self) -> Result<Timestamp, RtcError<I::Error>> {
        let mut status = [0u8; 1];
        self.i2c
            .write_read(Self::ADDRESS, &[REG_STATUS], &mut status)
            .map_err(RtcError::Bus)?;
        if status[0] & STATUS_OSF != 0 {
            return Err(RtcError::OscillatorStopped);
        }

        let mut regs = [0u8; 7];
        self.i2c
            .write_read(Self::ADDRESS, &[REG_SECONDS], &mut regs)
            .map_err(RtcError::Bus)?;
        decode_time(&regs).ok_or(RtcError::InvalidTime)
    }
}

fn bcd(byte: u8) -> u8 {
    (byte >> 4) * 10 + (byte & 0x0F)
}

fn decode_hour(byte: u8) -> u8 {
    if byte & 0x40 == 0 {
        return bcd(byte & 0x3F);
    }
    // 12-hour mode: bit 5 is PM
    let hour = bcd(byte & 0x1F) % 12;
    if byte & 0x20 != 0 {
        hour + 12
    } else {
        hour
    }
}

/// Decode the seven time registers (`0x00..=0x06`).
fn decode_time(regs: &[u8; 7]) -> Option<Timestamp> {
    let second = bcd(regs[0] & 0x7F);
    let minute = bcd(regs[1] & 0x7F);
    let hour = decode_hour(regs[2]);
    let day = bcd(regs[4] & 0x3F);
    let month = bcd(regs[5] & 0x1F);
    let century = if regs[5] & 0x80 != 0 { 100 } else { 0 };
    let year = 2000 + century + i16::from(bcd(regs[6]));

    let dt = DateTime::new(
        year,
        month as i8,
        day as i8,
        hour as i8,
        minute as i8,
        second as i8,
        0,
    )
    .ok()?;
    Offset::UTC.to_timestamp(dt).ok()
}
