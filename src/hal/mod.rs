//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `flasher`: Software LED blinker over any `embedded-hal` output pin
//! - `ina260`: INA260 power monitor over any `embedded-hal` I2C bus
//! - `ds3231`: DS3231 real-time clock over any `embedded-hal` I2C bus
//! - `fs`: Daily log files on a filesystem (requires `std` feature)
//! - `esp32`: ESP32-C3 SuperMini with servo, INA260 and SD card (requires `esp32` feature)

pub mod ds3231;
pub mod flasher;
pub mod ina260;
pub mod mock;

#[cfg(feature = "std")]
pub mod fs;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use ds3231::{Ds3231, RtcError};
pub use flasher::{Flasher, LedBank};
pub use ina260::Ina260;
pub use mock::*;

#[cfg(feature = "std")]
pub use fs::FsLogStore;

#[cfg(feature = "esp32")]
pub use esp32::*;
