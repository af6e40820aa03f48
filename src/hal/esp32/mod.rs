//! ESP32-C3 SuperMini hardware abstraction layer for the valve cycler.
//!
//! This module provides hardware implementations for the ESP32-C3 SuperMini board
//! driving a hobby servo on a ball valve.
//!
//! # Hardware Configuration
//!
//! - **MCU**: ESP32-C3 SuperMini (RISC-V 160MHz, 4MB Flash)
//! - **Actuator**: Hobby servo on LEDC PWM (50 Hz)
//! - **Power monitor**: INA260 (I2C, shared bus)
//! - **RTC**: DS3231 (I2C, shared bus)
//! - **Storage**: microSD card over SPI (FAT)
//! - **Status**: red, green and heartbeat LEDs
//!
//! The INA260 power monitor and the DS3231 clock use the generic drivers in
//! [`crate::hal::ina260`] and [`crate::hal::ds3231`] on an `I2cDriver`.
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments matching the SuperMini layout.

mod clock;
mod nvs;
mod servo;
mod uart;

pub use clock::Esp32Clock;
pub use nvs::Esp32Cell;
pub use servo::Esp32Servo;
pub use uart::Esp32Uart;

/// Pin assignments for SuperMini ESP32-C3.
///
/// These constants match the wiring diagram:
/// - Servo on GPIO2
/// - Status LEDs on GPIO3, 4 and the onboard LED on GPIO8
/// - SD card on SPI2 (GPIO5, 6, 7, 10)
/// - I2C sensors on GPIO0, 1
/// - External serial on GPIO20, 21
pub mod pins {
    // =========================================================================
    // Valve
    // =========================================================================

    /// Servo PWM signal
    pub const SERVO: i32 = 2;

    // =========================================================================
    // Status LEDs
    // =========================================================================

    /// Red LED (solid at bottom)
    pub const RED_LED: i32 = 3;

    /// Green LED (solid at top)
    pub const GREEN_LED: i32 = 4;

    /// Onboard blue LED, used as heartbeat
    pub const HEARTBEAT_LED: i32 = 8;

    // =========================================================================
    // SD Card (SPI2)
    // =========================================================================

    /// SPI MISO
    pub const SD_MISO: i32 = 5;

    /// SPI clock
    pub const SD_SCK: i32 = 6;

    /// SPI MOSI
    pub const SD_MOSI: i32 = 7;

    /// Card chip select
    pub const SD_CS: i32 = 10;

    /// FAT mount point
    pub const SD_MOUNT: &str = "/sdcard";

    // =========================================================================
    // I2C Sensors (INA260, DS3231)
    // =========================================================================

    /// I2C data line
    pub const I2C_SDA: i32 = 0;

    /// I2C clock line
    pub const I2C_SCL: i32 = 1;

    // =========================================================================
    // External Serial (UART1)
    // =========================================================================

    /// UART receive (command bytes)
    pub const UART_RX: i32 = 20;

    /// UART transmit (telemetry lines)
    pub const UART_TX: i32 = 21;
}
