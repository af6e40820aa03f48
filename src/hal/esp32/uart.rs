//! External serial port: command bytes in, telemetry lines out.

use crate::traits::{CommandInput, TelemetryLink};
use esp_idf_hal::delay::NON_BLOCK;
use esp_idf_hal::uart::UartDriver;
use esp_idf_hal::sys::EspError;
use log::debug;

/// Shared handle to the external UART.
///
/// The driver's read and write halves are independent, so the same handle is
/// copied into the control loop (as [`CommandInput`]) and the telemetry
/// scheduler (as [`TelemetryLink`]).
#[derive(Clone, Copy)]
pub struct Esp32Uart<'a, 'd> {
    uart: &'a UartDriver<'d>,
}

impl<'a, 'd> Esp32Uart<'a, 'd> {
    /// Wrap a configured driver.
    pub fn new(uart: &'a UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl CommandInput for Esp32Uart<'_, '_> {
    fn read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.uart.read(&mut buf, NON_BLOCK) {
            Ok(1) => Some(buf[0]),
            Ok(_) => None,
            Err(e) => {
                debug!("UART read failed: {:?}", e);
                None
            }
        }
    }
}

impl TelemetryLink for Esp32Uart<'_, '_> {
    type Error = EspError;

    fn send_line(&mut self, line: &str) -> Result<(), EspError> {
        self.uart.write(line.as_bytes())?;
        self.uart.write(b"\n")?;
        Ok(())
    }
}
