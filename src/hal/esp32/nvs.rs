//! Valve side persisted in ESP-IDF NVS flash.

use crate::traits::PersistentCell;
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_svc::sys::EspError;

/// One-byte NVS entry holding the last commanded side.
///
/// Writes are skipped when the value is unchanged to spare flash wear.
pub struct Esp32Cell {
    nvs: EspNvs<NvsDefault>,
    cached: Option<bool>,
}

impl Esp32Cell {
    const NAMESPACE: &'static str = "valve";
    const KEY: &'static str = "top";

    /// Open (or create) the `valve` namespace.
    pub fn new(partition: EspNvsPartition<NvsDefault>) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, Self::NAMESPACE, true)?;
        Ok(Self { nvs, cached: None })
    }
}

impl PersistentCell for Esp32Cell {
    type Error = EspError;

    fn read(&mut self) -> Result<bool, EspError> {
        // A never-written cell reads as bottom
        let top = self.nvs.get_u8(Self::KEY)?.is_some_and(|v| v != 0);
        self.cached = Some(top);
        Ok(top)
    }

    fn write(&mut self, value: bool) -> Result<(), EspError> {
        if self.cached == Some(value) {
            return Ok(());
        }
        self.nvs.set_u8(Self::KEY, u8::from(value))?;
        self.cached = Some(value);
        Ok(())
    }
}
