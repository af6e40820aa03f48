//! ESP32-C3 SuperMini valve cycler.
//!
//! This is the main entry point for the physical hardware controller.
//! It runs a 50Hz control loop that:
//! - Watches bus voltage and parks the valve at home when it sags
//! - Cycles the valve on the wall-clock schedule, or follows `t`/`b` bytes
//!   from the external serial port
//! - Blinks the status LEDs
//! - Logs power and valve position to the SD card and the external serial port
//!
//! Any failure during boot (RTC, power monitor, servo, storage) is logged and
//! the firmware stays idle without retrying.
//!
//! # Build
//!
//! ```bash
//! cargo build --release --features esp32 --bin esp32_main
//!
//! # Serial-commanded valve, files named pump_YYYY-MM-DD.csv
//! VALVE_MODE=external LOG_PREFIX=pump cargo build --release --features esp32 --bin esp32_main
//! ```

use anyhow::Context;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::spi::{SpiDriver, SpiDriverConfig};
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_svc::fs::fatfs::Fatfs;
use esp_idf_svc::io::vfs::MountedFatfs;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sd::{spi::SdSpiHostDriver, SdCardConfiguration, SdCardDriver};
use log::{error, info, warn};
use std::thread;
use std::time::Duration;
use valve_cycler::hal::esp32::{pins, Esp32Cell, Esp32Clock, Esp32Servo, Esp32Uart};
use valve_cycler::hal::{ina260, Ds3231, FsLogStore, Ina260, LedBank};
use valve_cycler::traits::{Clock, CommandInput, TelemetryLink};
use valve_cycler::config::{ControlMode, TelemetryConfig, ValveConfig};
use valve_cycler::{Config, InitError, PositionController, TelemetryScheduler};

/// Main loop interval in milliseconds (50Hz = 20ms)
const LOOP_INTERVAL_MS: u64 = 20;

fn main() {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    println!();
    println!("================================");
    println!("  valve-cycler SuperMini");
    println!("================================");
    println!();

    if let Err(e) = run() {
        error!("Boot failed: {e:#}");
        // Stay inert until power cycled
        loop {
            thread::sleep(Duration::from_secs(60));
        }
    }
}

fn run() -> anyhow::Result<()> {
    // =========================================================================
    // Configuration
    // =========================================================================
    // Selected at build time: VALVE_MODE=external LOG_PREFIX=pump cargo build ...
    let mode = match option_env!("VALVE_MODE") {
        Some(name) => ControlMode::from_name(name)
            .with_context(|| format!("unknown VALVE_MODE {name:?}"))?,
        None => ControlMode::Timer,
    };
    let mut telemetry_config = TelemetryConfig::default();
    if let Some(prefix) = option_env!("LOG_PREFIX") {
        telemetry_config = telemetry_config.with_file_prefix(prefix);
    }
    let config = Config::default()
        .with_valve(ValveConfig::default().with_mode(mode))
        .with_telemetry(telemetry_config);
    config.validate().map_err(InitError::from)?;

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Initialize Clock (DS3231 on GPIO0/1)
    // =========================================================================
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio0, // SDA
        peripherals.pins.gpio1, // SCL
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;

    let mut rtc = Ds3231::new(i2c);
    let mut clock = Esp32Clock::new();
    match rtc.read_time() {
        Ok(wall) => clock.sync(wall),
        Err(e) => warn!("RTC read failed: {e}"),
    }
    if !clock.is_set() {
        return Err(InitError::ClockNotSet.into());
    }
    println!("[OK] RTC has set the system time");

    // =========================================================================
    // Initialize Power Monitor (INA260, same bus)
    // =========================================================================
    let mut power = Ina260::new(rtc.release(), ina260::DEFAULT_ADDRESS);
    if !power.probe().unwrap_or(false) {
        return Err(InitError::PowerMonitorNotFound.into());
    }
    println!("[OK] INA260 power sensor initialized");

    // =========================================================================
    // Initialize Servo (LEDC on GPIO2) and LEDs (GPIO3/4/8)
    // =========================================================================
    let servo = Esp32Servo::new(
        peripherals.ledc.timer0,
        peripherals.ledc.channel0,
        peripherals.pins.gpio2,
    )
    .context(InitError::Actuator)?;

    let leds = LedBank::new(
        PinDriver::output(peripherals.pins.gpio3).context(InitError::Indicator)?,
        PinDriver::output(peripherals.pins.gpio4).context(InitError::Indicator)?,
        PinDriver::output(peripherals.pins.gpio8).context(InitError::Indicator)?,
    );
    println!("[OK] Servo and LEDs initialized");

    // =========================================================================
    // Initialize Storage (NVS side cell, SD card on SPI2)
    // =========================================================================
    let cell = Esp32Cell::new(EspDefaultNvsPartition::take()?).context(InitError::Storage)?;

    let spi = SpiDriver::new(
        peripherals.spi2,
        peripherals.pins.gpio6,       // SCK
        peripherals.pins.gpio7,       // MOSI
        Some(peripherals.pins.gpio5), // MISO
        &SpiDriverConfig::default(),
    )?;
    let sd_host = SdSpiHostDriver::new(
        spi,
        Some(peripherals.pins.gpio10), // CS
        AnyIOPin::none(),
        AnyIOPin::none(),
        AnyIOPin::none(),
        None,
    )
    .context(InitError::Storage)?;
    let sd_card =
        SdCardDriver::new_spi(sd_host, &SdCardConfiguration::new()).context(InitError::Storage)?;
    let _fatfs = MountedFatfs::mount(Fatfs::new_sdcard(0, sd_card)?, pins::SD_MOUNT, 4)
        .context(InitError::Storage)?;
    println!("[OK] SD card mounted at {}", pins::SD_MOUNT);

    // =========================================================================
    // Initialize External Serial (UART1 on GPIO20/21)
    // =========================================================================
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio21, // TX
        peripherals.pins.gpio20, // RX
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(115_200)),
    )?;
    let mut input = Esp32Uart::new(&uart);
    let mut link = input;
    let _ = link.send_line("External Serial Initialized");
    println!("[OK] External serial initialized");

    // =========================================================================
    // Create Controllers
    // =========================================================================
    let mut valve = PositionController::new(servo, power, cell, leds, config.valve.clone());
    valve
        .begin(&clock, &mut FreeRtos, config.startup.settle_delay_ms)
        .context(InitError::Actuator)?;

    let mut telemetry =
        TelemetryScheduler::new(FsLogStore::new(pins::SD_MOUNT), link, config.telemetry.clone());
    telemetry.begin(&clock.reading());

    println!();
    println!("Mode: {}", config.valve.mode.as_str());
    println!("Commands (external mode): 't' = top, 'b' = bottom");
    println!();
    info!("Starting control loop (50Hz)...");

    // =========================================================================
    // Main Control Loop
    // =========================================================================
    loop {
        let now = clock.reading();

        if let Err(e) = valve.update(&now, input.read_byte()) {
            warn!("Servo write failed: {:?}", e);
        }

        // Log after the valve has moved so the record shows the new position
        telemetry.tick(&now, &mut valve);

        // Sleep until next tick
        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
