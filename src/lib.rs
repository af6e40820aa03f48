//! # valve-cycler
//!
//! A servo valve controller that cycles a valve between two positions,
//! parks it at a safe home position when supply voltage sags, and logs
//! power and position telemetry to daily CSV files.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for the servo, power monitor, persistent storage and status lights
//! - **Two control modes**: Wall-clock schedule or single-byte external commands
//! - **Rate limiting**: A minimum spacing between moves protects the actuator
//! - **Low-voltage interlock**: The valve goes home whenever bus voltage drops, bypassing the rate limit
//! - **Telemetry**: Periodic records to the console, a rotating daily file and an outbound link
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and telemetry abstractions
//! - `commands` - External command bytes and move outcomes
//! - `valve` - Position controller with safety interlock
//! - `telemetry` - Record scheduling, formatting and daily rotation
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use valve_cycler::{
//!     Clock, PositionController, TelemetryScheduler, ValvePosition,
//!     config::Config,
//!     hal::{
//!         MockCell, MockClock, MockDelay, MockIndicator, MockLink, MockLogStore,
//!         MockPowerMonitor, MockServo,
//!     },
//! };
//!
//! let config = Config::default();
//! let mut valve = PositionController::new(
//!     MockServo::new(),
//!     MockPowerMonitor::new(12_000, 350),
//!     MockCell::new(),
//!     MockIndicator::new(),
//!     config.valve.clone(),
//! );
//! let mut telemetry =
//!     TelemetryScheduler::new(MockLogStore::new(), MockLink::new(), config.telemetry.clone());
//!
//! let mut clock = MockClock::new();
//! valve.begin(&clock, &mut MockDelay::new(), 0).unwrap();
//! telemetry.begin(&clock.reading());
//!
//! // Main loop: one tick every 20ms for a minute
//! for _ in 0..3000 {
//!     clock.advance(20);
//!     let now = clock.reading();
//!     valve.update(&now, None).unwrap();
//!     telemetry.tick(&now, &mut valve);
//! }
//!
//! assert_eq!(valve.current_position(), ValvePosition::Bottom);
//! // Header, reboot marker, then a row at 0, 10, 20, 30, 40, 50 and 60 s
//! assert_eq!(telemetry.store().lines("valve_log_1970-01-01.csv").len(), 9);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// External command bytes and move outcomes.
pub mod commands;
/// Error types for startup and configuration.
pub mod error;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Telemetry scheduling, record formatting and daily file rotation.
pub mod telemetry;
/// Core traits for hardware and telemetry abstraction.
pub mod traits;
/// Valve position controller with rate limiting and low-voltage interlock.
pub mod valve;

/// Shared configuration system for desktop and ESP32.
pub mod config;

// Re-exports for convenience
pub use commands::{MoveResult, ValveCommand};
pub use error::{ConfigError, InitError};
pub use telemetry::{
    LogDestination, PowerSample, SchedulerState, TelemetryRecord, TelemetryScheduler,
    TelemetrySource,
};
pub use traits::{
    // Hardware
    BlinkPattern,
    Clock,
    ClockReading,
    CommandInput,
    Indicator,
    // Telemetry
    LogStore,
    PersistentCell,
    PowerMonitor,
    ServoActuator,
    StatusIndicator,
    TelemetryLink,
};
pub use valve::{timer_target, ControllerState, IndicatorPattern, PositionController, ValvePosition};

// Config re-exports
pub use config::{Config, ControlMode, StartupConfig, TelemetryConfig, ValveConfig};
