//! Trait definitions for hardware abstraction and telemetry output.
//!
//! This module defines the core abstractions that allow valve-cycler to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Write telemetry to different stores and links
//!
//! # Submodules
//!
//! - `hardware`: Servo, power monitor, persistent cell, indicators, clock
//! - `telemetry`: Log file store and outbound link
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`ServoActuator`]: Pulse-width servo driving the valve
//! - [`PowerMonitor`]: Bus voltage and current sensor
//! - [`PersistentCell`]: Non-volatile valve side
//! - [`StatusIndicator`]: Blinking status lights
//! - [`Clock`]: Monotonic and wall-clock time

pub mod hardware;
pub mod telemetry;

pub use hardware::*;
pub use telemetry::*;
