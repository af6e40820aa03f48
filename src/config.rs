//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use valve_cycler::config::{Config, ControlMode, TelemetryConfig, ValveConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert!(config.validate().is_ok());
//!
//! // Or customize
//! let config = Config::default()
//!     .with_valve(ValveConfig::default().with_mode(ControlMode::External))
//!     .with_telemetry(TelemetryConfig::default().with_file_prefix("pump"));
//! ```

use crate::error::ConfigError;
use heapless::String as HString;

/// Maximum length for short config strings (file prefixes)
pub const MAX_SHORT_STRING: usize = 32;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    // Find the last char boundary that still fits
    let valid_end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= MAX_SHORT_STRING)
        .last()
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Valve controller configuration
    pub valve: ValveConfig,
    /// Telemetry scheduler configuration
    pub telemetry: TelemetryConfig,
    /// One-time startup behaviour
    pub startup: StartupConfig,
}

impl Config {
    /// Set valve configuration
    pub fn with_valve(mut self, valve: ValveConfig) -> Self {
        self.valve = valve;
        self
    }

    /// Set telemetry configuration
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Set startup configuration
    pub fn with_startup(mut self, startup: StartupConfig) -> Self {
        self.startup = startup;
        self
    }

    /// Check the whole configuration for values the controllers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.valve.validate()?;
        self.telemetry.validate()
    }
}

// ============================================================================
// Valve Config
// ============================================================================

/// How valve targets are chosen. Fixed for the lifetime of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ControlMode {
    /// Alternate bottom/top on a wall-clock schedule.
    #[default]
    Timer,
    /// Follow `t`/`b` bytes from the command input.
    External,
}

impl ControlMode {
    /// Returns the mode as a lowercase string.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ControlMode::Timer => "timer",
            ControlMode::External => "external",
        }
    }

    /// Parses a mode name, ignoring ASCII case.
    ///
    /// Returns `None` for anything other than `timer` or `external`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("timer") {
            Some(ControlMode::Timer)
        } else if name.eq_ignore_ascii_case("external") {
            Some(ControlMode::External)
        } else {
            None
        }
    }
}

/// Valve controller configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValveConfig {
    /// Target selection mode
    pub mode: ControlMode,
    /// Servo pulse for the bottom position (0 degrees)
    pub bottom_pulse_us: u16,
    /// Servo pulse for the top position (179 degrees)
    pub top_pulse_us: u16,
    /// Servo pulse for the safe home position (89 degrees)
    pub home_pulse_us: u16,
    /// Seconds between timer-mode valve changes
    pub change_interval_secs: u32,
    /// Minimum time between two committed moves
    pub min_move_interval_ms: u64,
    /// Bus voltage below which the valve is sent home
    pub low_voltage_threshold_mv: i32,
    /// Cadence of the power safety poll
    pub safety_poll_interval_ms: u64,
}

impl Default for ValveConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Timer,
            bottom_pulse_us: 1205,
            top_pulse_us: 1795,
            home_pulse_us: 1500,
            change_interval_secs: 30,
            min_move_interval_ms: 2000,
            low_voltage_threshold_mv: 10_000,
            safety_poll_interval_ms: 100,
        }
    }
}

impl ValveConfig {
    /// Set the control mode
    pub fn with_mode(mut self, mode: ControlMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the bottom/top/home pulse widths
    pub fn with_pulses_us(mut self, bottom: u16, top: u16, home: u16) -> Self {
        self.bottom_pulse_us = bottom;
        self.top_pulse_us = top;
        self.home_pulse_us = home;
        self
    }

    /// Set the timer-mode change interval
    pub fn with_change_interval_secs(mut self, secs: u32) -> Self {
        self.change_interval_secs = secs;
        self
    }

    /// Set the minimum move spacing
    pub fn with_min_move_interval_ms(mut self, ms: u64) -> Self {
        self.min_move_interval_ms = ms;
        self
    }

    /// Set the low-voltage threshold
    pub fn with_low_voltage_threshold_mv(mut self, mv: i32) -> Self {
        self.low_voltage_threshold_mv = mv;
        self
    }

    /// Set the safety poll cadence
    pub fn with_safety_poll_interval_ms(mut self, ms: u64) -> Self {
        self.safety_poll_interval_ms = ms;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let (low, high) = if self.bottom_pulse_us <= self.top_pulse_us {
            (self.bottom_pulse_us, self.top_pulse_us)
        } else {
            (self.top_pulse_us, self.bottom_pulse_us)
        };
        if self.home_pulse_us <= low || self.home_pulse_us >= high {
            return Err(ConfigError::HomeOutsideTravel {
                home_us: self.home_pulse_us,
                bottom_us: self.bottom_pulse_us,
                top_us: self.top_pulse_us,
            });
        }
        if self.change_interval_secs == 0 {
            return Err(ConfigError::ZeroChangeInterval);
        }
        Ok(())
    }
}

// ============================================================================
// Telemetry Config
// ============================================================================

/// Telemetry scheduler configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryConfig {
    /// Seconds between records, aligned to the minute
    pub log_interval_secs: u32,
    /// Daily file name prefix ("valve_log" -> "valve_log_2025-06-01.csv")
    pub file_prefix: ShortString,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_interval_secs: 10,
            file_prefix: short_string("valve_log"),
        }
    }
}

impl TelemetryConfig {
    /// Set the logging interval
    pub fn with_log_interval_secs(mut self, secs: u32) -> Self {
        self.log_interval_secs = secs;
        self
    }

    /// Set the daily file prefix
    pub fn with_file_prefix(mut self, prefix: &str) -> Self {
        self.file_prefix = short_string(prefix);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.log_interval_secs == 0 {
            return Err(ConfigError::ZeroLogInterval);
        }
        if self.file_prefix.is_empty() {
            return Err(ConfigError::EmptyFilePrefix);
        }
        Ok(())
    }
}

// ============================================================================
// Startup Config
// ============================================================================

/// One-time startup behaviour
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StartupConfig {
    /// Blocking wait before the servo is first driven
    pub settle_delay_ms: u32,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 4000,
        }
    }
}

impl StartupConfig {
    /// Set the settle delay
    pub fn with_settle_delay_ms(mut self, ms: u32) -> Self {
        self.settle_delay_ms = ms;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
