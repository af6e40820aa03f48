//! Error types for boot-time failures and configuration problems.
//!
//! Runtime failures (sensor reads, file writes, link writes) never reach
//! these types: they are logged where they happen and the tick carries on.
//! Only the startup sequence can fail hard, and it does so with an
//! [`InitError`], after which the firmware stays inert.

use core::fmt;

/// Fatal boot-time failure. No retry is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The wall clock could not be synchronised from the RTC.
    ClockNotSet,
    /// The power monitor did not answer or reported the wrong identity.
    PowerMonitorNotFound,
    /// The servo output could not be attached.
    Actuator,
    /// The telemetry store could not be mounted or opened.
    Storage,
    /// The status lights could not be configured.
    Indicator,
    /// The configuration is unusable.
    Config(ConfigError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClockNotSet => write!(f, "unable to sync with RTC"),
            Self::PowerMonitorNotFound => write!(f, "power monitor not found"),
            Self::Actuator => write!(f, "servo attach failed"),
            Self::Storage => write!(f, "log storage initialization failed"),
            Self::Indicator => write!(f, "status light initialization failed"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl From<ConfigError> for InitError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InitError {}

/// A configuration value the controllers cannot run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Home must lie strictly between the bottom and top pulses.
    HomeOutsideTravel {
        /// Configured home pulse.
        home_us: u16,
        /// Configured bottom pulse.
        bottom_us: u16,
        /// Configured top pulse.
        top_us: u16,
    },
    /// Timer mode needs a non-zero change interval.
    ZeroChangeInterval,
    /// Telemetry needs a non-zero log interval.
    ZeroLogInterval,
    /// Daily files need a name prefix.
    EmptyFilePrefix,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HomeOutsideTravel {
                home_us,
                bottom_us,
                top_us,
            } => write!(
                f,
                "home pulse {home_us}us not between bottom {bottom_us}us and top {top_us}us"
            ),
            Self::ZeroChangeInterval => write!(f, "change interval must be non-zero"),
            Self::ZeroLogInterval => write!(f, "log interval must be non-zero"),
            Self::EmptyFilePrefix => write!(f, "log file prefix must not be empty"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
