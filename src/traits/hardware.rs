//! Hardware abstraction traits for the servo, power monitor, persistent cell,
//! status lights, command input and time sources.
//!
//! This module defines the hardware interfaces that allow the valve controller
//! to run on the ESP32 as well as on a desktop with mocks.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ServoActuator`] | Pulse-width servo that moves the valve |
//! | [`PowerMonitor`] | Bus voltage and current readings |
//! | [`PersistentCell`] | One boolean that survives restarts |
//! | [`StatusIndicator`] | Blinking status lights |
//! | [`CommandInput`] | Single-byte external commands |
//! | [`Clock`] | Monotonic and wall-clock time |
//!
//! The one-time startup settle delay uses [`embedded_hal::delay::DelayNs`]
//! rather than a trait of its own.
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use valve_cycler::traits::{PowerMonitor, ServoActuator};
//! use valve_cycler::hal::{MockPowerMonitor, MockServo};
//!
//! let mut servo = MockServo::new();
//! servo.write_pulse_us(1795).unwrap();
//! assert_eq!(servo.pulse_us, Some(1795));
//!
//! let mut power = MockPowerMonitor::new(12_000, 350);
//! assert_eq!(power.read_voltage_mv().unwrap(), 12_000);
//! ```

use jiff::Timestamp;

/// Servo actuator trait - abstracts the PWM pulse that positions the valve.
///
/// Positions are expressed as pulse widths in microseconds, the native unit
/// of hobby servos (roughly 1000-2000 µs over the travel).
///
/// # Example Implementation
///
/// ```rust,ignore
/// use valve_cycler::traits::ServoActuator;
///
/// struct MyServo { /* PWM channel */ }
///
/// impl ServoActuator for MyServo {
///     type Error = ();
///
///     fn write_pulse_us(&mut self, pulse_us: u16) -> Result<(), ()> {
///         // Convert to duty at 50Hz and apply...
///         Ok(())
///     }
/// }
/// ```
pub trait ServoActuator {
    /// Error type for servo operations.
    type Error: core::fmt::Debug;

    /// Drive the servo with the given pulse width.
    fn write_pulse_us(&mut self, pulse_us: u16) -> Result<(), Self::Error>;
}

/// Bus voltage and current sensor.
///
/// Reads may fail transiently (bus glitch, sensor reset). Callers treat a
/// failure as a soft fault and continue with a sentinel value; a failed read
/// must never be fatal.
pub trait PowerMonitor {
    /// Error type for sensor reads.
    type Error: core::fmt::Debug;

    /// Bus voltage in millivolts.
    fn read_voltage_mv(&mut self) -> Result<i32, Self::Error>;

    /// Bus current in milliamps. May be negative on bidirectional sensors.
    fn read_current_ma(&mut self) -> Result<i32, Self::Error>;
}

/// A single boolean stored in non-volatile memory.
///
/// Holds the last commanded valve side (`true` = top) so that externally
/// controlled valves come back where they were left after a power cycle.
pub trait PersistentCell {
    /// Error type for storage operations.
    type Error: core::fmt::Debug;

    /// Read the stored value.
    fn read(&mut self) -> Result<bool, Self::Error>;

    /// Store a new value.
    fn write(&mut self, value: bool) -> Result<(), Self::Error>;
}

/// The physical status lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Indicator {
    /// Red light (solid when the valve is at the bottom).
    Red,
    /// Green light (solid when the valve is at the top).
    Green,
    /// On-board heartbeat light.
    Heartbeat,
}

/// Blink timing for one indicator.
///
/// `on_ms == 0` means permanently off, `off_ms == 0` means permanently on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlinkPattern {
    /// Time lit per period, in milliseconds.
    pub on_ms: u32,
    /// Time dark per period, in milliseconds.
    pub off_ms: u32,
}

impl BlinkPattern {
    /// Permanently dark.
    pub const OFF: Self = Self::new(0, 1000);
    /// Permanently lit.
    pub const SOLID: Self = Self::new(1000, 0);
    /// Short blink once a second.
    pub const MOSTLY_OFF: Self = Self::new(100, 900);
    /// 20% duty slow blink.
    pub const SLOW: Self = Self::new(200, 800);

    /// Creates a pattern from on/off durations.
    pub const fn new(on_ms: u32, off_ms: u32) -> Self {
        Self { on_ms, off_ms }
    }

    /// Returns true if this pattern never lights the indicator.
    #[inline]
    pub const fn is_off(&self) -> bool {
        self.on_ms == 0
    }

    /// Returns true if this pattern never darkens the indicator.
    #[inline]
    pub const fn is_solid(&self) -> bool {
        self.on_ms > 0 && self.off_ms == 0
    }
}

/// Status light driver.
///
/// `set_pattern` only records the timing; the light is actually toggled by
/// `tick`, which must be called every loop iteration.
pub trait StatusIndicator {
    /// Change the blink pattern of one indicator.
    fn set_pattern(&mut self, indicator: Indicator, pattern: BlinkPattern);

    /// Advance the blink phase.
    fn tick(&mut self, now_ms: u64);
}

/// Single-byte command channel (a UART in practice).
pub trait CommandInput {
    /// Returns the next received byte, if any. Never blocks.
    fn read_byte(&mut self) -> Option<u8>;
}

/// Time source.
///
/// Provides two distinct clocks:
///
/// - a monotonic millisecond counter used for rate limiting; it must never go
///   backwards and must not be affected by the wall clock's calendar rollover
/// - a wall clock with at least second resolution used for the valve schedule
///   and telemetry timestamps
///
/// # Example
///
/// ```rust
/// use valve_cycler::traits::Clock;
/// use valve_cycler::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(1500);
/// assert_eq!(clock.now_ms(), 1500);
/// assert_eq!(clock.wall_time().as_second(), 1);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;

    /// Returns the current wall-clock time (UTC).
    fn wall_time(&self) -> Timestamp;

    /// Returns true once the wall clock has been set from a trusted source.
    fn is_set(&self) -> bool {
        true
    }

    /// Samples both clocks.
    fn reading(&self) -> ClockReading {
        ClockReading {
            wall: self.wall_time(),
            monotonic_ms: self.now_ms(),
        }
    }
}

/// Both clocks sampled at the start of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockReading {
    /// Wall-clock time.
    pub wall: Timestamp,
    /// Monotonic milliseconds.
    pub monotonic_ms: u64,
}

impl ClockReading {
    /// Creates a reading from explicit values.
    pub const fn new(wall: Timestamp, monotonic_ms: u64) -> Self {
        Self { wall, monotonic_ms }
    }

    /// Whole seconds of the wall clock since the Unix epoch.
    #[inline]
    pub fn wall_secs(&self) -> i64 {
        self.wall.as_second()
    }
}
