//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and telemetry traits,
//! enabling development and testing on desktop without physical hardware.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockServo`] | [`ServoActuator`] | Records pulse widths |
//! | [`MockPowerMonitor`] | [`PowerMonitor`] | Settable voltage/current, failure injection |
//! | [`MockCell`] | [`PersistentCell`] | In-memory boolean with write counter |
//! | [`MockIndicator`] | [`StatusIndicator`] | Records patterns and ticks |
//! | [`MockClock`] | [`Clock`] | Controllable monotonic and wall time |
//! | [`MockDelay`] | [`DelayNs`] | Accumulates requested delay |
//! | [`MockCommandInput`] | [`CommandInput`] | Queued command bytes |
//! | [`MockLogStore`] | [`LogStore`] | In-memory keyed files |
//! | [`MockLink`] | [`TelemetryLink`] | Captures sent lines |
//! | [`MockPin`] | [`OutputPin`] | Tracks pin level |
//! | [`MockI2c`] | [`I2c`] | Register map per device address |
//!
//! # Example
//!
//! ```rust
//! use valve_cycler::{PositionController, ValvePosition};
//! use valve_cycler::config::{ControlMode, ValveConfig};
//! use valve_cycler::hal::{
//!     MockCell, MockClock, MockCommandInput, MockDelay, MockIndicator, MockPowerMonitor,
//!     MockServo,
//! };
//! use valve_cycler::traits::{Clock, CommandInput};
//!
//! let mut controller = PositionController::new(
//!     MockServo::new(),
//!     MockPowerMonitor::new(12_000, 300),
//!     MockCell::with_value(false),
//!     MockIndicator::new(),
//!     ValveConfig::default().with_mode(ControlMode::External),
//! );
//! let mut clock = MockClock::new();
//! controller.begin(&clock, &mut MockDelay::new(), 0).unwrap();
//!
//! let mut input = MockCommandInput::new();
//! input.push(b"t");
//! clock.advance(3_000);
//! controller.update(&clock.reading(), input.read_byte()).unwrap();
//!
//! // Verify via state and mocks
//! assert_eq!(controller.current_position(), ValvePosition::Top);
//! assert!(controller.cell().value);
//! ```
//!
//! [`ServoActuator`]: crate::traits::ServoActuator
//! [`PowerMonitor`]: crate::traits::PowerMonitor
//! [`PersistentCell`]: crate::traits::PersistentCell
//! [`StatusIndicator`]: crate::traits::StatusIndicator
//! [`Clock`]: crate::traits::Clock
//! [`DelayNs`]: embedded_hal::delay::DelayNs
//! [`CommandInput`]: crate::traits::CommandInput
//! [`LogStore`]: crate::traits::LogStore
//! [`TelemetryLink`]: crate::traits::TelemetryLink
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`I2c`]: embedded_hal::i2c::I2c

use crate::traits::{
    BlinkPattern, Clock, CommandInput, Indicator, LogStore, PersistentCell, PowerMonitor,
    ServoActuator, StatusIndicator, TelemetryLink,
};
use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, I2c, NoAcknowledgeSource, Operation};
use jiff::Timestamp;

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock servo for testing.
///
/// Records every pulse width written. Set `fail` to make writes error.
///
/// # Example
///
/// ```rust
/// use valve_cycler::hal::MockServo;
/// use valve_cycler::traits::ServoActuator;
///
/// let mut servo = MockServo::new();
/// servo.write_pulse_us(1205).unwrap();
/// servo.write_pulse_us(1500).unwrap();
///
/// assert_eq!(servo.pulse_us, Some(1500));
/// assert_eq!(servo.writes, [1205, 1500]);
/// ```
#[derive(Debug, Default)]
pub struct MockServo {
    /// Last pulse width written.
    pub pulse_us: Option<u16>,
    /// Every pulse width written, in order.
    pub writes: Vec<u16>,
    /// Make writes fail.
    pub fail: bool,
}

impl MockServo {
    /// Creates a new mock servo with no pulse written.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServoActuator for MockServo {
    type Error = ();

    fn write_pulse_us(&mut self, pulse_us: u16) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.pulse_us = Some(pulse_us);
        self.writes.push(pulse_us);
        Ok(())
    }
}

/// Mock power monitor for testing.
///
/// Returns the configured voltage and current. Set `fail` to simulate a bus
/// error on every read.
#[derive(Debug, Default)]
pub struct MockPowerMonitor {
    /// Reported bus voltage in millivolts.
    pub voltage_mv: i32,
    /// Reported bus current in milliamps.
    pub current_ma: i32,
    /// Make reads fail.
    pub fail: bool,
    /// Number of reads attempted.
    pub reads: usize,
}

impl MockPowerMonitor {
    /// Creates a monitor reporting fixed values.
    pub fn new(voltage_mv: i32, current_ma: i32) -> Self {
        Self {
            voltage_mv,
            current_ma,
            ..Self::default()
        }
    }

    /// Change the reported voltage.
    pub fn set_voltage_mv(&mut self, voltage_mv: i32) {
        self.voltage_mv = voltage_mv;
    }
}

impl PowerMonitor for MockPowerMonitor {
    type Error = ();

    fn read_voltage_mv(&mut self) -> Result<i32, ()> {
        self.reads += 1;
        if self.fail {
            return Err(());
        }
        Ok(self.voltage_mv)
    }

    fn read_current_ma(&mut self) -> Result<i32, ()> {
        self.reads += 1;
        if self.fail {
            return Err(());
        }
        Ok(self.current_ma)
    }
}

/// Mock persistent cell for testing.
///
/// Survives a simulated restart by being moved from one controller to the
/// next (see `PositionController::into_parts`).
#[derive(Debug, Default)]
pub struct MockCell {
    /// Stored value (`true` = top).
    pub value: bool,
    /// Number of successful writes.
    pub writes: usize,
    /// Make reads fail.
    pub fail_reads: bool,
    /// Make writes fail.
    pub fail_writes: bool,
}

impl MockCell {
    /// Creates a cell holding `false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell holding `value`.
    pub fn with_value(value: bool) -> Self {
        Self {
            value,
            ..Self::default()
        }
    }

    /// Make every read fail.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    /// Make every write fail.
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl PersistentCell for MockCell {
    type Error = ();

    fn read(&mut self) -> Result<bool, ()> {
        if self.fail_reads {
            return Err(());
        }
        Ok(self.value)
    }

    fn write(&mut self, value: bool) -> Result<(), ()> {
        if self.fail_writes {
            return Err(());
        }
        self.value = value;
        self.writes += 1;
        Ok(())
    }
}

/// Mock status lights for testing.
#[derive(Debug, Default)]
pub struct MockIndicator {
    /// Red light pattern.
    pub red: BlinkPattern,
    /// Green light pattern.
    pub green: BlinkPattern,
    /// Heartbeat light pattern.
    pub heartbeat: BlinkPattern,
    /// Number of `set_pattern` calls.
    pub changes: usize,
    /// Number of `tick` calls.
    pub ticks: usize,
    /// Time passed to the last `tick`.
    pub last_tick_ms: Option<u64>,
}

impl MockIndicator {
    /// Creates indicators that are all dark.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current pattern of one light.
    pub fn pattern(&self, indicator: Indicator) -> BlinkPattern {
        match indicator {
            Indicator::Red => self.red,
            Indicator::Green => self.green,
            Indicator::Heartbeat => self.heartbeat,
        }
    }
}

impl StatusIndicator for MockIndicator {
    fn set_pattern(&mut self, indicator: Indicator, pattern: BlinkPattern) {
        self.changes += 1;
        match indicator {
            Indicator::Red => self.red = pattern,
            Indicator::Green => self.green = pattern,
            Indicator::Heartbeat => self.heartbeat = pattern,
        }
    }

    fn tick(&mut self, now_ms: u64) {
        self.ticks += 1;
        self.last_tick_ms = Some(now_ms);
    }
}

/// Mock clock for testing.
///
/// The wall clock follows the monotonic counter at a fixed offset, starting
/// at the Unix epoch unless moved with [`with_wall_secs`](Self::with_wall_secs)
/// or [`set_wall`](Self::set_wall).
///
/// # Example
///
/// ```rust
/// use valve_cycler::hal::MockClock;
/// use valve_cycler::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// assert_eq!(clock.wall_time().as_second(), 1);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: u64,
    wall_offset_ms: i64,
    /// Value returned by `is_set`.
    pub synced: bool,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms and the Unix epoch.
    pub fn new() -> Self {
        Self {
            current_ms: 0,
            wall_offset_ms: 0,
            synced: true,
        }
    }

    /// Creates a clock at 0ms whose wall time is `secs` after the epoch.
    pub fn with_wall_secs(secs: i64) -> Self {
        Self {
            wall_offset_ms: secs * 1000,
            ..Self::new()
        }
    }

    /// Creates a clock whose wall time was never set.
    pub fn unsynced() -> Self {
        Self {
            synced: false,
            ..Self::new()
        }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Sets the current time in whole seconds.
    pub fn set_secs(&mut self, secs: u64) {
        self.current_ms = secs * 1000;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }

    /// Moves the wall clock without touching the monotonic counter.
    pub fn set_wall(&mut self, wall: Timestamp) {
        self.wall_offset_ms = wall.as_millisecond() - self.current_ms as i64;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }

    fn wall_time(&self) -> Timestamp {
        Timestamp::from_millisecond(self.current_ms as i64 + self.wall_offset_ms)
            .unwrap_or_default()
    }

    fn is_set(&self) -> bool {
        self.synced
    }
}

/// Mock delay for testing. Returns immediately and records the total.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total requested delay in nanoseconds.
    pub total_ns: u64,
    /// Number of delay calls.
    pub calls: usize,
}

impl MockDelay {
    /// Creates a delay with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ns += u64::from(ms) * 1_000_000;
        self.calls += 1;
    }
}

/// Mock command input for testing.
///
/// # Example
///
/// ```rust
/// use valve_cycler::hal::MockCommandInput;
/// use valve_cycler::traits::CommandInput;
///
/// let mut input = MockCommandInput::new();
/// input.push(b"tb");
///
/// assert_eq!(input.read_byte(), Some(b't'));
/// assert_eq!(input.read_byte(), Some(b'b'));
/// assert_eq!(input.read_byte(), None);
/// ```
#[derive(Debug, Default)]
pub struct MockCommandInput {
    pending: VecDeque<u8>,
}

impl MockCommandInput {
    /// Creates an input with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be read.
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes.iter().copied());
    }

    /// Number of bytes not yet read.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl CommandInput for MockCommandInput {
    fn read_byte(&mut self) -> Option<u8> {
        self.pending.pop_front()
    }
}

/// Mock output pin for testing flashers.
#[derive(Debug, Default)]
pub struct MockPin {
    /// Current level.
    pub high: bool,
    /// Number of level writes.
    pub writes: usize,
}

impl MockPin {
    /// Creates a pin driven low.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

/// Mock I2C bus for testing sensor drivers.
///
/// Each device is a set of registers. A write selects the register from its
/// first byte; a following read returns that register's bytes, padded with
/// zeros. Addresses with no registers do not acknowledge.
#[derive(Debug, Default)]
pub struct MockI2c {
    registers: Vec<(u8, u8, Vec<u8>)>,
    /// Make every transaction fail.
    pub fail: bool,
    /// Number of transactions attempted.
    pub transactions: usize,
}

impl MockI2c {
    /// Creates a bus with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bytes read back from one register.
    pub fn set_register(&mut self, address: u8, register: u8, bytes: &[u8]) {
        self.registers
            .retain(|(a, r, _)| !(*a == address && *r == register));
        self.registers.push((address, register, bytes.to_vec()));
    }

    fn register(&self, address: u8, register: u8) -> Option<&[u8]> {
        self.registers
            .iter()
            .find(|(a, r, _)| *a == address && *r == register)
            .map(|(_, _, bytes)| bytes.as_slice())
    }
}

impl i2c::ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), ErrorKind> {
        self.transactions += 1;
        if self.fail {
            return Err(ErrorKind::Bus);
        }
        if !self.registers.iter().any(|(a, _, _)| *a == address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut selected = None;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => selected = bytes.first().copied(),
                Operation::Read(buf) => {
                    let register = selected.ok_or(ErrorKind::Other)?;
                    let data = self.register(address, register).ok_or(ErrorKind::Other)?;
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = data.get(i).copied().unwrap_or(0);
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Telemetry Mocks
// ============================================================================

/// Mock log store for testing.
///
/// Keeps every file in memory as a list of lines. Set `fail_appends` to make
/// every append (header included) fail.
#[derive(Debug, Default)]
pub struct MockLogStore {
    /// Files in creation order: `(key, lines)`.
    pub files: Vec<(String, Vec<String>)>,
    /// Make appends fail.
    pub fail_appends: bool,
    /// Fail this many appends, then recover.
    pub fail_next_appends: usize,
}

impl MockLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of one file, empty if it does not exist.
    pub fn lines(&self, key: &str) -> Vec<&str> {
        self.files
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, lines)| lines.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Keys of every file, in creation order.
    pub fn keys(&self) -> Vec<&str> {
        self.files.iter().map(|(k, _)| k.as_str()).collect()
    }
}

impl LogStore for MockLogStore {
    type Error = ();

    fn exists(&mut self, key: &str) -> bool {
        self.files.iter().any(|(k, _)| k == key)
    }

    fn append_line(&mut self, key: &str, line: &str) -> Result<(), ()> {
        if self.fail_appends {
            return Err(());
        }
        if self.fail_next_appends > 0 {
            self.fail_next_appends -= 1;
            return Err(());
        }
        match self.files.iter_mut().find(|(k, _)| k == key) {
            Some((_, lines)) => lines.push(line.to_string()),
            None => self.files.push((key.to_string(), alloc::vec![line.to_string()])),
        }
        Ok(())
    }
}

/// Mock telemetry link for testing.
#[derive(Debug, Default)]
pub struct MockLink {
    /// Lines sent, in order.
    pub lines: Vec<String>,
    /// Make sends fail.
    pub fail: bool,
}

impl MockLink {
    /// Creates a link with nothing sent.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryLink for MockLink {
    type Error = ();

    fn send_line(&mut self, line: &str) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.lines.push(line.to_string());
        Ok(())
    }
}
