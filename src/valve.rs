//! Valve position controller: the single authority over where the valve is.
//!
//! This module provides [`PositionController`], which decides targets, enforces
//! the minimum spacing between moves, persists the commanded side and applies
//! the low-voltage safety interlock.
//!
//! # Overview
//!
//! Each tick the controller:
//! - Runs the safety poll (sends the valve home if bus voltage is low)
//! - Otherwise picks a target from the wall-clock schedule or a command byte
//! - Moves the valve if the target differs and the rate limiter allows it
//! - Advances the status light blink phase
//!
//! # Example
//!
//! ```rust
//! use valve_cycler::{
//!     Clock, PositionController, ValvePosition, MoveResult,
//!     config::ValveConfig,
//!     hal::{MockCell, MockClock, MockDelay, MockIndicator, MockPowerMonitor, MockServo},
//! };
//!
//! let mut controller = PositionController::new(
//!     MockServo::new(),
//!     MockPowerMonitor::new(12_000, 400),
//!     MockCell::new(),
//!     MockIndicator::new(),
//!     ValveConfig::default(),
//! );
//!
//! // Timer mode: at 00:00:00 the schedule says bottom
//! let mut clock = MockClock::new();
//! let initial = controller.begin(&clock, &mut MockDelay::new(), 0).unwrap();
//! assert_eq!(initial, ValvePosition::Bottom);
//!
//! // Thirty seconds later the schedule flips to top
//! clock.advance(30_000);
//! let result = controller.update(&clock.reading(), None).unwrap();
//! assert_eq!(result, Some(MoveResult::Moved(ValvePosition::Top)));
//! ```
//!
//! # Safety Interlock
//!
//! When bus voltage drops below the threshold the valve is driven to the
//! home position. The interlock bypasses the rate limiter and never touches
//! the persisted side, so a restart after a brown-out restores the last
//! commanded side rather than home.
//!
//! ```rust
//! use valve_cycler::{
//!     Clock, PositionController, ValvePosition, MoveResult,
//!     config::ValveConfig,
//!     hal::{MockCell, MockClock, MockDelay, MockIndicator, MockPowerMonitor, MockServo},
//! };
//!
//! let mut controller = PositionController::new(
//!     MockServo::new(),
//!     MockPowerMonitor::new(12_000, 400),
//!     MockCell::new(),
//!     MockIndicator::new(),
//!     ValveConfig::default(),
//! );
//! let mut clock = MockClock::new();
//! controller.begin(&clock, &mut MockDelay::new(), 0).unwrap();
//!
//! controller.power_mut().set_voltage_mv(5_000);
//! clock.advance(200);
//! let result = controller.update(&clock.reading(), None).unwrap();
//! assert_eq!(result, Some(MoveResult::MovedToHome));
//! assert_eq!(controller.current_position(), ValvePosition::Home);
//! ```

use crate::commands::{MoveResult, ValveCommand};
use crate::config::{ControlMode, ValveConfig};
use crate::telemetry::{PowerSample, TelemetrySource};
use crate::traits::{
    BlinkPattern, Clock, ClockReading, Indicator, PersistentCell, PowerMonitor, ServoActuator,
    StatusIndicator,
};
use embedded_hal::delay::DelayNs;
use jiff::Timestamp;
use log::{debug, info, warn};

/// Seconds in the timer schedule's cycle window.
const CYCLE_WINDOW_SECS: i64 = 3600;

/// One of the three valve positions.
///
/// Only [`Bottom`](Self::Bottom) and [`Top`](Self::Top) can be commanded.
/// [`Home`](Self::Home) sits between them and is reached only through the
/// safety interlock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ValvePosition {
    /// 0 degrees.
    Bottom,
    /// 179 degrees.
    Top,
    /// 89 degrees, the safe resting position.
    Home,
}

impl ValvePosition {
    /// Returns the position as a lowercase string.
    ///
    /// # Examples
    ///
    /// ```
    /// use valve_cycler::ValvePosition;
    ///
    /// assert_eq!(ValvePosition::Bottom.as_str(), "bottom");
    /// assert_eq!(ValvePosition::Top.as_str(), "top");
    /// assert_eq!(ValvePosition::Home.as_str(), "home");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ValvePosition::Bottom => "bottom",
            ValvePosition::Top => "top",
            ValvePosition::Home => "home",
        }
    }

    /// Decode the persisted side (`true` = top).
    #[inline]
    pub const fn from_side(top: bool) -> Self {
        if top {
            ValvePosition::Top
        } else {
            ValvePosition::Bottom
        }
    }

    /// Returns true for the two commandable sides.
    #[inline]
    pub const fn is_side(&self) -> bool {
        !matches!(self, ValvePosition::Home)
    }

    /// Servo pulse width for this position.
    #[inline]
    pub const fn pulse_us(&self, config: &ValveConfig) -> u16 {
        match self {
            ValvePosition::Bottom => config.bottom_pulse_us,
            ValvePosition::Top => config.top_pulse_us,
            ValvePosition::Home => config.home_pulse_us,
        }
    }

    /// Status light pattern shown while the valve rests here.
    ///
    /// | Position | Red | Green |
    /// |----------|-----|-------|
    /// | Bottom | solid | short blink |
    /// | Top | short blink | solid |
    /// | Home | slow blink | slow blink |
    pub const fn indicator_pattern(&self) -> IndicatorPattern {
        match self {
            ValvePosition::Bottom => IndicatorPattern {
                red: BlinkPattern::SOLID,
                green: BlinkPattern::MOSTLY_OFF,
            },
            ValvePosition::Top => IndicatorPattern {
                red: BlinkPattern::MOSTLY_OFF,
                green: BlinkPattern::SOLID,
            },
            ValvePosition::Home => IndicatorPattern {
                red: BlinkPattern::SLOW,
                green: BlinkPattern::SLOW,
            },
        }
    }
}

/// Red/green pattern pair for one valve position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndicatorPattern {
    /// Red light pattern.
    pub red: BlinkPattern,
    /// Green light pattern.
    pub green: BlinkPattern,
}

/// Seconds elapsed in the current hour of the UTC wall clock.
#[inline]
pub fn seconds_within_cycle(wall: Timestamp) -> u32 {
    wall.as_second().rem_euclid(CYCLE_WINDOW_SECS) as u32
}

/// Timer-mode schedule: bottom during even intervals of the hour, top during odd ones.
///
/// This depends only on the wall clock, so a controller restarted at any
/// moment lands in the same phase as one that never stopped.
///
/// # Examples
///
/// ```
/// use jiff::Timestamp;
/// use valve_cycler::{timer_target, ValvePosition};
///
/// let at = |s| Timestamp::from_second(s).unwrap();
/// assert_eq!(timer_target(at(0), 30), ValvePosition::Bottom);
/// assert_eq!(timer_target(at(29), 30), ValvePosition::Bottom);
/// assert_eq!(timer_target(at(30), 30), ValvePosition::Top);
/// assert_eq!(timer_target(at(60), 30), ValvePosition::Bottom);
/// ```
pub fn timer_target(wall: Timestamp, change_interval_secs: u32) -> ValvePosition {
    let bucket = seconds_within_cycle(wall) / change_interval_secs.max(1);
    if bucket % 2 == 0 {
        ValvePosition::Bottom
    } else {
        ValvePosition::Top
    }
}

/// Controller state snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerState {
    /// Where the valve was last driven.
    pub current: ValvePosition,
    /// Monotonic time of the last committed move.
    pub last_move_ms: Option<u64>,
    /// Last side read from or written to the persistent cell.
    pub persisted_top: Option<bool>,
    /// Monotonic time of the last safety poll.
    pub last_safety_poll_ms: Option<u64>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            current: ValvePosition::Bottom,
            last_move_ms: None,
            persisted_top: None,
            last_safety_poll_ms: None,
        }
    }
}

/// Valve position controller.
///
/// Owns the servo, power monitor, persistent cell and status lights, and is
/// the only writer of the valve position.
///
/// # Type Parameters
///
/// - `S`: servo ([`ServoActuator`])
/// - `P`: bus power sensor ([`PowerMonitor`])
/// - `C`: non-volatile side storage ([`PersistentCell`])
/// - `I`: status lights ([`StatusIndicator`])
///
/// # Errors
///
/// Only servo write failures are returned. Sensor and storage failures are
/// logged and contained.
pub struct PositionController<S, P, C, I>
where
    S: ServoActuator,
    P: PowerMonitor,
    C: PersistentCell,
    I: StatusIndicator,
{
    servo: S,
    power: P,
    cell: C,
    indicator: I,
    config: ValveConfig,
    state: ControllerState,
    // Set while the power monitor is failing, so only the first failure warns
    power_failed: bool,
}

impl<S, P, C, I> PositionController<S, P, C, I>
where
    S: ServoActuator,
    P: PowerMonitor,
    C: PersistentCell,
    I: StatusIndicator,
{
    /// Create a new controller. Call [`begin`](Self::begin) before the first tick.
    pub fn new(servo: S, power: P, cell: C, indicator: I, config: ValveConfig) -> Self {
        Self {
            servo,
            power,
            cell,
            indicator,
            config,
            state: ControllerState::default(),
            power_failed: false,
        }
    }

    /// One-time startup.
    ///
    /// Blocks for `settle_delay_ms` so the actuator can power up, then drives
    /// the valve to its initial side: the persisted side in external mode, the
    /// scheduled side in timer mode. Never starts at home.
    pub fn begin<K, D>(
        &mut self,
        clock: &K,
        delay: &mut D,
        settle_delay_ms: u32,
    ) -> Result<ValvePosition, S::Error>
    where
        K: Clock,
        D: DelayNs,
    {
        if settle_delay_ms > 0 {
            info!("Waiting {} ms for the valve to settle", settle_delay_ms);
            delay.delay_ms(settle_delay_ms);
        }
        self.indicator
            .set_pattern(Indicator::Heartbeat, BlinkPattern::MOSTLY_OFF);

        let now = clock.reading();
        let initial = match self.config.mode {
            ControlMode::External => match self.cell.read() {
                Ok(top) => {
                    self.state.persisted_top = Some(top);
                    ValvePosition::from_side(top)
                }
                Err(e) => {
                    warn!("Persisted valve side unreadable ({:?}), using bottom", e);
                    ValvePosition::Bottom
                }
            },
            ControlMode::Timer => timer_target(now.wall, self.config.change_interval_secs),
        };

        self.commit(initial, &now)?;
        info!(
            "Valve controller started in {} mode at {}",
            self.config.mode.as_str(),
            initial.as_str()
        );
        Ok(initial)
    }

    /// Run one control tick.
    ///
    /// The safety poll runs first; if it sends the valve home nothing else
    /// happens this tick. Otherwise the target for this tick is decided and
    /// attempted. The status light phase is advanced either way.
    pub fn update(
        &mut self,
        now: &ClockReading,
        external: Option<u8>,
    ) -> Result<Option<MoveResult>, S::Error> {
        let result = self.step(now, external);
        self.indicator.tick(now.monotonic_ms);
        result
    }

    fn step(
        &mut self,
        now: &ClockReading,
        external: Option<u8>,
    ) -> Result<Option<MoveResult>, S::Error> {
        if let Some(result) = self.safety_poll(now)? {
            return Ok(Some(result));
        }
        match self.decide_target(now, external) {
            Some(target) => {
                debug!(
                    "{}: turning to {}",
                    self.config.mode.as_str(),
                    target.as_str()
                );
                self.move_to(target, now).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Pick the target for this tick, or `None` if the valve should stay put.
    ///
    /// - Timer mode: [`timer_target`] of the wall clock
    /// - External mode: `b't'` → top, `b'b'` → bottom, anything else → none
    ///
    /// A target equal to the current position is reported as `None`.
    pub fn decide_target(&self, now: &ClockReading, external: Option<u8>) -> Option<ValvePosition> {
        let target = match self.config.mode {
            ControlMode::Timer => Some(timer_target(now.wall, self.config.change_interval_secs)),
            ControlMode::External => external.and_then(|byte| {
                let command = ValveCommand::from_byte(byte);
                if command.is_none() {
                    debug!("Ignoring command byte {:#04x}", byte);
                }
                command.map(|c| c.target())
            }),
        };
        target.filter(|t| *t != self.state.current)
    }

    /// Attempt to move the valve to `target`.
    ///
    /// Low bus voltage overrides the target with home regardless of the rate
    /// limiter. Otherwise a move closer than `min_move_interval_ms` to the
    /// previous one is [`Suppressed`](MoveResult::Suppressed) and changes
    /// nothing.
    pub fn move_to(
        &mut self,
        target: ValvePosition,
        now: &ClockReading,
    ) -> Result<MoveResult, S::Error> {
        if self.voltage_low() {
            self.go_home(now)?;
            return Ok(MoveResult::MovedToHome);
        }

        if self.is_rate_limited(now.monotonic_ms) {
            debug!("Move to {} suppressed by rate limit", target.as_str());
            return Ok(MoveResult::Suppressed);
        }

        self.commit(target, now)?;
        info!(
            "Valve moved to {} ({} us)",
            target.as_str(),
            target.pulse_us(&self.config)
        );
        Ok(MoveResult::Moved(target))
    }

    /// Fast power check, run at most once per `safety_poll_interval_ms`.
    ///
    /// Sends the valve home if bus voltage is low and it is not already
    /// there. Never rate limited.
    pub fn safety_poll(&mut self, now: &ClockReading) -> Result<Option<MoveResult>, S::Error> {
        if let Some(last) = self.state.last_safety_poll_ms {
            if now.monotonic_ms.saturating_sub(last) < self.config.safety_poll_interval_ms {
                return Ok(None);
            }
        }
        self.state.last_safety_poll_ms = Some(now.monotonic_ms);

        if self.state.current == ValvePosition::Home || !self.voltage_low() {
            return Ok(None);
        }
        self.go_home(now)?;
        Ok(Some(MoveResult::MovedToHome))
    }

    /// Returns true if a move at `now_ms` would be refused.
    pub fn is_rate_limited(&self, now_ms: u64) -> bool {
        match self.state.last_move_ms {
            Some(last) => now_ms.saturating_sub(last) < self.config.min_move_interval_ms,
            None => false,
        }
    }

    fn voltage_low(&mut self) -> bool {
        self.read_voltage_mv() < self.config.low_voltage_threshold_mv
    }

    fn read_voltage_mv(&mut self) -> i32 {
        match self.power.read_voltage_mv() {
            Ok(mv) => {
                if self.power_failed {
                    info!("Power monitor readings restored");
                    self.power_failed = false;
                }
                mv
            }
            Err(e) => {
                self.power_read_failed("voltage", &e);
                PowerSample::UNAVAILABLE.voltage_mv
            }
        }
    }

    fn power_read_failed(&mut self, what: &str, e: &P::Error) {
        if self.power_failed {
            debug!("Bus {} read failed: {:?}", what, e);
        } else {
            warn!("Bus {} read failed: {:?}", what, e);
            self.power_failed = true;
        }
    }

    fn go_home(&mut self, now: &ClockReading) -> Result<(), S::Error> {
        if self.state.current == ValvePosition::Home {
            self.state.last_move_ms = Some(now.monotonic_ms);
            return Ok(());
        }
        warn!("Power too low, returning valve to home");
        self.commit(ValvePosition::Home, now)
    }

    fn commit(&mut self, target: ValvePosition, now: &ClockReading) -> Result<(), S::Error> {
        self.servo.write_pulse_us(target.pulse_us(&self.config))?;
        self.state.current = target;
        self.state.last_move_ms = Some(now.monotonic_ms);

        if target.is_side() {
            let top = target == ValvePosition::Top;
            match self.cell.write(top) {
                Ok(()) => self.state.persisted_top = Some(top),
                Err(e) => warn!("Failed to persist valve side: {:?}", e),
            }
        }

        let pattern = target.indicator_pattern();
        self.indicator.set_pattern(Indicator::Red, pattern.red);
        self.indicator.set_pattern(Indicator::Green, pattern.green);
        Ok(())
    }

    /// Where the valve was last driven.
    #[inline]
    pub fn current_position(&self) -> ValvePosition {
        self.state.current
    }

    /// Pulse width of the current position.
    #[inline]
    pub fn current_pulse_us(&self) -> u16 {
        self.state.current.pulse_us(&self.config)
    }

    /// Controller state snapshot.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Active configuration.
    #[inline]
    pub fn config(&self) -> &ValveConfig {
        &self.config
    }

    /// The servo.
    pub fn servo(&self) -> &S {
        &self.servo
    }

    /// The power monitor.
    pub fn power(&self) -> &P {
        &self.power
    }

    /// Mutable access to the power monitor.
    pub fn power_mut(&mut self) -> &mut P {
        &mut self.power
    }

    /// The persistent cell.
    pub fn cell(&self) -> &C {
        &self.cell
    }

    /// The status lights.
    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Tear the controller down, returning its hardware.
    pub fn into_parts(self) -> (S, P, C, I) {
        (self.servo, self.power, self.cell, self.indicator)
    }
}

impl<S, P, C, I> TelemetrySource for PositionController<S, P, C, I>
where
    S: ServoActuator,
    P: PowerMonitor,
    C: PersistentCell,
    I: StatusIndicator,
{
    fn sample_power(&mut self) -> PowerSample {
        let voltage_mv = self.read_voltage_mv();
        let current_ma = match self.power.read_current_ma() {
            Ok(ma) => ma,
            Err(e) => {
                self.power_read_failed("current", &e);
                PowerSample::UNAVAILABLE.current_ma
            }
        };
        PowerSample {
            voltage_mv,
            current_ma,
        }
    }

    fn valve_position(&self) -> ValvePosition {
        self.state.current
    }

    fn valve_pulse_us(&self) -> u16 {
        self.current_pulse_us()
    }
}
