//! Software LED blinker over `embedded-hal` output pins.
//!
//! [`Flasher`] drives one pin through a [`BlinkPattern`] without timers or
//! interrupts; call [`Flasher::run`] from the main loop. [`LedBank`] groups
//! the red, green and heartbeat flashers behind [`StatusIndicator`].
//!
//! # Example
//!
//! ```rust
//! use valve_cycler::hal::{Flasher, MockPin};
//! use valve_cycler::traits::BlinkPattern;
//!
//! let mut led = Flasher::new(MockPin::new(), BlinkPattern::MOSTLY_OFF);
//! led.run(0);
//! assert!(led.is_lit());
//! led.run(100);
//! assert!(!led.is_lit());
//! led.run(1000);
//! assert!(led.is_lit());
//! ```

use crate::traits::{BlinkPattern, Indicator, StatusIndicator};
use embedded_hal::digital::{OutputPin, PinState};

/// One blinking LED.
///
/// The blink phase starts on the first `run` after a pattern change, so a new
/// pattern always begins with its lit portion.
pub struct Flasher<P: OutputPin> {
    pin: P,
    pattern: BlinkPattern,
    lit: Option<bool>,
    phase_start_ms: Option<u64>,
}

impl<P: OutputPin> Flasher<P> {
    /// Wrap a pin with an initial pattern.
    pub fn new(pin: P, pattern: BlinkPattern) -> Self {
        Self {
            pin,
            pattern,
            lit: None,
            phase_start_ms: None,
        }
    }

    /// Change the pattern. Setting the current pattern again keeps the phase.
    pub fn update(&mut self, pattern: BlinkPattern) {
        if pattern != self.pattern {
            self.pattern = pattern;
            self.phase_start_ms = None;
        }
    }

    /// Drive the pin for time `now_ms`.
    pub fn run(&mut self, now_ms: u64) {
        let lit = if self.pattern.is_off() {
            false
        } else if self.pattern.is_solid() {
            true
        } else {
            let start = *self.phase_start_ms.get_or_insert(now_ms);
            let period = u64::from(self.pattern.on_ms) + u64::from(self.pattern.off_ms);
            now_ms.saturating_sub(start) % period < u64::from(self.pattern.on_ms)
        };
        self.drive(lit);
    }

    fn drive(&mut self, lit: bool) {
        if self.lit == Some(lit) {
            return;
        }
        // A failed write is retried on the next run
        if self.pin.set_state(PinState::from(lit)).is_ok() {
            self.lit = Some(lit);
        }
    }

    /// Returns true if the LED was last driven on.
    pub fn is_lit(&self) -> bool {
        self.lit.unwrap_or(false)
    }

    /// Current pattern.
    pub fn pattern(&self) -> BlinkPattern {
        self.pattern
    }

    /// The underlying pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }
}

/// Red, green and heartbeat LEDs.
pub struct LedBank<R, G, H>
where
    R: OutputPin,
    G: OutputPin,
    H: OutputPin,
{
    /// Red LED.
    pub red: Flasher<R>,
    /// Green LED.
    pub green: Flasher<G>,
    /// Heartbeat LED.
    pub heartbeat: Flasher<H>,
}

impl<R, G, H> LedBank<R, G, H>
where
    R: OutputPin,
    G: OutputPin,
    H: OutputPin,
{
    /// All three LEDs start dark.
    pub fn new(red: R, green: G, heartbeat: H) -> Self {
        Self {
            red: Flasher::new(red, BlinkPattern::OFF),
            green: Flasher::new(green, BlinkPattern::OFF),
            heartbeat: Flasher::new(heartbeat, BlinkPattern::OFF),
        }
    }
}

impl<R, G, H> StatusIndicator for LedBank<R, G, H>
where
    R: OutputPin,
    G: OutputPin,
    H: OutputPin,
{
    fn set_pattern(&mut self, indicator: Indicator, pattern: BlinkPattern) {
        match indicator {
            Indicator::Red => self.red.update(pattern),
            Indicator::Green => self.green.update(pattern),
            Indicator::Heartbeat => self.heartbeat.update(pattern),
        }
    }

    fn tick(&mut self, now_ms: u64) {
        self.red.run(now_ms);
        self.green.run(now_ms);
        self.heartbeat.run(now_ms);
    }
}
