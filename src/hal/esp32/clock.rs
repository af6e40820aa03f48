//! ESP32 clock implementation using the ESP-IDF timer.

use crate::traits::Clock;
use jiff::Timestamp;

/// ESP32 clock using the hardware timer.
///
/// The monotonic side is `esp_timer_get_time()`, microseconds since boot. The
/// wall side is anchored once from the RTC at boot with
/// [`sync`](Self::sync) and then advanced by the monotonic counter, so a
/// wall-clock adjustment can never disturb rate limiting.
///
/// # Example
///
/// ```ignore
/// use valve_cycler::hal::esp32::Esp32Clock;
/// use valve_cycler::traits::Clock;
///
/// let mut clock = Esp32Clock::new();
/// assert!(!clock.is_set());
///
/// clock.sync(rtc.read_time()?);
/// let now = clock.reading();
/// ```
pub struct Esp32Clock {
    anchor: Option<(Timestamp, u64)>,
}

impl Esp32Clock {
    /// Creates a clock whose wall side is not yet set.
    #[inline]
    pub fn new() -> Self {
        Self { anchor: None }
    }

    /// Anchor the wall clock to `wall` at the current monotonic time.
    pub fn sync(&mut self, wall: Timestamp) {
        self.anchor = Some((wall, self.now_ms()));
    }
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // esp_timer_get_time returns microseconds since boot
        // Safe: this is a simple read of the hardware timer, no side effects
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }

    fn wall_time(&self) -> Timestamp {
        match self.anchor {
            Some((wall, at_ms)) => {
                let elapsed = self.now_ms().saturating_sub(at_ms) as i64;
                Timestamp::from_millisecond(wall.as_millisecond() + elapsed).unwrap_or(wall)
            }
            None => Timestamp::UNIX_EPOCH,
        }
    }

    fn is_set(&self) -> bool {
        self.anchor.is_some()
    }
}
