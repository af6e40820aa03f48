//! Hobby servo output using ESP32 LEDC PWM.
//!
//! A standard servo expects a 50 Hz frame with a 1-2 ms high pulse; the
//! pulse width selects the angle. The valve linkage uses roughly
//! 1205-1795 µs.

use crate::traits::ServoActuator;
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;

/// Servo on one LEDC channel.
///
/// Uses a 50 Hz timer with 14-bit resolution, giving about 1.2 µs per duty
/// step.
///
/// # Example
///
/// ```ignore
/// use valve_cycler::hal::esp32::Esp32Servo;
/// use valve_cycler::traits::ServoActuator;
///
/// let peripherals = Peripherals::take()?;
/// let mut servo = Esp32Servo::new(
///     peripherals.ledc.timer0,
///     peripherals.ledc.channel0,
///     peripherals.pins.gpio2,
/// )?;
///
/// servo.write_pulse_us(1500)?; // center
/// ```
pub struct Esp32Servo<'d> {
    channel: LedcDriver<'d>,
    pulse_us: Option<u16>,
}

impl<'d> Esp32Servo<'d> {
    /// Servo frame rate in Hz.
    const PWM_FREQ_HZ: u32 = 50;

    /// Frame period in microseconds.
    const PERIOD_US: u32 = 1_000_000 / Self::PWM_FREQ_HZ;

    /// PWM resolution (14-bit = 16384 steps).
    const PWM_RESOLUTION: Resolution = Resolution::Bits14;

    /// Creates a servo output. The pin stays low until the first pulse.
    ///
    /// # Errors
    ///
    /// Returns an error if PWM initialization fails.
    pub fn new<T, TI, C, CI, P, PI>(
        timer: T,
        channel: C,
        pin: P,
    ) -> Result<Self, esp_idf_hal::sys::EspError>
    where
        TI: esp_idf_hal::ledc::LedcTimer + 'd,
        T: Peripheral<P = TI> + 'd,
        CI: esp_idf_hal::ledc::LedcChannel<SpeedMode = TI::SpeedMode> + 'd,
        C: Peripheral<P = CI> + 'd,
        PI: esp_idf_hal::gpio::OutputPin + 'd,
        P: Peripheral<P = PI> + 'd,
    {
        let timer_config = TimerConfig::default()
            .frequency(Self::PWM_FREQ_HZ.Hz())
            .resolution(Self::PWM_RESOLUTION);
        let timer_driver = LedcTimerDriver::new(timer, &timer_config)?;

        let mut channel = LedcDriver::new(channel, timer_driver, pin)?;
        channel.set_duty(0)?;

        Ok(Self {
            channel,
            pulse_us: None,
        })
    }

    /// Last pulse width written.
    #[inline]
    pub fn pulse_us(&self) -> Option<u16> {
        self.pulse_us
    }

    fn duty_for(&self, pulse_us: u16) -> u32 {
        let max = self.channel.get_max_duty();
        (u64::from(pulse_us) * u64::from(max) / u64::from(Self::PERIOD_US)) as u32
    }
}

impl ServoActuator for Esp32Servo<'_> {
    type Error = esp_idf_hal::sys::EspError;

    fn write_pulse_us(&mut self, pulse_us: u16) -> Result<(), Self::Error> {
        let duty = self.duty_for(pulse_us);
        self.channel.set_duty(duty)?;
        self.pulse_us = Some(pulse_us);
        Ok(())
    }
}
