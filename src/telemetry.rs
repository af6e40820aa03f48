//! Telemetry scheduler: periodic power/valve records with daily file rotation.
//!
//! The [`TelemetryScheduler`] decides when a record is due, samples the
//! [`TelemetrySource`] (normally the
//! [`PositionController`](crate::PositionController)) and writes the record
//! to three independent sinks:
//!
//! | Sink | Target | On failure |
//! |------|--------|-----------|
//! | Console | `log::info!` | n/a |
//! | File | [`LogStore`], one file per UTC day | warn, skip the record |
//! | Link | [`TelemetryLink`], `V:` + CSV row | debug, drop the line |
//!
//! # Cadence
//!
//! A tick is eligible when the wall clock has moved past the last logged
//! second and the second-of-minute is a multiple of the log interval. Calling
//! [`tick`](TelemetryScheduler::tick) many times within the same second emits
//! at most one record.
//!
//! # Example
//!
//! ```rust
//! use valve_cycler::{TelemetryScheduler, PowerSample, TelemetrySource, ValvePosition};
//! use valve_cycler::config::TelemetryConfig;
//! use valve_cycler::hal::{MockClock, MockLink, MockLogStore};
//! use valve_cycler::Clock;
//!
//! struct Fixed;
//!
//! impl TelemetrySource for Fixed {
//!     fn sample_power(&mut self) -> PowerSample {
//!         PowerSample { voltage_mv: 12_000, current_ma: 250 }
//!     }
//!     fn valve_position(&self) -> ValvePosition {
//!         ValvePosition::Bottom
//!     }
//!     fn valve_pulse_us(&self) -> u16 {
//!         1205
//!     }
//! }
//!
//! let mut scheduler =
//!     TelemetryScheduler::new(MockLogStore::new(), MockLink::new(), TelemetryConfig::default());
//! let mut clock = MockClock::new();
//!
//! let record = scheduler.tick(&clock.reading(), &mut Fixed).unwrap();
//! assert_eq!(record.csv_row().as_str(), "1970-01-01T00:00:00Z,12000,250,1205");
//!
//! // Same second: nothing new
//! assert!(scheduler.tick(&clock.reading(), &mut Fixed).is_none());
//!
//! // 00:00:05 is not on the 10 s grid
//! clock.set_secs(5);
//! assert!(scheduler.tick(&clock.reading(), &mut Fixed).is_none());
//!
//! assert_eq!(
//!     scheduler.store().lines("valve_log_1970-01-01.csv"),
//!     ["timestamp,voltage,current,valve_position", "1970-01-01T00:00:00Z,12000,250,1205"]
//! );
//! ```

use crate::config::TelemetryConfig;
use crate::traits::{ClockReading, LogStore, TelemetryLink};
use crate::valve::ValvePosition;
use core::fmt::Write;
use heapless::String as HString;
use jiff::civil::Date;
use jiff::tz::Offset;
use jiff::Timestamp;
use log::{debug, info, warn};

/// Header line of every daily file.
pub const CSV_HEADER: &str = "timestamp,voltage,current,valve_position";

/// Prefix of every line sent over the link.
pub const LINK_PREFIX: &str = "V:";

/// Maximum length of a record line.
pub const MAX_LINE_LEN: usize = 64;

/// Maximum length of a file key (32-byte prefix + `_YYYY-MM-DD.csv`).
pub const MAX_KEY_LEN: usize = 48;

/// One formatted telemetry line.
pub type RecordLine = HString<MAX_LINE_LEN>;

/// A daily file name.
pub type FileKey = HString<MAX_KEY_LEN>;

/// `YYYY-MM-DDTHH:MM:SSZ`.
pub type TimestampText = HString<24>;

/// Bus power sampled for one record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerSample {
    /// Bus voltage in millivolts.
    pub voltage_mv: i32,
    /// Bus current in milliamps.
    pub current_ma: i32,
}

impl PowerSample {
    /// Reported when the sensor cannot be read.
    pub const UNAVAILABLE: Self = Self {
        voltage_mv: 0,
        current_ma: 0,
    };
}

/// Where a telemetry record gets its data.
pub trait TelemetrySource {
    /// Read bus voltage and current, falling back to
    /// [`PowerSample::UNAVAILABLE`] values on sensor failure.
    fn sample_power(&mut self) -> PowerSample;

    /// Current valve position.
    fn valve_position(&self) -> ValvePosition;

    /// Pulse width of the current valve position.
    fn valve_pulse_us(&self) -> u16;
}

/// One telemetry sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    /// Wall-clock time, second resolution.
    pub timestamp: Timestamp,
    /// Bus voltage in millivolts.
    pub voltage_mv: i32,
    /// Bus current in milliamps.
    pub current_ma: i32,
    /// Valve position at sampling time.
    pub position: ValvePosition,
    /// Pulse width of that position.
    pub pulse_us: u16,
}

impl TelemetryRecord {
    /// `timestamp,voltage,current,valve_position` row.
    ///
    /// The valve column holds the pulse width in microseconds.
    pub fn csv_row(&self) -> RecordLine {
        let mut line = RecordLine::new();
        let _ = write!(
            line,
            "{},{},{},{}",
            format_timestamp(self.timestamp),
            self.voltage_mv,
            self.current_ma,
            self.pulse_us
        );
        line
    }

    /// The row as sent over the telemetry link.
    pub fn link_line(&self) -> RecordLine {
        let mut line = RecordLine::new();
        let _ = write!(line, "{}{}", LINK_PREFIX, self.csv_row());
        line
    }
}

/// Format a timestamp as UTC `YYYY-MM-DDTHH:MM:SSZ`.
///
/// # Examples
///
/// ```
/// use jiff::Timestamp;
/// use valve_cycler::telemetry::format_timestamp;
///
/// let ts = Timestamp::from_second(1_748_764_803).unwrap();
/// assert_eq!(format_timestamp(ts).as_str(), "2025-06-01T08:00:03Z");
/// ```
pub fn format_timestamp(ts: Timestamp) -> TimestampText {
    let dt = Offset::UTC.to_datetime(ts);
    let mut text = TimestampText::new();
    let _ = write!(
        text,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        dt.year(),
        dt.month(),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    text
}

/// UTC calendar date of a timestamp.
#[inline]
pub fn utc_date(ts: Timestamp) -> Date {
    Offset::UTC.to_datetime(ts).date()
}

/// Daily file key: `<prefix>_YYYY-MM-DD.csv`.
pub fn file_key(prefix: &str, date: Date) -> FileKey {
    let mut key = FileKey::new();
    let _ = write!(
        key,
        "{}_{:04}-{:02}-{:02}.csv",
        prefix,
        date.year(),
        date.month(),
        date.day()
    );
    key
}

/// The daily file currently being written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogDestination {
    /// UTC day this destination covers.
    pub date: Date,
    /// File key derived from the prefix and date.
    pub key: FileKey,
    /// True once the header has been written or found already present.
    pub initialized: bool,
}

/// Scheduler state snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerState {
    /// Wall-clock second of the last emitted record.
    pub last_log_secs: Option<i64>,
    /// Active daily file.
    pub destination: Option<LogDestination>,
}

/// Periodic telemetry writer.
///
/// # Type Parameters
///
/// - `St`: daily file store ([`LogStore`])
/// - `L`: outbound line link ([`TelemetryLink`])
pub struct TelemetryScheduler<St, L>
where
    St: LogStore,
    L: TelemetryLink,
{
    store: St,
    link: L,
    config: TelemetryConfig,
    state: SchedulerState,
}

impl<St, L> TelemetryScheduler<St, L>
where
    St: LogStore,
    L: TelemetryLink,
{
    /// Create a scheduler. Nothing is written until [`begin`](Self::begin) or
    /// the first eligible tick.
    pub fn new(store: St, link: L, config: TelemetryConfig) -> Self {
        Self {
            store,
            link,
            config,
            state: SchedulerState::default(),
        }
    }

    /// Open today's file and mark the restart in it.
    pub fn begin(&mut self, now: &ClockReading) {
        self.rotate(now.wall);

        let mut marker = RecordLine::new();
        let _ = write!(marker, "Rebooted at {}", format_timestamp(now.wall));
        info!("{}", marker);

        self.append_to_file(marker.as_str());
    }

    /// Returns true if a record would be emitted at `wall`.
    pub fn is_due(&self, wall: Timestamp) -> bool {
        let secs = wall.as_second();
        if let Some(last) = self.state.last_log_secs {
            if secs <= last {
                return false;
            }
        }
        let second_of_minute = secs.rem_euclid(60) as u32;
        second_of_minute % self.config.log_interval_secs.max(1) == 0
    }

    /// Emit a record if one is due.
    pub fn tick<T>(&mut self, now: &ClockReading, source: &mut T) -> Option<TelemetryRecord>
    where
        T: TelemetrySource,
    {
        if !self.is_due(now.wall) {
            return None;
        }
        Some(self.emit(now.wall, source))
    }

    /// Emit a record immediately, ignoring the cadence.
    pub fn log_now<T>(&mut self, now: &ClockReading, source: &mut T) -> TelemetryRecord
    where
        T: TelemetrySource,
    {
        self.emit(now.wall, source)
    }

    fn emit<T>(&mut self, wall: Timestamp, source: &mut T) -> TelemetryRecord
    where
        T: TelemetrySource,
    {
        self.rotate(wall);

        let power = source.sample_power();
        let record = TelemetryRecord {
            timestamp: wall,
            voltage_mv: power.voltage_mv,
            current_ma: power.current_ma,
            position: source.valve_position(),
            pulse_us: source.valve_pulse_us(),
        };
        self.state.last_log_secs = Some(wall.as_second());

        self.write_record(&record);
        record
    }

    fn write_record(&mut self, record: &TelemetryRecord) {
        info!(
            "Logged power at {} - voltage: {} mV, current: {} mA, valve: {}",
            format_timestamp(record.timestamp),
            record.voltage_mv,
            record.current_ma,
            record.position.as_str()
        );

        self.append_to_file(record.csv_row().as_str());

        if let Err(e) = self.link.send_line(record.link_line().as_str()) {
            debug!("Telemetry link write failed: {:?}", e);
        }
    }

    fn rotate(&mut self, wall: Timestamp) {
        let date = utc_date(wall);
        let stale = self
            .state
            .destination
            .as_ref()
            .map_or(true, |dest| dest.date != date);
        if stale {
            let key = file_key(self.config.file_prefix.as_str(), date);
            info!("Logging to {}", key);
            self.state.destination = Some(LogDestination {
                date,
                key,
                initialized: false,
            });
        }
    }

    /// Append a line to the active file, writing the header first if the file
    /// has none yet. The line is dropped while the header cannot be written.
    fn append_to_file(&mut self, line: &str) {
        let Some(dest) = self.state.destination.as_mut() else {
            return;
        };

        if !dest.initialized {
            match self.store.write_header_if_new(dest.key.as_str(), CSV_HEADER) {
                Ok(_) => dest.initialized = true,
                Err(e) => {
                    warn!("Error creating {}, line dropped: {:?}", dest.key, e);
                    return;
                }
            }
        }

        if let Err(e) = self.store.append_line(dest.key.as_str(), line) {
            warn!("Error appending to {}: {:?}", dest.key, e);
        }
    }

    /// Key of the active daily file.
    pub fn destination_key(&self) -> Option<&str> {
        self.state.destination.as_ref().map(|dest| dest.key.as_str())
    }

    /// Scheduler state snapshot.
    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// The file store.
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Mutable access to the file store.
    pub fn store_mut(&mut self) -> &mut St {
        &mut self.store
    }

    /// The telemetry link.
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Mutable access to the telemetry link.
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
