//! Telemetry output traits: the rotating file store and the outbound link.
//!
//! The console, the third telemetry target, is the `log` facade and needs no
//! trait of its own.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`LogStore`] | Append-only keyed files (one per day) |
//! | [`TelemetryLink`] | Best-effort line writer to a companion device |
//!
//! # File layout
//!
//! ```text
//! valve_log_2025-06-01.csv
//!   timestamp,voltage,current,valve_position
//!   Rebooted at 2025-06-01T08:00:03Z
//!   2025-06-01T08:00:10Z,12034,412,1205
//!   2025-06-01T08:00:20Z,12029,415,1205
//! ```

/// Append-only keyed file store.
///
/// Keys are plain file names such as `valve_log_2025-06-01.csv`. Each call to
/// [`append_line`](Self::append_line) opens the entry for appending, creating
/// it if needed, writes the line plus a newline, and closes it again, so a
/// power cut loses at most the line being written.
///
/// # Example
///
/// ```rust
/// use valve_cycler::traits::LogStore;
/// use valve_cycler::hal::MockLogStore;
///
/// let mut store = MockLogStore::new();
/// assert!(store.write_header_if_new("a.csv", "h").unwrap());
/// assert!(!store.write_header_if_new("a.csv", "h").unwrap());
/// store.append_line("a.csv", "row").unwrap();
/// assert_eq!(store.lines("a.csv"), ["h", "row"]);
/// ```
pub trait LogStore {
    /// Error type for store operations.
    type Error: core::fmt::Debug;

    /// Returns true if an entry with this key exists.
    fn exists(&mut self, key: &str) -> bool;

    /// Append one line (without trailing newline) to the entry.
    fn append_line(&mut self, key: &str, line: &str) -> Result<(), Self::Error>;

    /// Write `header` as the first line of `key` if the entry does not exist yet.
    ///
    /// Returns `Ok(true)` if the header was written.
    fn write_header_if_new(&mut self, key: &str, header: &str) -> Result<bool, Self::Error> {
        if self.exists(key) {
            return Ok(false);
        }
        self.append_line(key, header)?;
        Ok(true)
    }
}

/// Outbound telemetry link.
///
/// Writes are fire-and-forget: there is no acknowledgment and callers do not
/// retry.
pub trait TelemetryLink {
    /// Error type for link writes.
    type Error: core::fmt::Debug;

    /// Send one line (the implementation appends the line terminator).
    fn send_line(&mut self, line: &str) -> Result<(), Self::Error>;
}
