//! Filesystem-backed [`LogStore`].
//!
//! One plain text file per key under a root directory. On ESP32 the root is
//! the mounted SD card (`/sdcard`); on a desktop it can be any directory.

use crate::traits::LogStore;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Daily log files in a directory.
///
/// Every append opens the file, writes one line and closes it again, so at
/// most the line in flight is lost on power failure.
///
/// # Example
///
/// ```rust
/// use valve_cycler::hal::FsLogStore;
/// use valve_cycler::traits::LogStore;
///
/// let dir = tempfile::tempdir().unwrap();
/// let mut store = FsLogStore::new(dir.path());
///
/// assert!(store.write_header_if_new("log.csv", "a,b").unwrap());
/// store.append_line("log.csv", "1,2").unwrap();
///
/// let text = std::fs::read_to_string(dir.path().join("log.csv")).unwrap();
/// assert_eq!(text, "a,b\n1,2\n");
/// ```
#[derive(Debug, Clone)]
pub struct FsLogStore {
    root: PathBuf,
}

impl FsLogStore {
    /// Store files under `root`. The directory must already exist.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl LogStore for FsLogStore {
    type Error = io::Error;

    fn exists(&mut self, key: &str) -> bool {
        self.path(key).is_file()
    }

    fn append_line(&mut self, key: &str, line: &str) -> Result<(), io::Error> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(key))?;
        writeln!(file, "{line}")?;
        file.flush()
    }
}
