//! Timestamped logging context.
//!
//! A [`Logger`] pairs a [`Clock`] with an output sink and is handed to every
//! component that reports progress. Tests swap in a [`FixedClock`] and a
//! [`MemorySink`] to get deterministic output.

use chrono::{Local, NaiveDateTime};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Format used in log line prefixes.
const SHORT_TIMESTAMP: &str = "%H:%M:%S";
/// Format used in archive file names.
const FULL_TIMESTAMP: &str = "%Y-%m-%dT%H%M%S";

/// Source of the current wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// In-memory sink whose contents stay readable after being handed to a [`Logger`].
#[derive(Debug, Default, Clone)]
pub struct MemorySink(Rc<RefCell<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes `[HH:MM:SS][LEVEL]: message` lines to a sink.
pub struct Logger {
    clock: Box<dyn Clock>,
    sink: RefCell<Box<dyn Write>>,
}

impl Logger {
    pub fn new(clock: impl Clock + 'static, sink: impl Write + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            sink: RefCell::new(Box::new(sink)),
        }
    }

    /// Logger on the system clock writing to standard output.
    pub fn stdout() -> Self {
        Self::new(SystemClock, io::stdout())
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write_line("INFO", message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write_line("ERROR", message.as_ref());
    }

    /// Timestamp suitable for file names, e.g. `2022-07-22T160455`.
    pub fn full_timestamp(&self) -> String {
        self.clock.now().format(FULL_TIMESTAMP).to_string()
    }

    fn short_timestamp(&self) -> String {
        self.clock.now().format(SHORT_TIMESTAMP).to_string()
    }

    fn write_line(&self, level: &str, message: &str) {
        let line = format!("[{}][{level}]: {message}\n", self.short_timestamp());
        let mut sink = self.sink.borrow_mut();
        // Logging failures are ignored.
        let _ = sink.write_all(line.as_bytes()).and_then(|_| sink.flush());
    }
}

#[cfg(test)]
pub(crate) fn test_logger() -> (Logger, MemorySink) {
    use chrono::NaiveDate;

    let now = NaiveDate::from_ymd_opt(2022, 7, 22)
        .and_then(|d| d.and_hms_opt(16, 4, 55))
        .unwrap();
    let sink = MemorySink::new();
    (Logger::new(FixedClock(now), sink.clone()), sink)
}
