//! Record dispatcher.
//!
//! ```text
//! log(tag, level, args)
//!   │
//!   ├─ resolve(tag) ──▶ (effective level, sink list)
//!   ├─ level disabled? ──▶ return (no formatting)
//!   ├─ format into RecordBuffer (512 B, truncating)
//!   └─ sink[0].on_write(..), sink[1].on_write(..), ... in list order
//! ```
//!
//! Formatting happens once per record, on the caller's stack. Sinks never
//! report failure back; a sink that swallows a write does not stop the ones
//! after it.

use core::fmt;

use crate::format::{self, RecordBuffer, BYTES_PER_LINE};
use crate::level::Level;
use crate::registry::Registry;

/// Tag used when a record has no subsystem of its own.
pub const ROOT_TAG: &str = "ROOT";

/// Timestamp provider, in milliseconds.
pub type TimeSource = fn() -> u32;

fn no_time() -> u32 {
    0
}

/// Milliseconds since boot from the ESP high resolution timer.
#[cfg(target_os = "espidf")]
pub fn esp_timer_ms() -> u32 {
    // SAFETY: plain FFI getter, callable from any context.
    let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
    (us / 1000) as u32
}

/// Registry plus the dispatch path.
pub struct Logger {
    registry: Registry,
    time: TimeSource,
}

impl Logger {
    /// Empty registry, timestamps fixed at 0.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Dispatch over an already configured registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            time: no_time,
        }
    }

    /// Builder form of [`set_time_source`](Self::set_time_source).
    pub fn with_time_source(mut self, time: TimeSource) -> Self {
        self.time = time;
        self
    }

    /// Replace the timestamp provider.
    pub fn set_time_source(&mut self, time: TimeSource) {
        self.time = time;
    }

    /// Current timestamp as stamped on records.
    #[inline]
    pub fn time(&self) -> u32 {
        (self.time)()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// True if a record at `level` on `tag` would be dispatched.
    #[inline]
    pub fn enabled(&self, tag: &str, level: Level) -> bool {
        self.registry.level(tag).allows(level)
    }

    /// Format and dispatch one record.
    ///
    /// Returns false if the level is disabled for `tag` (nothing formatted).
    /// Sink trouble is invisible here.
    pub fn log(&mut self, tag: &str, level: Level, args: fmt::Arguments<'_>) -> bool {
        let time = self.time;
        let (effective, sinks) = self.registry.resolve_mut(tag);
        if !effective.allows(level) {
            return false;
        }
        let timestamp = time();

        let mut record = RecordBuffer::<{ format::MAX_RECORD_LEN }>::new();
        format::format_record(&mut record, level, timestamp, tag, args);

        for sink in sinks.iter_mut() {
            sink.on_write(level, record.as_bytes());
        }
        true
    }

    /// Log `bytes` as hex, one record per 16 bytes.
    pub fn write_hex(&mut self, tag: &str, level: Level, bytes: &[u8]) {
        self.write_lines(tag, level, bytes, |out, _, line| format::hex_line(out, line));
    }

    /// Log `bytes` as raw characters, one record per 16 bytes.
    pub fn write_chars(&mut self, tag: &str, level: Level, bytes: &[u8]) {
        self.write_lines(tag, level, bytes, |out, _, line| format::char_line(out, line));
    }

    /// Log `bytes` as a hexdump (offset, hex, ASCII), one record per line.
    pub fn write_hexdump(&mut self, tag: &str, level: Level, bytes: &[u8]) {
        self.write_lines(tag, level, bytes, |out, offset, line| {
            format::hexdump_line(out, offset, line)
        });
    }

    fn write_lines<F>(&mut self, tag: &str, level: Level, bytes: &[u8], render: F)
    where
        F: Fn(&mut fmt::Formatter<'_>, usize, &[u8]) -> fmt::Result,
    {
        if bytes.is_empty() || !self.enabled(tag, level) {
            return;
        }
        for (i, line) in bytes.chunks(BYTES_PER_LINE).enumerate() {
            let rendered = Rendered {
                offset: i * BYTES_PER_LINE,
                line,
                render: &render,
            };
            self.log(tag, level, format_args!("{}", rendered));
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapts a line renderer to `Display` so it formats straight into the record.
struct Rendered<'a, F> {
    offset: usize,
    line: &'a [u8],
    render: &'a F,
}

impl<F> fmt::Display for Rendered<'_, F>
where
    F: Fn(&mut fmt::Formatter<'_>, usize, &[u8]) -> fmt::Result,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self.render)(f, self.offset, self.line)
    }
}
