//! Output sinks.
//!
//! A sink consumes already-formatted records. Sinks are fire-and-forget:
//! they never report failure to the caller, and they are not reentrant
//! (`on_write` takes `&mut self`).
//!
//! A sink registered directly in the [`Registry`](crate::Registry) is called
//! from whatever context logs. Wrap slow or context-sensitive sinks in an
//! [`AsyncSink`](crate::AsyncSink) so only one consumer thread touches them.

use std::io;
use std::sync::{Arc, Mutex};

use crate::level::Level;

/// A record consumer.
///
/// # Contract
///
/// - `bytes` is not terminated and may be any length, including a
///   fragment of a larger record (the async adapter forwards chunks).
/// - Must not panic on I/O trouble; swallow it and move on.
pub trait Sink: Send {
    /// Emit `bytes` at `level`.
    fn on_write(&mut self, level: Level, bytes: &[u8]);
}

/// Owned, type-erased sink as stored in sink lists.
pub type BoxedSink = Box<dyn Sink>;

impl<S: Sink + ?Sized> Sink for Box<S> {
    #[inline]
    fn on_write(&mut self, level: Level, bytes: &[u8]) {
        (**self).on_write(level, bytes);
    }
}

/// Shared-ownership handle to a sink.
///
/// Lets one physical sink appear in several sink lists (global and per tag)
/// without dangling references: the sink lives as long as any handle.
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S: Sink> SharedSink<S> {
    /// Wrap `sink` for sharing.
    pub fn new(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Run `f` with exclusive access to the wrapped sink.
    ///
    /// Returns `None` if a previous writer panicked while holding it.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        self.inner.lock().ok().map(|mut sink| f(&mut sink))
    }
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Sink> Sink for SharedSink<S> {
    fn on_write(&mut self, level: Level, bytes: &[u8]) {
        // Poisoned: drop the write rather than propagate a panic into logging.
        if let Ok(mut sink) = self.inner.lock() {
            sink.on_write(level, bytes);
        }
    }
}

/// Sink writing raw bytes to any [`io::Write`] (stdout, a file, a tty device).
pub struct WriterSink<W> {
    writer: W,
    errors: u32,
}

impl<W: io::Write + Send> WriterSink<W> {
    /// Create a sink over `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer, errors: 0 }
    }

    /// Number of writes that failed since creation.
    pub fn errors(&self) -> u32 {
        self.errors
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consume the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterSink<io::Stdout> {
    /// Sink on the process standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: io::Write + Send> Sink for WriterSink<W> {
    fn on_write(&mut self, _level: Level, bytes: &[u8]) {
        if self.writer.write_all(bytes).and_then(|_| self.writer.flush()).is_err() {
            self.errors = self.errors.saturating_add(1);
        }
    }
}

/// ANSI escape prefix for a level, empty for `None`/`All`.
pub fn color_for(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[0;31m",
        Level::Warning => "\x1b[0;33m",
        Level::Info => "\x1b[0;32m",
        Level::Debug => "\x1b[0m",
        Level::Trace => "\x1b[0;36m",
        Level::None | Level::All => "",
    }
}

/// ANSI reset sequence.
pub const RESET_COLOR: &str = "\x1b[0m";

/// Terminal decoration wrapper.
///
/// Emits the level color before and a reset after each write. With
/// `with_bell`, error and warning writes also ring the terminal bell.
pub struct ColorSink<S> {
    inner: S,
    bell: bool,
}

impl<S: Sink> ColorSink<S> {
    /// Decorate `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner, bell: false }
    }

    /// Ring the bell on error and warning records.
    pub fn with_bell(mut self) -> Self {
        self.bell = true;
        self
    }

    /// Consume the wrapper, returning the inner sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Sink> Sink for ColorSink<S> {
    fn on_write(&mut self, level: Level, bytes: &[u8]) {
        let color = color_for(level);
        if color.is_empty() {
            self.inner.on_write(level, bytes);
            return;
        }

        self.inner.on_write(level, color.as_bytes());
        if self.bell && matches!(level, Level::Error | Level::Warning) {
            self.inner.on_write(level, b"\x07");
        }
        self.inner.on_write(level, bytes);
        self.inner.on_write(level, RESET_COLOR.as_bytes());
    }
}

/// One captured `on_write` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedWrite {
    pub level: Level,
    pub bytes: Vec<u8>,
}

/// In-memory sink recording every write.
///
/// Clones share the same record list, so a clone can be kept for inspection
/// after the first handle has been moved into a registry or an adapter.
#[derive(Clone, Default)]
pub struct MemorySink {
    writes: Arc<Mutex<Vec<CapturedWrite>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all writes so far.
    pub fn writes(&self) -> Vec<CapturedWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of `on_write` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// All written bytes, concatenated.
    pub fn contents(&self) -> Vec<u8> {
        self.writes
            .lock()
            .map(|w| w.iter().flat_map(|c| c.bytes.iter().copied()).collect())
            .unwrap_or_default()
    }

    /// Concatenated bytes as (lossy) text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// Forget everything captured so far.
    pub fn clear(&self) {
        if let Ok(mut w) = self.writes.lock() {
            w.clear();
        }
    }
}

impl Sink for MemorySink {
    fn on_write(&mut self, level: Level, bytes: &[u8]) {
        if let Ok(mut w) = self.writes.lock() {
            w.push(CapturedWrite {
                level,
                bytes: bytes.to_vec(),
            });
        }
    }
}
