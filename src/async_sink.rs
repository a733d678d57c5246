//! Asynchronous, interrupt-safe sink adapter.
//!
//! # Architecture
//!
//! ```text
//! Producers (tasks, ISRs)      message buffer          consumer thread
//! ───────────────────────      ──────────────          ───────────────
//!
//! write() ──▶ framing lock ──▶ [hdr][chunk][chunk] ──▶ state machine ──▶ sink.on_write()
//!             (spin mutex)     bounded, lossy          ReceiveHeader
//!                                                      ReceiveChunks
//! ```
//!
//! A message is one header (`level`, `length`) followed by its payload in
//! chunks of at most [`MAX_CHUNK_LEN`] bytes. The framing lock is held for
//! the whole message, so chunks of different messages never interleave.
//!
//! # Rules
//!
//! - Producers never block indefinitely and never see an error. Anything
//!   that cannot be queued is dropped whole and counted.
//! - Interrupt producers never wait: lock busy or not enough room for the
//!   entire message means drop. Nothing partial is ever written.
//! - Only the consumer thread touches the wrapped sink.
//! - The drop count is reported by the consumer as an error record.
//!
//! # Shutdown
//!
//! `shutdown()` (or drop) clears `should_run`, then joins the consumer.
//! Records still queued at that point are discarded.

use core::fmt::Write as _;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::channel::{self, framed_len, Receiver, Sender, POLL_INTERVAL};
use crate::context::{DefaultContext, ExecutionContext};
use crate::format::RecordBuffer;
use crate::level::Level;
use crate::sink::Sink;

/// Maximum payload bytes per chunk.
pub const MAX_CHUNK_LEN: usize = 128;

/// Encoded header size: level byte plus `u32` length.
pub const HEADER_LEN: usize = 1 + core::mem::size_of::<u32>();

/// Messages of maximum chunk size the default buffer can hold.
const MAX_MESSAGES_IN_BUFFER: usize = 8;

/// Default buffer capacity in bytes.
pub const DEFAULT_CAPACITY: usize = (framed_len(HEADER_LEN) + framed_len(MAX_CHUNK_LEN)) * MAX_MESSAGES_IN_BUFFER;

/// Smallest usable capacity: one header plus one full chunk.
pub const MIN_CAPACITY: usize = framed_len(HEADER_LEN) + framed_len(MAX_CHUNK_LEN);

/// Bytes a message of `len` payload bytes occupies in the buffer,
/// header and per-write framing included.
pub const fn message_len(len: usize) -> usize {
    let full = len / MAX_CHUNK_LEN;
    let rest = len % MAX_CHUNK_LEN;
    let mut total = framed_len(HEADER_LEN) + full * framed_len(MAX_CHUNK_LEN);
    if rest != 0 {
        total += framed_len(rest);
    }
    total
}

/// Adapter configuration.
#[derive(Clone, Debug)]
pub struct AsyncSinkConfig {
    /// Message buffer size in bytes (framing included).
    pub capacity: usize,
    /// How long a task-context producer may wait for the lock and for
    /// buffer space. `None` waits as long as the consumer is alive.
    ///
    /// With a timeout set, records larger than the whole buffer are dropped
    /// up front; without one they are streamed.
    pub producer_timeout: Option<Duration>,
    /// Consumer receive timeout; bounds how fast it notices shutdown.
    pub refresh_period: Duration,
    /// Consumer thread name.
    pub thread_name: String,
    /// Consumer thread stack size in bytes.
    pub stack_size: usize,
    /// Consumer task priority (ESP-IDF only; low by default).
    pub priority: u8,
}

impl Default for AsyncSinkConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            producer_timeout: None,
            refresh_period: Duration::from_millis(10),
            thread_name: "sinklog".to_string(),
            stack_size: 8 * 1024,
            priority: 1,
        }
    }
}

impl AsyncSinkConfig {
    /// Default configuration with a different buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}

/// Adapter construction failure.
#[derive(Debug, thiserror::Error)]
pub enum AsyncSinkError {
    #[error("buffer capacity {capacity} is below the minimum of {minimum} bytes")]
    CapacityTooSmall { capacity: usize, minimum: usize },
    #[error("thread name {0:?} contains a NUL byte")]
    InvalidThreadName(String),
    #[error("failed to spawn consumer thread")]
    Spawn(#[source] std::io::Error),
    #[cfg(target_os = "espidf")]
    #[error("failed to configure consumer task: {0}")]
    TaskConfig(esp_idf_svc::sys::EspError),
}

/// Message header as carried through the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Header {
    level: Level,
    len: usize,
}

impl Header {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        raw[0] = self.level as u8;
        raw[1..].copy_from_slice(&(self.len as u32).to_le_bytes());
        raw
    }

    fn decode(raw: &[u8; HEADER_LEN]) -> Option<Self> {
        let level = Level::from_u8(raw[0])?;
        let len = u32::from_le_bytes([raw[1], raw[2], raw[3], raw[4]]) as usize;
        Some(Self { level, len })
    }
}

/// State shared by producers and the consumer.
struct Shared {
    /// Producer half of the buffer, guarded by the framing lock.
    sender: spin::Mutex<Sender>,
    /// Messages dropped since the last report.
    dropped: AtomicUsize,
    /// Cleared to ask the consumer to stop; producers stop queueing.
    should_run: AtomicBool,
    /// Set while the consumer thread is alive.
    running: AtomicBool,
}

impl Shared {
    fn new(capacity: usize) -> (Self, Receiver) {
        let (tx, rx) = channel::channel(capacity);
        let shared = Self {
            sender: spin::Mutex::new(tx),
            dropped: AtomicUsize::new(0),
            should_run: AtomicBool::new(true),
            running: AtomicBool::new(false),
        };
        (shared, rx)
    }

    #[inline]
    fn accepting(&self) -> bool {
        self.should_run.load(Ordering::Acquire)
    }

    #[inline]
    fn count_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Task-context path. May wait up to `timeout` (or while the consumer
    /// runs) for the lock and for buffer space.
    fn write_blocking(&self, level: Level, bytes: &[u8], timeout: Option<Duration>) {
        let deadline = timeout.map(|t| Instant::now() + t);

        let Some(mut tx) = self.lock_until(deadline) else {
            // Unable to take the lock, drop the message.
            self.count_drop();
            return;
        };

        let header = Header { level, len: bytes.len() }.encode();
        let total = message_len(bytes.len());

        if total > tx.capacity() && deadline.is_some() {
            // Streaming would outlive the timeout whenever the consumer is slow.
            self.count_drop();
            return;
        }

        if total <= tx.capacity() {
            // Reserve room for the whole message first so a timeout never
            // leaves a partial frame behind.
            if !tx.wait_for_space(total, deadline, || self.accepting()) {
                self.count_drop();
                return;
            }
            write_frames(&mut tx, &header, bytes);
        } else {
            // Larger than the whole buffer, no timeout: stream it while the
            // consumer drains.
            if !tx.send_until(&header, None, || self.accepting()) {
                self.count_drop();
                return;
            }
            for chunk in bytes.chunks(MAX_CHUNK_LEN) {
                // Only fails once shutdown started; the consumer is gone then.
                if !tx.send_until(chunk, None, || self.accepting()) {
                    return;
                }
            }
        }
    }

    /// Interrupt-context path. Never waits.
    fn write_from_isr(&self, level: Level, bytes: &[u8]) {
        let Some(mut tx) = self.sender.try_lock() else {
            // Lock held by the interrupted task or a lower priority ISR.
            self.count_drop();
            return;
        };

        if tx.space_available() < message_len(bytes.len()) {
            // Not enough room for the entire message, drop the message.
            self.count_drop();
            return;
        }

        let header = Header { level, len: bytes.len() }.encode();
        write_frames(&mut tx, &header, bytes);
    }

    fn lock_until(&self, deadline: Option<Instant>) -> Option<spin::MutexGuard<'_, Sender>> {
        loop {
            if let Some(guard) = self.sender.try_lock() {
                return Some(guard);
            }
            if !self.accepting() || deadline.is_some_and(|d| Instant::now() >= d) {
                return None;
            }
            // Sleep, not yield: the holder may run at a lower priority.
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Write header and chunks into space already known to be free.
fn write_frames(tx: &mut Sender, header: &[u8; HEADER_LEN], bytes: &[u8]) {
    // Sole producer while the lock is held: free space can only grow.
    let mut ok = tx.try_send(header);
    for chunk in bytes.chunks(MAX_CHUNK_LEN) {
        ok &= tx.try_send(chunk);
    }
    debug_assert!(ok, "reserved space vanished while holding the framing lock");
}

/// Consumer state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    ReceiveHeader,
    /// Header received; `len` counts the payload bytes still expected.
    ReceiveChunks(Header),
}

struct Consumer {
    rx: Receiver,
    state: State,
    chunk: [u8; MAX_CHUNK_LEN],
}

impl Consumer {
    fn new(rx: Receiver) -> Self {
        Self {
            rx,
            state: State::ReceiveHeader,
            chunk: [0; MAX_CHUNK_LEN],
        }
    }

    /// Run one state machine step, waiting up to `timeout` for data.
    fn step(&mut self, dropped: &AtomicUsize, sink: &mut dyn Sink, timeout: Duration) {
        match self.state {
            State::ReceiveHeader => {
                report_drops(dropped, sink);

                // Nothing received: keep waiting. Something that is not a
                // header: skip it and wait for the next thing that looks like one.
                let mut raw = [0u8; HEADER_LEN];
                if self.rx.receive(&mut raw, timeout) == Some(HEADER_LEN) {
                    if let Some(header) = Header::decode(&raw).filter(|h| h.len != 0) {
                        self.state = State::ReceiveChunks(header);
                    }
                }
            }
            State::ReceiveChunks(mut header) => {
                let Some(received) = self.rx.receive(&mut self.chunk, timeout) else {
                    return;
                };
                if received > header.len {
                    // Not part of the current message: resync on the next header.
                    self.state = State::ReceiveHeader;
                    return;
                }

                sink.on_write(header.level, &self.chunk[..received.min(MAX_CHUNK_LEN)]);
                header.len -= received;
                self.state = if header.len == 0 {
                    State::ReceiveHeader
                } else {
                    State::ReceiveChunks(header)
                };
            }
        }
    }
}

/// Emit "Dropped N messages!" if anything was dropped since the last call.
fn report_drops(dropped: &AtomicUsize, sink: &mut dyn Sink) {
    let count = dropped.swap(0, Ordering::AcqRel);
    if count != 0 {
        let mut msg = RecordBuffer::<40>::new();
        let _ = write!(msg, "Dropped {} messages!\r\n", count);
        sink.on_write(Level::Error, msg.as_bytes());
    }
}

/// Clears the run flags when the consumer exits, panics included.
struct ExitGuard<'a>(&'a Shared);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.0.should_run.store(false, Ordering::Release);
        self.0.running.store(false, Ordering::Release);
    }
}

fn consumer_task<S: Sink>(shared: Arc<Shared>, rx: Receiver, mut sink: S, refresh: Duration) {
    let _exit = ExitGuard(&shared);
    let mut consumer = Consumer::new(rx);

    while shared.should_run.load(Ordering::Acquire) {
        consumer.step(&shared.dropped, &mut sink, refresh);
    }
    // The sink is dropped here, before `running` is cleared.
    drop(sink);
}

/// Multi-producer, single-consumer sink adapter.
///
/// Wraps any [`Sink`] and defers its writes to a dedicated consumer thread.
/// `write` is callable from any thread and, with an interrupt-aware
/// [`ExecutionContext`], from interrupt handlers.
///
/// # Example
///
/// ```ignore
/// let uart = AsyncSink::spawn(UartSink::new(driver), AsyncSinkConfig::default())?;
/// logger.registry_mut().add_global_sink(Box::new(uart));
/// ```
pub struct AsyncSink<C: ExecutionContext = DefaultContext> {
    shared: Arc<Shared>,
    context: C,
    producer_timeout: Option<Duration>,
    capacity: usize,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncSink<DefaultContext> {
    /// Start a consumer thread owning `sink`.
    pub fn spawn<S>(sink: S, config: AsyncSinkConfig) -> Result<Self, AsyncSinkError>
    where
        S: Sink + 'static,
    {
        Self::spawn_with_context(sink, config, DefaultContext::default())
    }
}

impl<C: ExecutionContext> AsyncSink<C> {
    /// Start a consumer thread owning `sink`, probing interrupt context
    /// through `context`.
    ///
    /// Fails without leaving anything running if the buffer is too small
    /// or the thread cannot be created.
    pub fn spawn_with_context<S>(
        sink: S,
        config: AsyncSinkConfig,
        context: C,
    ) -> Result<Self, AsyncSinkError>
    where
        S: Sink + 'static,
    {
        if config.capacity < MIN_CAPACITY {
            return Err(AsyncSinkError::CapacityTooSmall {
                capacity: config.capacity,
                minimum: MIN_CAPACITY,
            });
        }

        if config.thread_name.contains('\0') {
            return Err(AsyncSinkError::InvalidThreadName(config.thread_name));
        }

        let (shared, rx) = Shared::new(config.capacity);
        let shared = Arc::new(shared);
        // Accept writes right away; they queue until the consumer starts.
        shared.running.store(true, Ordering::Release);

        #[cfg(target_os = "espidf")]
        configure_task(&config)?;

        let task_shared = Arc::clone(&shared);
        let refresh = config.refresh_period;
        let spawned = thread::Builder::new()
            .name(config.thread_name.clone())
            .stack_size(config.stack_size)
            .spawn(move || consumer_task(task_shared, rx, sink, refresh));

        #[cfg(target_os = "espidf")]
        restore_task_defaults();

        let handle = spawned.map_err(AsyncSinkError::Spawn)?;

        Ok(Self {
            shared,
            context,
            producer_timeout: config.producer_timeout,
            capacity: config.capacity,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queue a record for the wrapped sink.
    ///
    /// # Attention
    ///
    /// From an interrupt the message is dropped if:
    /// - the framing lock is held (by the interrupted task or a lower ISR)
    /// - the buffer cannot fit the whole message right now
    ///
    /// From a task it is dropped if the lock or the space does not become
    /// available within the producer timeout.
    pub fn write(&self, level: Level, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if bytes.len() > u32::MAX as usize {
            // Does not fit the header length field.
            self.shared.count_drop();
            return;
        }
        if !self.shared.accepting() {
            // Consumer stopped or stopping: nobody would deliver it.
            return;
        }

        if self.context.in_interrupt() {
            self.shared.write_from_isr(level, bytes);
        } else {
            self.shared.write_blocking(level, bytes, self.producer_timeout);
        }
    }

    /// Messages dropped and not yet reported by the consumer.
    #[inline]
    pub fn dropped(&self) -> usize {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// True while the consumer thread is alive.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Buffer capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stop the consumer and wait for it to exit. Idempotent.
    ///
    /// Queued but undelivered records are discarded. Writes issued after
    /// this starts are ignored.
    pub fn shutdown(&self) {
        self.shared.should_run.store(false, Ordering::Release);

        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            // A panicking sink already cleared the flags via its exit guard.
            let _ = handle.join();
        }
    }
}

impl<C: ExecutionContext> Drop for AsyncSink<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<C: ExecutionContext> Sink for AsyncSink<C> {
    #[inline]
    fn on_write(&mut self, level: Level, bytes: &[u8]) {
        self.write(level, bytes);
    }
}

/// Lets one adapter sit in several sink lists.
impl<C: ExecutionContext> Sink for Arc<AsyncSink<C>> {
    #[inline]
    fn on_write(&mut self, level: Level, bytes: &[u8]) {
        self.write(level, bytes);
    }
}

#[cfg(target_os = "espidf")]
fn configure_task(config: &AsyncSinkConfig) -> Result<(), AsyncSinkError> {
    use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;

    // Leaked: the task config needs a 'static, NUL terminated name.
    let mut name = config.thread_name.clone().into_bytes();
    name.push(0);
    let name: &'static [u8] = Box::leak(name.into_boxed_slice());

    ThreadSpawnConfiguration {
        name: Some(name),
        stack_size: config.stack_size,
        priority: config.priority,
        ..Default::default()
    }
    .set()
    .map_err(AsyncSinkError::TaskConfig)
}

#[cfg(target_os = "espidf")]
fn restore_task_defaults() {
    use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;

    let _ = ThreadSpawnConfiguration::default().set();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    const TICK: Duration = Duration::from_millis(1);

    fn drain(consumer: &mut Consumer, shared: &Shared, sink: &mut MemorySink) {
        // Enough steps for any test message; each empty step costs one tick.
        for _ in 0..32 {
            consumer.step(&shared.dropped, sink, TICK);
        }
    }

    #[test]
    fn test_header_encoding() {
        let header = Header { level: Level::Warning, len: 300 };
        let raw = header.encode();
        assert_eq!(raw, [2, 0x2c, 0x01, 0, 0]);
        assert_eq!(Header::decode(&raw), Some(header));

        assert_eq!(Header::decode(&[9, 1, 0, 0, 0]), None);
    }

    #[test]
    fn test_message_len() {
        assert_eq!(message_len(1), framed_len(HEADER_LEN) + framed_len(1));
        assert_eq!(
            message_len(MAX_CHUNK_LEN),
            framed_len(HEADER_LEN) + framed_len(MAX_CHUNK_LEN)
        );
        assert_eq!(
            message_len(MAX_CHUNK_LEN + 1),
            framed_len(HEADER_LEN) + framed_len(MAX_CHUNK_LEN) + framed_len(1)
        );
        assert_eq!(MIN_CAPACITY, message_len(MAX_CHUNK_LEN));
    }

    #[test]
    fn test_isr_exact_capacity_fits() {
        let (shared, mut rx) = Shared::new(message_len(300));
        shared.write_from_isr(Level::Info, &[7u8; 300]);

        assert_eq!(shared.dropped.load(Ordering::Relaxed), 0);
        assert_eq!(shared.sender.lock().space_available(), 0);

        let mut out = [0u8; MAX_CHUNK_LEN];
        assert_eq!(rx.try_receive(&mut out), Some(HEADER_LEN));
        assert_eq!(rx.try_receive(&mut out), Some(128));
        assert_eq!(rx.try_receive(&mut out), Some(128));
        assert_eq!(rx.try_receive(&mut out), Some(44));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_isr_one_byte_over_capacity_drops_whole_message() {
        let (shared, rx) = Shared::new(message_len(300));
        shared.write_from_isr(Level::Info, &[7u8; 301]);

        assert_eq!(shared.dropped.load(Ordering::Relaxed), 1);
        assert!(rx.is_empty());
        assert_eq!(shared.sender.lock().space_available(), message_len(300));
    }

    #[test]
    fn test_isr_drops_when_lock_busy() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        {
            let _held = shared.sender.lock();
            shared.write_from_isr(Level::Error, b"short");
            shared.write_from_isr(Level::Error, &[0u8; 500]);
        }
        assert_eq!(shared.dropped.load(Ordering::Relaxed), 2);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_task_path_times_out_on_lock() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        {
            let _held = shared.sender.lock();
            shared.write_blocking(Level::Info, b"x", Some(Duration::from_millis(2)));
        }
        assert_eq!(shared.dropped.load(Ordering::Relaxed), 1);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_task_path_times_out_on_space_without_partial_write() {
        let (shared, rx) = Shared::new(MIN_CAPACITY);
        shared.write_blocking(Level::Info, &[1u8; 100], Some(TICK));
        let used_before = MIN_CAPACITY - shared.sender.lock().space_available();

        // Second message cannot fit until the first is consumed.
        shared.write_blocking(Level::Info, &[2u8; 100], Some(Duration::from_millis(2)));

        assert_eq!(shared.dropped.load(Ordering::Relaxed), 1);
        assert_eq!(MIN_CAPACITY - shared.sender.lock().space_available(), used_before);
        assert!(!rx.is_empty());
    }

    #[test]
    fn test_task_path_stops_waiting_on_shutdown() {
        let (shared, _rx) = Shared::new(DEFAULT_CAPACITY);
        let _held = shared.sender.lock();
        shared.should_run.store(false, Ordering::Release);

        // Would wait forever while accepting; returns once stopped.
        shared.write_blocking(Level::Info, b"x", None);
        assert_eq!(shared.dropped.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_task_path_drops_oversized_record_when_timeout_set() {
        let (shared, rx) = Shared::new(MIN_CAPACITY);
        let start = Instant::now();
        shared.write_blocking(Level::Info, &[b'x'; 1000], Some(Duration::from_millis(5)));

        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(shared.dropped.load(Ordering::Relaxed), 1);
        // Nothing partial: not even the header.
        assert!(rx.is_empty());
    }

    #[test]
    fn test_task_path_waits_for_lock_holder() {
        let (shared, mut rx) = Shared::new(DEFAULT_CAPACITY);
        let shared = Arc::new(shared);
        let held = Arc::new(AtomicBool::new(false));

        let holder = {
            let shared = Arc::clone(&shared);
            let held = Arc::clone(&held);
            thread::spawn(move || {
                let _guard = shared.sender.lock();
                held.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
            })
        };
        while !held.load(Ordering::SeqCst) {
            thread::sleep(TICK);
        }

        shared.write_blocking(Level::Info, b"after", None);
        holder.join().unwrap();

        assert_eq!(shared.dropped.load(Ordering::Relaxed), 0);
        let mut out = [0u8; MAX_CHUNK_LEN];
        assert_eq!(rx.try_receive(&mut out), Some(HEADER_LEN));
        assert_eq!(rx.try_receive(&mut out), Some(5));
        assert_eq!(&out[..5], b"after");
    }

    #[test]
    fn test_consumer_round_trip_in_chunks() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        let payload: Vec<u8> = (0..300u32).map(|i| i as u8).collect();
        shared.write_blocking(Level::Debug, &payload, None);

        let mut consumer = Consumer::new(rx);
        let mut sink = MemorySink::new();
        drain(&mut consumer, &shared, &mut sink);

        let writes = sink.writes();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|w| w.level == Level::Debug));
        assert_eq!(writes[0].bytes.len(), 128);
        assert_eq!(writes[2].bytes.len(), 44);
        assert_eq!(sink.contents(), payload);
        assert_eq!(consumer.state, State::ReceiveHeader);
    }

    #[test]
    fn test_consumer_resyncs_on_oversized_chunk() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        {
            let mut tx = shared.sender.lock();
            // Header promises 3 bytes but 10 arrive.
            assert!(tx.try_send(&Header { level: Level::Info, len: 3 }.encode()));
            assert!(tx.try_send(b"0123456789"));
            // A valid message follows.
            assert!(tx.try_send(&Header { level: Level::Warning, len: 4 }.encode()));
            assert!(tx.try_send(b"good"));
        }

        let mut consumer = Consumer::new(rx);
        let mut sink = MemorySink::new();
        drain(&mut consumer, &shared, &mut sink);

        let writes = sink.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].level, Level::Warning);
        assert_eq!(writes[0].bytes, b"good");
        // Partial tail is lost, not counted as a drop.
        assert_eq!(shared.dropped.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_consumer_skips_non_headers() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        {
            let mut tx = shared.sender.lock();
            assert!(tx.try_send(b"stray chunk"));
            // Bad level byte.
            assert!(tx.try_send(&[0xEE, 1, 0, 0, 0]));
            assert!(tx.try_send(b"z"));
            assert!(tx.try_send(&Header { level: Level::Error, len: 2 }.encode()));
            assert!(tx.try_send(b"ok"));
        }

        let mut consumer = Consumer::new(rx);
        let mut sink = MemorySink::new();
        drain(&mut consumer, &shared, &mut sink);

        assert_eq!(sink.text(), "ok");
    }

    #[test]
    fn test_consumer_reports_drops() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        shared.dropped.store(3, Ordering::Relaxed);

        let mut consumer = Consumer::new(rx);
        let mut sink = MemorySink::new();
        consumer.step(&shared.dropped, &mut sink, TICK);

        let writes = sink.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].level, Level::Error);
        assert_eq!(writes[0].bytes, b"Dropped 3 messages!\r\n");
        assert_eq!(shared.dropped.load(Ordering::Relaxed), 0);

        // Nothing new: no second report.
        consumer.step(&shared.dropped, &mut sink, TICK);
        assert_eq!(sink.write_count(), 1);
    }

    #[test]
    fn test_messages_never_interleave() {
        let (shared, rx) = Shared::new(DEFAULT_CAPACITY);
        let shared = Arc::new(shared);

        let producers: Vec<_> = (0..4u8)
            .map(|p| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..20 {
                        shared.write_blocking(Level::Info, &[b'a' + p; 200], None);
                    }
                })
            })
            .collect();

        let mut consumer = Consumer::new(rx);
        let mut sink = MemorySink::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while sink.contents().len() < 4 * 20 * 200 && Instant::now() < deadline {
            consumer.step(&shared.dropped, &mut sink, TICK);
        }
        for p in producers {
            p.join().unwrap();
        }

        let contents = sink.contents();
        assert_eq!(contents.len(), 4 * 20 * 200);
        for message in contents.chunks(200) {
            assert!(message.iter().all(|&b| b == message[0]));
        }
    }
}
