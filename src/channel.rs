//! Bounded byte message buffer (single producer, single consumer).
//!
//! Every message is stored as a little-endian `u32` length prefix followed
//! by its payload, so the consumer always gets whole messages back:
//!
//! ```text
//! ┌──────┬──────────┬──────┬────────────────┬─────
//! │ len0 │ payload0 │ len1 │ payload1       │ ...
//! └──────┴──────────┴──────┴────────────────┴─────
//!  4 B     len0 B    4 B     len1 B
//! ```
//!
//! # Rules
//!
//! - One [`Sender`], one [`Receiver`]; neither is `Clone`. Multiple
//!   producers must serialize access to the sender themselves.
//! - `try_send` is all-or-nothing: a message is written whole or not at all.
//! - Nothing here blocks; the waiting variants poll.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Per-message framing overhead in bytes.
pub const LENGTH_PREFIX_LEN: usize = core::mem::size_of::<u32>();

/// Upper bound on a single sleep while polling.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Bytes a message of `len` bytes occupies in the buffer.
#[inline]
pub const fn framed_len(len: usize) -> usize {
    LENGTH_PREFIX_LEN + len
}

struct Ring {
    buf: Box<[UnsafeCell<u8>]>,
    /// Bytes currently stored (prefixes included).
    used: AtomicUsize,
}

// SAFETY: The producer only writes the free region, the consumer only reads
// the used region. Ownership of bytes moves between them through `used`
// (Release on publish, Acquire before access).
unsafe impl Sync for Ring {}
unsafe impl Send for Ring {}

impl Ring {
    #[inline]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Copy `bytes` in starting at `pos`, wrapping. Returns the next position.
    ///
    /// # Safety
    ///
    /// `[pos, pos + bytes.len())` must be free space owned by the caller.
    unsafe fn write_at(&self, mut pos: usize, bytes: &[u8]) -> usize {
        for &b in bytes {
            *self.buf[pos].get() = b;
            pos = (pos + 1) % self.capacity();
        }
        pos
    }

    /// Copy out `out.len()` bytes starting at `pos`, wrapping.
    ///
    /// # Safety
    ///
    /// `[pos, pos + out.len())` must be published data owned by the caller.
    unsafe fn read_at(&self, pos: usize, out: &mut [u8]) {
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = *self.buf[(pos + i) % self.capacity()].get();
        }
    }
}

/// Create a message buffer holding `capacity` bytes (framing included).
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel(capacity: usize) -> (Sender, Receiver) {
    assert!(capacity > 0, "message buffer capacity must be non-zero");

    let ring = Arc::new(Ring {
        buf: (0..capacity).map(|_| UnsafeCell::new(0)).collect(),
        used: AtomicUsize::new(0),
    });

    (
        Sender {
            ring: Arc::clone(&ring),
            head: 0,
        },
        Receiver { ring, tail: 0 },
    )
}

/// Producer half.
pub struct Sender {
    ring: Arc<Ring>,
    head: usize,
}

impl Sender {
    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Free bytes right now. May only grow until the next send.
    #[inline]
    pub fn space_available(&self) -> usize {
        self.capacity() - self.ring.used.load(Ordering::Acquire)
    }

    /// Write `msg` if the whole framed message fits, without waiting.
    ///
    /// # Timing
    ///
    /// O(len), never blocks. Safe to call from interrupt context as long as
    /// the caller holds the producer side exclusively.
    pub fn try_send(&mut self, msg: &[u8]) -> bool {
        let framed = framed_len(msg.len());
        if msg.len() > u32::MAX as usize || framed > self.space_available() {
            return false;
        }

        let prefix = (msg.len() as u32).to_le_bytes();
        // SAFETY: `framed` bytes starting at `head` are free (checked above)
        // and only this sender writes there.
        unsafe {
            let pos = self.ring.write_at(self.head, &prefix);
            self.head = self.ring.write_at(pos, msg);
        }
        self.ring.used.fetch_add(framed, Ordering::Release);
        true
    }

    /// Write `msg`, polling for space until `deadline` passes or
    /// `keep_waiting` returns false. `None` deadline waits indefinitely.
    ///
    /// Returns false right away for messages larger than the buffer.
    pub fn send_until(
        &mut self,
        msg: &[u8],
        deadline: Option<Instant>,
        keep_waiting: impl Fn() -> bool,
    ) -> bool {
        let framed = framed_len(msg.len());
        if !self.wait_for_space(framed, deadline, keep_waiting) {
            return false;
        }
        self.try_send(msg)
    }

    /// Poll until at least `bytes` are free.
    ///
    /// Same exit conditions as [`send_until`](Self::send_until).
    pub fn wait_for_space(
        &self,
        bytes: usize,
        deadline: Option<Instant>,
        keep_waiting: impl Fn() -> bool,
    ) -> bool {
        if bytes > self.capacity() {
            return false;
        }
        loop {
            if self.space_available() >= bytes {
                return true;
            }
            if !keep_waiting() || !sleep_before(deadline) {
                return false;
            }
        }
    }
}

/// Consumer half.
pub struct Receiver {
    ring: Arc<Ring>,
    tail: usize,
}

impl Receiver {
    /// True if no message is waiting.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.used.load(Ordering::Acquire) == 0
    }

    /// Pop the next message into `out` without waiting.
    ///
    /// Returns the full message length. A message longer than `out` is
    /// still consumed; only its first `out.len()` bytes are copied.
    pub fn try_receive(&mut self, out: &mut [u8]) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        // SAFETY: `used > 0` means at least one whole framed message starts
        // at `tail` (senders publish whole messages only).
        let len = unsafe {
            self.ring.read_at(self.tail, &mut prefix);
            let len = u32::from_le_bytes(prefix) as usize;
            let payload = (self.tail + LENGTH_PREFIX_LEN) % self.ring.capacity();
            let copied = len.min(out.len());
            self.ring.read_at(payload, &mut out[..copied]);
            len
        };

        let framed = framed_len(len);
        self.tail = (self.tail + framed) % self.ring.capacity();
        self.ring.used.fetch_sub(framed, Ordering::Release);
        Some(len)
    }

    /// Pop the next message, polling for up to `timeout`.
    pub fn receive(&mut self, out: &mut [u8], timeout: Duration) -> Option<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(len) = self.try_receive(out) {
                return Some(len);
            }
            if !sleep_before(Some(deadline)) {
                return None;
            }
        }
    }
}

/// Sleep one poll step. Returns false once `deadline` has passed.
fn sleep_before(deadline: Option<Instant>) -> bool {
    match deadline {
        None => {
            thread::sleep(POLL_INTERVAL);
            true
        }
        Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
            true
        }
    }
}
