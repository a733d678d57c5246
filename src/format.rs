//! Bounded record formatting.
//!
//! Records are formatted into a fixed stack buffer; anything past
//! [`MAX_RECORD_LEN`] is cut. Truncation is not an error.
//!
//! Record layout:
//!
//! ```text
//! I (00042) [NET] link up\r\n
//! │  │       │     │
//! │  │       │     └─ message
//! │  │       └─ tag
//! │  └─ timestamp, zero padded to 5 digits
//! └─ level char (E, W, I, D, T, otherwise ?)
//! ```

use core::fmt::{self, Write};

use crate::level::Level;

/// Maximum formatted record length, terminator included.
pub const MAX_RECORD_LEN: usize = 512;

/// Record terminator.
pub const LINE_END: &[u8] = b"\r\n";

/// Bytes per line for the buffer dump helpers.
pub const BYTES_PER_LINE: usize = 16;

/// Fixed-capacity byte buffer that silently drops what does not fit.
pub struct RecordBuffer<const N: usize = MAX_RECORD_LEN> {
    buf: [u8; N],
    pos: usize,
    limit: usize,
}

impl<const N: usize> RecordBuffer<N> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            pos: 0,
            limit: N,
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.pos
    }

    /// True if nothing was written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == 0
    }

    /// True if a write was cut short.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.pos == self.limit
    }

    /// Append as much of `bytes` as fits.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let to_write = bytes.len().min(self.limit - self.pos);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
    }

    /// Keep `n` bytes at the end of the buffer out of reach of writes.
    fn reserve_tail(&mut self, n: usize) {
        self.limit = N.saturating_sub(n).max(self.pos);
    }

    /// Give back the reserved tail.
    fn release_tail(&mut self) {
        self.limit = N;
    }
}

impl<const N: usize> Default for RecordBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Write for RecordBuffer<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        // Never report an error: truncation is silent.
        Ok(())
    }
}

/// Format a full record into `out`.
///
/// The `\r\n` terminator always survives: on overflow the message body is
/// cut so that the record is exactly `N` bytes long.
pub fn format_record<const N: usize>(
    out: &mut RecordBuffer<N>,
    level: Level,
    timestamp: u32,
    tag: &str,
    args: fmt::Arguments<'_>,
) {
    out.reserve_tail(LINE_END.len());
    let _ = write!(out, "{} ({:05}) [{}] ", level.as_char(), timestamp, tag);
    let _ = out.write_fmt(args);
    out.release_tail();
    out.push_bytes(LINE_END);
}

/// Hex bytes separated by spaces: `"de ad be ef "`.
pub fn hex_line(out: &mut impl Write, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(out, "{:02x} ", b)?;
    }
    Ok(())
}

/// Raw bytes as characters (each byte taken as a Latin-1 code point).
pub fn char_line(out: &mut impl Write, bytes: &[u8]) -> fmt::Result {
    for &b in bytes {
        out.write_char(char::from(b))?;
    }
    Ok(())
}

/// One hexdump line of at most [`BYTES_PER_LINE`] bytes.
///
/// ```text
/// 0x00000010   77 6f 72 6b 69 6e 67 20  61 6c 6f 6e 67 20 77 69  |working along wi|
/// ```
///
/// Short lines are padded so the ASCII column stays aligned.
pub fn hexdump_line(out: &mut impl Write, offset: usize, bytes: &[u8]) -> fmt::Result {
    write!(out, "{:#010x} ", offset)?;
    for i in 0..BYTES_PER_LINE {
        if i % 8 == 0 {
            out.write_char(' ')?;
        }
        match bytes.get(i) {
            Some(b) => write!(out, " {:02x}", b)?,
            None => out.write_str("   ")?,
        }
    }
    out.write_str("  |")?;
    for &b in bytes.iter().take(BYTES_PER_LINE) {
        let c = if b.is_ascii_graphic() || b == b' ' { char::from(b) } else { '.' };
        out.write_char(c)?;
    }
    out.write_char('|')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_record_layout() {
        let mut out = RecordBuffer::<128>::new();
        format_record(&mut out, Level::Info, 42, "NET", format_args!("link {}", "up"));
        assert_eq!(out.as_bytes(), b"I (00042) [NET] link up\r\n");
    }

    #[test]
    fn test_format_record_wide_timestamp() {
        let mut out = RecordBuffer::<128>::new();
        format_record(&mut out, Level::Error, 1234567, "ROOT", format_args!("x"));
        assert_eq!(out.as_bytes(), b"E (1234567) [ROOT] x\r\n");
    }

    #[test]
    fn test_format_record_truncation_keeps_terminator() {
        let mut out = RecordBuffer::<32>::new();
        let long = "y".repeat(100);
        format_record(&mut out, Level::Debug, 0, "T", format_args!("{}", long));

        assert_eq!(out.len(), 32);
        assert!(out.is_full());
        assert!(out.as_bytes().ends_with(b"\r\n"));
        assert!(out.as_bytes().starts_with(b"D (00000) [T] yyy"));
    }

    #[test]
    fn test_format_record_truncation_is_deterministic() {
        let long = "z".repeat(2 * MAX_RECORD_LEN);
        let mut a = RecordBuffer::<MAX_RECORD_LEN>::new();
        let mut b = RecordBuffer::<MAX_RECORD_LEN>::new();
        format_record(&mut a, Level::Info, 7, "A", format_args!("{}", long));
        format_record(&mut b, Level::Info, 7, "A", format_args!("{}", long));

        assert_eq!(a.len(), MAX_RECORD_LEN);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_hex_line() {
        let mut s = String::new();
        hex_line(&mut s, &[0xde, 0xad, 0x01]).unwrap();
        assert_eq!(s, "de ad 01 ");
    }

    #[test]
    fn test_char_line() {
        let mut s = String::new();
        char_line(&mut s, b"ESP32").unwrap();
        assert_eq!(s, "ESP32");
    }

    #[test]
    fn test_hexdump_line_full() {
        let mut s = String::new();
        hexdump_line(&mut s, 0x10, b"working along wi").unwrap();
        assert_eq!(
            s,
            "0x00000010   77 6f 72 6b 69 6e 67 20  61 6c 6f 6e 67 20 77 69  |working along wi|"
        );
    }

    #[test]
    fn test_hexdump_line_short_and_unprintable() {
        let mut s = String::new();
        hexdump_line(&mut s, 0, &[b'I', b'D', 0x00]).unwrap();
        assert!(s.starts_with("0x00000000   49 44 00"));
        assert!(s.ends_with("|ID.|"));
        // Padding keeps the ASCII column at the same offset as a full line.
        let mut full = String::new();
        hexdump_line(&mut full, 0, &[0u8; 16]).unwrap();
        assert_eq!(s.find('|'), full.find('|'));
    }
}
