//! Target-trap classification and the request-target scanner.
//!
//! Grounded directly on `nxt_http_target_chars` and
//! `nxt_http_parse_target` in NGINX Unit's `nxt_http_parse_request`:
//! the table below is the same 256-byte mapping, transcribed byte for
//! byte, and the scanner keeps the same 10-byte lookahead so that a stop
//! at the target-terminating space always leaves room to read
//! ` HTTP/1.1\r` without a further suspension.

use super::Scan;

/// A classified stop event produced by [`scan`]. Running out of buffer
/// is not a member of this enum; it is represented by `Scan::Again`
/// instead, since it carries no event data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// `\s` — the target has ended.
    Space,
    /// `#` — a fragment introducer; marks the target complex.
    Hash,
    /// `/` — a path segment boundary.
    Slash,
    /// `.` — a possible extension marker.
    Dot,
    /// `?` — a query-string introducer.
    ArgsMark,
    /// `%` — percent-encoding; marks the target quoted.
    QuoteMark,
    /// `+` — marks `plus_in_target`.
    Plus,
    /// `\0`, `\r`, or `\n` — protocol-illegal byte in a target.
    Bad,
}

/// How far ahead `scan` needs to see before it will inspect the current
/// byte; this is what lets the request-line parser read ` HTTP/1.1\r`
/// immediately after a stop at the trailing space without re-entering.
const LOOKAHEAD: usize = 10;

#[rustfmt::skip]
static TARGET_CHARS: [u8; 256] = [
//   0  1  2  3   4  5  6  7   8  9  a  b   c  d  e  f
     4, 0, 0, 0,  0, 0, 0, 0,  0, 0, 4, 0,  0, 4, 0, 0, // 0x00
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x10
     1, 0, 0, 2,  0, 8, 0, 0,  0, 0, 0, 9,  0, 0, 6, 5, // 0x20  sp ! " # $ % & ' ( ) * + , - . /
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 7, // 0x30  0-9 : ; < = > ?
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x40
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x50
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x60
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x70
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x80
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0x90
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0xa0
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0xb0
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0xc0
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0xd0
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0xe0
     0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0,  0, 0, 0, 0, // 0xf0
];

#[inline]
fn decode(trap: u8) -> Trap {
    match trap {
        1 => Trap::Space,
        2 => Trap::Hash,
        4 => Trap::Bad,
        5 => Trap::Slash,
        6 => Trap::Dot,
        7 => Trap::ArgsMark,
        8 => Trap::QuoteMark,
        9 => Trap::Plus,
        _ => unreachable!("non-zero trap codes are exhaustively listed above"),
    }
}

/// Advance from `start` while the byte is an ordinary target byte,
/// stopping at the first byte with a non-zero trap code (without
/// consuming it), or suspending if fewer than [`LOOKAHEAD`] bytes remain.
#[inline]
pub fn scan(buf: &[u8], start: usize) -> Scan<Trap> {
    let mut p = start;
    loop {
        if buf.len().saturating_sub(p) < LOOKAHEAD {
            return Scan::Again;
        }
        let trap = TARGET_CHARS[buf[p] as usize];
        if trap != 0 {
            return Scan::Stop(p, decode(trap));
        }
        p += 1;
    }
}
