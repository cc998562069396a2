//! Field-name normalization/scanning and the field-value-end scanner.
//!
//! Grounded on NGINX Unit's `normal[256]` table and the inner loop of
//! `nxt_http_parse_field_name`, together with its `nxt_http_lookup_field_end`
//! helper.

use super::Scan;

/// Size of the rotating, lowercased, packed field-name key. Registered
/// names longer than this are outside the lookup path entirely.
pub const KEY_LEN: usize = 32;

static NAME_CHARS: [u8; 256] = {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = match i as u8 {
            b'A'..=b'Z' => (i as u8) + (b'a' - b'A'),
            b'a'..=b'z' => i as u8,
            b'0'..=b'9' => i as u8,
            b'-' => b'-',
            _ => 0,
        };
        i += 1;
    }
    t
};

/// Lowercase a single field-name byte, or `0` if the byte terminates a
/// field name (anything that is not a letter, digit, or `-`; this
/// includes `_`, matching the source's `normal[256]` table exactly).
#[inline]
pub fn normalize(byte: u8) -> u8 {
    NAME_CHARS[byte as usize]
}

/// Scan a field name into `key`, writing each normalized byte at index
/// `i % KEY_LEN` so that names longer than [`KEY_LEN`] simply keep
/// overwriting the same lanes, starting at `buf[start + i]` and resuming
/// from a previous suspension at index `i`.
///
/// Returns the terminating byte and the index (length of the name) at
/// which it was found, or `Scan::Again` with `key` updated in place if
/// the buffer ran out first.
pub fn scan(buf: &[u8], start: usize, mut i: usize, key: &mut [u8; KEY_LEN]) -> Scan<u8> {
    loop {
        let Some(&byte) = buf.get(start + i) else {
            return Scan::Again;
        };
        let c = normalize(byte);
        if c == 0 {
            return Scan::Stop(i, byte);
        }
        key[i % KEY_LEN] = c;
        i += 1;
    }
}

/// Number of 64-bit lanes needed to hold a name of the given length
/// (1..=4 for lengths 1..=32).
#[inline]
pub fn lanes_for_len(len: usize) -> usize {
    (len + 7) / 8
}

/// Reinterpret a packed field-name key as four 64-bit lanes, matching
/// the layout a [`crate::fields::FieldsTable`] entry's key is stored in.
#[inline]
pub fn lanes(key: &[u8; KEY_LEN]) -> [u64; 4] {
    let mut out = [0u64; 4];
    for (lane, chunk) in out.iter_mut().zip(key.chunks_exact(8)) {
        *lane = u64::from_ne_bytes(chunk.try_into().unwrap());
    }
    out
}

/// Advance from `start` while the byte is an ordinary field-value byte
/// (`>= 0x10`), stopping at the first control byte. Returns `None`
/// (meaning "again") if the buffer ran out without finding one.
#[inline]
pub fn lookup_field_end(buf: &[u8], start: usize) -> Option<usize> {
    buf[start..].iter().position(|&b| b < 0x10).map(|rel| start + rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_packs() {
        let mut key = [0u8; KEY_LEN];
        let buf = b"Host: example.com";
        assert_eq!(scan(buf, 0, 0, &mut key), Scan::Stop(4, b':'));
        assert_eq!(&key[..4], b"host");
        assert!(key[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn underscore_terminates() {
        let mut key = [0u8; KEY_LEN];
        let buf = b"Under_score: x";
        assert_eq!(scan(buf, 0, 0, &mut key), Scan::Stop(5, b'_'));
    }

    #[test]
    fn again_when_short() {
        let mut key = [0u8; KEY_LEN];
        let buf = b"Hos";
        assert_eq!(scan(buf, 0, 0, &mut key), Scan::Again);
        assert_eq!(&key[..3], b"hos");
    }

    #[test]
    fn value_end_stops_at_cr() {
        let buf = b"example.com\r\n";
        assert_eq!(lookup_field_end(buf, 0), Some(11));
    }

    #[test]
    fn value_end_again_when_no_control_byte() {
        let buf = b"example.com";
        assert_eq!(lookup_field_end(buf, 0), None);
    }
}
