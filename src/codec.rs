//! Byte-level helpers shared by the tree walker and the data decoder
//!
//! Integers in the MMDB format are big-endian and stored in the minimum
//! number of bytes, so every reader funnels through [`bytes_to_uint`].
//!
//! The module also carries the Latin-1 transliteration used when a
//! database is opened with [`TextMode::TransliterateToLatin1`].

use crate::error::{DecodeError, Result};
use serde::{Deserialize, Serialize};

/// Fold a big-endian byte run into an unsigned integer.
///
/// Accepts 0 to 8 bytes; an empty run is zero. No sign extension is done.
#[inline]
pub fn bytes_to_uint(buf: &[u8]) -> u64 {
    bytes_to_uint_with_prefix(0, buf)
}

/// Fold a big-endian byte run onto an existing partial value.
///
/// Each byte shifts the accumulator left by eight bits. Pointers and 28-bit
/// tree records carry their high bits outside the byte run and pass them in
/// as `prefix`.
#[inline]
pub fn bytes_to_uint_with_prefix(prefix: u64, buf: &[u8]) -> u64 {
    debug_assert!(buf.len() <= 8, "integer runs are at most 8 bytes");
    buf.iter().fold(prefix, |acc, &b| (acc << 8) | b as u64)
}

/// Reinterpret four big-endian bytes as an IEEE-754 single.
#[inline]
pub fn bytes_to_f32(buf: [u8; 4]) -> f32 {
    f32::from_be_bytes(buf)
}

/// Reinterpret eight big-endian bytes as an IEEE-754 double.
#[inline]
pub fn bytes_to_f64(buf: [u8; 8]) -> f64 {
    f64::from_be_bytes(buf)
}

/// How string payloads are turned into `String`s.
///
/// Chosen once when the database is opened and applied to every string
/// value (map keys are always compared as raw bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMode {
    /// Strings must be valid UTF-8 and are returned unchanged
    #[default]
    PassThrough,
    /// Strings are folded onto the Latin-1 repertoire with [`to_latin1`];
    /// anything outside it becomes `'?'`
    TransliterateToLatin1,
}

impl TextMode {
    /// Turn a string payload into text according to the mode.
    ///
    /// `offset` is only used for error reporting.
    pub fn decode(self, raw: &[u8], offset: usize) -> Result<String> {
        match self {
            TextMode::PassThrough => std::str::from_utf8(raw)
                .map(str::to_owned)
                .map_err(|_| DecodeError::InvalidUtf8 { offset }),
            TextMode::TransliterateToLatin1 => Ok(from_latin1(&to_latin1(raw))),
        }
    }
}

/// Transliterate UTF-8 bytes into single-byte Latin-1 (ISO-8859-1).
///
/// This is lossy and one-directional. ASCII passes through, two-byte
/// sequences for U+0080..=U+00FF collapse to their single byte, and every
/// other character (including all multi-byte scripts) becomes one `'?'`.
/// Continuation bytes of a replaced character are skipped so the following
/// characters stay aligned; stray continuation bytes become `'?'` each.
pub fn to_latin1(utf8: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(utf8.len());
    let mut i = 0;
    while i < utf8.len() {
        let b = utf8[i];
        if b < 0x80 {
            out.push(b);
            i += 1;
            continue;
        }
        let next = utf8.get(i + 1).copied();
        if (b == 0xC2 || b == 0xC3) && next.is_some_and(is_continuation) {
            let cont = next.unwrap_or_default();
            out.push(((b & 0x1F) << 6) | (cont & 0x3F));
            i += 2;
            continue;
        }
        out.push(b'?');
        i += 1;
        let extra = match b {
            0xC0..=0xDF => 1,
            0xE0..=0xEF => 2,
            0xF0..=0xF7 => 3,
            _ => 0,
        };
        for _ in 0..extra {
            match utf8.get(i) {
                Some(&c) if is_continuation(c) => i += 1,
                _ => break,
            }
        }
    }
    out
}

/// Expand Latin-1 bytes into a UTF-8 `String`. Lossless.
pub fn from_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}
