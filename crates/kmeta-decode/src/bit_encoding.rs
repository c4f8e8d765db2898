//! Packing of binary data into string arrays
//!
//! The encoded declaration tree travels as an array of strings (`d1`). Two
//! packings exist:
//!
//! - UTF-8 mode: the first string starts with `U+0000`; every following
//!   char is one byte (`0x00..=0xFF`).
//! - 7-bit mode: every char is a 7-bit unit stored with a `+1 (mod 128)`
//!   shift. The units form an LSB-first bit stream that is regrouped into
//!   bytes. A leading `U+FFFF` marker, if present, is dropped.

use crate::error::DecodeError;

/// First char of UTF-8 mode data
pub const UTF8_MODE_MARKER: char = '\u{0}';

/// Optional first char of 7-bit mode data
pub const SEVEN_BIT_MODE_MARKER: char = '\u{FFFF}';

/// Maximum number of chars per emitted string
pub const MAX_CHUNK_CHARS: usize = 32767;

/// Unpack `d1` strings into bytes
pub fn decode_bytes(data: &[String]) -> Result<Vec<u8>, DecodeError> {
    let first = data.first().and_then(|s| s.chars().next());
    match first {
        Some(UTF8_MODE_MARKER) => units(data, 1, 0xFF),
        Some(SEVEN_BIT_MODE_MARKER) => {
            let units = units(data, 1, 0x7F)?;
            Ok(decode_7to8(&units))
        }
        _ => {
            let units = units(data, 0, 0x7F)?;
            Ok(decode_7to8(&units))
        }
    }
}

/// Pack bytes into UTF-8 mode strings
pub fn encode_utf8(bytes: &[u8]) -> Vec<String> {
    let mut chars = Vec::with_capacity(bytes.len() + 1);
    chars.push(UTF8_MODE_MARKER);
    chars.extend(bytes.iter().map(|&b| char::from(b)));
    split(&chars)
}

/// Pack bytes into 7-bit mode strings
pub fn encode_7bit(bytes: &[u8]) -> Vec<String> {
    let units = encode_8to7(bytes);
    let mut chars = Vec::with_capacity(units.len() + 1);
    for unit in units {
        chars.push(char::from((unit + 1) & 0x7F));
    }
    // A leading zero unit would read back as the UTF-8 marker
    if chars.first() == Some(&UTF8_MODE_MARKER) {
        chars.insert(0, SEVEN_BIT_MODE_MARKER);
    }
    split(&chars)
}

fn split(chars: &[char]) -> Vec<String> {
    chars
        .chunks(MAX_CHUNK_CHARS)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Collect every char of `data` as a byte, skipping `skip` leading chars
fn units(data: &[String], skip: usize, max: u32) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.iter().map(|s| s.len()).sum());
    let mut to_skip = skip;
    for (index, string) in data.iter().enumerate() {
        for (offset, ch) in string.chars().enumerate() {
            if to_skip > 0 {
                to_skip -= 1;
                continue;
            }
            let code = ch as u32;
            if code > max {
                return Err(DecodeError::MalformedData {
                    index,
                    offset,
                    reason: format!("char U+{code:04X} exceeds {max:#x}"),
                });
            }
            out.push(code as u8);
        }
    }
    Ok(out)
}

/// Regroup shifted 7-bit units into bytes
fn decode_7to8(units: &[u8]) -> Vec<u8> {
    let len = 7 * units.len() / 8;
    let mut out = Vec::with_capacity(len);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &unit in units {
        let value = (unit as u32 + 0x7F) & 0x7F;
        acc |= value << bits;
        bits += 7;
        if bits >= 8 {
            out.push((acc & 0xFF) as u8);
            acc >>= 8;
            bits -= 8;
        }
    }
    out.truncate(len);
    out
}

/// Split bytes into unshifted 7-bit units
fn encode_8to7(bytes: &[u8]) -> Vec<u8> {
    let len = (bytes.len() * 8 + 6) / 7;
    let mut out = Vec::with_capacity(len);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &byte in bytes {
        acc |= (byte as u32) << bits;
        bits += 8;
        while bits >= 7 {
            out.push((acc & 0x7F) as u8);
            acc >>= 7;
            bits -= 7;
        }
    }
    if bits > 0 {
        out.push((acc & 0x7F) as u8);
    }
    out
}
