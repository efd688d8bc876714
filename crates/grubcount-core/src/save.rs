//! Save container decoder.
//!
//! Telltale `.save` files start with a four-byte raw sentinel; the rest of
//! the file is obfuscated by XORing every byte with `0xFF`. The decoded
//! payload is a sequence of length-prefixed key/value records, but the
//! decoder never parses them: it searches the decoded buffer for the fixed
//! signature that precedes the grub counter and reads the little-endian
//! u32 that follows.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::scan::pattern;

/// Raw sentinel at the start of every save file, before decoding.
pub const SAVE_MAGIC: [u8; 4] = [0xAA, 0xDE, 0xAF, 0x64];

/// Decoded signature directly preceding the counter DWORD: record length,
/// the variable's two name hashes, and a zero pad.
pub const COUNT_SIGNATURE: [u8; 16] = [
    0x02, 0x00, 0x00, 0x00, 0xA1, 0x5A, 0x21, 0x97, 0x53, 0xC0, 0x0E, 0x51, 0x00, 0x00, 0x00, 0x00,
];

/// Read the grub count from a save file on disk.
pub fn read_grub_count<P: AsRef<Path>>(path: P) -> Result<u32> {
    let raw = fs::read(path.as_ref())?;
    grub_count_from_raw(&raw)
}

/// Read the grub count from the raw bytes of a save file.
///
/// If the counter signature occurs more than once, the first occurrence
/// wins. The value is returned verbatim; no range validation is applied.
pub fn grub_count_from_raw(raw: &[u8]) -> Result<u32> {
    if raw.len() < SAVE_MAGIC.len() || raw[..SAVE_MAGIC.len()] != SAVE_MAGIC {
        return Err(Error::NotASave);
    }

    let decoded = decode(raw);
    let idx = pattern::find_first(&decoded, &COUNT_SIGNATURE).ok_or(Error::CounterNotFound)?;

    let start = idx + COUNT_SIGNATURE.len();
    let bytes = decoded.get(start..start + 4).ok_or(Error::SaveTruncated)?;
    let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    debug!("decoded grub count {} at offset {:#x}", count, start);
    Ok(count)
}

/// Reverse the whole-file obfuscation (bitwise NOT of every byte).
fn decode(raw: &[u8]) -> Vec<u8> {
    raw.iter().map(|b| b ^ 0xFF).collect()
}
