//! Node-signature constants and scan sizing.
//!
//! # Node layout
//!
//! The counter lives in a scripting-variable hash node. Relative to the
//! signature start:
//!
//! ```text
//! -0x10, -0x0C, -0x08   pointer words used for locality scoring
//!  0x00                 hash1 (A1 5A 21 97)
//!  0x04                 hash2 (53 C0 0E 51)
//!  0x08                 integer type tag (5C 8F 8D 00)
//!  0x0C                 value DWORD, little-endian
//! ```
//!
//! The engine leaves dead copies of the node behind (GC history, plus a
//! persistently hosted second VM whose copy always reads zero), so a raw
//! signature scan yields 8-10 look-alikes per session.

/// In-memory signature of the counter's variable node: the two name
/// hashes followed by the engine's integer type tag, little-endian.
pub const NODE_SIGNATURE: [u8; 12] = [
    0xA1, 0x5A, 0x21, 0x97, 0x53, 0xC0, 0x0E, 0x51, 0x5C, 0x8F, 0x8D, 0x00,
];

/// Offset of the value DWORD from the node signature start.
pub const COUNT_OFFSET: u32 = 0x0C;

/// Offset back from the signature start to the first of the three pointer
/// words used for locality scoring.
pub const NEIGHBOR_WORDS_OFFSET: u32 = 0x10;

/// Number of pointer-sized words scored per candidate.
pub const NEIGHBOR_WORD_COUNT: usize = 3;

/// A neighbor word counts toward the locality score when it lies within
/// this distance of the node address. Holds for the supported engine
/// build; other engine versions may need a different window, so it is a
/// single named constant.
pub const LOCALITY_MAX_DELTA: u32 = 4 * 1024 * 1024;

/// Regions are read in chunks of this size to bound peak memory.
pub const SCAN_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Bytes of the previous chunk carried into the next so signature matches
/// straddling a chunk boundary are still found.
pub const CHUNK_OVERLAP: usize = 15;
