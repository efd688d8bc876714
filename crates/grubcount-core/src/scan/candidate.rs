//! Candidate nodes and the selection rule.

use super::constants::{LOCALITY_MAX_DELTA, NEIGHBOR_WORD_COUNT};

/// A node-signature match found during a full scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Absolute address of the signature start.
    pub addr: u32,
    /// The pointer words at `addr - 0x10`, `- 0x0C`, `- 0x08`; zero when
    /// they could not be read.
    pub neighbors: [u32; NEIGHBOR_WORD_COUNT],
    /// Value DWORD at `addr + 0x0C`.
    pub value: u32,
    /// How many neighbor words lie within the locality window.
    pub locality: u8,
}

/// Count the neighbor words within [`LOCALITY_MAX_DELTA`] of the node
/// address (unsigned 32-bit distance).
pub fn locality_score(addr: u32, neighbors: &[u32; NEIGHBOR_WORD_COUNT]) -> u8 {
    neighbors
        .iter()
        .filter(|&&word| addr.abs_diff(word) <= LOCALITY_MAX_DELTA)
        .count() as u8
}

/// Pick the winning candidate.
///
/// Only the highest-locality group survives; in practice the live node
/// scores 3 and dead copies fall below, but when nothing reaches 3 the
/// best group present is kept. Among survivors the largest value wins: the
/// engine's second VM holds a permanently-zero copy with equally good
/// locality, while the real counter only grows. A value tie goes to the
/// lowest address, so a fixed memory snapshot always selects the same
/// node.
pub fn select(candidates: &[Candidate]) -> Option<&Candidate> {
    let best_locality = candidates.iter().map(|c| c.locality).max()?;
    candidates
        .iter()
        .filter(|c| c.locality == best_locality)
        .min_by(|a, b| b.value.cmp(&a.value).then(a.addr.cmp(&b.addr)))
}
