//! Live-memory signature scanning and the cached locator.
//!
//! A full scan walks every readable region of the attached process, finds
//! all node-signature matches, scores each candidate by how many of the
//! three pointer words preceding it stay near the node, and selects one
//! winner. [`GrubLocator`] caches the winning address so subsequent polls
//! are a single four-byte read until the cache stops validating.

mod candidate;
mod constants;
mod locator;
pub mod pattern;

pub use candidate::{Candidate, locality_score, select};
pub use constants::{COUNT_OFFSET, LOCALITY_MAX_DELTA, NODE_SIGNATURE};
pub use locator::{CandidateObserver, GrubLocator};
