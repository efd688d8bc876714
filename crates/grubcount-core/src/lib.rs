//! Read-only inspectors for the Tales of Monkey Island 3 grub counter.
//!
//! The counter lives in two places: obfuscated `.save` containers on disk,
//! and a scripting-variable node inside the running 32-bit game process
//! whose address changes between sessions. This crate provides:
//!
//! - **Save decoding**: validate the container sentinel, reverse the
//!   whole-file obfuscation and pull the counter out by byte signature
//!   ([`save`]).
//! - **Live location**: enumerate the process's readable memory, find every
//!   node-signature match, discriminate the live node from dead copies by a
//!   pointer-locality heuristic, and keep a validated cached address so
//!   steady-state polls cost a single four-byte read ([`scan`]).

pub mod config;
pub mod error;
pub mod memory;
pub mod save;
pub mod scan;
pub mod stream;

pub use error::{Error, Result};
pub use memory::{MemoryRegion, ProcessHandle, ProcessMemory};
pub use scan::{Candidate, GrubLocator};
pub use save::{grub_count_from_raw, read_grub_count};
pub use stream::StreamOutput;
