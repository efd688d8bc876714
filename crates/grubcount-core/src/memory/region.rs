/// A committed, readable span of the target's address space.
///
/// Only valid for the enumeration pass that produced it: the target frees
/// and remaps memory between scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub base: u32,
    pub size: u32,
}
