//! Live locator: full signature scan plus the cached fast path.

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ProcessMemory};

use super::candidate::{self, Candidate};
use super::constants::{
    CHUNK_OVERLAP, COUNT_OFFSET, NEIGHBOR_WORDS_OFFSET, NODE_SIGNATURE, SCAN_CHUNK_SIZE,
};
use super::pattern;

/// Callback invoked for every candidate found by a full scan, for
/// diagnostic dumps. Does not influence selection.
pub type CandidateObserver = Box<dyn FnMut(&Candidate)>;

#[derive(Debug, Clone, Copy)]
struct CachedNode {
    addr: u32,
    value: u32,
}

/// Locates the grub counter in a running game process.
///
/// The first poll performs a full scan of the target's readable address
/// space. Subsequent polls read four bytes at the cached node address and
/// fall back to a full scan whenever the cache can no longer be trusted.
///
/// The locator exclusively owns its process handle and cache; polls must
/// not run concurrently on the same instance.
pub struct GrubLocator<M: ProcessMemory> {
    memory: M,
    cache: Option<CachedNode>,
    observer: Option<CandidateObserver>,
}

impl<M: ProcessMemory> GrubLocator<M> {
    pub fn new(memory: M) -> Self {
        Self {
            memory,
            cache: None,
            observer: None,
        }
    }

    /// Install a per-candidate callback. The default is a no-op.
    pub fn set_observer(&mut self, observer: CandidateObserver) {
        self.observer = Some(observer);
    }

    /// Address of the node the cache currently trusts, if any.
    pub fn cached_addr(&self) -> Option<u32> {
        self.cache.map(|c| c.addr)
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Read the current count, scanning only when necessary.
    ///
    /// A cached value of zero cannot be told apart from a dead node that
    /// also reads zero, so it always forces a rescan. A value that moved
    /// backwards or jumped by more than one means the save was reloaded or
    /// the address went stale; the cache is dropped and the scan reruns on
    /// the same poll.
    pub fn poll(&mut self) -> Result<u32> {
        if let Some(cached) = self.cache {
            if cached.value == 0 {
                debug!("cached value is zero, revalidating from scratch");
                self.cache = None;
            } else {
                match self.read_count_at(cached.addr) {
                    Ok(v) if v == cached.value || v == cached.value.saturating_add(1) => {
                        self.cache = Some(CachedNode {
                            addr: cached.addr,
                            value: v,
                        });
                        return Ok(v);
                    }
                    Ok(v) => {
                        debug!(
                            "cached node {:#010X} read {} (last {}), rescanning",
                            cached.addr, v, cached.value
                        );
                        self.cache = None;
                    }
                    Err(_) => {
                        debug!("cached node {:#010X} unreadable, rescanning", cached.addr);
                        self.cache = None;
                    }
                }
            }
        }

        let selected = self.full_scan()?;
        self.cache = Some(CachedNode {
            addr: selected.addr,
            value: selected.value,
        });
        Ok(selected.value)
    }

    fn read_count_at(&self, node_addr: u32) -> Result<u32> {
        let addr = node_addr
            .checked_add(COUNT_OFFSET)
            .ok_or(Error::ReadFailed { address: node_addr })?;
        self.memory.read_u32(addr)
    }

    /// Scan every readable region for node-signature matches and pick the
    /// winning candidate.
    fn full_scan(&mut self) -> Result<Candidate> {
        let regions = self.memory.enumerate_regions()?;
        debug!("full scan over {} readable regions", regions.len());

        let mut addrs: Vec<u32> = Vec::new();
        for region in &regions {
            self.scan_region(region, &mut addrs);
        }
        addrs.sort_unstable();
        addrs.dedup();

        let mut candidates = Vec::with_capacity(addrs.len());
        for addr in addrs {
            if let Some(found) = self.probe(addr) {
                candidates.push(found);
            }
        }
        debug!("signature matched {} candidate nodes", candidates.len());

        if let Some(observer) = self.observer.as_mut() {
            for found in &candidates {
                observer(found);
            }
        }

        match candidate::select(&candidates) {
            Some(winner) => {
                debug!(
                    "selected node {:#010X} (value {}, locality {})",
                    winner.addr, winner.value, winner.locality
                );
                Ok(*winner)
            }
            None => {
                if !self.memory.is_alive() {
                    return Err(Error::ProcessNotRunning(self.memory.name().to_string()));
                }
                Err(Error::CounterNotFound)
            }
        }
    }

    /// Collect signature match addresses from one region.
    ///
    /// The region is read in bounded chunks; the tail of each chunk is
    /// carried into the next so matches straddling a chunk boundary are
    /// still seen. A failed read skips the rest of the region.
    fn scan_region(&self, region: &MemoryRegion, out: &mut Vec<u32>) {
        let mut tail: Vec<u8> = Vec::new();
        let mut offset: u32 = 0;

        while offset < region.size {
            let remaining = (region.size - offset) as usize;
            let read_size = remaining.min(SCAN_CHUNK_SIZE);
            let addr = region.base + offset;

            let chunk = match self.memory.read_bytes(addr, read_size) {
                Ok(bytes) => bytes,
                Err(e) => {
                    debug!(
                        "skipping rest of region {:#010X} after failed read at {:#010X}: {}",
                        region.base, addr, e
                    );
                    return;
                }
            };

            let mut data = Vec::with_capacity(tail.len() + chunk.len());
            data.extend_from_slice(&tail);
            data.extend_from_slice(&chunk);
            let data_base = addr - tail.len() as u32;

            for pos in pattern::find_all(&data, &NODE_SIGNATURE) {
                out.push(data_base + pos as u32);
            }

            let keep = CHUNK_OVERLAP.min(data.len());
            tail = data[data.len() - keep..].to_vec();

            offset += read_size as u32;
        }
    }

    /// Build a candidate from a signature match address.
    ///
    /// The three preceding words count as zero when they cannot be read
    /// (a match at the very start of the address space or of a mapping).
    /// A candidate whose value DWORD cannot be read is dropped.
    fn probe(&self, addr: u32) -> Option<Candidate> {
        let neighbors = self.read_neighbors(addr);
        let value = self.read_count_at(addr).ok()?;
        Some(Candidate {
            addr,
            neighbors,
            value,
            locality: candidate::locality_score(addr, &neighbors),
        })
    }

    fn read_neighbors(&self, addr: u32) -> [u32; 3] {
        let Some(start) = addr.checked_sub(NEIGHBOR_WORDS_OFFSET) else {
            return [0; 3];
        };
        match self.memory.read_bytes(start, 12) {
            Ok(bytes) => [
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
                u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            ],
            Err(_) => [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockProcess;
    use std::cell::RefCell;
    use std::rc::Rc;

    const REGION_BASE: u32 = 0x0800_0000;

    /// Node image: three neighbor words, one unscored word, the signature,
    /// then the value DWORD. The signature starts 0x10 bytes in.
    fn node_bytes(neighbors: [u32; 3], value: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        for word in neighbors {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 4]);
        bytes.extend_from_slice(&NODE_SIGNATURE);
        bytes.extend_from_slice(&value.to_le_bytes());
        bytes
    }

    /// Place a node so its signature starts at `sig_addr`; neighbor words
    /// are synthesized close to the node so it scores 3.
    fn place_live_node(region: &mut [u8], region_base: u32, sig_addr: u32, value: u32) {
        let addr = sig_addr;
        place_node_with_neighbors(
            region,
            region_base,
            sig_addr,
            [addr - 0x2000, addr + 0x2000, addr - 0x40],
            value,
        );
    }

    fn place_node_with_neighbors(
        region: &mut [u8],
        region_base: u32,
        sig_addr: u32,
        neighbors: [u32; 3],
        value: u32,
    ) {
        let bytes = node_bytes(neighbors, value);
        let start = (sig_addr - region_base - NEIGHBOR_WORDS_OFFSET) as usize;
        region[start..start + bytes.len()].copy_from_slice(&bytes);
    }

    fn locator_with_region(region: Vec<u8>) -> (GrubLocator<MockProcess>, MockProcess) {
        let mock = MockProcess::new();
        mock.add_region(REGION_BASE, region);
        (GrubLocator::new(mock.clone()), mock)
    }

    #[test]
    fn test_zero_copy_loses_to_live_value() {
        let mut region = vec![0u8; 0x1000];
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x100, 42);
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x500, 0);
        let (mut locator, _mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 42);
        assert_eq!(locator.cached_addr(), Some(REGION_BASE + 0x100));
    }

    #[test]
    fn test_partial_locality_discarded_and_zero_tie_goes_low() {
        let mut region = vec![0u8; 0x1000];
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x100, 0);
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x300, 0);
        // Score-2 candidate with a tempting value.
        let far = REGION_BASE + 0x600;
        place_node_with_neighbors(
            &mut region,
            REGION_BASE,
            far,
            [far - 0x100, far + 0x100, 0x7F00_0000],
            99,
        );
        let (mut locator, _mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 0);
        assert_eq!(locator.cached_addr(), Some(REGION_BASE + 0x100));
    }

    #[test]
    fn test_best_group_survives_when_no_full_score() {
        let mut region = vec![0u8; 0x1000];
        let a = REGION_BASE + 0x100;
        let b = REGION_BASE + 0x400;
        place_node_with_neighbors(&mut region, REGION_BASE, a, [a - 0x10, 0, 0], 3);
        place_node_with_neighbors(&mut region, REGION_BASE, b, [b - 0x10, b + 0x10, 0], 1);
        let (mut locator, _mock) = locator_with_region(region);

        // The score-2 candidate wins despite its smaller value.
        assert_eq!(locator.poll().unwrap(), 1);
        assert_eq!(locator.cached_addr(), Some(b));
    }

    #[test]
    fn test_no_signature_anywhere() {
        let (mut locator, _mock) = locator_with_region(vec![0u8; 0x1000]);
        assert!(matches!(locator.poll(), Err(Error::CounterNotFound)));
        assert_eq!(locator.cached_addr(), None);
    }

    #[test]
    fn test_unreadable_neighbors_count_as_zero() {
        // Signature right at the region start: the neighbor words lie in
        // unmapped space, so the candidate scores 0 but still wins alone.
        let mut region = vec![0u8; 0x1000];
        region[..12].copy_from_slice(&NODE_SIGNATURE);
        region[12..16].copy_from_slice(&77u32.to_le_bytes());
        let (mut locator, _mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 77);
    }

    #[test]
    fn test_warm_polls_track_increments_without_rescanning() {
        let mut region = vec![0u8; 0x1000];
        let node = REGION_BASE + 0x200;
        place_live_node(&mut region, REGION_BASE, node, 100);
        let (mut locator, mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 100);
        let scans_after_first = mock.scan_read_count();

        mock.write_u32(node + COUNT_OFFSET, 101);
        assert_eq!(locator.poll().unwrap(), 101);
        assert_eq!(locator.poll().unwrap(), 101);
        mock.write_u32(node + COUNT_OFFSET, 102);
        assert_eq!(locator.poll().unwrap(), 102);

        assert_eq!(mock.scan_read_count(), scans_after_first);
        assert_eq!(locator.cached_addr(), Some(node));
    }

    #[test]
    fn test_backwards_jump_forces_rescan_on_same_poll() {
        let mut region = vec![0u8; 0x1000];
        let node = REGION_BASE + 0x200;
        place_live_node(&mut region, REGION_BASE, node, 100);
        let (mut locator, mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 100);
        mock.write_u32(node + COUNT_OFFSET, 101);
        assert_eq!(locator.poll().unwrap(), 101);
        mock.write_u32(node + COUNT_OFFSET, 102);
        assert_eq!(locator.poll().unwrap(), 102);

        // Save reloaded to an earlier point.
        let scans_before = mock.scan_read_count();
        mock.write_u32(node + COUNT_OFFSET, 50);
        assert_eq!(locator.poll().unwrap(), 50);
        assert!(mock.scan_read_count() > scans_before);

        mock.write_u32(node + COUNT_OFFSET, 51);
        assert_eq!(locator.poll().unwrap(), 51);
    }

    #[test]
    fn test_forward_jump_forces_rescan() {
        let mut region = vec![0u8; 0x1000];
        let node = REGION_BASE + 0x200;
        place_live_node(&mut region, REGION_BASE, node, 10);
        let (mut locator, mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 10);
        let scans_before = mock.scan_read_count();
        mock.write_u32(node + COUNT_OFFSET, 12);
        assert_eq!(locator.poll().unwrap(), 12);
        assert!(mock.scan_read_count() > scans_before);
    }

    #[test]
    fn test_zero_cached_value_always_rescans() {
        let mut region = vec![0u8; 0x1000];
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x200, 0);
        let (mut locator, mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 0);
        let scans_before = mock.scan_read_count();
        assert_eq!(locator.poll().unwrap(), 0);
        assert!(mock.scan_read_count() > scans_before);
    }

    #[test]
    fn test_cached_read_failure_falls_back_to_scan() {
        let mut region = vec![0u8; 0x1000];
        let node = REGION_BASE + 0x200;
        place_live_node(&mut region, REGION_BASE, node, 5);
        let (mut locator, mock) = locator_with_region(region);

        assert_eq!(locator.poll().unwrap(), 5);

        // The node moved: old mapping gone, same node in a fresh region.
        mock.remove_region(REGION_BASE);
        let new_base = 0x0A00_0000;
        let mut fresh = vec![0u8; 0x1000];
        place_live_node(&mut fresh, new_base, new_base + 0x400, 6);
        mock.add_region(new_base, fresh);

        assert_eq!(locator.poll().unwrap(), 6);
        assert_eq!(locator.cached_addr(), Some(new_base + 0x400));
    }

    #[test]
    fn test_dead_process_reports_not_running() {
        let (mut locator, mock) = locator_with_region(vec![0u8; 0x1000]);
        mock.set_alive(false);
        assert!(matches!(locator.poll(), Err(Error::ProcessNotRunning(_))));
    }

    #[test]
    fn test_unreadable_region_is_skipped() {
        let mut good = vec![0u8; 0x1000];
        place_live_node(&mut good, 0x0A00_0000, 0x0A00_0200, 9);
        let (mut locator, mock) = locator_with_region(vec![0u8; 0x1000]);
        mock.add_region(0x0A00_0000, good);
        mock.set_unreadable(REGION_BASE);

        assert_eq!(locator.poll().unwrap(), 9);
    }

    #[test]
    fn test_match_straddling_chunk_boundary_found_once() {
        let mut region = vec![0u8; SCAN_CHUNK_SIZE + 0x100];
        // Signature starts 6 bytes before the chunk boundary.
        let node = REGION_BASE + SCAN_CHUNK_SIZE as u32 - 6;
        place_live_node(&mut region, REGION_BASE, node, 33);
        let (mut locator, _mock) = locator_with_region(region);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_by_observer = Rc::clone(&seen);
        locator.set_observer(Box::new(move |c| {
            seen_by_observer.borrow_mut().push(c.addr);
        }));

        assert_eq!(locator.poll().unwrap(), 33);
        assert_eq!(*seen.borrow(), vec![node]);
    }

    #[test]
    fn test_scan_is_deterministic_across_locators() {
        let mut region = vec![0u8; 0x1000];
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x100, 8);
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x300, 8);
        let mock = MockProcess::new();
        mock.add_region(REGION_BASE, region);

        let mut first = GrubLocator::new(mock.clone());
        let mut second = GrubLocator::new(mock.clone());
        assert_eq!(first.poll().unwrap(), second.poll().unwrap());
        assert_eq!(first.cached_addr(), second.cached_addr());
        assert_eq!(first.cached_addr(), Some(REGION_BASE + 0x100));
    }

    #[test]
    fn test_observer_sees_every_candidate() {
        let mut region = vec![0u8; 0x1000];
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x100, 1);
        place_live_node(&mut region, REGION_BASE, REGION_BASE + 0x400, 0);
        let (mut locator, _mock) = locator_with_region(region);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_by_observer = Rc::clone(&seen);
        locator.set_observer(Box::new(move |c| {
            seen_by_observer.borrow_mut().push((c.addr, c.value, c.locality));
        }));

        locator.poll().unwrap();
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (REGION_BASE + 0x100, 1, 3));
        assert_eq!(seen[1], (REGION_BASE + 0x400, 0, 3));
    }
}
