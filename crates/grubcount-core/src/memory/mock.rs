//! In-memory [`ProcessMemory`] double for scanner and locator tests.

use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ProcessMemory};

struct MockState {
    regions: Vec<(u32, Vec<u8>)>,
    unreadable: Vec<u32>,
    alive: bool,
    scan_reads: usize,
}

/// Fake process memory. Clones share state, so a test can keep a handle
/// and mutate memory between polls of a locator that owns another clone.
#[derive(Clone)]
pub struct MockProcess {
    state: Arc<Mutex<MockState>>,
}

impl MockProcess {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                regions: Vec::new(),
                unreadable: Vec::new(),
                alive: true,
                scan_reads: 0,
            })),
        }
    }

    pub fn add_region(&self, base: u32, bytes: Vec<u8>) {
        let mut state = self.state.lock().unwrap();
        state.regions.push((base, bytes));
        state.regions.sort_by_key(|(base, _)| *base);
    }

    pub fn remove_region(&self, base: u32) {
        self.state.lock().unwrap().regions.retain(|(b, _)| *b != base);
    }

    /// Make every read that touches the region at `base` fail.
    pub fn set_unreadable(&self, base: u32) {
        self.state.lock().unwrap().unreadable.push(base);
    }

    pub fn set_alive(&self, alive: bool) {
        self.state.lock().unwrap().alive = alive;
    }

    pub fn write(&self, address: u32, bytes: &[u8]) {
        let mut state = self.state.lock().unwrap();
        for (base, data) in &mut state.regions {
            let Some(offset) = address.checked_sub(*base) else {
                continue;
            };
            let offset = offset as usize;
            if offset < data.len() && offset + bytes.len() <= data.len() {
                data[offset..offset + bytes.len()].copy_from_slice(bytes);
                return;
            }
        }
        panic!("write outside mock regions: {address:#010X}");
    }

    pub fn write_u32(&self, address: u32, value: u32) {
        self.write(address, &value.to_le_bytes());
    }

    /// Number of bulk reads served so far; distinguishes full scans from
    /// cached four-byte polls.
    pub fn scan_read_count(&self) -> usize {
        self.state.lock().unwrap().scan_reads
    }
}

impl ProcessMemory for MockProcess {
    fn enumerate_regions(&self) -> Result<Vec<MemoryRegion>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .regions
            .iter()
            .map(|(base, data)| MemoryRegion {
                base: *base,
                size: data.len() as u32,
            })
            .collect())
    }

    fn read_bytes(&self, address: u32, len: usize) -> Result<Vec<u8>> {
        let mut state = self.state.lock().unwrap();
        if len > 64 {
            state.scan_reads += 1;
        }
        for (base, data) in &state.regions {
            let Some(offset) = address.checked_sub(*base) else {
                continue;
            };
            let offset = offset as usize;
            if offset >= data.len() {
                continue;
            }
            if state.unreadable.contains(base) || offset + len > data.len() {
                break;
            }
            return Ok(data[offset..offset + len].to_vec());
        }
        Err(Error::ReadFailed { address })
    }

    fn is_alive(&self) -> bool {
        self.state.lock().unwrap().alive
    }

    fn name(&self) -> &str {
        "mock"
    }
}
