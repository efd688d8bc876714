//! Stub backend for platforms the game does not run on.

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ProcessMemory};

pub struct ProcessHandle {
    name: String,
}

impl ProcessHandle {
    pub fn attach(name: &str) -> Result<Self> {
        let _ = name;
        Err(Error::AccessDenied(
            "live process inspection is not supported on this platform".to_string(),
        ))
    }

    pub fn pid(&self) -> u32 {
        0
    }
}

impl ProcessMemory for ProcessHandle {
    fn enumerate_regions(&self) -> Result<Vec<MemoryRegion>> {
        Err(Error::AccessDenied(
            "live process inspection is not supported on this platform".to_string(),
        ))
    }

    fn read_bytes(&self, address: u32, _len: usize) -> Result<Vec<u8>> {
        Err(Error::ReadFailed { address })
    }

    fn is_alive(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        &self.name
    }
}
