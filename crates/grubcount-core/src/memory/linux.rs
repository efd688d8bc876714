//! Linux backend for the game running under Proton/Wine: procfs pid
//! lookup, `/proc/<pid>/maps` enumeration and positioned reads on
//! `/proc/<pid>/mem`.

use std::fs::{self, File};
use std::os::unix::fs::FileExt;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ProcessMemory};

/// Exclusive end of the 32-bit target's address space.
const ADDRESS_SPACE_END: u64 = 1 << 32;

/// Read-only handle to the running game process. `/proc/<pid>/mem` stays
/// open for the handle's lifetime and closes on drop.
pub struct ProcessHandle {
    pid: u32,
    mem: File,
    name: String,
}

impl ProcessHandle {
    /// Attach to the first process whose command name or executable
    /// matches `name` (case-insensitive).
    pub fn attach(name: &str) -> Result<Self> {
        let pid = find_pid(name)?.ok_or_else(|| Error::ProcessNotRunning(name.to_string()))?;

        let mem = File::open(format!("/proc/{pid}/mem")).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                Error::AccessDenied(format!(
                    "cannot open /proc/{pid}/mem (run as the game's user or root)"
                ))
            } else {
                Error::ProcessNotRunning(name.to_string())
            }
        })?;

        debug!("attached to {} (pid {})", name, pid);
        Ok(Self {
            pid,
            mem,
            name: name.to_string(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl ProcessMemory for ProcessHandle {
    fn enumerate_regions(&self) -> Result<Vec<MemoryRegion>> {
        let maps = fs::read_to_string(format!("/proc/{}/maps", self.pid)).map_err(|e| {
            Error::EnumerationFailed(format!("cannot read maps for pid {}: {e}", self.pid))
        })?;

        let mut regions = Vec::new();
        for line in maps.lines() {
            let mut parts = line.split_whitespace();
            let Some(range) = parts.next() else { continue };
            let Some(perms) = parts.next() else { continue };
            if !perms.starts_with('r') {
                continue;
            }
            let Some((start, end)) = parse_range(range) else {
                continue;
            };
            // Wine maps its own helper pages above 4 GiB; the 32-bit
            // target's address space ends there.
            if start >= ADDRESS_SPACE_END {
                continue;
            }
            let end = end.min(ADDRESS_SPACE_END);
            if end > start {
                regions.push(MemoryRegion {
                    base: start as u32,
                    size: (end - start) as u32,
                });
            }
        }
        Ok(regions)
    }

    fn read_bytes(&self, address: u32, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        self.mem
            .read_exact_at(&mut buffer, address as u64)
            .map_err(|_| Error::ReadFailed { address })?;
        Ok(buffer)
    }

    fn is_alive(&self) -> bool {
        Path::new(&format!("/proc/{}/maps", self.pid)).exists()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Parse a maps address range like `08048000-08051000`.
fn parse_range(range: &str) -> Option<(u64, u64)> {
    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    Some((start, end))
}

fn find_pid(name: &str) -> Result<Option<u32>> {
    let entries =
        fs::read_dir("/proc").map_err(|e| Error::EnumerationFailed(format!("cannot list /proc: {e}")))?;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let Some(pid) = file_name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        if process_matches(pid, name) {
            return Ok(Some(pid));
        }
    }
    Ok(None)
}

/// Match against `comm` (which the kernel caps at 15 bytes) and, for Wine
/// processes started with a Windows path, the cmdline basename.
fn process_matches(pid: u32, name: &str) -> bool {
    if let Ok(comm) = fs::read_to_string(format!("/proc/{pid}/comm")) {
        let comm = comm.trim();
        if comm.eq_ignore_ascii_case(name) {
            return true;
        }
        if comm.len() == 15
            && name.len() > 15
            && name.get(..15).is_some_and(|prefix| prefix.eq_ignore_ascii_case(comm))
        {
            return true;
        }
    }

    if let Ok(cmdline) = fs::read(format!("/proc/{pid}/cmdline"))
        && let Some(first) = cmdline.split(|&b| b == 0).next()
    {
        let arg = String::from_utf8_lossy(first).replace('\\', "/");
        if let Some(base) = arg.rsplit('/').next()
            && base.eq_ignore_ascii_case(name)
        {
            return true;
        }
    }

    false
}
