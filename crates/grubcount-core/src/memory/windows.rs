//! Windows backend: Toolhelp attach, VirtualQueryEx region enumeration
//! and ReadProcessMemory reads.

use std::mem;

use tracing::debug;
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEMORY_BASIC_INFORMATION, PAGE_GUARD, PAGE_NOACCESS, VirtualQueryEx,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, IsWow64Process, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ,
};

use crate::error::{Error, Result};
use crate::memory::{MemoryRegion, ProcessMemory};

/// Exit code of a process that has not terminated.
const STILL_ACTIVE: u32 = 259;

/// Exclusive end of the 32-bit target's address space.
const ADDRESS_SPACE_END: u64 = 1 << 32;

/// Read-only handle to the running game process. The OS handle is closed
/// on drop.
pub struct ProcessHandle {
    handle: HANDLE,
    pid: u32,
    name: String,
}

impl ProcessHandle {
    /// Attach to the first process whose image name matches `name`
    /// (case-insensitive).
    pub fn attach(name: &str) -> Result<Self> {
        let pid = find_pid(name)?.ok_or_else(|| Error::ProcessNotRunning(name.to_string()))?;

        // SAFETY: OpenProcess takes no pointers; the returned handle is
        // owned by Self and closed on drop.
        let handle = unsafe { OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, false, pid) }
            .map_err(|e| Error::AccessDenied(format!("OpenProcess failed for pid {pid}: {e}")))?;

        let process = Self {
            handle,
            pid,
            name: name.to_string(),
        };

        // The supported game is a 32-bit build and always runs under WOW64
        // on a 64-bit host; a native 64-bit image is a different target.
        let mut wow64 = BOOL::default();
        // SAFETY: handle is a valid process handle opened above.
        if unsafe { IsWow64Process(process.handle, &mut wow64) }.is_ok() && !wow64.as_bool() {
            return Err(Error::UnsupportedTarget(format!(
                "{name} (pid {pid}) is not a 32-bit process"
            )));
        }

        debug!("attached to {} (pid {})", name, pid);
        Ok(process)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl ProcessMemory for ProcessHandle {
    fn enumerate_regions(&self) -> Result<Vec<MemoryRegion>> {
        let mut regions = Vec::new();
        let mut address: u64 = 0;

        while address < ADDRESS_SPACE_END {
            let mut mbi: MEMORY_BASIC_INFORMATION = unsafe { mem::zeroed() };
            // SAFETY: mbi is a valid out-pointer of the size passed.
            let written = unsafe {
                VirtualQueryEx(
                    self.handle,
                    Some(address as usize as *const _),
                    &mut mbi,
                    mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if written == 0 {
                break;
            }

            let base = mbi.BaseAddress as u64;
            let end = (base + mbi.RegionSize as u64).min(ADDRESS_SPACE_END);
            let readable = mbi.State == MEM_COMMIT
                && !mbi.Protect.contains(PAGE_NOACCESS)
                && !mbi.Protect.contains(PAGE_GUARD);
            if readable && base < ADDRESS_SPACE_END && end > base {
                regions.push(MemoryRegion {
                    base: base as u32,
                    size: (end - base) as u32,
                });
            }

            let next = base + mbi.RegionSize as u64;
            if next <= address {
                break;
            }
            address = next;
        }

        Ok(regions)
    }

    fn read_bytes(&self, address: u32, len: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        let mut bytes_read = 0usize;

        // SAFETY: buffer is valid for len bytes and bytes_read is a valid
        // out-pointer.
        let read = unsafe {
            ReadProcessMemory(
                self.handle,
                address as usize as *const _,
                buffer.as_mut_ptr() as *mut _,
                len,
                Some(&mut bytes_read),
            )
        };
        if read.is_err() || bytes_read != len {
            return Err(Error::ReadFailed { address });
        }

        Ok(buffer)
    }

    fn is_alive(&self) -> bool {
        let mut code = 0u32;
        // SAFETY: code is a valid out-pointer.
        unsafe { GetExitCodeProcess(self.handle, &mut code) }.is_ok() && code == STILL_ACTIVE
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // SAFETY: the handle was opened by attach and is closed exactly once.
        let _ = unsafe { CloseHandle(self.handle) };
    }
}

fn find_pid(name: &str) -> Result<Option<u32>> {
    // SAFETY: the snapshot handle is closed before returning; the entry
    // struct is plain data sized before the first call.
    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::EnumerationFailed(format!("process snapshot failed: {e}")))?;
        if snapshot == INVALID_HANDLE_VALUE {
            return Err(Error::EnumerationFailed("process snapshot failed".to_string()));
        }

        let mut found = None;
        let mut entry: PROCESSENTRY32W = mem::zeroed();
        entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as u32;

        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let exe = String::from_utf16_lossy(&entry.szExeFile[..len]);
                if exe.eq_ignore_ascii_case(name) {
                    found = Some(entry.th32ProcessID);
                    break;
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }

        let _ = CloseHandle(snapshot);
        Ok(found)
    }
}
