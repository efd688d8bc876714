use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not a save file (bad magic)")]
    NotASave,

    #[error("Grub counter not found")]
    CounterNotFound,

    #[error("Save file truncated after counter signature")]
    SaveTruncated,

    #[error("Process not running: {0}")]
    ProcessNotRunning(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unsupported target process: {0}")]
    UnsupportedTarget(String),

    #[error("Memory read failed at {address:#010X}")]
    ReadFailed { address: u32 },

    #[error("Region enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error means the target process is gone, so a wrapper
    /// can go back to waiting for it instead of aborting.
    pub fn is_not_running(&self) -> bool {
        matches!(self, Error::ProcessNotRunning(_))
    }
}
