//! Overlay file output.

use std::fs;
use std::path::PathBuf;

use crate::error::Result;

/// Writes the current count to a text file for streaming overlays.
///
/// Disabled mode turns every write into a no-op so one-shot runs can share
/// the monitor code path.
pub struct StreamOutput {
    enabled: bool,
    path: PathBuf,
}

impl StreamOutput {
    pub fn new(enabled: bool, path: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            path: path.into(),
        }
    }

    pub fn write_count(&self, count: u32) -> Result<()> {
        self.write(&count.to_string())
    }

    /// Written when the counter is not currently locatable.
    pub fn write_unknown(&self) -> Result<()> {
        self.write("?")
    }

    fn write(&self, content: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_count_and_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grub_count.txt");
        let output = StreamOutput::new(true, &path);

        output.write_count(118).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "118");

        output.write_unknown().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "?");
    }

    #[test]
    fn test_disabled_output_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grub_count.txt");
        let output = StreamOutput::new(false, &path);

        output.write_count(5).unwrap();
        assert!(!path.exists());
    }
}
