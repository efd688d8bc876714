//! Fixed operational constants for the supported game build.

use std::time::Duration;

/// Image name of the game process the live locator attaches to.
pub const PROCESS_NAME: &str = "MonkeyIsland103.exe";

/// File the monitor writes the current count to for streaming overlays.
pub const DEFAULT_OUTPUT_FILE: &str = "grub_count.txt";

/// Interval between polls in monitor mode.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Interval between attach attempts while waiting for the game to start.
pub const ATTACH_RETRY_INTERVAL: Duration = Duration::from_secs(1);
