//! Live monitor: attach to the game, poll the locator, stream the count.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use grubcount_core::config::{ATTACH_RETRY_INTERVAL, POLL_INTERVAL, PROCESS_NAME};
use grubcount_core::{Error, GrubLocator, ProcessHandle, ProcessMemory, StreamOutput};

use crate::shutdown::ShutdownSignal;

pub fn run(output: &Path, once: bool, verbose: bool) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        shutdown_ctrlc.trigger();
    })?;

    let mut waiting_reported = false;
    while !shutdown.is_shutdown() {
        match ProcessHandle::attach(PROCESS_NAME) {
            Ok(process) => {
                waiting_reported = false;
                println!("Attached to {} (pid {})", PROCESS_NAME, process.pid());

                let mut locator = GrubLocator::new(process);
                if verbose {
                    locator.set_observer(Box::new(|c| {
                        println!(
                            "  candidate: addr={:#010X}  value={:>6}  locality={}  neighbors={:08X?}",
                            c.addr, c.value, c.locality, c.neighbors
                        );
                    }));
                }

                if once {
                    match locator.poll() {
                        Ok(count) => println!("Grub Count: {count}"),
                        Err(Error::CounterNotFound) => {
                            println!("Count not found (game not in the grub chapter?)");
                        }
                        Err(e) => return Err(e.into()),
                    }
                    return Ok(());
                }

                println!(
                    "Counting grubs... writing to {} (Ctrl+C to stop)",
                    output.display()
                );
                let stream = StreamOutput::new(true, output);
                watch(&mut locator, &stream, &shutdown)?;

                if shutdown.is_shutdown() {
                    break;
                }
                println!("Game process ended. Waiting for it to restart...");
            }
            Err(Error::ProcessNotRunning(_)) => {
                if !waiting_reported {
                    println!("Waiting for {PROCESS_NAME} to be launched... (Ctrl+C to cancel)");
                    waiting_reported = true;
                }
            }
            Err(e) => return Err(e.into()),
        }

        if shutdown.wait(ATTACH_RETRY_INTERVAL) {
            break;
        }
    }

    Ok(())
}

/// Poll until shutdown or until the game exits; print and stream only when
/// the count changes.
fn watch(
    locator: &mut GrubLocator<ProcessHandle>,
    stream: &StreamOutput,
    shutdown: &ShutdownSignal,
) -> Result<()> {
    let mut last_written: Option<Option<u32>> = None;

    while !shutdown.is_shutdown() {
        if !locator.memory().is_alive() {
            return Ok(());
        }

        let current = match locator.poll() {
            Ok(count) => Some(count),
            Err(Error::CounterNotFound) => None,
            Err(Error::ProcessNotRunning(_)) => return Ok(()),
            Err(e) => {
                warn!("poll failed: {e}");
                None
            }
        };

        if last_written != Some(current) {
            match current {
                Some(count) => {
                    println!("Grub Count: {count}");
                    stream.write_count(count)?;
                }
                None => {
                    println!("Grub Count: ?");
                    stream.write_unknown()?;
                }
            }
            last_written = Some(current);
        }

        if shutdown.wait(POLL_INTERVAL) {
            break;
        }
    }

    Ok(())
}
