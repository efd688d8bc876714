use std::path::PathBuf;

use clap::{Parser, Subcommand};
use grubcount_core::config::DEFAULT_OUTPUT_FILE;

#[derive(Parser)]
#[command(
    name = "grubcount",
    version,
    about = "Read the Tales of Monkey Island 3 grub counter from save files or the running game"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read the counter from .save files
    Save {
        /// Read a specific .save file instead of scanning a directory
        file: Option<PathBuf>,

        /// Directory to scan for .save files (default: the game's save folder)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Emit the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch the running game and stream the counter to a text file
    Monitor {
        /// File the current count is written to
        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        output: PathBuf,

        /// Print the count once and exit (no file written)
        #[arg(long)]
        once: bool,

        /// Print every candidate node found by a scan
        #[arg(long)]
        verbose: bool,
    },
}
