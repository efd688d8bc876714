mod cli;
mod commands;
mod shutdown;

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Command};
use grubcount_core::config::DEFAULT_OUTPUT_FILE;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("grubcount_cli=warn,grubcount_core=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match args.command {
        Some(Command::Save { file, dir, json }) => {
            commands::save::run(file.as_deref(), dir.as_deref(), json)
        }
        Some(Command::Monitor {
            output,
            once,
            verbose,
        }) => commands::monitor::run(&output, once, verbose),
        None => commands::monitor::run(Path::new(DEFAULT_OUTPUT_FILE), false, false),
    }
}
