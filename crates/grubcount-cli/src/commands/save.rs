//! Save command: decode one file or scan a directory of saves.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Serialize;

use grubcount_core::read_grub_count;

#[derive(Serialize)]
struct SaveEntry {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(file: Option<&Path>, dir: Option<&Path>, json: bool) -> Result<()> {
    if let Some(path) = file {
        let count = read_grub_count(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if json {
            let entry = SaveEntry {
                file: path.display().to_string(),
                count: Some(count),
                error: None,
            };
            println!("{}", serde_json::to_string_pretty(&entry)?);
        } else {
            println!("Grub Count: {count}");
        }
        return Ok(());
    }

    let savedir = match dir {
        Some(d) => d.to_path_buf(),
        None => default_save_dir()
            .context("could not resolve the default save directory; use --dir")?,
    };

    let mut saves = list_save_files(&savedir)?;
    if saves.is_empty() {
        bail!("no .save files found in {}", savedir.display());
    }
    // Later chapters sort later by file name; show the newest first.
    saves.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let entries: Vec<SaveEntry> = saves
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned();
            match read_grub_count(path) {
                Ok(count) => SaveEntry {
                    file: name,
                    count: Some(count),
                    error: None,
                },
                Err(e) => SaveEntry {
                    file: name,
                    count: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{:<30} {:>40}", "File", "Grub Count");
    println!("{}", "-".repeat(71));
    for entry in &entries {
        match (entry.count, &entry.error) {
            (Some(count), _) => println!("{:<30} {:>40}", entry.file, count),
            (None, Some(error)) => println!("{:<30} {:>40}", entry.file, error),
            (None, None) => {}
        }
    }

    Ok(())
}

fn list_save_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut saves = Vec::new();
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("save"))
        {
            saves.push(path);
        }
    }
    Ok(saves)
}

/// The game's documents save folder.
fn default_save_dir() -> Option<PathBuf> {
    dirs::document_dir().map(|docs| {
        docs.join("Telltale Games")
            .join("Tales of Monkey Island 3")
    })
}
