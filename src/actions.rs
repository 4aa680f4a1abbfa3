use std::ffi::OsStr;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};

use crate::aggregator::FileMap;
use crate::duplicates;
use crate::utils::normalize_path;

/// Interactive dispatch over the finished scan.
///
/// Loops until the user picks `i` (or input ends), so listing can be
/// followed by a move or delete in the same session. Prompt input comes
/// through `input` rather than straight from stdin so tests can script it.
pub fn run_action_loop(file_map: &FileMap, input: &mut impl BufRead) -> Result<()> {
    loop {
        print!("Do you want to list, move, delete, or ignore the duplicates? (l/m/d/i): ");
        io::stdout().flush()?;

        let Some(choice) = read_trimmed_line(input)? else {
            break;
        };
        match choice.to_lowercase().as_str() {
            "l" => duplicates::print_results(file_map),
            "m" => move_duplicates(file_map, input)?,
            "d" => delete_duplicates(file_map, input)?,
            "i" => {
                println!("Duplicates will be ignored.");
                break;
            }
            _ => println!("Invalid choice."),
        }
    }
    Ok(())
}

/// Relocates every non-original member of every duplicate group into a
/// destination directory chosen at the prompt. Index 0 of each group is
/// never touched. A failure on one file is logged and the rest continue.
pub fn move_duplicates(file_map: &FileMap, input: &mut impl BufRead) -> Result<()> {
    if !confirm("Are you sure you want to move duplicated files?", input)? {
        println!("Move operation canceled.");
        return Ok(());
    }

    print!("Enter the destination path to move duplicated files: ");
    io::stdout().flush()?;
    let Some(raw) = read_trimmed_line(input)? else {
        println!("Move operation canceled.");
        return Ok(());
    };
    if raw.is_empty() {
        println!("Move operation canceled.");
        return Ok(());
    }

    let destination = PathBuf::from(normalize_path(&raw));
    // An unusable destination cancels the move but not the session; the
    // user is back at the action prompt and can try again.
    if let Err(err) = fs::create_dir_all(&destination) {
        error!(
            "Failed to create destination directory '{}': {}",
            destination.display(),
            err
        );
        return Ok(());
    }

    let mut moved = 0u64;
    for group in file_map.values().filter(|group| group.len() > 1) {
        for record in &group[1..] {
            let Some(file_name) = record.path.file_name() else {
                error!("Skipping '{}': no file name", record.path.display());
                continue;
            };
            let dest = unique_destination(&destination, file_name);
            match relocate_file(&record.path, &dest) {
                Ok(()) => {
                    moved += 1;
                    println!(
                        "Moved file {} to {}",
                        record.path.display(),
                        dest.display()
                    );
                }
                Err(err) => {
                    error!(
                        "Failed to move '{}' to '{}': {}",
                        record.path.display(),
                        dest.display(),
                        err
                    );
                }
            }
        }
    }

    info!("Moved {} duplicate files to {}", moved, destination.display());
    Ok(())
}

/// Removes every non-original member of every duplicate group.
pub fn delete_duplicates(file_map: &FileMap, input: &mut impl BufRead) -> Result<()> {
    if !confirm("Are you sure you want to delete duplicated files?", input)? {
        println!("Deletion canceled.");
        return Ok(());
    }

    let mut deleted = 0u64;
    for group in file_map.values().filter(|group| group.len() > 1) {
        for record in &group[1..] {
            match fs::remove_file(&record.path) {
                Ok(()) => {
                    deleted += 1;
                    println!("Deleted file: {}", record.path.display());
                }
                Err(err) => {
                    error!("Failed to delete '{}': {}", record.path.display(), err);
                }
            }
        }
    }

    info!("Deleted {} duplicate files", deleted);
    Ok(())
}

/// Moves `src` to `dest`, preferring an atomic rename. Only a genuine
/// cross-device error falls back to copy-then-delete; if the copy fails the
/// partial destination is removed and the source is left intact.
fn relocate_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(err) if is_cross_device_error(&err) => match fs::copy(src, dest) {
            Ok(_) => fs::remove_file(src),
            Err(copy_err) => {
                let _ = fs::remove_file(dest);
                Err(copy_err)
            }
        },
        Err(err) => Err(err),
    }
}

fn is_cross_device_error(err: &io::Error) -> bool {
    match err.raw_os_error() {
        Some(18) => true, // POSIX EXDEV
        Some(17) => true, // Windows ERROR_NOT_SAME_DEVICE
        _ => false,
    }
}

/// Picks a destination name that does not collide with anything already in
/// `dir`: `name.ext`, then `name(1).ext`, `name(2).ext`, ...
fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .unwrap_or(file_name)
        .to_string_lossy()
        .into_owned();
    let ext = name.extension().map(|ext| ext.to_string_lossy().into_owned());

    let mut counter = 1;
    loop {
        let next = match &ext {
            Some(ext) => dir.join(format!("{stem}({counter}).{ext}")),
            None => dir.join(format!("{stem}({counter})")),
        };
        if !next.exists() {
            return next;
        }
        counter += 1;
    }
}

fn confirm(prompt: &str, input: &mut impl BufRead) -> Result<bool> {
    print!("{prompt} (yes/no): ");
    io::stdout().flush()?;
    Ok(matches!(
        read_trimmed_line(input)?,
        Some(line) if line.eq_ignore_ascii_case("yes")
    ))
}

/// `Ok(None)` on end of input.
fn read_trimmed_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input
        .read_line(&mut line)
        .context("Failed to read from input")?
        == 0
    {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
