use std::io;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::HumanCount;
use log::{LevelFilter, debug, info};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use time::macros::format_description;

use dupesweep::pool::AdmissionGate;
use dupesweep::{Cli, actions, duplicates, scanner, utils};

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    init_logging(&cli)?;

    info!("Starting dupesweep v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);

    let root = cli
        .path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", cli.path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }
    info!("Target directory: '{}'", root.display());

    let capacity = cli
        .workers
        .unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1);
    // One pool thread per admission slot, so a full gate is also a full pool.
    rayon::ThreadPoolBuilder::new()
        .num_threads(capacity)
        .build_global()
        .context("Failed to build the hashing thread pool")?;

    println!("Scanning files...");
    let gate = AdmissionGate::new(capacity);
    let (file_map, summary) = scanner::scan(&root, &gate)?;

    println!("Scanning completed.");
    info!(
        "Hashed {} of {} files ({}), {} failures, in {}",
        HumanCount(summary.hashed),
        HumanCount(summary.discovered),
        utils::format_size(summary.total_bytes),
        summary.failed,
        utils::format_human_elapsed(start_time.elapsed()),
    );

    if let Some(report) = cli.json.as_deref() {
        duplicates::write_json_report(&file_map, report)?;
    }

    let totals = duplicates::stats(&file_map);
    if totals.groups == 0 {
        println!("{}", "No duplicate files found!".green());
        return Ok(());
    }
    println!(
        "Found {} duplicate files in {} groups, {} reclaimable",
        HumanCount(totals.redundant_files).to_string().yellow(),
        HumanCount(totals.groups),
        utils::format_size(totals.reclaimable_bytes).yellow(),
    );

    let stdin = io::stdin();
    actions::run_action_loop(&file_map, &mut stdin.lock())?;
    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = ConfigBuilder::new();
    builder.set_time_format_custom(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));
    // UTC timestamps when the local offset cannot be determined.
    let config = match builder.set_time_offset_to_local() {
        Ok(builder) => builder.build(),
        Err(builder) => builder.build(),
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = &cli.log_file {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        loggers.push(WriteLogger::new(level, config, file));
    }
    CombinedLogger::init(loggers).context("Failed to initialize logging")?;
    Ok(())
}
