use std::fs;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossbeam::channel::Receiver;
use log::{debug, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

mod cli;
mod collectors;
mod constants;
mod engine;
mod error;
mod manifest;
mod models;
mod resolve;
mod utils;

use cli::{Args, Commands};
use engine::{CancelFlag, CollectionEvent, Orchestrator, RunContext, RunOptions, RunState};
use manifest::FileManifestSource;
use models::CollectionResult;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd);
    }

    let manifest_path = args.manifest.clone().ok_or_else(|| {
        anyhow!("no manifest given; pass a manifest path or run `odc-collector sample-manifest`")
    })?;

    info!("Starting diagnostic data collection");

    let options = build_run_options(&args);
    let archive_dir = options.archive_dir.clone();
    fs::create_dir_all(&archive_dir).with_context(|| {
        format!("Failed to create output directory {}", archive_dir.display())
    })?;

    let (ctx, events) = RunContext::new();
    install_cancel_handler(ctx.cancel.clone())?;

    let worker = Orchestrator::new(options)
        .spawn(FileManifestSource::new(manifest_path), ctx)
        .context("Failed to start collection worker")?;

    drain_events(events);

    let result = worker
        .join()
        .map_err(|_| anyhow!("collection worker panicked"))?;

    report_outcome(&result);

    if args.report {
        let summary_path = utils::summary::write_run_summary(&result, &archive_dir)?;
        info!("Run summary: {}", summary_path.display());
    }

    if let Some(reason) = &result.failure {
        return Err(anyhow!("collection failed: {reason}"));
    }

    info!("Collection finished");
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Handle subcommands (sample-manifest)
fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::SampleManifest { path } => {
            manifest::write_sample_manifest(path)?;
            info!("Edit it, then run: odc-collector {}", path.display());
            Ok(())
        }
    }
}

fn build_run_options(args: &Args) -> RunOptions {
    let mut options = RunOptions::default();
    if let Some(output) = &args.output {
        options.archive_dir = output.clone();
    }
    options
}

/// Route Ctrl-C onto the run's cancel flag; the run then stops between
/// items and still cleans up its staging area.
fn install_cancel_handler(cancel: CancelFlag) -> Result<()> {
    ctrlc::set_handler(move || {
        warn!("Cancellation requested; stopping after the current item");
        cancel.cancel();
    })
    .context("Failed to install Ctrl-C handler")
}

/// Log worker events until the run ends and the channel closes.
fn drain_events(events: Receiver<CollectionEvent>) {
    let mut state = RunState::Idle;
    for event in events.iter() {
        match event {
            CollectionEvent::Message(text) => info!("{text}"),
            CollectionEvent::PackageStarted { id, index, total } => {
                info!("[{}/{}] collecting package '{}'", index + 1, total, id);
            }
            CollectionEvent::PackageFinished { id, .. } => {
                debug!("package '{id}' finished");
            }
            CollectionEvent::Progress(value) => debug!("progress: {value}%"),
            CollectionEvent::State(next) => {
                debug!("state: {state} -> {next}");
                state = next;
            }
        }
    }
}

/// Summarize the run on the console: per-package counts, every recorded
/// error, and the archive location and size.
fn report_outcome(result: &CollectionResult) {
    for (id, report) in &result.packages {
        info!(
            "package '{}': {} file(s), {} registry key(s), {} event log(s), {} command(s), {} error(s)",
            id,
            report.files_collected,
            report.registries_collected,
            report.event_logs_collected,
            report.commands_collected,
            report.errors.len()
        );
        for error in &report.errors {
            warn!("{error}");
        }
    }

    info!(
        "Collected {} item(s) across {} package(s), {} error(s)",
        result.total_collected(),
        result.packages.len(),
        result.total_errors()
    );

    if result.cancelled {
        warn!("Collection was cancelled; no archive was produced");
    }
    if let Some(path) = &result.archive_path {
        let size_mb = fs::metadata(path)
            .map(|meta| meta.len() as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0);
        info!("Archive: {} ({size_mb:.2} MB)", path.display());
    }
}
