//! Collection run orchestration.
//!
//! A run walks a fixed lifecycle: prepare the staging area, load the
//! manifest, collect each package in document order, archive the staging
//! tree, and clean up. The worker reports state changes, progress, and
//! per-package milestones through its [`RunContext`]; the host observes
//! them on the paired receiver and can request cancellation at any time.
//!
//! Per-action failures are recorded in the run's [`CollectionResult`] and
//! never abort the run. Only three things end a run early: a staging area
//! that cannot be prepared, a manifest that cannot be loaded, and an
//! archive that cannot be written.

mod context;

pub use context::{CancelFlag, CollectionEvent, RunContext};

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use log::{debug, info, warn};

use crate::collectors::{commands, event_logs, files, registry, PackageContext};
use crate::constants::{
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_REGISTRY_TOOL, PROGRESS_COMPLETE,
    PROGRESS_MANIFEST_READY, PROGRESS_PACKAGES_DONE, PROGRESS_STAGING_READY, STAGING_DIR_NAME,
};
use crate::error::ActionKind;
use crate::manifest::{parse, Manifest, ManifestSource, Package};
use crate::models::CollectionResult;
use crate::utils::archive::archive_staging;

/// Lifecycle states of a collection run, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Preparing,
    RunningPackages,
    Archiving,
    Finished(RunOutcome),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Preparing => write!(f, "preparing"),
            RunState::RunningPackages => write!(f, "running packages"),
            RunState::Archiving => write!(f, "archiving"),
            RunState::Finished(outcome) => write!(f, "finished ({outcome})"),
        }
    }
}

/// How a finished run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Cancelled,
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success => write!(f, "success"),
            RunOutcome::Cancelled => write!(f, "cancelled"),
            RunOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Tunables for a collection run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory that receives the final archive; staging lives beneath it.
    pub archive_dir: PathBuf,
    /// Host identifier for output names; detected when `None`.
    pub host_id: Option<String>,
    /// Deadline for each external command and registry export.
    pub command_timeout: Duration,
    /// Program invoked as `<tool> export <key> <file> /y`.
    pub registry_tool: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            archive_dir: std::env::temp_dir().join("odc-collector"),
            host_id: None,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            registry_tool: DEFAULT_REGISTRY_TOOL.to_string(),
        }
    }
}

/// Drives one collection run from manifest to archive.
pub struct Orchestrator {
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Runs the collection on a dedicated worker thread.
    ///
    /// The returned handle yields the final [`CollectionResult`]; events
    /// arrive on the receiver paired with `ctx` while the run executes.
    pub fn spawn(
        self,
        source: impl ManifestSource + Send + 'static,
        ctx: RunContext,
    ) -> io::Result<JoinHandle<CollectionResult>> {
        thread::Builder::new()
            .name("collection-worker".to_string())
            .spawn(move || self.run(&source, &ctx))
    }

    /// Runs the collection on the calling thread.
    pub fn run(&self, source: &dyn ManifestSource, ctx: &RunContext) -> CollectionResult {
        let started_at = Utc::now();
        let host_id = self.resolve_host_id();
        let mut result = CollectionResult::new(&host_id, &started_at);
        let staging_root = self.options.archive_dir.join(STAGING_DIR_NAME);

        transition(ctx, RunState::Preparing);
        ctx.emit_message(format!("Starting collection on {host_id}"));

        if let Err(err) = prepare_staging(&staging_root) {
            return self.finish(
                ctx,
                result,
                RunOutcome::Failed,
                Some(format!("{err:#}")),
                &staging_root,
            );
        }
        let mut progress = bump_progress(ctx, 0, PROGRESS_STAGING_READY);

        let manifest = match load_manifest(source) {
            Ok(manifest) => manifest,
            Err(err) => {
                return self.finish(
                    ctx,
                    result,
                    RunOutcome::Failed,
                    Some(format!("{err:#}")),
                    &staging_root,
                );
            }
        };
        progress = bump_progress(ctx, progress, PROGRESS_MANIFEST_READY);
        ctx.emit_message(format!(
            "Loaded manifest from {}: {} package(s)",
            source.origin(),
            manifest.packages.len()
        ));

        transition(ctx, RunState::RunningPackages);
        if ctx.cancel.is_cancelled() {
            result.cancelled = true;
            return self.finish(ctx, result, RunOutcome::Cancelled, None, &staging_root);
        }

        let total = manifest.packages.len();
        for (index, package) in manifest.packages.iter().enumerate() {
            ctx.emit(CollectionEvent::PackageStarted {
                id: package.id.clone(),
                index,
                total,
            });
            self.collect_package(package, &staging_root, &host_id, ctx, &mut result);
            ctx.emit(CollectionEvent::PackageFinished {
                id: package.id.clone(),
                index,
                total,
            });
            progress = bump_progress(ctx, progress, package_progress(index + 1, total));

            if ctx.cancel.is_cancelled() {
                result.cancelled = true;
                return self.finish(ctx, result, RunOutcome::Cancelled, None, &staging_root);
            }
        }

        transition(ctx, RunState::Archiving);
        progress = bump_progress(ctx, progress, PROGRESS_PACKAGES_DONE);
        ctx.emit_message("Archiving collected data");
        match archive_staging(&staging_root, &self.options.archive_dir, &host_id, &started_at) {
            Ok(path) => {
                info!("archive written to {}", path.display());
                result.archive_path = Some(path);
                bump_progress(ctx, progress, PROGRESS_COMPLETE);
                self.finish(ctx, result, RunOutcome::Success, None, &staging_root)
            }
            Err(err) => self.finish(
                ctx,
                result,
                RunOutcome::Failed,
                Some(format!("failed to archive collected data: {err}")),
                &staging_root,
            ),
        }
    }

    fn collect_package(
        &self,
        package: &Package,
        staging_root: &Path,
        host_id: &str,
        ctx: &RunContext,
        result: &mut CollectionResult,
    ) {
        info!(
            "collecting package '{}': {} action(s)",
            package.id,
            package.actions.len()
        );
        let pkg_ctx = PackageContext {
            staging_root,
            package_id: &package.id,
            host_id,
            cancel: &ctx.cancel,
            command_timeout: self.options.command_timeout,
            registry_tool: &self.options.registry_tool,
        };
        let report = result.packages.entry(package.id.clone()).or_default();

        for action in &package.actions.files {
            let tally = files::collect(action, &pkg_ctx);
            report.add(ActionKind::Files, tally.collected, tally.errors);
        }
        for action in &package.actions.registries {
            let tally = registry::export(action, &pkg_ctx);
            report.add(ActionKind::Registries, tally.collected, tally.errors);
        }
        for action in &package.actions.event_logs {
            let tally = event_logs::collect(action, &pkg_ctx);
            report.add(ActionKind::EventLogs, tally.collected, tally.errors);
        }
        for action in &package.actions.commands {
            let tally = commands::run(action, &pkg_ctx);
            report.add(ActionKind::Commands, tally.collected, tally.errors);
        }
    }

    /// Settles the run: records any failure, removes staging, and emits the
    /// terminal state. Staging is removed on every path out of a run.
    fn finish(
        &self,
        ctx: &RunContext,
        mut result: CollectionResult,
        outcome: RunOutcome,
        failure: Option<String>,
        staging_root: &Path,
    ) -> CollectionResult {
        if let Some(reason) = failure {
            warn!("collection failed: {reason}");
            result.failure = Some(reason);
        }
        remove_staging(staging_root);
        transition(ctx, RunState::Finished(outcome));
        result
    }

    fn resolve_host_id(&self) -> String {
        if let Some(host) = &self.options.host_id {
            return host.clone();
        }
        match hostname::get() {
            Ok(name) => name.to_string_lossy().into_owned(),
            Err(err) => {
                warn!("could not determine hostname: {err}");
                "unknown-host".to_string()
            }
        }
    }
}

fn transition(ctx: &RunContext, state: RunState) {
    debug!("run state: {state}");
    ctx.emit(CollectionEvent::State(state));
}

/// Emits `target` if it advances the bar; progress never moves backwards.
fn bump_progress(ctx: &RunContext, current: u8, target: u8) -> u8 {
    if target > current {
        ctx.emit(CollectionEvent::Progress(target));
        target
    } else {
        current
    }
}

/// Progress after `done` of `total` packages, spread evenly across the
/// package phase of the bar.
fn package_progress(done: usize, total: usize) -> u8 {
    let span = (PROGRESS_PACKAGES_DONE - PROGRESS_MANIFEST_READY) as usize;
    PROGRESS_MANIFEST_READY + (span * done / total) as u8
}

/// Clears out any leftovers from an earlier run and creates a fresh
/// staging directory.
fn prepare_staging(staging_root: &Path) -> anyhow::Result<()> {
    if staging_root.exists() {
        debug!("removing stale staging area {}", staging_root.display());
        fs::remove_dir_all(staging_root).with_context(|| {
            format!("Failed to clear stale staging at {}", staging_root.display())
        })?;
    }
    fs::create_dir_all(staging_root)
        .with_context(|| format!("Failed to create staging at {}", staging_root.display()))?;
    Ok(())
}

fn remove_staging(staging_root: &Path) {
    if !staging_root.exists() {
        return;
    }
    if let Err(err) = fs::remove_dir_all(staging_root) {
        warn!(
            "could not remove staging area {}: {err}",
            staging_root.display()
        );
    }
}

fn load_manifest(source: &dyn ManifestSource) -> anyhow::Result<Manifest> {
    let bytes = source
        .fetch()
        .with_context(|| format!("Failed to fetch manifest from {}", source.origin()))?;
    let manifest = parse(&bytes)
        .with_context(|| format!("Failed to parse manifest from {}", source.origin()))?;
    Ok(manifest)
}
