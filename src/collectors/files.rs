//! File collection by path pattern.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filetime::FileTime;
use log::{debug, warn};

use crate::error::{ActionKind, CollectionError};
use crate::manifest::FileAction;
use crate::resolve::resolve_pattern;

use super::{PackageContext, Tally};

/// Copies every existing file the action's pattern resolves to.
pub fn collect(action: &FileAction, ctx: &PackageContext) -> Tally {
    collect_matches(&action.path_pattern, &action.team, ActionKind::Files, ctx)
}

/// Shared engine for file-shaped collection, used by both the Files and
/// EventLogs groups. Matches that vanished or cannot be read are recorded;
/// a pattern with no matches records nothing at all.
pub(super) fn collect_matches(
    pattern: &str,
    team: &str,
    kind: ActionKind,
    ctx: &PackageContext,
) -> Tally {
    let mut tally = Tally::default();

    for source in resolve_pattern(pattern) {
        if ctx.cancel.is_cancelled() {
            debug!("cancellation requested, stopping {kind} collection");
            break;
        }
        match copy_into_staging(&source, kind, team, ctx) {
            Ok(dest) => {
                debug!("collected {} -> {}", source.display(), dest.display());
                tally.collected += 1;
            }
            Err(err) => {
                warn!("failed to collect {}: {err:#}", source.display());
                tally.errors.push(CollectionError::new(
                    ctx.package_id,
                    kind,
                    source.display().to_string(),
                    format!("{err:#}"),
                ));
            }
        }
    }

    tally
}

/// Copies one file into the staging layout, preserving its modification
/// time. An existing destination is overwritten.
fn copy_into_staging(
    source: &Path,
    kind: ActionKind,
    team: &str,
    ctx: &PackageContext,
) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let dest = ctx.destination(kind, team, &file_name);

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let metadata = fs::metadata(source)
        .with_context(|| format!("Failed to read metadata for {}", source.display()))?;
    fs::copy(source, &dest).with_context(|| {
        format!("Failed to copy {} to {}", source.display(), dest.display())
    })?;

    let mtime = FileTime::from_last_modification_time(&metadata);
    if let Err(err) = filetime::set_file_mtime(&dest, mtime) {
        debug!("could not preserve mtime on {}: {err}", dest.display());
    }

    Ok(dest)
}
