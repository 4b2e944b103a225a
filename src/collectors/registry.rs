//! Registry key export through an external tool.
//!
//! Keys are exported by invoking the configured tool (`reg` by default) as
//! `<tool> export <key> <destination> /y`, so behavior matches what an
//! operator would get by hand and the tool can be swapped for testing.

use std::fs;

use log::{debug, warn};

use crate::constants::REGISTRY_OUTPUT_EXTENSION;
use crate::error::{ActionKind, CollectionError};
use crate::manifest::RegistryAction;
use crate::utils::exec::run_with_timeout;

use super::{PackageContext, Tally};

pub fn export(action: &RegistryAction, ctx: &PackageContext) -> Tally {
    let mut tally = Tally::default();
    if ctx.cancel.is_cancelled() {
        debug!("cancellation requested, skipping registry export");
        return tally;
    }

    let file_name = format!("{}.{}", action.output_name, REGISTRY_OUTPUT_EXTENSION);
    let dest = ctx.destination(ActionKind::Registries, &action.team, &file_name);
    if let Some(parent) = dest.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Registries,
                &action.key_path,
                format!("failed to create {}: {err}", parent.display()),
            ));
            return tally;
        }
    }

    let dest_str = dest.to_string_lossy();
    let args = [
        "export",
        action.key_path.as_str(),
        dest_str.as_ref(),
        "/y",
    ];
    match run_with_timeout(ctx.registry_tool, &args, ctx.command_timeout) {
        Ok(outcome) if outcome.success() => {
            debug!("exported {} -> {}", action.key_path, dest.display());
            tally.collected += 1;
        }
        Ok(outcome) => {
            // A partial file from a failed export is noise, not evidence.
            let _ = fs::remove_file(&dest);
            let detail = if outcome.timed_out {
                format!("timed out after {}s", ctx.command_timeout.as_secs())
            } else {
                let code = outcome
                    .exit_code
                    .map_or_else(|| "signal".to_string(), |code| code.to_string());
                let stderr = outcome.stderr.trim();
                if stderr.is_empty() {
                    format!("{} exited with status {code}", ctx.registry_tool)
                } else {
                    format!("{} exited with status {code}: {stderr}", ctx.registry_tool)
                }
            };
            warn!("registry export of {} failed: {detail}", action.key_path);
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Registries,
                &action.key_path,
                detail,
            ));
        }
        Err(err) => {
            warn!(
                "could not launch {} for {}: {err}",
                ctx.registry_tool, action.key_path
            );
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Registries,
                &action.key_path,
                format!("failed to launch {}: {err}", ctx.registry_tool),
            ));
        }
    }

    tally
}
