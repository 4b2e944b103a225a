//! Command execution with captured output.
//!
//! Each command runs from a throwaway script file rather than an inline
//! argument, so multi-line bodies, quoting, and shell builtins all behave
//! the way they would in an operator's own terminal. Shell commands get a
//! wrapper that invokes the named program directly when it resolves and
//! falls back to full shell evaluation otherwise; batch commands run
//! verbatim as a native script.

use std::fs;
use std::io;
use std::path::Path;

use log::{debug, warn};
use tempfile::TempDir;

use crate::error::{ActionKind, CollectionError};
use crate::manifest::{CommandAction, CommandKind, CommandOutput};
use crate::utils::exec::run_with_timeout;

use super::{PackageContext, Tally};

pub fn run(action: &CommandAction, ctx: &PackageContext) -> Tally {
    let mut tally = Tally::default();
    if ctx.cancel.is_cancelled() {
        debug!("cancellation requested, skipping command '{}'", action.text);
        return tally;
    }

    let scripts = match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => {
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Commands,
                &action.text,
                format!("failed to create script directory: {err}"),
            ));
            return tally;
        }
    };
    let invocation = match prepare_script(scripts.path(), action) {
        Ok(invocation) => invocation,
        Err(err) => {
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Commands,
                &action.text,
                format!("failed to write script: {err}"),
            ));
            return tally;
        }
    };

    let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
    match run_with_timeout(&invocation.program, &args, ctx.command_timeout) {
        Err(err) => {
            warn!("could not launch '{}': {err}", action.text);
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Commands,
                &action.text,
                format!("failed to launch {}: {err}", invocation.program),
            ));
        }
        Ok(outcome) if outcome.timed_out => {
            warn!(
                "command '{}' timed out after {}s",
                action.text,
                ctx.command_timeout.as_secs()
            );
            tally.errors.push(CollectionError::new(
                ctx.package_id,
                ActionKind::Commands,
                &action.text,
                format!("timed out after {}s", ctx.command_timeout.as_secs()),
            ));
        }
        Ok(outcome) => {
            // A non-zero exit is still a result; the captured output is
            // the artifact either way.
            if !outcome.success() {
                debug!(
                    "command '{}' exited with status {:?}",
                    action.text, outcome.exit_code
                );
            }
            match &action.output {
                CommandOutput::Skip => {
                    debug!("output of '{}' discarded as requested", action.text);
                }
                CommandOutput::Named(name) => {
                    let file_name = format!("{name}.txt");
                    let dest = ctx.destination(ActionKind::Commands, &action.team, &file_name);
                    match write_output(&dest, &outcome.combined_output()) {
                        Ok(()) => {
                            debug!("captured '{}' -> {}", action.text, dest.display());
                            tally.collected += 1;
                        }
                        Err(err) => {
                            tally.errors.push(CollectionError::new(
                                ctx.package_id,
                                ActionKind::Commands,
                                &action.text,
                                format!("failed to write {}: {err}", dest.display()),
                            ));
                        }
                    }
                }
            }
        }
    }

    tally
}

struct Invocation {
    program: String,
    args: Vec<String>,
}

fn write_output(dest: &Path, output: &str) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, output)
}

#[cfg(not(windows))]
fn prepare_script(dir: &Path, action: &CommandAction) -> io::Result<Invocation> {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("command.sh");
    let body = match action.kind {
        CommandKind::Shell => shell_wrapper_sh(&action.text),
        CommandKind::BatchShell => action.text.clone(),
    };
    fs::write(&script, body)?;
    fs::set_permissions(&script, fs::Permissions::from_mode(0o700))?;
    Ok(Invocation {
        program: "sh".to_string(),
        args: vec![script.to_string_lossy().into_owned()],
    })
}

#[cfg(windows)]
fn prepare_script(dir: &Path, action: &CommandAction) -> io::Result<Invocation> {
    let invocation = match action.kind {
        CommandKind::Shell => {
            let script = dir.join("command.ps1");
            fs::write(&script, shell_wrapper_ps(&action.text))?;
            Invocation {
                program: "powershell".to_string(),
                args: vec![
                    "-NoProfile".to_string(),
                    "-ExecutionPolicy".to_string(),
                    "Bypass".to_string(),
                    "-File".to_string(),
                    script.to_string_lossy().into_owned(),
                ],
            }
        }
        CommandKind::BatchShell => {
            let script = dir.join("command.cmd");
            fs::write(&script, &action.text)?;
            Invocation {
                program: "cmd".to_string(),
                args: vec!["/C".to_string(), script.to_string_lossy().into_owned()],
            }
        }
    };
    Ok(invocation)
}

/// Wraps a shell command so stderr merges into stdout in real order and
/// command lines whose first token is not a resolvable program (variable
/// assignments, pipelines of builtins) still evaluate.
#[cfg(not(windows))]
fn shell_wrapper_sh(text: &str) -> String {
    let first = text.split_whitespace().next().unwrap_or_default();
    format!(
        "#!/bin/sh\nexec 2>&1\nif command -v {} >/dev/null 2>&1; then\n{}\nelse\neval {}\nfi\n",
        sh_single_quote(first),
        text,
        sh_single_quote(text),
    )
}

#[cfg(not(windows))]
fn sh_single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(windows)]
fn shell_wrapper_ps(text: &str) -> String {
    let quoted = text.replace('\'', "''");
    format!(
        "$command = '{quoted}'\n\
         $parts = $command -split '\\s+'\n\
         if (Get-Command $parts[0] -ErrorAction SilentlyContinue) {{\n\
             & $parts[0] @($parts | Select-Object -Skip 1) 2>&1\n\
         }} else {{\n\
             Invoke-Expression $command 2>&1\n\
         }}\n"
    )
}
