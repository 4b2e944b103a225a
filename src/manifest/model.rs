//! Data model for parsed collection manifests.
//!
//! Values of these types are already normalized: teams are defaulted and
//! made path-safe, registry keys have trailing wildcards stripped, and every
//! output name is a usable file name.

use crate::constants::{DEFAULT_TEAM, FALLBACK_OUTPUT_NAME};
use crate::error::ManifestError;

/// A parsed manifest: zero or more packages in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub packages: Vec<Package>,
}

/// One named unit of collection work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: String,
    pub actions: ActionSet,
}

/// The four action groups a package may carry, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSet {
    pub files: Vec<FileAction>,
    pub registries: Vec<RegistryAction>,
    pub event_logs: Vec<EventLogAction>,
    pub commands: Vec<CommandAction>,
}

impl ActionSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.registries.is_empty()
            && self.event_logs.is_empty()
            && self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.registries.len() + self.event_logs.len() + self.commands.len()
    }
}

/// Copy every existing file matching a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAction {
    pub path_pattern: String,
    pub team: String,
}

/// Copy event log files matching a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogAction {
    pub path_pattern: String,
    pub team: String,
}

/// Export one registry key through the external registry tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAction {
    pub key_path: String,
    pub team: String,
    pub output_name: String,
}

/// Run one command line and capture its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAction {
    pub text: String,
    pub kind: CommandKind,
    pub team: String,
    pub output: CommandOutput,
}

/// How a command's text is handed to the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Run through the shell wrapper (manifest attribute `PS`, the default).
    Shell,
    /// Run verbatim as a native batch script (manifest attribute `CMD`).
    BatchShell,
}

impl CommandKind {
    /// Maps a manifest `Type` attribute onto a kind.
    ///
    /// Matching is case-insensitive; a missing or empty attribute means
    /// [`CommandKind::Shell`]. Anything else fails the whole parse.
    pub(crate) fn from_manifest_attr(value: &str) -> Result<Self, ManifestError> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("ps") {
            Ok(CommandKind::Shell)
        } else if value.eq_ignore_ascii_case("cmd") {
            Ok(CommandKind::BatchShell)
        } else {
            Err(ManifestError::UnknownCommandKind(value.to_string()))
        }
    }
}

/// Where a command's captured output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Write the output under this file name.
    Named(String),
    /// Run the command but discard its output.
    Skip,
}

impl CommandOutput {
    pub fn is_skip(&self) -> bool {
        matches!(self, CommandOutput::Skip)
    }
}

/// Makes a string safe to use as a single file name.
///
/// Alphanumerics, dots, dashes, underscores and spaces pass through;
/// everything else becomes an underscore.
pub(crate) fn sanitize_output_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', ' ']).is_empty() {
        FALLBACK_OUTPUT_NAME.to_string()
    } else {
        cleaned
    }
}

/// Makes a package id or team usable as a single directory component.
pub(crate) fn sanitize_label(raw: &str) -> String {
    let cleaned = raw.trim().replace(['\\', '/', ':'], "_");
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Defaults and sanitizes a Team attribute.
pub(crate) fn normalize_team(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(team) if !team.is_empty() => sanitize_label(team),
        _ => DEFAULT_TEAM.to_string(),
    }
}

/// Drops a trailing `*` wildcard (and any separator left behind) from a
/// registry key path.
pub(crate) fn strip_trailing_wildcard(key: &str) -> &str {
    key.trim_end()
        .trim_end_matches('*')
        .trim_end_matches(['\\', '/'])
}

/// Derives the default output name for a registry export from its key path.
pub(crate) fn registry_output_name(key: &str) -> String {
    sanitize_output_name(&key.replace(['\\', '/', ':'], "_"))
}

/// Derives the default output name for a command from its first token.
pub(crate) fn command_output_name(text: &str) -> String {
    match text.split_whitespace().next() {
        Some(token) => sanitize_output_name(token),
        None => FALLBACK_OUTPUT_NAME.to_string(),
    }
}
