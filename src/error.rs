//! Error types shared across the collector.
//!
//! Manifest and archive problems abort a run and surface as typed errors;
//! problems with individual actions are recorded as [`CollectionError`]
//! values inside the run report and never abort the run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    COMMANDS_DIR_NAME, EVENT_LOGS_DIR_NAME, FILES_DIR_NAME, REGISTRY_DIR_NAME,
};

/// Fatal problems encountered while decoding or parsing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("manifest contains no root element")]
    Empty,
    #[error("malformed manifest XML: {0}")]
    Malformed(String),
    #[error("bad manifest attribute: {0}")]
    Attributes(#[from] quick_xml::events::attributes::AttrError),
    #[error("unknown command type '{0}' in manifest (expected PS or CMD)")]
    UnknownCommandKind(String),
}

impl From<quick_xml::Error> for ManifestError {
    fn from(err: quick_xml::Error) -> Self {
        ManifestError::Malformed(err.to_string())
    }
}

/// Fatal problems encountered while writing the final archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("archive write error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// The four action groups a package can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    Files,
    Registries,
    EventLogs,
    Commands,
}

impl ActionKind {
    /// Staging sub-folder that outputs of this kind land in.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ActionKind::Files => FILES_DIR_NAME,
            ActionKind::Registries => REGISTRY_DIR_NAME,
            ActionKind::EventLogs => EVENT_LOGS_DIR_NAME,
            ActionKind::Commands => COMMANDS_DIR_NAME,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActionKind::Files => "file",
            ActionKind::Registries => "registry",
            ActionKind::EventLogs => "event log",
            ActionKind::Commands => "command",
        };
        write!(f, "{label}")
    }
}

/// A non-fatal failure recorded against a single action.
///
/// The run keeps going after one of these; they end up in the per-package
/// report and the JSON summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind} action '{subject}' in package '{package}': {detail}")]
pub struct CollectionError {
    pub package: String,
    pub kind: ActionKind,
    pub subject: String,
    pub detail: String,
}

impl CollectionError {
    pub fn new(
        package: &str,
        kind: ActionKind,
        subject: impl Into<String>,
        detail: impl ToString,
    ) -> Self {
        Self {
            package: package.to_string(),
            kind,
            subject: subject.into(),
            detail: detail.to_string(),
        }
    }
}
