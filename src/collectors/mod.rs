//! Action executors.
//!
//! One executor per action group, all writing into the same staging layout:
//!
//! ```text
//! <staging>/
//! └── <package id>/
//!     ├── Files/<team>/<host>_<file name>
//!     ├── RegistryKeys/<team>/<host>_<output>.txt
//!     ├── EventLogs/<team>/<host>_<file name>
//!     └── Commands/<team>/<host>_<output>.txt
//! ```
//!
//! Executors check the cancellation flag before each sub-item and return
//! partial tallies when asked to stop. Per-action failures are recorded,
//! never raised: one broken path or dead command must not cost the rest of
//! the collection.

/// Command execution through wrapper scripts
pub mod commands;

/// Event log file collection
pub mod event_logs;

/// File collection by path pattern
pub mod files;

/// Registry export through the system registry tool
pub mod registry;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::CancelFlag;
use crate::error::{ActionKind, CollectionError};

/// Counts and errors from running one group of actions.
#[derive(Debug, Default)]
pub struct Tally {
    pub collected: usize,
    pub errors: Vec<CollectionError>,
}

/// Everything an executor needs to place outputs for one package.
#[derive(Debug)]
pub struct PackageContext<'a> {
    pub staging_root: &'a Path,
    pub package_id: &'a str,
    pub host_id: &'a str,
    pub cancel: &'a CancelFlag,
    pub command_timeout: Duration,
    pub registry_tool: &'a str,
}

impl PackageContext<'_> {
    /// Destination for one output file:
    /// `<staging>/<package>/<kind dir>/<team>/<host>_<name>`.
    pub fn destination(&self, kind: ActionKind, team: &str, file_name: &str) -> PathBuf {
        self.staging_root
            .join(self.package_id)
            .join(kind.dir_name())
            .join(team)
            .join(format!("{}_{}", self.host_id, file_name))
    }
}
