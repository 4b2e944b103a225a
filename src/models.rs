use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ActionKind, CollectionError};

/// Per-package tally of what was collected and what went wrong.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageReport {
    pub files_collected: usize,
    pub registries_collected: usize,
    pub event_logs_collected: usize,
    pub commands_collected: usize,
    pub errors: Vec<CollectionError>,
}

impl PackageReport {
    /// Folds the outcome of one action group into this report.
    pub fn add(&mut self, kind: ActionKind, collected: usize, errors: Vec<CollectionError>) {
        match kind {
            ActionKind::Files => self.files_collected += collected,
            ActionKind::Registries => self.registries_collected += collected,
            ActionKind::EventLogs => self.event_logs_collected += collected,
            ActionKind::Commands => self.commands_collected += collected,
        }
        self.errors.extend(errors);
    }

    pub fn total_collected(&self) -> usize {
        self.files_collected
            + self.registries_collected
            + self.event_logs_collected
            + self.commands_collected
    }
}

/// Outcome of a whole collection run.
///
/// Returned by the engine regardless of how the run ended; a cancelled or
/// failed run still carries everything gathered up to that point.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CollectionResult {
    /// Random id minted at the start of the run.
    pub collection_id: String,
    /// Host name the run executed on.
    pub host_id: String,
    /// RFC 3339 timestamp of the moment the run started.
    pub started_at: String,
    /// Reports keyed by package id, in sorted order.
    pub packages: BTreeMap<String, PackageReport>,
    /// Path of the finished archive; `None` unless the run succeeded.
    pub archive_path: Option<PathBuf>,
    /// True when the run stopped early on user request.
    pub cancelled: bool,
    /// Description of the fatal error, for runs that failed outright.
    pub failure: Option<String>,
}

impl CollectionResult {
    pub fn new(host_id: &str, started_at: &DateTime<Utc>) -> Self {
        Self {
            collection_id: Uuid::new_v4().to_string(),
            host_id: host_id.to_string(),
            started_at: started_at.to_rfc3339(),
            packages: BTreeMap::new(),
            archive_path: None,
            cancelled: false,
            failure: None,
        }
    }

    pub fn total_collected(&self) -> usize {
        self.packages.values().map(PackageReport::total_collected).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.packages.values().map(|report| report.errors.len()).sum()
    }
}
