//! Event log collection.
//!
//! Event logs are files on every platform this tool targets, so collection
//! reuses the file engine and only changes the staging category.

use crate::error::ActionKind;
use crate::manifest::EventLogAction;

use super::{files, PackageContext, Tally};

pub fn collect(action: &EventLogAction, ctx: &PackageContext) -> Tally {
    files::collect_matches(
        &action.path_pattern,
        &action.team,
        ActionKind::EventLogs,
        ctx,
    )
}
