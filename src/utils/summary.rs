use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde_json::json;

use crate::constants::SUMMARY_FILE_NAME;
use crate::models::CollectionResult;

/// Renders a run's result as pretty-printed JSON.
///
/// The summary carries the run identity, per-package counts, and every
/// recorded error, so the archive can be assessed without unpacking it.
pub fn create_run_summary(result: &CollectionResult) -> Result<String> {
    let summary = json!({
        "collection_id": result.collection_id,
        "hostname": result.host_id,
        "collection_time": result.started_at,
        "os": std::env::consts::OS,
        "collector_version": env!("CARGO_PKG_VERSION"),
        "cancelled": result.cancelled,
        "failure": result.failure,
        "archive": result.archive_path.as_ref().map(|path| path.display().to_string()),
        "total_collected": result.total_collected(),
        "total_errors": result.total_errors(),
        "packages": &result.packages,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize run summary to JSON")
}

/// Writes the run summary next to the archive and returns its path.
pub fn write_run_summary(result: &CollectionResult, dest_dir: &Path) -> Result<PathBuf> {
    let body = create_run_summary(result)?;
    let path = dest_dir.join(SUMMARY_FILE_NAME);
    fs::write(&path, body)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    info!("Wrote run summary to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActionKind, CollectionError};
    use chrono::Utc;
    use serde_json::Value;
    use tempfile::TempDir;

    fn sample_result() -> CollectionResult {
        let mut result = CollectionResult::new("HOST01", &Utc::now());
        let report = result.packages.entry("Networking".to_string()).or_default();
        report.add(ActionKind::Files, 2, Vec::new());
        report.add(
            ActionKind::Commands,
            1,
            vec![CollectionError::new(
                "Networking",
                ActionKind::Commands,
                "netstat -ano",
                "timed out after 120s",
            )],
        );
        result.archive_path = Some(PathBuf::from("/tmp/HOST01_CollectedData.zip"));
        result
    }

    #[test]
    fn summary_reports_counts_and_identity() {
        let result = sample_result();
        let json: Value = serde_json::from_str(&create_run_summary(&result).unwrap()).unwrap();

        assert_eq!(json["hostname"], "HOST01");
        assert_eq!(json["collection_id"], result.collection_id.as_str());
        assert_eq!(json["total_collected"], 3);
        assert_eq!(json["total_errors"], 1);
        assert_eq!(json["cancelled"], false);
        assert!(json["failure"].is_null());
        assert_eq!(json["archive"], "/tmp/HOST01_CollectedData.zip");

        let package = &json["packages"]["Networking"];
        assert_eq!(package["files_collected"], 2);
        assert_eq!(package["commands_collected"], 1);
        assert_eq!(package["errors"][0]["detail"], "timed out after 120s");
    }

    #[test]
    fn summary_records_failures() {
        let mut result = CollectionResult::new("HOST01", &Utc::now());
        result.cancelled = true;
        result.failure = Some("failed to archive collected data".to_string());

        let json: Value = serde_json::from_str(&create_run_summary(&result).unwrap()).unwrap();
        assert_eq!(json["cancelled"], true);
        assert_eq!(json["failure"], "failed to archive collected data");
        assert!(json["archive"].is_null());
    }

    #[test]
    fn summary_is_pretty_printed() {
        let body = create_run_summary(&sample_result()).unwrap();
        assert!(body.contains('\n'));
        assert!(body.contains("  "));
    }

    #[test]
    fn summary_lands_next_to_the_archive() {
        let dir = TempDir::new().unwrap();
        let path = write_run_summary(&sample_result(), dir.path()).unwrap();

        assert_eq!(path, dir.path().join(SUMMARY_FILE_NAME));
        let json: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["hostname"], "HOST01");
    }
}
