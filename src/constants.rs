//! Global constants for the odc-collector application.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Staging layout constants
/// Name of the scratch directory created under the output directory
pub const STAGING_DIR_NAME: &str = "staging";

/// Staging sub-folder for file collections
pub const FILES_DIR_NAME: &str = "Files";

/// Staging sub-folder for registry exports
pub const REGISTRY_DIR_NAME: &str = "RegistryKeys";

/// Staging sub-folder for event log collections
pub const EVENT_LOGS_DIR_NAME: &str = "EventLogs";

/// Staging sub-folder for command outputs
pub const COMMANDS_DIR_NAME: &str = "Commands";

// Manifest constants
/// Team folder used when an action carries no Team attribute
pub const DEFAULT_TEAM: &str = "General";

/// Output attribute value that discards a command's output
pub const SKIP_OUTPUT_SENTINEL: &str = "skip";

/// Fallback used when output-name sanitization leaves nothing behind
pub const FALLBACK_OUTPUT_NAME: &str = "output";

// Execution constants
/// Default per-command timeout in seconds
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Default external program used to export registry keys
pub const DEFAULT_REGISTRY_TOOL: &str = "reg";

/// File extension given to registry export outputs
pub const REGISTRY_OUTPUT_EXTENSION: &str = "txt";

// Progress milestones (percent)
/// Progress once the staging directory is ready
pub const PROGRESS_STAGING_READY: u8 = 10;

/// Progress once the manifest has been fetched and parsed
pub const PROGRESS_MANIFEST_READY: u8 = 25;

/// Progress once every package has been processed
pub const PROGRESS_PACKAGES_DONE: u8 = 90;

/// Progress on successful completion
pub const PROGRESS_COMPLETE: u8 = 100;

// Archive constants
/// Timestamp layout embedded in archive names (MM_DD_YYYY_HH_MM)
pub const ARCHIVE_TIMESTAMP_FORMAT: &str = "%m_%d_%Y_%H_%M";

/// Middle segment of every archive name
pub const ARCHIVE_NAME_INFIX: &str = "CollectedData";

/// Deflate level used for archive entries
pub const ARCHIVE_COMPRESSION_LEVEL: i32 = 6;

// Default file names
/// File name for the JSON run summary written next to the archive
pub const SUMMARY_FILE_NAME: &str = "collection_summary.json";

/// Default path for the `sample-manifest` subcommand
pub const DEFAULT_SAMPLE_MANIFEST_PATH: &str = "sample-manifest.xml";
