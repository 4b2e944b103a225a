use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::DEFAULT_SAMPLE_MANIFEST_PATH;

/// Command-line arguments for the collector.
///
/// A run needs a manifest; everything else has a sensible default. The
/// archive (and its staging area while the run executes) land under the
/// output directory.
#[derive(Parser, Debug)]
#[clap(name = "odc-collector", about = "Manifest-driven diagnostic data collector")]
pub struct Args {
    /// Path to the collection manifest XML
    pub manifest: Option<PathBuf>,

    /// Directory for the archive (default: %TEMP%/odc-collector or /tmp/odc-collector)
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Write a JSON run summary next to the archive
    #[clap(long)]
    pub report: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the collector.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a commented sample manifest to start from
    SampleManifest {
        /// Path to the manifest file to create
        #[clap(default_value = DEFAULT_SAMPLE_MANIFEST_PATH)]
        path: PathBuf,
    },
}
