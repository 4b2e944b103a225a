//! # odc-collector
//!
//! A manifest-driven diagnostic data collector: one XML manifest describes
//! which files, registry keys, event logs, and command outputs to gather,
//! and a run packs everything it found into a single timestamped ZIP.
//!
//! ## Overview
//!
//! A collection run is a fixed pipeline. The manifest is fetched and parsed
//! into packages; each package's actions are executed in order against a
//! staging directory laid out as
//! `<package>/<category>/<team>/<host>_<name>`; the staging tree is then
//! archived deterministically and removed. Failures of individual actions
//! are recorded in the run report and never abort the run.
//!
//! ## Features
//!
//! - **Namespace-tolerant manifests**: packages are found whether the XML
//!   uses the expected namespace, no namespace, or a foreign one
//! - **Four action groups**: file patterns (with environment variables and
//!   wildcards), registry exports, event logs, and captured commands
//! - **Cooperative cancellation**: a shared flag stops the run between
//!   items, never mid-copy, and staging is always cleaned up
//! - **Deterministic archives**: sorted entries, forward-slash names, and
//!   a collision-checked `<host>_CollectedData_<timestamp>_UTC.zip` name
//! - **Run reports**: per-package counts and recorded errors, exportable
//!   as pretty-printed JSON
//!
//! ## Usage
//!
//! ```no_run
//! use odc_collector::engine::{CollectionEvent, Orchestrator, RunContext, RunOptions};
//! use odc_collector::manifest::FileManifestSource;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (ctx, events) = RunContext::new();
//! let worker = Orchestrator::new(RunOptions::default())
//!     .spawn(FileManifestSource::new("manifest.xml"), ctx)?;
//!
//! for event in events.iter() {
//!     if let CollectionEvent::Message(text) = event {
//!         println!("{text}");
//!     }
//! }
//!
//! let result = worker.join().expect("worker panicked");
//! println!("collected {} item(s)", result.total_collected());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`manifest`]: Manifest sources, parser, and the normalized data model
//! - [`resolve`]: Environment-variable expansion and path pattern matching
//! - [`collectors`]: The four action executors and the staging layout
//! - [`engine`]: The run state machine, worker thread, and event channel
//! - [`models`]: Run reports and per-package tallies
//! - [`error`]: The crate's error taxonomy
//! - [`utils`]: Archiving, process execution, and run summaries
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Action executors and the staging directory layout
pub mod collectors;

/// Application constants and configuration values
pub mod constants;

/// Collection run orchestration and events
pub mod engine;

/// Error taxonomy shared across the crate
pub mod error;

/// Manifest acquisition, parsing, and data model
pub mod manifest;

/// Run reports and result bookkeeping
pub mod models;

/// Path pattern resolution against the live system
pub mod resolve;

/// Archiving, process execution, and summary utilities
pub mod utils;
