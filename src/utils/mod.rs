//! Supporting machinery shared across the collection pipeline.
//!
//! ## Components
//!
//! - **Archive**: deterministic ZIP packing of the staging tree
//! - **Exec**: external process execution with a hard deadline
//! - **Summary**: JSON run summary generation and reporting
//!
//! ## Archiving a staging tree
//!
//! ```no_run
//! use odc_collector::utils::archive::archive_staging;
//! use chrono::Utc;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let staging = Path::new("/tmp/odc-collector/staging");
//! let dest = Path::new("/tmp/odc-collector");
//!
//! let zip_path = archive_staging(staging, dest, "workstation01", &Utc::now())?;
//! println!("Created archive: {}", zip_path.display());
//! # Ok(())
//! # }
//! ```

/// Deterministic ZIP archive creation
pub mod archive;

/// External command execution with timeouts
pub mod exec;

/// Run summary generation and reporting
pub mod summary;
