//! Manifest acquisition.
//!
//! The engine never reads manifests itself; callers hand it a source and the
//! worker fetches the bytes at the start of the run. That keeps the run loop
//! identical whether the manifest sits on disk, arrived over the wire, or is
//! baked into a test.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Anything that can produce raw manifest bytes for a run.
pub trait ManifestSource {
    /// Returns the manifest bytes, undecoded and unparsed.
    fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable origin of the manifest, for logging.
    fn origin(&self) -> String;
}

/// Reads the manifest from a file on disk.
#[derive(Debug, Clone)]
pub struct FileManifestSource {
    path: PathBuf,
}

impl FileManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ManifestSource for FileManifestSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        fs::read(&self.path)
            .with_context(|| format!("Failed to read manifest {}", self.path.display()))
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serves a manifest already held in memory.
#[derive(Debug, Clone)]
pub struct BytesManifestSource {
    bytes: Vec<u8>,
}

impl BytesManifestSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }
}

impl ManifestSource for BytesManifestSource {
    fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn origin(&self) -> String {
        format!("in-memory manifest ({} bytes)", self.bytes.len())
    }
}
