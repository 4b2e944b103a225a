//! Deterministic archive of the staging tree.
//!
//! Entries are written in sorted path order with forward-slash names and no
//! directory entries, so two runs over identical staging trees produce the
//! same entry list. An archive name is never reused: a second run landing
//! in the same minute fails instead of overwriting evidence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info};
use walkdir::WalkDir;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use crate::constants::{ARCHIVE_COMPRESSION_LEVEL, ARCHIVE_NAME_INFIX, ARCHIVE_TIMESTAMP_FORMAT};
use crate::error::ArchiveError;

/// Name of the archive for a run started by `host_id` at `started_at`.
pub fn archive_file_name(host_id: &str, started_at: &DateTime<Utc>) -> String {
    format!(
        "{host_id}_{ARCHIVE_NAME_INFIX}_{}_UTC.zip",
        started_at.format(ARCHIVE_TIMESTAMP_FORMAT)
    )
}

/// Packs every file under `staging_root` into a single zip in `dest_dir`
/// and returns the archive path.
pub fn archive_staging(
    staging_root: &Path,
    dest_dir: &Path,
    host_id: &str,
    started_at: &DateTime<Utc>,
) -> Result<PathBuf, ArchiveError> {
    let archive_path = dest_dir.join(archive_file_name(host_id, started_at));
    if archive_path.exists() {
        return Err(ArchiveError::AlreadyExists(archive_path));
    }

    let file = fs::File::create(&archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL))
        .unix_permissions(0o644);

    let mut entries = 0usize;
    for entry in WalkDir::new(staging_root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(staging_root) else {
            continue;
        };
        let name = rel
            .components()
            .map(|part| part.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name.as_str(), options)?;
        let mut reader = fs::File::open(entry.path())?;
        io::copy(&mut reader, &mut zip)?;
        debug!("archived {name}");
        entries += 1;
    }

    zip.finish()?;
    info!("wrote {} ({} file(s))", archive_path.display(), entries);
    Ok(archive_path)
}
