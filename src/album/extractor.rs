//! Album metadata extraction
//!
//! Pulls everything the pipeline needs out of one container in a single
//! pass: tags, stream properties, embedded pictures, and the raw cuesheet
//! text. The result is immutable and shared across the album's jobs.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, SplitError};
use crate::tools::TagReader;
use crate::types::AlbumSource;

/// Read one container into an `AlbumSource`.
///
/// Containers without an embedded track list cannot be split and fail
/// extraction; so do containers whose stream properties are unusable for
/// boundary arithmetic. Both are per-album failures, not fatal for the
/// batch.
pub fn extract(reader: &dyn TagReader, path: &Path) -> Result<AlbumSource> {
    debug!("Reading container metadata from {}", path.display());
    let dump = reader.read(path)?;

    let track_list = dump
        .cuesheet
        .ok_or_else(|| SplitError::parse(path, "no embedded cuesheet"))?;
    if dump.sample_rate == 0 {
        return Err(SplitError::parse(path, "container reports sample rate 0"));
    }
    if dump.total_samples == 0 {
        return Err(SplitError::parse(path, "container reports 0 total samples"));
    }

    debug!(
        "{}: {} Hz, {} samples, {} tags, {} pictures",
        path.display(),
        dump.sample_rate,
        dump.total_samples,
        dump.tags.len(),
        dump.pictures.len()
    );

    Ok(AlbumSource {
        path: path.to_path_buf(),
        tags: dump.tags,
        pictures: dump.pictures,
        track_list,
        sample_rate: dump.sample_rate,
        total_samples: dump.total_samples,
    })
}
