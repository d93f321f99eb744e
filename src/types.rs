//! Core data types for flacsplit
//!
//! These types represent the domain model and flow through the pipeline:
//! one `AlbumSource` per input container, one `TrackDescriptor` per parsed
//! cue track, one `OutputPlan` per destination file.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Album-level tag mapping with uppercase-normalized keys.
///
/// Ordered so logs and fake-encoder output stay deterministic.
pub type TagMap = BTreeMap<String, String>;

// =============================================================================
// Album container
// =============================================================================

/// An embedded picture (cover art) carried from container to output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// MIME type as stored in the container, e.g. "image/jpeg"
    pub mime_type: String,
    /// Raw image bytes
    pub data: Vec<u8>,
}

/// Everything read from one album container.
///
/// Created at extraction time and read-only afterwards; shared across the
/// album's encode jobs behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AlbumSource {
    /// Filesystem path of the container
    pub path: PathBuf,
    /// Album-level tags, keys uppercased
    pub tags: TagMap,
    /// Embedded pictures, in container order
    pub pictures: Vec<Picture>,
    /// Raw embedded track-list (cue) text
    pub track_list: String,
    /// Sample rate of the audio stream in Hz
    pub sample_rate: u32,
    /// Total number of samples in the stream
    pub total_samples: u64,
}

impl AlbumSource {
    /// Look up a tag by uppercase key
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Album artist, preferring ALBUMARTIST over ARTIST
    pub fn album_performer(&self) -> Option<&str> {
        self.tag("ALBUMARTIST").or_else(|| self.tag("ARTIST"))
    }

    /// Album title from tags
    pub fn album_title(&self) -> Option<&str> {
        self.tag("ALBUM")
    }
}

// =============================================================================
// Parsed tracks
// =============================================================================

/// One parsed track with sample-accurate boundaries.
///
/// For an album of N tracks the starts are strictly increasing, the first
/// start is 0, and each end equals the next start (the last end is the
/// album's total sample count) - together the descriptors partition the
/// full sample range with no gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    /// 1-based track number from the cue TRACK line
    pub index: u32,
    /// Track title, if the cue carries one
    pub title: Option<String>,
    /// Track performer; inherits the cue-level PERFORMER when absent
    pub performer: Option<String>,
    /// First sample of the track (inclusive)
    pub start_sample: u64,
    /// One past the last sample of the track (exclusive)
    pub end_sample: u64,
}

impl TrackDescriptor {
    /// Number of samples in this track
    pub fn sample_count(&self) -> u64 {
        self.end_sample - self.start_sample
    }

    /// Track duration in seconds
    pub fn duration_seconds(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.sample_count() as f64 / sample_rate as f64
    }

    /// Title to display and render into filenames, with the positional
    /// fallback used when the cue has no TITLE line
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(t) => t.clone(),
            None => format!("Track {}", self.index),
        }
    }
}

// =============================================================================
// Output planning
// =============================================================================

/// Resolved destination for one track.
///
/// No two plans produced within one batch run share the same `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    /// Directory the track is written into
    pub directory: PathBuf,
    /// Sanitized file name including extension
    pub file_name: String,
    /// Full destination path (`directory` joined with `file_name`)
    pub path: PathBuf,
}

// =============================================================================
// Tagging
// =============================================================================

/// Tag values carried onto one encoded track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    /// 1-based track number
    pub track_number: u32,
    /// Track count of the whole album, not of any selected subset
    pub track_total: u32,
}

impl TrackTags {
    /// Assemble the tag set for one track from album tags and the parsed
    /// descriptor. Track-level values win over album-level ones.
    pub fn for_track(album: &AlbumSource, track: &TrackDescriptor, track_total: u32) -> Self {
        Self {
            title: Some(track.display_title()),
            artist: track
                .performer
                .clone()
                .or_else(|| album.album_performer().map(str::to_string)),
            album: album.album_title().map(str::to_string),
            date: album.tag("DATE").map(str::to_string),
            genre: album.tag("GENRE").map(str::to_string),
            track_number: track.index,
            track_total,
        }
    }
}
