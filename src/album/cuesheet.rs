//! Embedded cuesheet parsing
//!
//! Turns the raw cue text exported from a container into an ordered list of
//! `TrackDescriptor`s with sample-accurate boundaries. Only the pieces a
//! gapless split needs are read: TRACK/TITLE/PERFORMER/INDEX lines. FILE,
//! REM and the rest of the cue vocabulary are ignored.

use std::collections::HashSet;
use std::path::Path;

use tracing::warn;

use crate::error::{Result, SplitError};
use crate::types::TrackDescriptor;

/// CD audio addresses positions in 1/75-second frames; cue INDEX timecodes
/// are MM:SS:FF where FF counts those frames.
const FRAMES_PER_SECOND: u64 = 75;

/// One TRACK block as read from the cue text, before boundary validation
#[derive(Debug, Default)]
struct CueEntry {
    number: u32,
    title: Option<String>,
    performer: Option<String>,
    /// INDEX 00 position in frames (pregap start)
    index00: Option<u64>,
    /// INDEX 01 position in frames (track start)
    index01: Option<u64>,
}

impl CueEntry {
    fn new(number: u32) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Track start in frames: INDEX 01 when present, INDEX 00 otherwise
    fn start_frames(&self) -> Option<u64> {
        self.index01.or(self.index00)
    }
}

/// Parse cue text into track descriptors whose boundaries partition
/// `[0, total_samples)` exactly.
///
/// Each track starts at its INDEX 01 position (INDEX 00 when 01 is absent)
/// and ends where the next track starts; the final track ends at
/// `total_samples`. Pregap audio therefore stays attached to the end of the
/// preceding track and nothing is dropped between tracks.
///
/// Malformed cue text is a parse error; structurally valid cue text whose
/// boundaries violate the partition (first start not 0, starts out of order,
/// a start beyond the stream end, duplicate track numbers) is a planning
/// error. Both are scoped to the album.
pub fn parse_track_list(
    raw: &str,
    sample_rate: u32,
    total_samples: u64,
    album_path: &Path,
) -> Result<Vec<TrackDescriptor>> {
    if sample_rate == 0 || u64::from(sample_rate) % FRAMES_PER_SECOND != 0 {
        return Err(SplitError::parse(
            album_path,
            format!(
                "sample rate {} Hz is not divisible by {} (cue frames)",
                sample_rate, FRAMES_PER_SECOND
            ),
        ));
    }
    let samples_per_frame = u64::from(sample_rate) / FRAMES_PER_SECOND;

    let entries = read_entries(raw, album_path)?;
    if entries.is_empty() {
        return Err(SplitError::parse(
            album_path,
            "cuesheet contains no audio tracks",
        ));
    }

    // Resolve starts and check the partition invariants before synthesizing
    // any end boundary.
    let mut starts = Vec::with_capacity(entries.len());
    let mut seen_numbers = HashSet::new();
    for entry in &entries {
        if !seen_numbers.insert(entry.number) {
            return Err(SplitError::planning(
                album_path,
                format!("duplicate track number {}", entry.number),
            ));
        }
        let frames = entry.start_frames().ok_or_else(|| {
            SplitError::parse(
                album_path,
                format!("track {} has no INDEX line", entry.number),
            )
        })?;
        starts.push(frames * samples_per_frame);
    }

    if starts[0] != 0 {
        return Err(SplitError::planning(
            album_path,
            format!("first track starts at sample {} instead of 0", starts[0]),
        ));
    }
    for (entry, window) in entries.iter().skip(1).zip(starts.windows(2)) {
        if window[1] <= window[0] {
            return Err(SplitError::planning(
                album_path,
                format!(
                    "track {} starts at sample {}, not after the previous track at {}",
                    entry.number, window[1], window[0]
                ),
            ));
        }
    }
    if let Some(&last) = starts.last() {
        if last >= total_samples {
            return Err(SplitError::planning(
                album_path,
                format!(
                    "track {} starts at sample {} but the stream has only {}",
                    entries[entries.len() - 1].number,
                    last,
                    total_samples
                ),
            ));
        }
    }

    let count = entries.len();
    let tracks = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| TrackDescriptor {
            index: entry.number,
            title: entry.title,
            performer: entry.performer,
            start_sample: starts[i],
            end_sample: if i + 1 < count {
                starts[i + 1]
            } else {
                total_samples
            },
        })
        .collect();

    Ok(tracks)
}

/// Scan the cue text line by line and collect AUDIO track blocks.
///
/// A cue-level PERFORMER (before the first TRACK) is inherited by tracks
/// that carry none of their own. Non-AUDIO tracks and their following
/// lines are skipped with a warning.
fn read_entries(raw: &str, album_path: &Path) -> Result<Vec<CueEntry>> {
    let mut entries: Vec<CueEntry> = Vec::new();
    let mut current: Option<CueEntry> = None;
    let mut album_performer: Option<String> = None;
    let mut seen_track = false;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (keyword, rest) = split_keyword(line);

        match keyword {
            "TRACK" => {
                seen_track = true;
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
                let mut fields = rest.split_whitespace();
                let number: u32 = fields
                    .next()
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| {
                        SplitError::parse(album_path, format!("malformed TRACK line '{}'", line))
                    })?;
                let mode = fields.next().unwrap_or("");
                if mode == "AUDIO" {
                    current = Some(CueEntry::new(number));
                } else {
                    // Leaving `current` empty makes the whole block
                    // invisible to the TITLE/PERFORMER/INDEX arms.
                    warn!(
                        "Ignoring non-audio track {} ({}) in {}",
                        number,
                        mode,
                        album_path.display()
                    );
                }
            }
            "TITLE" => {
                if let Some(entry) = current.as_mut() {
                    entry.title = Some(unquote(rest));
                }
                // A cue-level TITLE names the album; tags already carry that.
            }
            "PERFORMER" => {
                if let Some(entry) = current.as_mut() {
                    entry.performer = Some(unquote(rest));
                } else if !seen_track {
                    album_performer = Some(unquote(rest));
                }
            }
            "INDEX" => {
                if let Some(entry) = current.as_mut() {
                    let mut fields = rest.split_whitespace();
                    let slot: u32 = fields
                        .next()
                        .and_then(|n| n.parse().ok())
                        .ok_or_else(|| {
                            SplitError::parse(
                                album_path,
                                format!("malformed INDEX line '{}'", line),
                            )
                        })?;
                    let frames = fields
                        .next()
                        .and_then(msf_to_frames)
                        .ok_or_else(|| {
                            SplitError::parse(
                                album_path,
                                format!("malformed INDEX line '{}'", line),
                            )
                        })?;
                    match slot {
                        0 => entry.index00 = Some(frames),
                        1 => entry.index01 = Some(frames),
                        // Subindexes (02+) mark points inside the track;
                        // irrelevant for boundary computation.
                        _ => {}
                    }
                }
            }
            // FILE, REM, CATALOG, FLAGS, ISRC, ...
            _ => {}
        }
    }
    if let Some(entry) = current.take() {
        entries.push(entry);
    }

    if !entries.is_empty() {
        if let Some(performer) = album_performer {
            for entry in entries.iter_mut() {
                if entry.performer.is_none() {
                    entry.performer = Some(performer.clone());
                }
            }
        }
    }

    Ok(entries)
}

/// Split a cue line into its keyword and the remainder
fn split_keyword(line: &str) -> (&str, &str) {
    let mut parts = line.splitn(2, char::is_whitespace);
    let keyword = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();
    (keyword, rest)
}

/// Strip one pair of surrounding double quotes, if present
fn unquote(value: &str) -> String {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// Convert an MM:SS:FF timecode to a frame count.
///
/// Returns None for anything that is not three colon-separated numbers
/// with SS < 60 and FF < 75. Minutes may exceed 99 for long streams.
fn msf_to_frames(msf: &str) -> Option<u64> {
    let mut parts = msf.splitn(3, ':');
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    let frames: u64 = parts.next()?.parse().ok()?;
    if seconds >= 60 || frames >= FRAMES_PER_SECOND {
        return None;
    }
    Some((minutes * 60 + seconds) * FRAMES_PER_SECOND + frames)
}
