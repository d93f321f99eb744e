//! Runtime configuration settings

use crate::error::{Result, SplitError};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Immutable run options for the split pipeline.
///
/// Built once from the CLI at startup and passed by reference into every
/// component; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Album containers or directories as given on the command line
    pub inputs: Vec<PathBuf>,
    /// Output root for encoded tracks
    pub output_dir: PathBuf,
    /// Mirror input-relative directories under the output root
    pub mirror_dirs: bool,
    /// Root for relativizing mirrored paths
    pub input_root: Option<PathBuf>,
    /// Nest each album's tracks under an album-named subdirectory
    pub album_subdir: bool,
    /// Restrict output names to FAT-safe characters
    pub fat_safe: bool,
    /// Cap on the base filename length, in characters
    pub max_name_len: Option<usize>,
    /// Skip tracks whose output is newer than the source
    pub skip_newer: bool,
    /// Keep dispatching after failures
    pub continue_on_error: bool,
    /// Interrupt in-flight jobs when a failure halts dispatch
    pub cancel_in_flight: bool,
    /// Subset of track numbers to encode
    pub track_filter: Option<TrackFilter>,
    /// Preset handed to the lame encoder
    pub lame_preset: String,
    /// Number of encode workers
    pub workers: usize,
    /// stdin input list is NUL-delimited
    pub null_delimited: bool,
    /// Print plans without encoding anything
    pub dry_run: bool,
    /// Show the progress bar
    pub show_progress: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        let workers = cli.jobs.unwrap_or_else(num_cpus::get).max(1);

        let track_filter = match &cli.tracks {
            Some(spec) => Some(TrackFilter::parse(spec)?),
            None => None,
        };

        if let Some(0) = cli.truncate_filenames {
            return Err(SplitError::Config(
                "--truncate-filenames must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            inputs: cli.inputs.clone(),
            output_dir: cli.output_dir.clone(),
            mirror_dirs: cli.keep_directory_structure,
            input_root: cli.input_root.clone(),
            album_subdir: cli.subdir,
            fat_safe: cli.fat_safe,
            max_name_len: cli.truncate_filenames,
            skip_newer: cli.skip_newer,
            continue_on_error: cli.continue_on_error,
            cancel_in_flight: cli.cancel_in_flight,
            track_filter,
            lame_preset: cli.lame_preset.clone(),
            workers,
            null_delimited: cli.null,
            dry_run: cli.dry_run,
            show_progress: !cli.quiet,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inputs: vec![],
            output_dir: PathBuf::from("."),
            mirror_dirs: false,
            input_root: None,
            album_subdir: false,
            fat_safe: false,
            max_name_len: None,
            skip_newer: false,
            continue_on_error: false,
            cancel_in_flight: false,
            track_filter: None,
            lame_preset: "extreme".to_string(),
            workers: num_cpus::get().max(1),
            null_delimited: false,
            dry_run: false,
            show_progress: true,
        }
    }
}

/// Selection of track numbers, parsed from a spec like "1-3,5"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFilter {
    numbers: BTreeSet<u32>,
}

impl TrackFilter {
    /// Parse a comma-separated list of track numbers and inclusive ranges
    pub fn parse(spec: &str) -> Result<Self> {
        let mut numbers = BTreeSet::new();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            match part.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_track_number(lo)?;
                    let hi = parse_track_number(hi)?;
                    if lo > hi {
                        return Err(SplitError::Config(format!(
                            "invalid track range '{}': {} is greater than {}",
                            part, lo, hi
                        )));
                    }
                    numbers.extend(lo..=hi);
                }
                None => {
                    numbers.insert(parse_track_number(part)?);
                }
            }
        }

        if numbers.is_empty() {
            return Err(SplitError::Config(format!(
                "track list '{}' selects no tracks",
                spec
            )));
        }

        Ok(Self { numbers })
    }

    /// Whether the given track number is selected
    pub fn contains(&self, track_number: u32) -> bool {
        self.numbers.contains(&track_number)
    }

    /// Selected numbers absent from `present`, in ascending order
    pub fn missing_from(&self, present: impl IntoIterator<Item = u32>) -> Vec<u32> {
        let present: BTreeSet<u32> = present.into_iter().collect();
        self.numbers.difference(&present).copied().collect()
    }

    /// Number of selected tracks
    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

fn parse_track_number(text: &str) -> Result<u32> {
    let number: u32 = text.trim().parse().map_err(|_| {
        SplitError::Config(format!("invalid track number '{}'", text.trim()))
    })?;
    if number == 0 {
        return Err(SplitError::Config(
            "track numbers start at 1".to_string(),
        ));
    }
    Ok(number)
}
