//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// flacsplit - Split single-file FLAC albums into per-track MP3s
///
/// Reads the cuesheet embedded in each FLAC container, decodes each track's
/// sample range with the reference `flac` tool, encodes it with `lame`, and
/// carries album tags and cover art over to the MP3s.
#[derive(Parser, Debug)]
#[command(name = "flacsplit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Album containers to split, or directories to scan for .flac files.
    /// With no arguments the list is read from stdin, one path per line.
    #[arg(value_name = "FLAC")]
    pub inputs: Vec<PathBuf>,

    /// Output directory for encoded tracks
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Mirror each input's directory structure under the output root
    #[arg(short = 'k', long)]
    pub keep_directory_structure: bool,

    /// Root against which mirrored input paths are made relative
    #[arg(long, value_name = "DIR", requires = "keep_directory_structure")]
    pub input_root: Option<PathBuf>,

    /// Nest each album's tracks in a subdirectory named after the album file
    #[arg(short = 's', long)]
    pub subdir: bool,

    /// Restrict output names to characters FAT filesystems accept
    #[arg(short = 'f', long)]
    pub fat_safe: bool,

    /// Cap the base filename length at N characters (extension excluded)
    #[arg(long, value_name = "N")]
    pub truncate_filenames: Option<usize>,

    /// Skip tracks whose output file is newer than the source container
    #[arg(short = 'n', long)]
    pub skip_newer: bool,

    /// Keep processing remaining tracks and albums after a failure
    #[arg(short = 'c', long)]
    pub continue_on_error: bool,

    /// On the first failure, also interrupt running jobs at the next
    /// pipeline stage instead of letting them finish
    #[arg(long, conflicts_with = "continue_on_error")]
    pub cancel_in_flight: bool,

    /// Only encode the listed track numbers, e.g. "1-3,5" (default: all)
    #[arg(short = 't', long, value_name = "LIST")]
    pub tracks: Option<String>,

    /// Quality preset handed to lame
    #[arg(short = 'p', long, value_name = "PRESET", default_value = "extreme")]
    pub lame_preset: String,

    /// Number of parallel encode workers (defaults to CPU count)
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Input list on stdin is NUL-delimited instead of newline-delimited
    #[arg(short = '0', long)]
    pub null: bool,

    /// Show planned outputs and skip decisions without encoding anything
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress bar, log errors only)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}
