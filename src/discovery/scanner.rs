//! Input enumeration
//!
//! Expands the command-line input list into the ordered set of album
//! containers to split. Directories are scanned for .flac files; with no
//! arguments at all the list is read from stdin, which lets the tool sit
//! at the end of a `find ... -print0` pipe.

use crate::config::Settings;
use crate::error::Result;
use std::collections::HashSet;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Collect the album containers for this run.
///
/// Nonexistent file arguments are kept in the list: they surface later as
/// that album's extraction failure, so one bad path does not abort a batch
/// run under --continue-on-error.
pub fn collect_inputs(settings: &Settings) -> Result<Vec<PathBuf>> {
    let listed: Vec<PathBuf> = if settings.inputs.is_empty() {
        info!("No inputs on the command line, reading list from stdin");
        let mut raw = Vec::new();
        io::stdin().lock().read_to_end(&mut raw)?;
        parse_input_list(&raw, settings.null_delimited)
    } else {
        settings.inputs.clone()
    };

    let mut seen = HashSet::new();
    let mut inputs = Vec::new();

    for path in listed {
        if path.is_dir() {
            let mut found = scan_directory(&path);
            found.sort();
            for file in found {
                if seen.insert(file.clone()) {
                    inputs.push(file);
                }
            }
        } else {
            if !path.exists() {
                warn!("Input does not exist: {}", path.display());
            }
            if seen.insert(path.clone()) {
                inputs.push(path);
            }
        }
    }

    info!("Collected {} album containers", inputs.len());

    if inputs.is_empty() {
        warn!("No inputs to process");
    }

    Ok(inputs)
}

/// Split a raw stdin buffer into paths, NUL- or newline-delimited.
///
/// NUL-delimited entries are taken byte for byte, so names straight out
/// of `find -print0` survive exactly, stray whitespace included. Newline
/// entries are trimmed like any hand-written list; a line that is not
/// valid UTF-8 is dropped with a warning.
pub fn parse_input_list(raw: &[u8], null_delimited: bool) -> Vec<PathBuf> {
    if null_delimited {
        return raw
            .split(|b| *b == 0)
            .filter(|entry| !entry.is_empty())
            .map(path_from_bytes)
            .collect();
    }

    let mut paths = Vec::new();
    for line in raw.lines() {
        match line {
            Ok(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    paths.push(PathBuf::from(line));
                }
            }
            Err(e) => warn!("Skipping unreadable input line: {}", e),
        }
    }
    paths
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Walk a directory for .flac containers
fn scan_directory(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && is_flac(path) {
            debug!("Discovered: {}", path.display());
            found.push(path.to_path_buf());
        }
    }

    if found.is_empty() {
        warn!("No .flac files found in {}", dir.display());
    }

    found
}

/// Whether the path carries a .flac extension (case-insensitive)
pub fn is_flac(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("flac"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flac_extension_matches_case_insensitively() {
        assert!(is_flac(Path::new("/music/album.flac")));
        assert!(is_flac(Path::new("/music/album.FLAC")));
        assert!(!is_flac(Path::new("/music/album.mp3")));
        assert!(!is_flac(Path::new("/music/album")));
    }

    #[test]
    fn test_newline_list_skips_blank_lines() {
        let raw = b"a.flac\n\n  b.flac  \n";
        let paths = parse_input_list(raw, false);
        assert_eq!(
            paths,
            vec![PathBuf::from("a.flac"), PathBuf::from("b.flac")]
        );
    }

    #[test]
    fn test_nul_list_preserves_names_with_newlines() {
        let raw = b"a\nweird.flac\0b.flac\0";
        let paths = parse_input_list(raw, true);
        assert_eq!(
            paths,
            vec![PathBuf::from("a\nweird.flac"), PathBuf::from("b.flac")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_nul_entries_keep_whitespace_and_raw_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = b" padded.flac \0caf\xe9.flac\0";
        let paths = parse_input_list(raw, true);
        assert_eq!(paths[0], PathBuf::from(" padded.flac "));
        assert_eq!(paths[1].as_os_str(), OsStr::from_bytes(b"caf\xe9.flac"));
    }

    #[test]
    fn test_unreadable_newline_entries_are_dropped() {
        let raw = b"good.flac\nbad\xff\xfe.flac\nalso.flac\n";
        let paths = parse_input_list(raw, false);
        assert_eq!(
            paths,
            vec![PathBuf::from("good.flac"), PathBuf::from("also.flac")]
        );
    }

    #[test]
    fn test_directories_expand_to_sorted_flac_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.flac"), b"x").unwrap();
        fs::write(dir.path().join("a.flac"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let sub = dir.path().join("disc2");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.flac"), b"x").unwrap();

        let settings = Settings {
            inputs: vec![dir.path().to_path_buf()],
            ..Settings::default()
        };
        let inputs = collect_inputs(&settings).unwrap();

        assert_eq!(inputs.len(), 3);
        assert!(inputs[0].ends_with("a.flac"));
        assert!(inputs[1].ends_with("b.flac"));
        assert!(inputs[2].ends_with("c.flac"));
    }

    #[test]
    fn test_duplicate_inputs_are_listed_once() {
        let dir = TempDir::new().unwrap();
        let album = dir.path().join("album.flac");
        fs::write(&album, b"x").unwrap();

        let settings = Settings {
            inputs: vec![album.clone(), album.clone(), dir.path().to_path_buf()],
            ..Settings::default()
        };
        let inputs = collect_inputs(&settings).unwrap();
        assert_eq!(inputs, vec![album]);
    }

    #[test]
    fn test_missing_files_stay_in_the_list() {
        let settings = Settings {
            inputs: vec![PathBuf::from("/no/such/album.flac")],
            ..Settings::default()
        };
        let inputs = collect_inputs(&settings).unwrap();
        assert_eq!(inputs.len(), 1);
    }
}
