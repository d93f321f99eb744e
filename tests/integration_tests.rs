//! Integration tests for the flacsplit pipeline
//!
//! These drive full batch runs over the fake toolset: decode output is
//! deterministic text, encoded files land on the real filesystem, and no
//! external binaries are involved.

use flacsplit::config::{Settings, TrackFilter};
use flacsplit::pipeline;
use flacsplit::tools::fake::{ConcurrencyGauge, FakeDecoder, FakeEncoder, FakeTagReader};
use flacsplit::tools::{ContainerDump, Toolset};
use flacsplit::types::{Picture, TagMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::TempDir;

/// One minute of 44.1kHz audio
const SAMPLES_PER_MINUTE: u64 = 60 * 44100;

/// Cuesheet text with one track per minute, INDEX 01 on minute boundaries
fn cue_for(titles: &[&str]) -> String {
    let mut cue = String::from("PERFORMER \"The Band\"\nFILE \"album.flac\" WAVE\n");
    for (i, title) in titles.iter().enumerate() {
        cue.push_str(&format!(
            "  TRACK {:02} AUDIO\n    TITLE \"{}\"\n    INDEX 01 {:02}:00:00\n",
            i + 1,
            title,
            i
        ));
    }
    cue
}

/// Canned album metadata with one one-minute track per title
fn album_dump(titles: &[&str]) -> ContainerDump {
    ContainerDump {
        tags: TagMap::from([
            ("ALBUM".to_string(), "Greatest Live".to_string()),
            ("ALBUMARTIST".to_string(), "The Band".to_string()),
            ("DATE".to_string(), "1994".to_string()),
            ("GENRE".to_string(), "Rock".to_string()),
        ]),
        cuesheet: Some(cue_for(titles)),
        pictures: vec![Picture {
            mime_type: "image/jpeg".to_string(),
            data: vec![0xFF, 0xD8, 0xFF],
        }],
        sample_rate: 44100,
        total_samples: titles.len() as u64 * SAMPLES_PER_MINUTE,
    }
}

/// Put a dummy container file on disk so mtime checks have something to stat
fn place_album(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"fLaC").expect("Failed to write dummy container");
    path
}

fn set_mtime(path: &Path, secs_after_epoch: u64) {
    let file = fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file for mtime change");
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs_after_epoch))
        .expect("Failed to set mtime");
}

fn fake_tools(dumps: Vec<(PathBuf, ContainerDump)>) -> Toolset {
    Toolset {
        reader: Arc::new(FakeTagReader::new(dumps)),
        decoder: Arc::new(FakeDecoder::new()),
        encoder: Arc::new(FakeEncoder::new()),
    }
}

/// Test settings with the progress bar disabled
fn test_settings(inputs: Vec<PathBuf>, output: &Path) -> Settings {
    Settings {
        inputs,
        output_dir: output.to_path_buf(),
        workers: 2,
        show_progress: false,
        ..Settings::default()
    }
}

/// Names of all .mp3 files directly inside `dir`, sorted
fn mp3_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("Failed to read output dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".mp3"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_batch_splits_albums_into_tagged_tracks() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let first = place_album(input.path(), "first.flac");
    let second = place_album(input.path(), "second.flac");

    let tools = fake_tools(vec![
        (first.clone(), album_dump(&["One", "Two", "Three"])),
        (second.clone(), album_dump(&["Uno", "Dos", "Tres"])),
    ]);
    let settings = test_settings(vec![first.clone(), second], output.path());

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 6);
    assert_eq!(report.failure_count, 0);
    assert_eq!(report.skip_count, 0);
    assert!(report.exit_ok());
    assert_eq!(mp3_names(output.path()).len(), 6);

    // Track 2 of the first album covers its second minute of samples and
    // carries the album tags plus the cover art
    let track_two = fs::read_to_string(output.path().join("02 Two (The Band).mp3"))
        .expect("Failed to read encoded track");
    assert!(track_two.starts_with("MP3\n"));
    assert!(track_two.contains(&format!(
        "PCM {} {} {}",
        first.display(),
        SAMPLES_PER_MINUTE,
        2 * SAMPLES_PER_MINUTE
    )));
    assert!(track_two.contains("TITLE=Two\n"));
    assert!(track_two.contains("ARTIST=The Band\n"));
    assert!(track_two.contains("ALBUM=Greatest Live\n"));
    assert!(track_two.contains("DATE=1994\n"));
    assert!(track_two.contains("GENRE=Rock\n"));
    assert!(track_two.contains("TRACK=2/3\n"));
    assert!(track_two.contains("PICTURE:image/jpeg:3\n"));
}

#[test]
fn test_album_without_cuesheet_fails_but_batch_continues() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");

    let mut albums = Vec::new();
    let mut dumps = Vec::new();
    for i in 1..=5 {
        let path = place_album(input.path(), &format!("album{}.flac", i));
        let dump = if i == 3 {
            ContainerDump {
                cuesheet: None,
                ..album_dump(&["Solo"])
            }
        } else {
            album_dump(&["Solo"])
        };
        dumps.push((path.clone(), dump));
        albums.push(path);
    }

    let tools = fake_tools(dumps);
    let settings = Settings {
        continue_on_error: true,
        ..test_settings(albums.clone(), output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 4);
    assert_eq!(report.failure_count, 1);
    assert!(!report.exit_ok());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].album, albums[2]);
    assert_eq!(report.failures[0].track, None);
    assert!(report.failures[0].cause.contains("no embedded cuesheet"));
    assert_eq!(mp3_names(output.path()).len(), 4);
}

#[test]
fn test_planning_failure_without_continue_stops_the_batch() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let good = place_album(input.path(), "good.flac");
    let bad = place_album(input.path(), "bad.flac");
    let later = place_album(input.path(), "later.flac");

    let tools = fake_tools(vec![
        (good.clone(), album_dump(&["One"])),
        (
            bad.clone(),
            ContainerDump {
                cuesheet: None,
                ..album_dump(&["One"])
            },
        ),
        (later.clone(), album_dump(&["One"])),
    ]);
    let settings = test_settings(vec![good, bad.clone(), later], output.path());

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.failures[0].album, bad);
    // Planning stopped before any encode was dispatched
    assert_eq!(report.success_count, 0);
    assert!(mp3_names(output.path()).is_empty());
}

#[test]
fn test_skip_newer_rerun_is_a_noop() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One", "Two", "Three"]))]);
    let settings = Settings {
        skip_newer: true,
        ..test_settings(vec![album.clone()], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("first run failed");
    assert_eq!(report.success_count, 3);
    assert_eq!(report.skip_count, 0);

    // Make the source strictly older than every freshly written output
    set_mtime(&album, 100);
    let before: Vec<(String, Vec<u8>)> = mp3_names(output.path())
        .into_iter()
        .map(|name| {
            let bytes = fs::read(output.path().join(&name)).expect("read output");
            (name, bytes)
        })
        .collect();
    assert_eq!(before.len(), 3);

    let rerun = pipeline::run_with_tools(&settings, &tools).expect("second run failed");
    assert_eq!(rerun.success_count, 0);
    assert_eq!(rerun.failure_count, 0);
    assert_eq!(rerun.skip_count, 3);
    assert!(rerun.exit_ok());

    for (name, bytes) in before {
        let after = fs::read(output.path().join(&name)).expect("read output after rerun");
        assert_eq!(after, bytes, "{} changed on a skipped rerun", name);
    }
}

#[test]
fn test_truncated_collisions_stay_distinct() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");

    // Three albums whose only track truncates to the same base name
    let mut albums = Vec::new();
    let mut dumps = Vec::new();
    for i in 1..=3 {
        let path = place_album(input.path(), &format!("rip{}.flac", i));
        dumps.push((path.clone(), album_dump(&["An Extremely Long Title"])));
        albums.push(path);
    }

    let tools = fake_tools(dumps);
    let settings = Settings {
        max_name_len: Some(10),
        ..test_settings(albums, output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 3);

    let names = mp3_names(output.path());
    assert_eq!(names.len(), 3);
    for name in &names {
        let stem = name.strip_suffix(".mp3").expect("mp3 extension");
        assert!(
            stem.chars().count() <= 10,
            "{} exceeds the length cap",
            name
        );
    }
}

#[test]
fn test_track_filter_selects_a_subset() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One", "Two", "Three"]))]);
    let settings = Settings {
        track_filter: Some(TrackFilter::parse("1,3").expect("filter spec")),
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 2);

    let names = mp3_names(output.path());
    assert_eq!(
        names,
        vec![
            "01 One (The Band).mp3".to_string(),
            "03 Three (The Band).mp3".to_string()
        ]
    );

    // Track numbering still reflects the whole album
    let third = fs::read_to_string(output.path().join("03 Three (The Band).mp3"))
        .expect("read selected track");
    assert!(third.contains("TRACK=3/3\n"));
}

#[test]
fn test_absent_requested_track_fails_the_album() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One", "Two"]))]);
    let settings = Settings {
        track_filter: Some(TrackFilter::parse("1,12").expect("filter spec")),
        ..test_settings(vec![album.clone()], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.success_count, 0);
    assert!(!report.exit_ok());
    assert_eq!(report.failures[0].album, album);
    assert_eq!(report.failures[0].track, Some(12));
    assert!(report.failures[0].cause.contains("not present"));
    assert!(mp3_names(output.path()).is_empty());
}

#[test]
fn test_absent_requested_track_with_continue_encodes_the_rest() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One", "Two"]))]);
    let settings = Settings {
        track_filter: Some(TrackFilter::parse("1,12").expect("filter spec")),
        continue_on_error: true,
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.failure_count, 1);
    assert_eq!(report.success_count, 1);
    assert!(!report.exit_ok());
    assert_eq!(
        mp3_names(output.path()),
        vec!["01 One (The Band).mp3".to_string()]
    );
}

#[test]
fn test_failed_track_leaves_no_partial_file() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let tools = Toolset {
        reader: Arc::new(FakeTagReader::new(vec![(
            album.clone(),
            album_dump(&["One", "Two", "Three"]),
        )])),
        decoder: Arc::new(FakeDecoder::new()),
        encoder: Arc::new(FakeEncoder::failing_for(["02 Two (The Band).mp3"])),
    };
    let settings = Settings {
        continue_on_error: true,
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 2);
    assert_eq!(report.failure_count, 1);
    assert!(!report.exit_ok());

    assert!(!output.path().join("02 Two (The Band).mp3").exists());
    let leftovers: Vec<String> = fs::read_dir(output.path())
        .expect("read output dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty(), "stale temp files: {:?}", leftovers);
}

#[test]
fn test_mirrored_layout_tracks_the_input_tree() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album_dir = input.path().join("The Band").join("1994 - Greatest Live");
    fs::create_dir_all(&album_dir).expect("create album dir");
    let album = place_album(&album_dir, "album.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One"]))]);
    let settings = Settings {
        mirror_dirs: true,
        input_root: Some(input.path().to_path_buf()),
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 1);

    let expected = output
        .path()
        .join("The Band")
        .join("1994 - Greatest Live")
        .join("01 One (The Band).mp3");
    assert!(expected.exists(), "missing {}", expected.display());
}

#[test]
fn test_album_subdir_groups_tracks_per_container() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "Greatest Live.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One", "Two"]))]);
    let settings = Settings {
        album_subdir: true,
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 2);
    assert!(output
        .path()
        .join("Greatest Live")
        .join("01 One (The Band).mp3")
        .exists());
    assert!(output
        .path()
        .join("Greatest Live")
        .join("02 Two (The Band).mp3")
        .exists());
}

#[test]
fn test_concurrency_never_exceeds_the_worker_cap() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let gauge = ConcurrencyGauge::new();
    let tools = Toolset {
        reader: Arc::new(FakeTagReader::new(vec![(
            album.clone(),
            album_dump(&["A", "B", "C", "D", "E", "F"]),
        )])),
        decoder: Arc::new(FakeDecoder::with_gauge(Arc::clone(&gauge))),
        encoder: Arc::new(FakeEncoder::with_delay(Duration::from_millis(50))),
    };
    let settings = Settings {
        workers: 3,
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 6);
    assert!(
        gauge.peak() <= 3,
        "ran {} decode streams at once with 3 workers",
        gauge.peak()
    );
    assert!(gauge.peak() >= 2, "jobs never overlapped");
}

#[test]
fn test_dry_run_writes_nothing() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");
    let album = place_album(input.path(), "album.flac");

    let tools = fake_tools(vec![(album.clone(), album_dump(&["One", "Two", "Three"]))]);
    let settings = Settings {
        dry_run: true,
        ..test_settings(vec![album], output.path())
    };

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 0);
    assert_eq!(report.failure_count, 0);
    assert_eq!(report.skip_count, 3);
    assert!(report.exit_ok());
    assert!(mp3_names(output.path()).is_empty());
}

#[test]
fn test_empty_directory_input_does_nothing() {
    let input = TempDir::new().expect("input dir");
    let output = TempDir::new().expect("output dir");

    let tools = fake_tools(vec![]);
    let settings = test_settings(vec![input.path().to_path_buf()], output.path());

    let report = pipeline::run_with_tools(&settings, &tools).expect("pipeline failed");
    assert_eq!(report.success_count, 0);
    assert_eq!(report.failure_count, 0);
    assert_eq!(report.skip_count, 0);
    assert!(report.exit_ok());
}
