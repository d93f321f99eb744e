//! CLI surface tests
//!
//! These exercise argument handling and exit codes of the real binary
//! without touching any external audio tool: every case either fails
//! before tool invocation or runs on an empty input list.

use assert_cmd::Command;

fn flacsplit() -> Command {
    Command::cargo_bin("flacsplit").expect("binary built")
}

#[test]
fn test_help_lists_the_batch_flags() {
    let assert = flacsplit().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("--skip-newer"));
    assert!(stdout.contains("--fat-safe"));
    assert!(stdout.contains("--continue-on-error"));
    assert!(stdout.contains("--lame-preset"));
}

#[test]
fn test_empty_stdin_list_exits_zero() {
    let assert = flacsplit()
        .args(["--output-dir", "/tmp"])
        .write_stdin("")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("Summary: 0 encoded, 0 failed, 0 skipped"));
}

#[test]
fn test_cancel_in_flight_conflicts_with_continue_on_error() {
    let assert = flacsplit()
        .args(["--continue-on-error", "--cancel-in-flight"])
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("cancel-in-flight"));
}

#[test]
fn test_malformed_track_list_is_rejected() {
    let assert = flacsplit()
        .args(["--tracks", "three,four"])
        .write_stdin("")
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_zero_truncation_cap_is_rejected() {
    let assert = flacsplit()
        .args(["--truncate-filenames", "0"])
        .write_stdin("")
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("--truncate-filenames"));
}

#[test]
fn test_missing_input_is_reported_and_fails_the_run() {
    let assert = flacsplit()
        .args(["--output-dir", "/tmp", "/nonexistent/album.flac"])
        .assert()
        .failure();
    let output = assert.get_output();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(stderr.contains("/nonexistent/album.flac"));
    assert!(stdout.contains("Summary: 0 encoded, 1 failed, 0 skipped"));
}
