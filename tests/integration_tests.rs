//! End-to-end tests of the `splitter` binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with a clean environment and no stray config file
fn splitter(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("splitter").unwrap();
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("SPLITX_CONFIG")
        .env("XDG_CONFIG_HOME", dir)
        .env("SPLITX_LOG_LEVEL", "warn");
    cmd
}

fn create_test_video(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, b"fake video data").unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_unknown_extension_exits_with_unsupported() {
    let temp_dir = TempDir::new().unwrap();
    let file = create_test_video(temp_dir.path(), "notes.xyz");

    splitter(temp_dir.path())
        .args(["run", &file])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unsupported format"));
}

#[test]
fn test_missing_input_exits_with_not_found() {
    let temp_dir = TempDir::new().unwrap();

    splitter(temp_dir.path())
        .args(["run", "missing.mkv", "--cuts", "10-20"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_dry_run_prints_script_and_keeps_side_files() {
    let temp_dir = TempDir::new().unwrap();
    let movie = create_test_video(temp_dir.path(), "movie.mkv");

    splitter(temp_dir.path())
        .args(["run", &movie, "--cuts", "10-20,30-", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("#! /usr/bin/env sh\n"))
        .stdout(predicate::str::contains("mkvmerge @"));

    let side_files: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(".MkvMerge.json"))
        .collect();
    assert_eq!(side_files.len(), 1);
    let options = fs::read_to_string(temp_dir.path().join(&side_files[0])).unwrap();
    assert!(options.contains("parts:00:00:10.000-00:00:20.000,00:00:30.000-"));
}

#[test]
fn test_explicit_order_with_missing_binary_exhausts() {
    let temp_dir = TempDir::new().unwrap();
    let movie = create_test_video(temp_dir.path(), "movie.mkv");

    splitter(temp_dir.path())
        .env("SPLITX_MKVMERGE", "nonexistent_tool_xyz_12345")
        .args(["run", &movie, "-C", "mkvmerge", "--cuts", "0-5"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("nonexistent_tool_xyz_12345"));
}

#[test]
fn test_filters_need_a_filter_capable_converter() {
    let temp_dir = TempDir::new().unwrap();
    let clip = create_test_video(temp_dir.path(), "clip.wvm");

    splitter(temp_dir.path())
        .args(["run", &clip, "--filters", "-vf crop=720:352"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("apply custom filters"));
}

#[test]
fn test_bad_cuts_are_a_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    let movie = create_test_video(temp_dir.path(), "movie.mkv");

    splitter(temp_dir.path())
        .args(["run", &movie, "--cuts", "20-10"])
        .assert()
        .code(2);

    splitter(temp_dir.path())
        .args(["run", &movie, "-C", "handbrake"])
        .assert()
        .code(2);
}

#[test]
fn test_most_severe_outcome_wins() {
    let temp_dir = TempDir::new().unwrap();
    let unsupported = create_test_video(temp_dir.path(), "a.xyz");

    splitter(temp_dir.path())
        .args(["run", &unsupported, "missing.mkv", "--no-probe"])
        .assert()
        .code(4);
}

#[test]
fn test_dry_run_json_summary() {
    let temp_dir = TempDir::new().unwrap();
    let movie = create_test_video(temp_dir.path(), "movie.mkv");

    let output = splitter(temp_dir.path())
        .args(["run", &movie, "-n", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["exit_code"], 0);
    assert_eq!(reports[0]["summary"]["converter"], "mkvmerge");
    assert_eq!(reports[0]["summary"]["dry_run"], true);
}

#[test]
fn test_converters_lists_every_tool_in_order() {
    let temp_dir = TempDir::new().unwrap();

    let output = splitter(temp_dir.path())
        .arg("converters")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<_> = stdout
        .lines()
        .filter_map(|line| line.split('\t').next())
        .collect();
    assert_eq!(names, vec!["mkvmerge", "ffmpeg", "MP4Box", "avidemux", "asfbin"]);
}

#[test]
fn test_probe_reports_fail_for_missing_tool() {
    let temp_dir = TempDir::new().unwrap();
    let clip = create_test_video(temp_dir.path(), "clip.wvm");

    splitter(temp_dir.path())
        .env("SPLITX_ASFBIN", "nonexistent_tool_xyz_12345")
        .args(["probe", &clip])
        .assert()
        .code(6)
        .stdout(predicate::str::contains("asfbin:\tFail"));
}

#[test]
fn test_config_file_is_honoured() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("custom.toml");
    fs::write(
        &config,
        "[executables]\nmkvmerge = \"/opt/mkvtoolnix/mkvmerge\"\n",
    )
    .unwrap();

    splitter(temp_dir.path())
        .args(["--config", config.to_str().unwrap(), "converters"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/opt/mkvtoolnix/mkvmerge"));
}
