use assert_cmd::Command;
use image::{DynamicImage, ImageBuffer, Rgb};
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str) {
    let img = ImageBuffer::from_fn(40, 30, |x, y| Rgb([(x * 5) as u8, (y * 7) as u8, 90]));
    DynamicImage::ImageRgb8(img).save(dir.join(name)).unwrap();
}

fn sizecap() -> Command {
    let mut cmd = Command::cargo_bin("sizecap").unwrap();
    for var in [
        "BATCH_SIZE",
        "STEP_OF_COMPRESSION",
        "DESTINATION_FOLDER_NAME",
        "MAX_DEGREE_OF_PARALLELISM",
        "SIZECAP_CONFIG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn prompts_for_folder_on_stdin() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "a.png");
    write_image(dir.path(), "b.png");

    sizecap()
        .write_stdin(format!("{}\n", dir.path().display()))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Please enter the path to folder with images:",
        ));

    let out = dir.path().join("Compressed");
    assert!(out.join("a.png").is_file());
    assert!(out.join("b.png").is_file());
}

#[test]
fn json_summary_with_input_flag() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "one.png");
    std::fs::write(dir.path().join("broken.jpg"), b"garbage").unwrap();

    let output = sizecap()
        .arg("--input")
        .arg(dir.path())
        .args(["--json", "-Q"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["files_found"], 2);
    assert_eq!(summary["saved"], 1);
    assert_eq!(summary["skipped"], 1);
    assert!(dir.path().join("Compressed").join("one.png").is_file());
}

#[test]
fn destination_from_environment() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "env.png");

    sizecap()
        .env("DESTINATION_FOLDER_NAME", "FromEnv")
        .env("BATCH_SIZE", "not a number")
        .arg("-i")
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("FromEnv").join("env.png").is_file());
}

#[test]
fn cli_flag_beats_environment() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "flag.png");

    sizecap()
        .env("DESTINATION_FOLDER_NAME", "FromEnv")
        .args(["--destination", "FromFlag", "-i"])
        .arg(dir.path())
        .assert()
        .success();

    assert!(dir.path().join("FromFlag").is_dir());
    assert!(!dir.path().join("FromEnv").exists());
}

#[test]
fn empty_folder_is_a_noop() {
    let dir = TempDir::new().unwrap();

    sizecap()
        .arg("-i")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No files to process"));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn invalid_batch_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_image(dir.path(), "x.png");

    sizecap()
        .args(["--batch-size", "0", "-i"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));

    assert!(!dir.path().join("Compressed").exists());
}

#[test]
fn lists_builtin_profiles() {
    sizecap()
        .args(["profiles", "--detailed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("standard"))
        .stdout(predicate::str::contains("discord"))
        .stdout(predicate::str::contains("Discord formatted"));
}

#[test]
fn example_config_validates() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sizecap.toml");

    sizecap()
        .arg("example-config")
        .arg("-o")
        .arg(&path)
        .assert()
        .success();
    assert!(path.is_file());

    sizecap()
        .arg("config")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"));
}
