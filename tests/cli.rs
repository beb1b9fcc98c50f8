//! Integration tests driving the image2tensor binary.

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

const META: &str = r#"
input_meta:
  databases:
  - ports:
    - layout: nhwc
      shape: [1, 16, 16, 3]
      preprocess:
        reverse_channel: false
        mean: [127.5]
        scale: [0.0078125]
"#;

fn image2tensor_cmd() -> Command {
    Command::cargo_bin("image2tensor").unwrap()
}

struct Workspace {
    _root: TempDir,
    input: std::path::PathBuf,
    output: std::path::PathBuf,
    meta: std::path::PathBuf,
}

fn workspace() -> Workspace {
    let root = TempDir::new().unwrap();
    let input = root.path().join("input_folder");
    let output = root.path().join("output_folder");
    std::fs::create_dir(&input).unwrap();
    std::fs::create_dir(&output).unwrap();
    let meta = root.path().join("inputmeta.yml");
    std::fs::write(&meta, META).unwrap();
    RgbImage::from_pixel(20, 10, Rgb([255, 0, 128]))
        .save(input.join("sample.png"))
        .unwrap();
    Workspace {
        _root: root,
        input,
        output,
        meta,
    }
}

#[test]
fn test_cli_help() {
    image2tensor_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tensor"))
        .stdout(predicate::str::contains("resize"));
}

#[test]
fn test_tensor_command() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("tensor")
        .arg("--input-meta")
        .arg(&ws.meta)
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .assert()
        .success()
        .stdout(predicate::str::contains("==========DONE=========="));

    let bytes = std::fs::read(ws.output.join("sample.tensor")).unwrap();
    assert_eq!(bytes.len(), 16 * 16 * 3 * 4);
}

#[test]
fn test_underscore_aliases() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("tensor")
        .arg("--input_meta")
        .arg(&ws.meta)
        .arg("--input_path")
        .arg(&ws.input)
        .arg("--output_path")
        .arg(&ws.output)
        .arg("--keep_ratio")
        .arg("false")
        .assert()
        .success();
    assert!(ws.output.join("sample.tensor").exists());
}

#[test]
fn test_missing_output_dir_is_fatal() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("tensor")
        .arg("--input-meta")
        .arg(&ws.meta)
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(ws.output.join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid output dir"))
        .stdout(predicate::str::contains("DONE").not());
}

#[test]
fn test_missing_meta_is_fatal() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("tensor")
        .arg("--input-meta")
        .arg(ws.input.join("missing.yml"))
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid input meta yaml file"));
}

#[test]
fn test_resize_non_square_keep_ratio_is_fatal() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("resize")
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .arg("--width")
        .arg("300")
        .arg("--height")
        .arg("400")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not square"));
    assert!(!ws.output.join("sample.jpg").exists());
}

#[test]
fn test_resize_without_ratio() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("resize")
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .arg("--width")
        .arg("30")
        .arg("--height")
        .arg("40")
        .arg("--keep-ratio")
        .arg("false")
        .assert()
        .success()
        .stdout(predicate::str::contains("DONE"));
    let resized = image::open(ws.output.join("sample.jpg")).unwrap();
    assert_eq!((resized.width(), resized.height()), (30, 40));
}

#[test]
fn test_empty_input_dir_prints_done() {
    let ws = workspace();
    std::fs::remove_file(ws.input.join("sample.png")).unwrap();
    image2tensor_cmd()
        .arg("tensor")
        .arg("--input-meta")
        .arg(&ws.meta)
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .assert()
        .success()
        .stdout(predicate::str::contains("==========DONE=========="))
        .stderr(predicate::str::contains("no images found"));
}

#[test]
fn test_keep_going_failure_exits_non_zero() {
    let ws = workspace();
    std::fs::write(ws.input.join("broken.png"), b"not an image").unwrap();
    image2tensor_cmd()
        .arg("tensor")
        .arg("--input-meta")
        .arg(&ws.meta)
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .arg("--keep-going")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.png"))
        .stdout(predicate::str::contains("DONE").not());
    assert!(ws.output.join("sample.tensor").exists());
}

#[test]
fn test_zero_resize_width_rejected() {
    let ws = workspace();
    image2tensor_cmd()
        .arg("resize")
        .arg("--input-path")
        .arg(&ws.input)
        .arg("--output-path")
        .arg(&ws.output)
        .arg("--width")
        .arg("0")
        .arg("--keep-ratio")
        .arg("false")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--width"));
    assert!(!ws.output.join("sample.jpg").exists());
}
