//! CLI smoke tests against the built `twibbon` binary.

use image::{ImageEncoder, Rgba, RgbaImage};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn twibbon(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_twibbon"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run twibbon")
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: Rgba<u8>) {
    let image = RgbaImage::from_pixel(width, height, color);
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(image.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    std::fs::write(dir.join(name), out).unwrap();
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn gen_config_prints_parseable_toml() {
    let tmp = TempDir::new().unwrap();
    let output = twibbon(tmp.path(), &["gen-config"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("[canvas]"));
    let parsed: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(parsed["export"]["multiplier"].as_integer(), Some(4));
}

#[test]
fn compose_writes_default_named_export() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "frame.png", 50, 50, Rgba([255, 0, 0, 255]));
    write_png(tmp.path(), "face.png", 20, 30, Rgba([0, 0, 255, 255]));

    let output = twibbon(
        tmp.path(),
        &[
            "compose", "--frame", "frame.png", "--photo", "face.png", "--scale", "0.5",
            "--offset", "-10,10",
        ],
    );
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let written = tmp.path().join("Twibbon Hut RI-79.jpg");
    let decoded = image::open(&written).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (2000, 2000));
    assert!(stdout(&output).contains("001 overlay"));
}

#[test]
fn compose_narrow_with_title_and_slug_remembers_frame() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "frame.png", 40, 40, Rgba([255, 0, 0, 255]));
    write_png(tmp.path(), "face.png", 10, 10, Rgba([0, 255, 0, 255]));

    let first = twibbon(
        tmp.path(),
        &[
            "compose", "--frame", "frame.png", "--photo", "face.png", "--narrow", "--title",
            "Wisuda", "--slug", "wisuda",
        ],
    );
    assert!(first.status.success());
    let decoded = image::open(tmp.path().join("Twibbon Wisuda.jpg")).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1200, 1200));
    assert!(tmp.path().join(".twibbon-session.json").exists());

    // Second run recalls the frame from the slug.
    let second = twibbon(
        tmp.path(),
        &[
            "compose", "--photo", "face.png", "--slug", "wisuda", "--viewport-width", "1024",
            "--output", "again.jpg",
        ],
    );
    assert!(
        second.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&second.stderr)
    );
    let decoded = image::open(tmp.path().join("again.jpg")).unwrap();
    assert_eq!(decoded.width(), 2000);
}

#[test]
fn remembered_frame_is_the_fallback() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "frame.png", 40, 40, Rgba([255, 0, 0, 255]));
    write_png(tmp.path(), "face.png", 10, 10, Rgba([0, 255, 0, 255]));

    let first = twibbon(
        tmp.path(),
        &[
            "compose", "--frame", "frame.png", "--photo", "face.png", "--remember-frame",
            "--output", "first.jpg",
        ],
    );
    assert!(first.status.success());

    let second = twibbon(
        tmp.path(),
        &["compose", "--photo", "face.png", "--output", "second.jpg"],
    );
    assert!(
        second.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&second.stderr)
    );
    assert!(tmp.path().join("second.jpg").exists());
}

#[test]
fn compose_without_any_frame_fails() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "face.png", 10, 10, Rgba([0, 255, 0, 255]));
    let output = twibbon(tmp.path(), &["compose", "--photo", "face.png"]);
    assert!(!output.status.success());
}

#[test]
fn check_reports_dimensions() {
    let tmp = TempDir::new().unwrap();
    write_png(tmp.path(), "frame.png", 64, 48, Rgba([1, 2, 3, 255]));

    let output = twibbon(tmp.path(), &["check", "frame.png"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("URL shape: ok"));
    assert!(text.contains("Header: 64x48"));
    assert!(text.contains("Loaded: 64x48"));

    let missing = twibbon(tmp.path(), &["check", "missing.png"]);
    assert!(!missing.status.success());
    assert!(stdout(&missing).contains("Load failed"));
    assert!(!stdout(&missing).contains("Header:"));
}
