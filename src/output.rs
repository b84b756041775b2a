//! CLI output formatting.
//!
//! # Layer Display Contract
//!
//! Every layer follows the same two-level pattern:
//!
//! 1. **Header line**: zero-padded z-index + layer name (+ zoom for the overlay)
//! 2. **Context lines**: indented `Source:` and geometry
//!
//! # Output Format
//!
//! ## Compose
//!
//! ```text
//! Scene 500x500 (export 500x500)
//! 000 background
//!     Source: frame.png
//!     Placed: 1080x1080 → 500x500 at (0, 0)
//! 001 overlay ×1.20
//!     Source: face.jpg
//!     Placed: 640x960 → 600x600 at (-50, -50)
//!
//! Exported 2000x2000 jpeg (184213 bytes) → Twibbon Hut RI-79.jpg
//! ```
//!
//! ## Check
//!
//! ```text
//! frame.png
//!     URL shape: ok
//!     Header: 1080x1080
//!     Loaded: 1080x1080
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure and do no I/O.

use crate::export::EncodedImage;
use crate::imaging::Dimensions;
use crate::layer::{LayerName, LayerRecord};
use crate::scene::SceneRecord;
use crate::surface::LoadOutcome;
use std::path::Path;

/// Longest source string shown before truncation. Data URIs run to megabytes.
const MAX_SOURCE_LEN: usize = 60;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a z-index as 3-digit zero-padded.
fn format_index(z: u32) -> String {
    format!("{:0>3}", z)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate to `max` characters, appending `...` if truncated.
fn truncate_source(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Whole canvas pixels, without a `-0`.
fn px(v: f64) -> f64 {
    v.round() + 0.0
}

fn layer_header(layer: &LayerRecord) -> String {
    match layer.name {
        LayerName::Overlay => format!(
            "{} {} \u{00d7}{:.2}",
            format_index(layer.z_index),
            layer.name,
            layer.user_scale
        ),
        LayerName::Background => format!("{} {}", format_index(layer.z_index), layer.name),
    }
}

fn layer_lines(layer: &LayerRecord) -> Vec<String> {
    let [x, y, w, h] = layer.bounds;
    vec![
        layer_header(layer),
        format!(
            "{}Source: {}",
            indent(1),
            truncate_source(&layer.source_ref, MAX_SOURCE_LEN)
        ),
        format!(
            "{}Placed: {} \u{2192} {}x{} at ({}, {})",
            indent(1),
            layer.base_size,
            px(w),
            px(h),
            px(x),
            px(y)
        ),
    ]
}

// ============================================================================
// Scene
// ============================================================================

/// Format a scene snapshot, layers bottom-to-top.
pub fn format_scene(scene: &SceneRecord) -> Vec<String> {
    let mut lines = vec![format!(
        "Scene {} (export {})",
        scene.canvas_size, scene.export_size
    )];
    if scene.layers.is_empty() {
        lines.push(format!("{}(no layers)", indent(1)));
    }
    for layer in &scene.layers {
        lines.extend(layer_lines(layer));
    }
    lines
}

pub fn format_load_outcome(name: LayerName, source: &str, outcome: LoadOutcome) -> String {
    let status = match outcome {
        LoadOutcome::Committed => "loaded",
        LoadOutcome::Superseded => "superseded",
        LoadOutcome::Failed => "failed",
        LoadOutcome::NotReady => "skipped (surface not ready)",
    };
    format!(
        "{}: {} {}",
        name,
        truncate_source(source, MAX_SOURCE_LEN),
        status
    )
}

// ============================================================================
// Compose
// ============================================================================

/// Format the result of a compose run: the scene, then the written export.
pub fn format_compose_output(
    scene: &SceneRecord,
    encoded: &EncodedImage,
    output: &Path,
) -> Vec<String> {
    let mut lines = format_scene(scene);
    lines.push(String::new());
    lines.push(format!(
        "Exported {} {} ({} bytes) \u{2192} {}",
        encoded.dimensions,
        encoded.format.mime_type().trim_start_matches("image/"),
        encoded.bytes.len(),
        output.display()
    ));
    lines
}

pub fn print_compose_output(scene: &SceneRecord, encoded: &EncodedImage, output: &Path) {
    for line in format_compose_output(scene, encoded, output) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Outcome of `twibbon check` for one source.
#[derive(Debug)]
pub struct CheckReport {
    pub source: String,
    pub url_shape_ok: bool,
    /// Dimensions read from the header, before any decode.
    pub header: Option<Dimensions>,
    pub loaded: Result<Dimensions, String>,
}

pub fn format_check_output(report: &CheckReport) -> Vec<String> {
    let shape = if report.url_shape_ok { "ok" } else { "not recognised" };
    let loaded = match &report.loaded {
        Ok(dims) => format!("{}Loaded: {}", indent(1), dims),
        Err(reason) => format!("{}Load failed: {}", indent(1), reason),
    };
    let mut lines = vec![
        truncate_source(&report.source, MAX_SOURCE_LEN),
        format!("{}URL shape: {}", indent(1), shape),
    ];
    if let Some(dims) = report.header {
        lines.push(format!("{}Header: {}", indent(1), dims));
    }
    lines.push(loaded);
    lines
}

pub fn print_check_output(report: &CheckReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}
