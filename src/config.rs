//! Compositor configuration.
//!
//! Handles loading, validating, and merging a `twibbon.toml` file. User
//! values are layered over stock defaults, so a config file only needs the
//! keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [canvas]
//! background = "#EEEEF3"      # Fill behind all layers
//! breakpoint_min_width = 768  # Viewport width at which the wide preset applies
//!
//! [canvas.wide]
//! width = 500
//! height = 500
//!
//! [canvas.narrow]
//! width = 300
//! height = 300
//!
//! [export]
//! multiplier = 4              # Export pixels per canvas pixel
//! quality = 100               # JPEG quality (1-100)
//! format = "jpeg"             # "jpeg" or "png"
//!
//! [filters]
//! background_blur = 0.5       # Blur for placeholder backgrounds (0-1)
//! overlay_brightness = 0.0    # -1 to 1
//! overlay_contrast = 0.0      # -1 to 1
//!
//! [scale]
//! initial = 1.0               # Zoom applied to a fresh overlay
//! ui_min = 0.2                # Slider bounds; the compositor never clamps
//! ui_max = 3.0
//! ui_step = 0.01
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Dimensions, EncodeFormat};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Compositor configuration loaded from `twibbon.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositorConfig {
    /// Canvas fill and the two responsive presets.
    pub canvas: CanvasConfig,
    /// Export resolution and encoding.
    pub export: ExportConfig,
    /// Filter parameters per layer kind.
    pub filters: FiltersConfig,
    /// Zoom defaults and slider hints.
    pub scale: ScaleConfig,
}

impl CompositorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, preset) in [("wide", &self.canvas.wide), ("narrow", &self.canvas.narrow)] {
            if preset.width == 0 || preset.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "canvas.{name} dimensions must be non-zero"
                )));
            }
        }
        parse_hex_color(&self.canvas.background)?;
        if !(1..=16).contains(&self.export.multiplier) {
            return Err(ConfigError::Validation(
                "export.multiplier must be 1-16".into(),
            ));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.filters.background_blur) {
            return Err(ConfigError::Validation(
                "filters.background_blur must be 0-1".into(),
            ));
        }
        for (name, value) in [
            ("overlay_brightness", self.filters.overlay_brightness),
            ("overlay_contrast", self.filters.overlay_contrast),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "filters.{name} must be between -1 and 1"
                )));
            }
        }
        let scale = &self.scale;
        if !(scale.ui_min <= scale.initial && scale.initial <= scale.ui_max) {
            return Err(ConfigError::Validation(
                "scale.initial must lie within ui_min..=ui_max".into(),
            ));
        }
        if !(scale.ui_step > 0.0) {
            return Err(ConfigError::Validation(
                "scale.ui_step must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// A fixed canvas size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetSize {
    pub width: u32,
    pub height: u32,
}

impl PresetSize {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Canvas fill colour as `#RRGGBB`, `#RGB` or `#RRGGBBAA`.
    pub background: String,
    /// Viewports at least this wide use the wide preset.
    pub breakpoint_min_width: u32,
    pub wide: PresetSize,
    pub narrow: PresetSize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            background: "#EEEEF3".to_string(),
            breakpoint_min_width: 768,
            wide: PresetSize {
                width: 500,
                height: 500,
            },
            narrow: PresetSize {
                width: 300,
                height: 300,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Export pixels per logical canvas pixel, independent of display density.
    pub multiplier: u32,
    pub quality: u32,
    pub format: EncodeFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            multiplier: 4,
            quality: 100,
            format: EncodeFormat::Jpeg,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersConfig {
    /// Blur amount for placeholder backgrounds. Regular backgrounds are never blurred.
    pub background_blur: f32,
    pub overlay_brightness: f32,
    pub overlay_contrast: f32,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            background_blur: 0.5,
            overlay_brightness: 0.0,
            overlay_contrast: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaleConfig {
    pub initial: f64,
    pub ui_min: f64,
    pub ui_max: f64,
    pub ui_step: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            ui_min: 0.2,
            ui_max: 3.0,
            ui_step: 0.01,
        }
    }
}

impl ScaleConfig {
    /// Clamp a slider value to the UI range. The compositor itself accepts
    /// any finite non-negative factor.
    pub fn clamp_to_ui(&self, factor: f64) -> f64 {
        factor.clamp(self.ui_min, self.ui_max)
    }
}

/// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA` into RGBA.
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>, ConfigError> {
    let invalid = || ConfigError::Validation(format!("invalid colour {value:?}"));
    let hex = value.strip_prefix('#').ok_or_else(invalid)?;
    if !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match hex.len() {
        3 => {
            let mut out = [0u8, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                let v = channel(&c.to_string())?;
                out[i] = v * 17;
            }
            Ok(Rgba(out))
        }
        6 | 8 => {
            let mut out = [0u8, 0, 0, 255];
            for i in 0..hex.len() / 2 {
                out[i] = channel(&hex[i * 2..i * 2 + 2])?;
            }
            Ok(Rgba(out))
        }
        _ => Err(invalid()),
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CompositorConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CompositorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CompositorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or stock defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<CompositorConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = match path {
        Some(p) => load_raw_config(p)?,
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `twibbon.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Twibbon Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Canvas
# ---------------------------------------------------------------------------
[canvas]
# Colour painted behind every layer.
background = "#EEEEF3"

# Viewports at least this many CSS pixels wide use the wide preset.
breakpoint_min_width = 768

# The two supported canvas sizes. Exports use the same logical size.
[canvas.wide]
width = 500
height = 500

[canvas.narrow]
width = 300
height = 300

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Export pixels per canvas pixel. 4 turns a 500x500 canvas into 2000x2000.
multiplier = 4

# Encoding quality (1 = worst, 100 = best). Ignored for PNG.
quality = 100

# "jpeg" or "png".
format = "jpeg"

# ---------------------------------------------------------------------------
# Filters
# ---------------------------------------------------------------------------
[filters]
# Blur applied to placeholder backgrounds only (0 = none, 1 = heavy).
background_blur = 0.5

# Brightness and contrast normalization for the user photo (-1 to 1).
overlay_brightness = 0.0
overlay_contrast = 0.0

# ---------------------------------------------------------------------------
# Scale
# ---------------------------------------------------------------------------
[scale]
# Zoom applied to a freshly loaded photo.
initial = 1.0

# Slider range and step. The compositor accepts any non-negative zoom;
# these only bound interactive controls.
ui_min = 0.2
ui_max = 3.0
ui_step = 0.01
"##
}
