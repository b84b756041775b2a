//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the compositor (which decides which filters a layer gets
//! and how an export is encoded) and the [`backend`](super::backend) and
//! [`filters`](super::filters) modules (which do the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Filter`]: A single visual filter with its parameter.
//! - [`FilterSet`]: The ordered filters a layer kind receives at load time.
//! - [`EncodeFormat`]: Output container for exports (JPEG or PNG).
//! - [`EncodeParams`]: Everything an encode needs: format and quality.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// A deterministic per-pixel or neighbourhood filter.
///
/// - `Blur`: `amount` in `[0, 1]`, relative to the image's longer edge
///   (`sigma = amount * longer_edge / 20`). `0` is the identity.
/// - `Brightness`: `amount` in `[-1, 1]`, added to every colour channel as
///   `amount * 255`. `0` is the identity.
/// - `Contrast`: `amount` in `[-1, 1]`, pivoting every colour channel around
///   mid-grey. `0` is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    Blur { amount: f32 },
    Brightness { amount: f32 },
    Contrast { amount: f32 },
}

/// Ordered list of filters applied to a layer's decoded source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(Vec<Filter>);

impl FilterSet {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Background frames are unfiltered unless they stand in as a blurred
    /// placeholder.
    pub fn background(blur: Option<f32>) -> Self {
        match blur {
            Some(amount) => Self(vec![Filter::Blur { amount }]),
            None => Self::empty(),
        }
    }

    /// The user photo always gets brightness then contrast normalization.
    pub fn overlay(brightness: f32, contrast: f32) -> Self {
        Self(vec![
            Filter::Brightness { amount: brightness },
            Filter::Contrast { amount: contrast },
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Container format for exported images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFormat {
    #[default]
    Jpeg,
    Png,
}

impl EncodeFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "image/jpeg",
            EncodeFormat::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::Png => "png",
        }
    }
}

/// Parameters for an encode operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: EncodeFormat,
    /// Ignored by lossless formats.
    pub quality: Quality,
}
