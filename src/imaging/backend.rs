//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the compositor
//! needs from a pixel backend: identify, decode, and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) on top of the `image`
//! crate. Tests swap in a recording mock so loader and exporter logic can be
//! checked without touching codecs.

use super::params::EncodeParams;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format")]
    UnsupportedFormat,
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Natural pixel size of an image or surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all three operations so the loader and
/// exporter stay backend-agnostic.
pub trait ImageBackend {
    /// Read image dimensions from encoded bytes without a full decode.
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode encoded bytes into straight-alpha RGBA8.
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError>;

    /// Encode an RGBA8 raster.
    fn encode(&self, image: &RgbaImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
