//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, WebP, GIF, BMP) | `image::load_from_memory` → RGBA8 |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha dropped) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeFormat, EncodeParams};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError, ImageReader, RgbaImage};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn map_image_error(err: ImageError) -> BackendError {
    match err {
        ImageError::Unsupported(_) => BackendError::UnsupportedFormat,
        ImageError::IoError(e) => BackendError::Io(e),
        other => BackendError::ProcessingFailed(other.to_string()),
    }
}

/// Encode as JPEG. Export rasters are composited over an opaque background,
/// so dropping alpha loses nothing.
fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {}", e)))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(map_image_error)?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
        image::load_from_memory(bytes)
            .map(|img| img.to_rgba8())
            .map_err(map_image_error)
    }

    fn encode(&self, image: &RgbaImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        match params.format {
            EncodeFormat::Jpeg => encode_jpeg(image, params.quality.value() as u8),
            EncodeFormat::Png => encode_png(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{png_bytes, solid_image};
    use image::Rgba;

    #[test]
    fn identify_synthetic_png() {
        let bytes = png_bytes(&solid_image(200, 150, Rgba([10, 20, 30, 255])));

        let dims = RustBackend::new().identify(&bytes).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn identify_garbage_errors() {
        assert!(RustBackend::new().identify(b"definitely not an image").is_err());
    }

    #[test]
    fn decode_synthetic_png_preserves_pixels() {
        let src = solid_image(4, 3, Rgba([100, 50, 200, 128]));
        let decoded = RustBackend::new().decode(&png_bytes(&src)).unwrap();
        assert_eq!(decoded, src);
    }

    #[test]
    fn decode_garbage_is_unsupported() {
        let err = RustBackend::new().decode(b"GIF? no").unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedFormat));
    }

    #[test]
    fn encode_jpeg_produces_jpeg_magic() {
        let img = solid_image(16, 16, Rgba([200, 10, 10, 255]));
        let bytes = RustBackend::new()
            .encode(
                &img,
                &EncodeParams {
                    format: EncodeFormat::Jpeg,
                    quality: Quality::new(100),
                },
            )
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn encode_png_roundtrips_dimensions() {
        let img = solid_image(7, 5, Rgba([0, 0, 0, 0]));
        let backend = RustBackend::new();
        let bytes = backend
            .encode(
                &img,
                &EncodeParams {
                    format: EncodeFormat::Png,
                    quality: Quality::default(),
                },
            )
            .unwrap();
        assert_eq!(backend.identify(&bytes).unwrap(), Dimensions::new(7, 5));
    }
}
