//! Pure calculation functions for layer geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Logical coordinates are canvas pixels as `f64` (`kurbo` types); raster
//! coordinates are integer device pixels after applying a multiplier.

use super::backend::Dimensions;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Per-axis scale that maps an image's natural size onto a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitTransform {
    pub scale_x: f64,
    pub scale_y: f64,
}

impl FitTransform {
    pub const IDENTITY: FitTransform = FitTransform {
        scale_x: 1.0,
        scale_y: 1.0,
    };
}

/// Calculate the non-uniform fit-to-cover transform.
///
/// Width and height are scaled independently so the image covers the canvas
/// exactly on both axes; the aspect ratio is not preserved.
///
/// # Examples
/// ```
/// # use twibbon::imaging::{Dimensions, fit_to_cover};
/// let fit = fit_to_cover(
///     Dimensions { width: 1000, height: 250 },
///     Dimensions { width: 500, height: 500 },
/// );
/// assert_eq!((fit.scale_x, fit.scale_y), (0.5, 2.0));
/// ```
pub fn fit_to_cover(base: Dimensions, canvas: Dimensions) -> FitTransform {
    FitTransform {
        scale_x: canvas.width as f64 / base.width.max(1) as f64,
        scale_y: canvas.height as f64 / base.height.max(1) as f64,
    }
}

/// Logical size of a layer: natural size × fit × user scale.
pub fn rendered_size(base: Dimensions, fit: FitTransform, user_scale: f64) -> Size {
    Size::new(
        base.width as f64 * fit.scale_x * user_scale,
        base.height as f64 * fit.scale_y * user_scale,
    )
}

/// Overlay size for a zoom factor: the canvas size times the factor.
pub fn scaled_canvas_size(canvas: Dimensions, factor: f64) -> Size {
    Size::new(canvas.width as f64 * factor, canvas.height as f64 * factor)
}

pub fn canvas_center(canvas: Dimensions) -> Point {
    Point::new(canvas.width as f64 / 2.0, canvas.height as f64 / 2.0)
}

/// Rectangle of the given size centred on `center`.
pub fn centered_rect(center: Point, size: Size) -> Rect {
    Rect::from_center_size(center, size)
}

/// Pixel dimensions of a raster taken at `multiplier` × the logical size.
pub fn export_pixel_size(export: Dimensions, multiplier: u32) -> Dimensions {
    Dimensions {
        width: export.width.saturating_mul(multiplier),
        height: export.height.saturating_mul(multiplier),
    }
}

/// Placement of a logical rectangle inside a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePlacement {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Map a logical rectangle into raster pixels for a crop origin and multiplier.
///
/// Returns `None` when the rectangle collapses to zero pixels. Sizes past
/// `u32::MAX` are capped around the rectangle's center.
pub fn device_placement(rect: Rect, crop_origin: Point, multiplier: f64) -> Option<DevicePlacement> {
    let width = (rect.width() * multiplier).round().min(u32::MAX as f64);
    let height = (rect.height() * multiplier).round().min(u32::MAX as f64);
    if !(width >= 1.0 && height >= 1.0) {
        return None;
    }
    let center = rect.center();
    Some(DevicePlacement {
        x: ((center.x - crop_origin.x) * multiplier - width / 2.0).round() as i64,
        y: ((center.y - crop_origin.y) * multiplier - height / 2.0).round() as i64,
        width: width as u32,
        height: height as u32,
    })
}
