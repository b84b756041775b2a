//! Scene rasterization.
//!
//! One routine serves both the live display (multiplier 1, crop = canvas)
//! and export (multiplier from config, crop = export rect). Layers are drawn
//! bottom-to-top; only the part of each layer that lands inside the frame is
//! resampled, so a heavily zoomed overlay never allocates more than the
//! frame itself.

use crate::imaging::{DevicePlacement, device_placement};
use crate::scene::Scene;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use kurbo::Rect;

/// Rasterize `crop` (in canvas coordinates) at `multiplier` device pixels
/// per canvas pixel.
pub fn rasterize(scene: &Scene, background: Rgba<u8>, multiplier: f64, crop: Rect) -> RgbaImage {
    let width = (crop.width() * multiplier).round().max(1.0) as u32;
    let height = (crop.height() * multiplier).round().max(1.0) as u32;
    let mut frame = RgbaImage::from_pixel(width, height, background);

    for layer in scene.layers().all() {
        let Some(placement) = device_placement(layer.bounds(), crop.origin(), multiplier) else {
            continue;
        };
        let Some(visible) = visible_part(layer.pixels(), placement, width, height) else {
            continue;
        };
        imageops::overlay(&mut frame, &visible.pixels, visible.x, visible.y);
    }
    frame
}

struct VisiblePart {
    pixels: RgbaImage,
    x: i64,
    y: i64,
}

/// Resample the portion of `source` that `placement` puts inside a
/// `frame_w`×`frame_h` frame.
fn visible_part(
    source: &RgbaImage,
    placement: DevicePlacement,
    frame_w: u32,
    frame_h: u32,
) -> Option<VisiblePart> {
    let x0 = placement.x.max(0);
    let y0 = placement.y.max(0);
    let x1 = (placement.x + placement.width as i64).min(frame_w as i64);
    let y1 = (placement.y + placement.height as i64).min(frame_h as i64);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return None;
    }
    let sx = src_w as f64 / placement.width as f64;
    let sy = src_h as f64 / placement.height as f64;

    // Source window covering the visible device rect.
    let src_x0 = (((x0 - placement.x) as f64 * sx).floor() as u32).min(src_w - 1);
    let src_y0 = (((y0 - placement.y) as f64 * sy).floor() as u32).min(src_h - 1);
    let src_x1 = (((x1 - placement.x) as f64 * sx).ceil() as u32).clamp(src_x0 + 1, src_w);
    let src_y1 = (((y1 - placement.y) as f64 * sy).ceil() as u32).clamp(src_y0 + 1, src_h);

    let window =
        imageops::crop_imm(source, src_x0, src_y0, src_x1 - src_x0, src_y1 - src_y0).to_image();
    let pixels = imageops::resize(
        &window,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
        FilterType::Triangle,
    );
    Some(VisiblePart { pixels, x: x0, y: y0 })
}
