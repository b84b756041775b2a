//! Filter pipeline.
//!
//! [`apply`] is a pure function of `(image, filters)`: the input is never
//! mutated, and callers always pass a layer's unfiltered source. Applying the
//! same set again therefore yields the same pixels, which is what makes a
//! resize-induced reload safe.

use super::params::{Filter, FilterSet};
use image::{RgbaImage, imageops};

/// Run every filter in order against a copy of `image`.
pub fn apply(image: &RgbaImage, filters: &FilterSet) -> RgbaImage {
    let mut out = image.clone();
    for filter in filters.iter() {
        out = match *filter {
            Filter::Blur { amount } => blur(&out, amount),
            Filter::Brightness { amount } => {
                brightness_in_place(&mut out, amount);
                out
            }
            Filter::Contrast { amount } => {
                contrast_in_place(&mut out, amount);
                out
            }
        };
    }
    out
}

fn blur(image: &RgbaImage, amount: f32) -> RgbaImage {
    let longer_edge = image.width().max(image.height()) as f32;
    let sigma = amount.clamp(0.0, 1.0) * longer_edge / 20.0;
    if sigma <= 0.0 {
        return image.clone();
    }
    imageops::blur(image, sigma)
}

fn brightness_in_place(image: &mut RgbaImage, amount: f32) {
    let delta = (amount.clamp(-1.0, 1.0) * 255.0).round() as i32;
    if delta == 0 {
        return;
    }
    for px in image.pixels_mut() {
        for c in &mut px.0[..3] {
            *c = (*c as i32 + delta).clamp(0, 255) as u8;
        }
    }
}

fn contrast_in_place(image: &mut RgbaImage, amount: f32) {
    let c = (amount.clamp(-1.0, 1.0) * 255.0).floor();
    if c == 0.0 {
        return;
    }
    let factor = 259.0 * (c + 255.0) / (255.0 * (259.0 - c));
    for px in image.pixels_mut() {
        for v in &mut px.0[..3] {
            *v = (factor * (*v as f32 - 128.0) + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}
