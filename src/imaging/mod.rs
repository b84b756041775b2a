//! Image processing in pure Rust, with no system libraries.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image::load_from_memory` → RGBA8 |
//! | **Filters** | brightness/contrast per pixel, blur via `image::imageops::blur` |
//! | **Encode** | JPEG / PNG encoders from the `image` crate |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for layer geometry (unit testable)
//! - **Parameters**: Data structures describing filters and encodes
//! - **Filters**: The deterministic filter pipeline
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod filters;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    DevicePlacement, FitTransform, canvas_center, centered_rect, device_placement,
    export_pixel_size, fit_to_cover, rendered_size, scaled_canvas_size,
};
pub use params::{EncodeFormat, EncodeParams, Filter, FilterSet, Quality};
pub use rust_backend::RustBackend;
