//! # Twibbon
//!
//! A layered image compositor for twibbons: a fixed decorative frame as the
//! background layer and a user's photo as the overlay above it, zoomed and
//! positioned by hand, then exported as one raster image.
//!
//! # Architecture: Load → Filter → Upsert → Render
//!
//! Every change to what is on screen runs through the same sequence, owned
//! by [`surface::CanvasSurface`]:
//!
//! ```text
//! add_background / add_frame
//!     → loader    source string → decoded RGBA        (async, may be superseded)
//!     → filters   fixed per-layer filter set          (pure, idempotent)
//!     → layer     upsert into the z-ordered store     (atomic under one borrow)
//!     → render    rasterize scene → DrawTarget        (synchronous)
//! ```
//!
//! Scale changes and breakpoint changes are explicit event handlers on the
//! surface ([`surface::CanvasSurface::on_scale_change`],
//! [`surface::CanvasSurface::on_breakpoint_change`]), not implicit re-runs.
//! Export ([`surface::CanvasSurface::to_image`]) rasterizes at a fixed
//! multiplier of the export size, independent of the display.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`surface`] | Surface lifecycle, load sequencing, stale-completion and disposal guards |
//! | [`scene`] | Canvas size, export size and the layer store of one surface |
//! | [`layer`] | `LayerName`, `Layer`, `LayerStore`, explicit layer serialization |
//! | [`loader`] | Source parsing and async fetch/decode of URLs, data URIs, blobs and files |
//! | [`scale`] | Zoom factor → overlay size (`canvas × factor`) |
//! | [`responsive`] | Wide/narrow breakpoints and their canvas presets |
//! | [`render`] | Scene rasterization at any multiplier and crop |
//! | [`export`] | Export settings, encoding and download naming |
//! | [`imaging`] | Pure-Rust pixel work: geometry math, filters, decode/encode backend |
//! | [`config`] | `twibbon.toml` loading, validation and merging |
//! | [`validator`] | URL-shape check for user-supplied frame sources |
//! | [`session`] | Slug-keyed memory of frame parameters |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Single-Threaded Async
//!
//! The surface is driven from one thread, like a browser canvas. State lives
//! in `Rc<RefCell<_>>` and load futures are `!Send` `LocalBoxFuture`s; any
//! single-threaded executor drives them (`futures::executor::block_on` in
//! the CLI). No locks exist because nothing runs in parallel: correctness
//! rests on per-layer request sequence numbers and on checking surface state
//! at commit time.
//!
//! ## Full Relayout on Breakpoint Change
//!
//! Fit-to-cover is non-uniform and relative to the canvas, and filters are
//! baked into layer pixels. A breakpoint change therefore clears the scene
//! and reloads every committed source against the new canvas instead of
//! rescaling what is already there.
//!
//! ## Unbounded Zoom
//!
//! The scale controller accepts any finite, non-negative factor. The 0.2–3.0
//! slider range is a UI hint carried in [`config::ScaleConfig`].

pub mod config;
pub mod export;
pub mod imaging;
pub mod layer;
pub mod loader;
pub mod output;
pub mod render;
pub mod responsive;
pub mod scale;
pub mod scene;
pub mod session;
pub mod surface;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_helpers;
