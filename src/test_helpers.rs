//! Shared test utilities for the twibbon test suite.
//!
//! Provides synthetic image builders and fetchers that let tests control
//! exactly when (and in which order) loads complete.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let fetcher = GatedFetcher::new();
//! let surface = surface_with(fetcher.clone());
//! let first = surface.add_frame("a.png");
//! let second = surface.add_frame("b.png");
//! fetcher.release("b.png", png_bytes(&solid_image(4, 4, RED)));
//! fetcher.release("a.png", png_bytes(&solid_image(4, 4, BLUE)));
//! ```

use crate::config::CompositorConfig;
use crate::imaging::RustBackend;
use crate::loader::{Fetch, ImageLoader, ImageSource, LoadError};
use crate::responsive::Breakpoint;
use crate::surface::{CanvasSurface, FrameBuffer};
use base64::Engine as _;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use image::{ImageEncoder, Rgba, RgbaImage};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);

// =========================================================================
// Synthetic images
// =========================================================================

pub fn solid_image(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 17 % 256) as u8, (y * 29 % 256) as u8, 128, 255])
    })
}

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    out
}

pub fn data_uri(image: &RgbaImage) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(image))
    )
}

// =========================================================================
// Fetchers
// =========================================================================

/// Answers immediately from a fixed map of source → bytes.
#[derive(Clone, Default)]
pub struct MemoryFetcher {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, source: &str, image: &RgbaImage) -> Self {
        self.entries
            .borrow_mut()
            .insert(source.to_string(), png_bytes(image));
        self
    }
}

fn source_key(source: &ImageSource) -> String {
    match source {
        ImageSource::File(path) => path.to_string_lossy().into_owned(),
        other => other.to_string(),
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, source: &ImageSource) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let key = source_key(source);
        let result = self.entries.borrow().get(&key).cloned().ok_or(LoadError::Fetch {
            source_ref: key,
            reason: "404".to_string(),
        });
        futures::future::ready(result).boxed_local()
    }
}

/// Holds every fetch open until the test releases it.
#[derive(Clone, Default)]
pub struct GatedFetcher {
    pending: Rc<RefCell<HashMap<String, Vec<oneshot::Sender<Result<Vec<u8>, LoadError>>>>>>,
}

impl GatedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete the oldest pending fetch for `source` with image bytes.
    pub fn release(&self, source: &str, bytes: Vec<u8>) {
        self.complete(source, Ok(bytes));
    }

    /// Complete the oldest pending fetch for `source` with a failure.
    pub fn fail(&self, source: &str) {
        self.complete(
            source,
            Err(LoadError::Fetch {
                source_ref: source.to_string(),
                reason: "connection reset".to_string(),
            }),
        );
    }

    fn complete(&self, source: &str, result: Result<Vec<u8>, LoadError>) {
        let sender = {
            let mut pending = self.pending.borrow_mut();
            let queue = pending
                .get_mut(source)
                .unwrap_or_else(|| panic!("no pending fetch for {source}"));
            queue.remove(0)
        };
        let _ = sender.send(result);
    }
}

impl Fetch for GatedFetcher {
    fn fetch(&self, source: &ImageSource) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        let key = source_key(source);
        let (tx, rx) = oneshot::channel();
        self.pending
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push(tx);
        async move {
            rx.await.unwrap_or(Err(LoadError::Fetch {
                source_ref: key,
                reason: "cancelled".to_string(),
            }))
        }
        .boxed_local()
    }
}

// =========================================================================
// Surfaces
// =========================================================================

/// A surface over `fetcher` and the real backend, created at the wide preset.
pub fn surface_with(fetcher: impl Fetch + 'static) -> CanvasSurface<FrameBuffer> {
    let surface = CanvasSurface::new(
        CompositorConfig::default(),
        ImageLoader::new(fetcher, RustBackend::new()),
    );
    surface.create(FrameBuffer::default(), Breakpoint::Wide);
    surface
}
