//! Asynchronous image loading.
//!
//! A load turns an opaque source string into a [`DecodedImage`] in two
//! steps: a [`Fetch`] implementation produces the encoded bytes, then the
//! [`ImageBackend`] decodes them to RGBA8. Both steps are independent of any
//! rendering surface; the surface decides later whether the result may
//! commit.
//!
//! ## Sources
//!
//! | Form | Example | Resolved by |
//! |---|---|---|
//! | Network URL | `https://cdn.example.com/frame.png` | `reqwest` (`http` feature) |
//! | Data URI | `data:image/png;base64,iVBOR…` | inline base64 / percent decoding |
//! | Blob reference | `blob:twibbon/3` | the [`BlobStore`] that minted it |
//! | File URL / path | `file:///tmp/face.jpg`, `photos/face.jpg` | `std::fs` |
//!
//! Every form goes through the same [`ImageLoader::load`] path, so a blob
//! created from a picked file behaves exactly like a fetched URL.

use crate::imaging::{BackendError, Dimensions, ImageBackend, RustBackend};
use base64::Engine as _;
use base64::engine::general_purpose;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use image::RgbaImage;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;
use tracing::Instrument;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to fetch {source_ref}: {reason}")]
    Fetch { source_ref: String, reason: String },
    #[error("failed to read {}: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("invalid data URI: {0}")]
    DataUri(String),
    #[error("unknown blob reference: {0}")]
    UnknownBlob(String),
    #[error("unsupported source {source_ref}: {reason}")]
    Unsupported { source_ref: String, reason: String },
    #[error("failed to decode {source_ref}: {err}")]
    Decode {
        source_ref: String,
        #[source]
        err: BackendError,
    },
}

/// A parsed image source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Http(String),
    Data(String),
    Blob(String),
    File(PathBuf),
}

impl ImageSource {
    /// Classify a source string. Anything that is not a recognised URL form
    /// is treated as a filesystem path.
    pub fn parse(raw: &str) -> ImageSource {
        let s = raw.trim();
        let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Http(s.to_string())
        } else if lower.starts_with("data:") {
            ImageSource::Data(s.to_string())
        } else if lower.starts_with("blob:") {
            ImageSource::Blob(s.to_string())
        } else if lower.starts_with("file://") {
            ImageSource::File(PathBuf::from(&s["file://".len()..]))
        } else {
            ImageSource::File(PathBuf::from(s))
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Http(url) | ImageSource::Blob(url) => f.write_str(url),
            ImageSource::Data(uri) => {
                let head: String = uri.chars().take(32).collect();
                write!(f, "{head}…")
            }
            ImageSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Produces the encoded bytes behind an [`ImageSource`].
///
/// The returned future owns everything it needs, so it can outlive the
/// fetcher borrow and be raced against newer requests.
pub trait Fetch {
    fn fetch(&self, source: &ImageSource) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>>;
}

#[derive(Default)]
struct BlobRegistry {
    next_id: u64,
    blobs: HashMap<String, Rc<[u8]>>,
}

/// In-memory registry of locally created image bytes.
///
/// Clones share the same registry, so a UI layer can mint references while
/// the loader resolves them.
#[derive(Clone, Default)]
pub struct BlobStore {
    inner: Rc<RefCell<BlobRegistry>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return a `blob:` reference that loads them.
    pub fn create_object_url(&self, bytes: Vec<u8>) -> String {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let url = format!("blob:twibbon/{}", inner.next_id);
        inner.blobs.insert(url.clone(), Rc::from(bytes));
        url
    }

    /// Forget a reference. Returns whether it was registered.
    pub fn revoke_object_url(&self, url: &str) -> bool {
        self.inner.borrow_mut().blobs.remove(url).is_some()
    }

    pub fn get(&self, url: &str) -> Option<Rc<[u8]>> {
        self.inner.borrow().blobs.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default fetcher covering every [`ImageSource`] form.
#[derive(Clone, Default)]
pub struct SourceFetcher {
    blobs: BlobStore,
}

impl SourceFetcher {
    pub fn new(blobs: BlobStore) -> Self {
        Self { blobs }
    }
}

impl Fetch for SourceFetcher {
    fn fetch(&self, source: &ImageSource) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        match source {
            ImageSource::File(path) => {
                let path = path.clone();
                async move { std::fs::read(&path).map_err(|err| LoadError::Io { path, err }) }
                    .boxed_local()
            }
            ImageSource::Data(uri) => futures::future::ready(decode_data_uri(uri)).boxed_local(),
            ImageSource::Blob(url) => {
                let result = self
                    .blobs
                    .get(url)
                    .map(|bytes| bytes.to_vec())
                    .ok_or_else(|| LoadError::UnknownBlob(url.clone()));
                futures::future::ready(result).boxed_local()
            }
            ImageSource::Http(url) => fetch_http(url.clone()),
        }
    }
}

#[cfg(feature = "http")]
fn fetch_http(url: String) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
    async move {
        let fail = |reason: String| LoadError::Fetch {
            source_ref: url.clone(),
            reason,
        };
        let response = reqwest::blocking::get(&url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| fail(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| fail(e.to_string()))?;
        Ok(bytes.to_vec())
    }
    .boxed_local()
}

#[cfg(not(feature = "http"))]
fn fetch_http(url: String) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
    futures::future::ready(Err(LoadError::Unsupported {
        source_ref: url,
        reason: "network sources need the `http` feature or a host fetcher".to_string(),
    }))
    .boxed_local()
}

/// Decode the payload of a `data:` URI (base64 or percent-encoded).
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadError> {
    let rest = uri
        .trim()
        .get("data:".len()..)
        .ok_or_else(|| LoadError::DataUri("not a data URI".to_string()))?;
    let (meta, data) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DataUri("missing comma".to_string()))?;

    let is_base64 = meta
        .split(';')
        .any(|t| t.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        general_purpose::STANDARD
            .decode(data.trim())
            .or_else(|_| general_purpose::URL_SAFE.decode(data.trim()))
            .map_err(|e| LoadError::DataUri(format!("invalid base64: {e}")))
    } else {
        percent_decode(data)
    }
}

fn percent_decode(s: &str) -> Result<Vec<u8>, LoadError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| LoadError::DataUri("invalid percent-encoding".to_string()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// A decoded image ready to become a layer.
///
/// Owned by the loader's result and shared into layers through `Rc`; when the
/// last layer referencing it is replaced, the pixels are freed.
#[derive(Debug)]
pub struct DecodedImage {
    source_ref: String,
    pixels: RgbaImage,
}

impl DecodedImage {
    pub fn new(source_ref: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            source_ref: source_ref.into(),
            pixels,
        }
    }

    /// The string this image was loaded from.
    pub fn source_ref(&self) -> &str {
        &self.source_ref
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.pixels.width(), self.pixels.height())
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Fetches and decodes image sources.
#[derive(Clone)]
pub struct ImageLoader {
    fetcher: Rc<dyn Fetch>,
    backend: Rc<dyn ImageBackend>,
}

impl ImageLoader {
    pub fn new(fetcher: impl Fetch + 'static, backend: impl ImageBackend + 'static) -> Self {
        Self {
            fetcher: Rc::new(fetcher),
            backend: Rc::new(backend),
        }
    }

    /// Loader over [`SourceFetcher`] and [`RustBackend`] sharing `blobs`.
    pub fn with_blobs(blobs: BlobStore) -> Self {
        Self::new(SourceFetcher::new(blobs), RustBackend::new())
    }

    pub fn backend(&self) -> Rc<dyn ImageBackend> {
        Rc::clone(&self.backend)
    }

    /// Fetch `source_ref` and read its dimensions from the header only.
    pub fn identify(&self, source_ref: &str) -> LocalBoxFuture<'static, Result<Dimensions, LoadError>> {
        let fetch = self.fetcher.fetch(&ImageSource::parse(source_ref));
        let backend = Rc::clone(&self.backend);
        let source_ref = source_ref.to_string();

        async move {
            let bytes = fetch.await?;
            backend
                .identify(&bytes)
                .map_err(|err| LoadError::Decode { source_ref, err })
        }
        .boxed_local()
    }

    /// Start loading `source_ref`.
    ///
    /// The fetch is issued immediately; decoding happens when the returned
    /// future completes.
    pub fn load(&self, source_ref: &str) -> LocalBoxFuture<'static, Result<Rc<DecodedImage>, LoadError>> {
        let source = ImageSource::parse(source_ref);
        let span = tracing::debug_span!("load", source = %source);
        let fetch = self.fetcher.fetch(&source);
        let backend = Rc::clone(&self.backend);
        let source_ref = source_ref.to_string();

        async move {
            let bytes = fetch.await?;
            let pixels = backend.decode(&bytes).map_err(|err| LoadError::Decode {
                source_ref: source_ref.clone(),
                err,
            })?;
            tracing::debug!(width = pixels.width(), height = pixels.height(), "decoded");
            Ok(Rc::new(DecodedImage::new(source_ref, pixels)))
        }
        .instrument(span)
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{data_uri, png_bytes, solid_image};
    use futures::executor::block_on;
    use image::Rgba;

    // =========================================================================
    // ImageSource::parse tests
    // =========================================================================

    #[test]
    fn parse_recognises_url_forms() {
        assert_eq!(
            ImageSource::parse("https://cdn.example.com/a.png"),
            ImageSource::Http("https://cdn.example.com/a.png".into())
        );
        assert_eq!(
            ImageSource::parse("HTTP://example.com/a.png"),
            ImageSource::Http("HTTP://example.com/a.png".into())
        );
        assert!(matches!(ImageSource::parse("data:image/png;base64,AA"), ImageSource::Data(_)));
        assert!(matches!(ImageSource::parse("blob:twibbon/1"), ImageSource::Blob(_)));
    }

    #[test]
    fn parse_file_url_and_bare_path() {
        assert_eq!(
            ImageSource::parse("file:///tmp/face.jpg"),
            ImageSource::File(PathBuf::from("/tmp/face.jpg"))
        );
        assert_eq!(
            ImageSource::parse(" photos/face.jpg "),
            ImageSource::File(PathBuf::from("photos/face.jpg"))
        );
    }

    #[test]
    fn parse_short_strings_do_not_panic() {
        assert_eq!(ImageSource::parse("a"), ImageSource::File(PathBuf::from("a")));
        assert_eq!(ImageSource::parse(""), ImageSource::File(PathBuf::from("")));
    }

    // =========================================================================
    // data URI tests
    // =========================================================================

    #[test]
    fn data_uri_base64_decodes() {
        let uri = format!("data:text/plain;base64,{}", general_purpose::STANDARD.encode(b"hi"));
        assert_eq!(decode_data_uri(&uri).unwrap(), b"hi");
    }

    #[test]
    fn data_uri_percent_decodes() {
        assert_eq!(decode_data_uri("data:,a%20b").unwrap(), b"a b");
    }

    #[test]
    fn data_uri_missing_comma_errors() {
        assert!(matches!(decode_data_uri("data:image/png;base64"), Err(LoadError::DataUri(_))));
    }

    #[test]
    fn data_uri_truncated_percent_errors() {
        assert!(decode_data_uri("data:,abc%2").is_err());
    }

    // =========================================================================
    // BlobStore tests
    // =========================================================================

    #[test]
    fn blob_store_mints_unique_refs() {
        let blobs = BlobStore::new();
        let a = blobs.create_object_url(vec![1]);
        let b = blobs.create_object_url(vec![2]);
        assert_ne!(a, b);
        assert!(a.starts_with("blob:"));
        assert_eq!(&*blobs.get(&b).unwrap(), &[2]);
    }

    #[test]
    fn blob_store_revoke() {
        let blobs = BlobStore::new();
        let url = blobs.create_object_url(vec![1, 2, 3]);
        assert!(blobs.revoke_object_url(&url));
        assert!(!blobs.revoke_object_url(&url));
        assert!(blobs.is_empty());
    }

    #[test]
    fn blob_store_clones_share_registry() {
        let blobs = BlobStore::new();
        let url = blobs.clone().create_object_url(vec![9]);
        assert_eq!(blobs.len(), 1);
        assert!(blobs.get(&url).is_some());
    }

    // =========================================================================
    // ImageLoader tests
    // =========================================================================

    #[test]
    fn load_file_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("frame.png");
        std::fs::write(&path, png_bytes(&solid_image(30, 20, Rgba([1, 2, 3, 255])))).unwrap();

        let loader = ImageLoader::with_blobs(BlobStore::new());
        let img = block_on(loader.load(path.to_str().unwrap())).unwrap();
        assert_eq!(img.dimensions(), Dimensions::new(30, 20));
        assert_eq!(img.source_ref(), path.to_str().unwrap());
    }

    #[test]
    fn load_blob_and_data_uri_identically() {
        let src = solid_image(5, 4, Rgba([9, 8, 7, 255]));
        let blobs = BlobStore::new();
        let blob_url = blobs.create_object_url(png_bytes(&src));
        let loader = ImageLoader::with_blobs(blobs);

        let from_blob = block_on(loader.load(&blob_url)).unwrap();
        let from_data = block_on(loader.load(&data_uri(&src))).unwrap();
        assert_eq!(from_blob.pixels(), from_data.pixels());
    }

    #[test]
    fn identify_reads_header_dimensions() {
        let blobs = BlobStore::new();
        let url = blobs.create_object_url(png_bytes(&solid_image(64, 48, Rgba([1, 2, 3, 255]))));
        let loader = ImageLoader::with_blobs(blobs);
        assert_eq!(block_on(loader.identify(&url)).unwrap(), Dimensions::new(64, 48));
    }

    #[test]
    fn identify_garbage_is_decode_error() {
        let blobs = BlobStore::new();
        let url = blobs.create_object_url(b"not an image".to_vec());
        let loader = ImageLoader::with_blobs(blobs);
        assert!(matches!(block_on(loader.identify(&url)), Err(LoadError::Decode { .. })));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let loader = ImageLoader::with_blobs(BlobStore::new());
        let err = block_on(loader.load("/nonexistent/frame.png")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn load_revoked_blob_errors() {
        let blobs = BlobStore::new();
        let url = blobs.create_object_url(vec![1, 2, 3]);
        blobs.revoke_object_url(&url);
        let loader = ImageLoader::with_blobs(blobs);
        assert!(matches!(block_on(loader.load(&url)), Err(LoadError::UnknownBlob(_))));
    }

    #[test]
    fn load_undecodable_bytes_is_decode_error() {
        let blobs = BlobStore::new();
        let url = blobs.create_object_url(b"not an image".to_vec());
        let loader = ImageLoader::with_blobs(blobs);
        let err = block_on(loader.load(&url)).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn load_http_without_feature_is_unsupported() {
        let loader = ImageLoader::with_blobs(BlobStore::new());
        let err = block_on(loader.load("https://example.com/frame.png")).unwrap_err();
        assert!(matches!(err, LoadError::Unsupported { .. }));
    }
}
