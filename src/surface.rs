//! The live rendering surface.
//!
//! [`CanvasSurface`] owns one [`Scene`] and the host's [`DrawTarget`], and
//! sequences every layer change as load → filter → upsert → render.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──create()──▶ Ready ──dispose()──▶ Disposed
//! ```
//!
//! Only `Ready` accepts layer mutations or renders. Everything else is a
//! logged no-op: a load that resolves after `dispose()` reports
//! [`LoadOutcome::NotReady`] and leaves the (cleared) store alone.
//!
//! ## Ordering
//!
//! All state sits behind one `Rc<RefCell<_>>` and is only touched from the
//! host's single thread. Loads suspend at the fetch/decode boundary only;
//! the commit that follows runs to completion under one borrow, so a render
//! never sees a filtered-but-not-inserted layer.
//!
//! Each layer name carries a request sequence. Issuing a load bumps it and
//! the load remembers its ticket; at commit time a ticket that is no longer
//! the latest is discarded as [`LoadOutcome::Superseded`]. Surface state is
//! checked at commit time too, never at request time alone.

use crate::config::{CompositorConfig, parse_hex_color};
use crate::export::{self, EncodedImage, ExportSettings};
use crate::imaging::{Dimensions, FilterSet};
use crate::layer::{Layer, LayerName};
use crate::loader::{DecodedImage, ImageLoader, LoadError};
use crate::render;
use crate::responsive::{Breakpoint, ResponsivePolicy};
use crate::scale::{ScaleController, ScaleError};
use crate::scene::{Scene, SceneRecord};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect, Vec2};
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

/// The host-provided drawable a surface binds to.
pub trait DrawTarget {
    /// Called on create and on every breakpoint change.
    fn resize(&mut self, size: Dimensions);

    /// Called with a complete frame after every render.
    fn present(&mut self, frame: &RgbaImage);
}

/// A [`DrawTarget`] that keeps the last presented frame in memory.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    size: Option<Dimensions>,
    frame: Option<RgbaImage>,
    presents: usize,
}

impl FrameBuffer {
    pub fn size(&self) -> Option<Dimensions> {
        self.size
    }

    pub fn frame(&self) -> Option<&RgbaImage> {
        self.frame.as_ref()
    }

    pub fn present_count(&self) -> usize {
        self.presents
    }
}

impl DrawTarget for FrameBuffer {
    fn resize(&mut self, size: Dimensions) {
        self.size = Some(size);
    }

    fn present(&mut self, frame: &RgbaImage) {
        self.frame = Some(frame.clone());
        self.presents += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Ready,
    Disposed,
}

/// How an asynchronous layer load ended.
///
/// None of these is a fault: callers may inspect or ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The layer was inserted and the scene re-rendered.
    Committed,
    /// A newer load for the same layer was issued first.
    Superseded,
    /// Fetch or decode failed; the previous layer is untouched.
    Failed,
    /// The surface was not `Ready` when the load was issued or completed.
    NotReady,
}

/// Monotonic per-layer request counter.
#[derive(Debug, Default)]
struct RequestLedger {
    latest: HashMap<LayerName, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    layer: LayerName,
    seq: u64,
}

impl RequestLedger {
    fn issue(&mut self, layer: LayerName) -> Ticket {
        let seq = self.latest.entry(layer).or_insert(0);
        *seq += 1;
        Ticket { layer, seq: *seq }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.layer) == Some(&ticket.seq)
    }
}

/// What to reload for a layer after a relayout.
#[derive(Debug, Clone)]
struct LayerRequest {
    source_ref: String,
    filters: FilterSet,
}

struct Inner<D> {
    state: SurfaceState,
    scene: Scene,
    breakpoint: Breakpoint,
    target: Option<D>,
    requests: RequestLedger,
    committed: BTreeMap<LayerName, LayerRequest>,
    /// Latest issued request per layer until it commits or fails.
    pending: BTreeMap<LayerName, LayerRequest>,
    scale: ScaleController,
    policy: ResponsivePolicy,
    background: Rgba<u8>,
    export: ExportSettings,
    config: CompositorConfig,
}

impl<D: DrawTarget> Inner<D> {
    fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    /// Rasterize the canvas and hand the frame to the target.
    fn render(&mut self) {
        if !self.is_ready() {
            return;
        }
        let canvas = self.scene.canvas_size();
        let crop = Rect::new(0.0, 0.0, canvas.width as f64, canvas.height as f64);
        let frame = render::rasterize(&self.scene, self.background, 1.0, crop);
        if let Some(target) = self.target.as_mut() {
            target.present(&frame);
        }
        self.scene.mark_clean();
    }

    fn commit(
        &mut self,
        ticket: Ticket,
        request: LayerRequest,
        result: Result<Rc<DecodedImage>, LoadError>,
    ) -> LoadOutcome {
        let name = ticket.layer;
        if !self.is_ready() {
            debug!(layer = %name, source = %request.source_ref, state = ?self.state, "surface not ready, dropping load");
            return LoadOutcome::NotReady;
        }
        if !self.requests.is_current(ticket) {
            debug!(layer = %name, source = %request.source_ref, "load superseded");
            return LoadOutcome::Superseded;
        }
        self.pending.remove(&name);
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(layer = %name, error = %err, "load failed, keeping previous layer");
                return LoadOutcome::Failed;
            }
        };

        let mut layer = Layer::new(
            name,
            decoded,
            request.filters.clone(),
            self.scene.canvas_size(),
        );
        if name == LayerName::Overlay {
            layer.set_user_scale(self.scale.factor());
        }
        let base = layer.base_size();
        self.scene.layers_mut().upsert(layer);
        info!(layer = %name, source = %request.source_ref, size = %base, "layer committed");
        self.committed.insert(name, request);
        self.render();
        LoadOutcome::Committed
    }
}

/// Owner of one live rendering surface.
///
/// Cloning is not supported; share it behind the host's own handle. Load
/// futures hold only a weak reference, so dropping the surface also
/// neutralizes any load still in flight.
pub struct CanvasSurface<D> {
    inner: Rc<RefCell<Inner<D>>>,
    loader: ImageLoader,
}

impl<D: DrawTarget + 'static> CanvasSurface<D> {
    pub fn new(config: CompositorConfig, loader: ImageLoader) -> Self {
        let policy = ResponsivePolicy::from_config(&config.canvas);
        let background = parse_hex_color(&config.canvas.background).unwrap_or_else(|err| {
            warn!(error = %err, "falling back to default canvas colour");
            Rgba([0xEE, 0xEE, 0xF3, 255])
        });
        let preset = policy.preset(Breakpoint::Wide);
        let inner = Inner {
            state: SurfaceState::Uninitialized,
            scene: Scene::new(preset.canvas, preset.export),
            breakpoint: Breakpoint::Wide,
            target: None,
            requests: RequestLedger::default(),
            committed: BTreeMap::new(),
            pending: BTreeMap::new(),
            scale: ScaleController::new(config.scale.initial),
            policy,
            background,
            export: ExportSettings::from_config(&config.export),
            config,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            loader,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind `target` and size the scene for `breakpoint`.
    ///
    /// Only valid from `Uninitialized`; returns whether the surface was created.
    pub fn create(&self, mut target: D, breakpoint: Breakpoint) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.state != SurfaceState::Uninitialized {
            debug!(state = ?inner.state, "create ignored");
            return false;
        }
        let preset = inner.policy.preset(breakpoint);
        inner.scene.set_canvas_size(preset.canvas, preset.export);
        target.resize(preset.canvas);
        inner.target = Some(target);
        inner.breakpoint = breakpoint;
        inner.state = SurfaceState::Ready;
        info!(%breakpoint, canvas = %preset.canvas, "surface created");
        inner.render();
        true
    }

    /// Release the target and every layer. Later calls do nothing.
    ///
    /// Returns whether this call performed the disposal.
    pub fn dispose(&self) -> bool {
        let mut inner = self.inner.borrow_mut();
        if inner.state == SurfaceState::Disposed {
            return false;
        }
        inner.state = SurfaceState::Disposed;
        inner.target = None;
        inner.scene.layers_mut().clear();
        inner.committed.clear();
        inner.pending.clear();
        info!("surface disposed");
        true
    }

    pub fn state(&self) -> SurfaceState {
        self.inner.borrow().state
    }

    // =========================================================================
    // Layer loads
    // =========================================================================

    /// Load `source_ref` as the unfiltered background frame.
    pub fn add_background(&self, source_ref: &str) -> LocalBoxFuture<'static, LoadOutcome> {
        self.add_layer(LayerName::Background, source_ref, FilterSet::background(None))
    }

    /// Load `source_ref` as a blurred stand-in background.
    pub fn add_placeholder_background(
        &self,
        source_ref: &str,
    ) -> LocalBoxFuture<'static, LoadOutcome> {
        let blur = self.inner.borrow().config.filters.background_blur;
        self.add_layer(
            LayerName::Background,
            source_ref,
            FilterSet::background(Some(blur)),
        )
    }

    /// Load the user's photo as the overlay, centred and at the current scale.
    pub fn add_frame(&self, source_ref: &str) -> LocalBoxFuture<'static, LoadOutcome> {
        let filters = {
            let inner = self.inner.borrow();
            FilterSet::overlay(
                inner.config.filters.overlay_brightness,
                inner.config.filters.overlay_contrast,
            )
        };
        self.add_layer(LayerName::Overlay, source_ref, filters)
    }

    /// Issue the ticket and the fetch now; commit when the future completes.
    fn add_layer(
        &self,
        name: LayerName,
        source_ref: &str,
        filters: FilterSet,
    ) -> LocalBoxFuture<'static, LoadOutcome> {
        let request = LayerRequest {
            source_ref: source_ref.to_string(),
            filters,
        };
        let ticket = {
            let mut inner = self.inner.borrow_mut();
            if !inner.is_ready() {
                debug!(layer = %name, state = ?inner.state, "load ignored");
                return future::ready(LoadOutcome::NotReady).boxed_local();
            }
            inner.pending.insert(name, request.clone());
            inner.requests.issue(name)
        };
        debug!(layer = %name, seq = ticket.seq, "load issued");

        let load = self.loader.load(source_ref);
        let weak: Weak<RefCell<Inner<D>>> = Rc::downgrade(&self.inner);
        async move {
            let result = load.await;
            match weak.upgrade() {
                Some(inner) => inner.borrow_mut().commit(ticket, request, result),
                None => LoadOutcome::NotReady,
            }
        }
        .boxed_local()
    }

    // =========================================================================
    // Overlay geometry
    // =========================================================================

    /// Size the overlay to `canvas * factor`, keeping its centre.
    ///
    /// Invalid factors are rejected and the previous scale retained.
    pub fn set_scale(&self, factor: f64) -> Result<(), ScaleError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.is_ready() {
            debug!(factor, "scale ignored, surface not ready");
            return Ok(());
        }
        let Inner { scale, scene, .. } = &mut *inner;
        scale.set_scale(scene, factor)?;
        inner.render();
        Ok(())
    }

    /// Event-handler form of [`set_scale`](Self::set_scale): failures are
    /// logged, never returned.
    pub fn on_scale_change(&self, factor: f64) {
        if let Err(err) = self.set_scale(factor) {
            warn!(error = %err, "scale rejected");
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.inner.borrow().scale.factor()
    }

    /// Translate the overlay by `delta` canvas pixels.
    pub fn move_overlay(&self, delta: Vec2) -> bool {
        self.update_overlay(|overlay| overlay.set_center(overlay.center() + delta))
    }

    pub fn set_overlay_center(&self, center: Point) -> bool {
        self.update_overlay(|overlay| overlay.set_center(center))
    }

    fn update_overlay(&self, f: impl FnOnce(&mut Layer)) -> bool {
        let mut inner = self.inner.borrow_mut();
        if !inner.is_ready() {
            return false;
        }
        match inner.scene.layers_mut().get_mut(LayerName::Overlay) {
            Some(overlay) => f(overlay),
            None => return false,
        }
        inner.render();
        true
    }

    // =========================================================================
    // Responsive relayout
    // =========================================================================

    pub fn breakpoint(&self) -> Breakpoint {
        self.inner.borrow().breakpoint
    }

    /// Switch presets and reload every layer against the new canvas.
    ///
    /// Each layer reloads its latest requested source: a load still in
    /// flight wins over the committed one. The scene is cleared, resized and
    /// rendered empty synchronously; the returned future resolves once every
    /// reload has settled. Reloads supersede any load still in flight.
    #[tracing::instrument(skip(self))]
    pub fn on_breakpoint_change(
        &self,
        breakpoint: Breakpoint,
    ) -> LocalBoxFuture<'static, Vec<(LayerName, LoadOutcome)>> {
        let reloads: Vec<(LayerName, LayerRequest)> = {
            let mut inner = self.inner.borrow_mut();
            if !inner.is_ready() {
                debug!(state = ?inner.state, "relayout ignored");
                return future::ready(Vec::new()).boxed_local();
            }
            if inner.breakpoint == breakpoint {
                debug!("breakpoint unchanged");
                return future::ready(Vec::new()).boxed_local();
            }
            let preset = inner.policy.preset(breakpoint);
            inner.breakpoint = breakpoint;
            inner.scene.layers_mut().clear();
            inner.scene.set_canvas_size(preset.canvas, preset.export);
            if let Some(target) = inner.target.as_mut() {
                target.resize(preset.canvas);
            }
            inner.render();
            info!(canvas = %preset.canvas, "relayout");
            // A request still in flight is newer than what it would replace.
            let mut latest = inner.committed.clone();
            latest.extend(inner.pending.iter().map(|(name, request)| (*name, request.clone())));
            latest.into_iter().collect()
        };

        let loads: Vec<_> = reloads
            .into_iter()
            .map(|(name, request)| {
                self.add_layer(name, &request.source_ref, request.filters)
                    .map(move |outcome| (name, outcome))
            })
            .collect();
        future::join_all(loads).boxed_local()
    }

    /// [`on_breakpoint_change`](Self::on_breakpoint_change) for a raw viewport width.
    pub fn on_viewport_width(
        &self,
        viewport_width: u32,
    ) -> LocalBoxFuture<'static, Vec<(LayerName, LoadOutcome)>> {
        let breakpoint = self.inner.borrow().policy.breakpoint_for_width(viewport_width);
        self.on_breakpoint_change(breakpoint)
    }

    // =========================================================================
    // Rendering & export
    // =========================================================================

    /// Force a render of the current scene.
    pub fn render(&self) {
        self.inner.borrow_mut().render();
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().scene.is_dirty()
    }

    pub fn canvas_size(&self) -> Dimensions {
        self.inner.borrow().scene.canvas_size()
    }

    pub fn export_size(&self) -> Dimensions {
        self.inner.borrow().scene.export_size()
    }

    pub fn export_settings(&self) -> ExportSettings {
        self.inner.borrow().export
    }

    /// Snapshot of the scene's layers, bottom-to-top.
    pub fn scene_record(&self) -> SceneRecord {
        self.inner.borrow().scene.to_record()
    }

    /// Source reference of the committed layer `name`, if any.
    pub fn layer_source(&self, name: LayerName) -> Option<String> {
        self.inner
            .borrow()
            .scene
            .layers()
            .get(name)
            .map(|layer| layer.source_ref().to_string())
    }

    /// The bound draw target while the surface is `Ready`.
    pub fn target(&self) -> Option<Ref<'_, D>> {
        Ref::filter_map(self.inner.borrow(), |inner| inner.target.as_ref()).ok()
    }

    /// Encode the export crop. `None` unless `Ready` with a background.
    pub fn export_image(&self) -> Option<EncodedImage> {
        let inner = self.inner.borrow();
        if !inner.is_ready() {
            debug!(state = ?inner.state, "export ignored");
            return None;
        }
        if inner.scene.layers().get(LayerName::Background).is_none() {
            debug!("export ignored, no background");
            return None;
        }
        let backend = self.loader.backend();
        match export::export_scene(&inner.scene, inner.background, &inner.export, &*backend) {
            Ok(encoded) => {
                info!(size = %encoded.dimensions, bytes = encoded.bytes.len(), "exported");
                Some(encoded)
            }
            Err(err) => {
                warn!(error = %err, "export failed");
                None
            }
        }
    }

    /// The export as a `data:` URL.
    pub fn to_image(&self) -> Option<String> {
        self.export_image().map(|encoded| encoded.to_data_url())
    }
}
