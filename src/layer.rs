//! Layers and the layer store.
//!
//! A scene holds at most two layers, identified by the closed [`LayerName`]
//! enum rather than a string tag. The enum's declaration order *is* the
//! z-order, so the store's `BTreeMap` iterates bottom-to-top no matter the
//! order in which layers were inserted.
//!
//! | Name | z | Interaction | Filters |
//! |---|---|---|---|
//! | `Background` | 0 | locked | optional placeholder blur |
//! | `Overlay` | 1 | movable, resizable | brightness + contrast |

use crate::imaging::{
    Dimensions, FilterSet, FitTransform, canvas_center, centered_rect, filters, fit_to_cover,
    rendered_size,
};
use crate::loader::DecodedImage;
use image::RgbaImage;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Identity of a layer. Ordering follows z-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerName {
    Background,
    Overlay,
}

impl LayerName {
    pub const ALL: [LayerName; 2] = [LayerName::Background, LayerName::Overlay];

    pub fn z_index(self) -> u32 {
        match self {
            LayerName::Background => 0,
            LayerName::Overlay => 1,
        }
    }

    pub fn interaction(self) -> Interaction {
        match self {
            LayerName::Background => Interaction::LOCKED,
            LayerName::Overlay => Interaction::MOVABLE,
        }
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayerName::Background => "background",
            LayerName::Overlay => "overlay",
        })
    }
}

/// What a user may do to a layer on the live surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub movable: bool,
    pub resizable: bool,
    pub selectable: bool,
}

impl Interaction {
    pub const LOCKED: Interaction = Interaction {
        movable: false,
        resizable: false,
        selectable: false,
    };
    pub const MOVABLE: Interaction = Interaction {
        movable: true,
        resizable: true,
        selectable: true,
    };
}

/// One named visual element of a scene.
#[derive(Debug)]
pub struct Layer {
    name: LayerName,
    source: Rc<DecodedImage>,
    filters: FilterSet,
    filtered: RgbaImage,
    fit: FitTransform,
    user_scale: f64,
    center: Point,
}

impl Layer {
    /// Build a layer from a decoded image: filters are baked, the fit is
    /// derived for `canvas`, and the layer is centred on it.
    pub fn new(
        name: LayerName,
        source: Rc<DecodedImage>,
        filters: FilterSet,
        canvas: Dimensions,
    ) -> Self {
        let filtered = filters::apply(source.pixels(), &filters);
        let fit = fit_to_cover(source.dimensions(), canvas);
        Self {
            name,
            source,
            filters,
            filtered,
            fit,
            user_scale: 1.0,
            center: canvas_center(canvas),
        }
    }

    pub fn name(&self) -> LayerName {
        self.name
    }

    pub fn z_index(&self) -> u32 {
        self.name.z_index()
    }

    pub fn source(&self) -> &Rc<DecodedImage> {
        &self.source
    }

    pub fn source_ref(&self) -> &str {
        self.source.source_ref()
    }

    pub fn base_size(&self) -> Dimensions {
        self.source.dimensions()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Filtered pixels at natural size.
    pub fn pixels(&self) -> &RgbaImage {
        &self.filtered
    }

    pub fn fit(&self) -> FitTransform {
        self.fit
    }

    pub fn user_scale(&self) -> f64 {
        self.user_scale
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn interaction(&self) -> Interaction {
        self.name.interaction()
    }

    pub fn rendered_size(&self) -> Size {
        rendered_size(self.base_size(), self.fit, self.user_scale)
    }

    /// Logical rectangle on the canvas.
    pub fn bounds(&self) -> Rect {
        centered_rect(self.center, self.rendered_size())
    }

    /// Re-derive the fit for a new canvas and re-centre the layer.
    pub fn refit(&mut self, canvas: Dimensions) {
        self.fit = fit_to_cover(self.base_size(), canvas);
        self.center = canvas_center(canvas);
    }

    /// Re-run the filter set against the unfiltered source.
    pub fn reapply_filters(&mut self) {
        self.filtered = filters::apply(self.source.pixels(), &self.filters);
    }

    pub(crate) fn set_user_scale(&mut self, scale: f64) {
        self.user_scale = scale;
    }

    pub(crate) fn set_center(&mut self, center: Point) {
        self.center = center;
    }

    /// Explicit serialization of the layer's state (no pixel data).
    pub fn to_record(&self) -> LayerRecord {
        let bounds = self.bounds();
        LayerRecord {
            name: self.name,
            z_index: self.z_index(),
            source_ref: self.source_ref().to_string(),
            base_size: self.base_size(),
            fit: self.fit,
            user_scale: self.user_scale,
            center: [self.center.x, self.center.y],
            bounds: [bounds.x0, bounds.y0, bounds.width(), bounds.height()],
            interaction: self.interaction(),
            filters: self.filters.clone(),
        }
    }
}

/// Serializable snapshot of a [`Layer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    pub name: LayerName,
    pub z_index: u32,
    pub source_ref: String,
    pub base_size: Dimensions,
    pub fit: FitTransform,
    pub user_scale: f64,
    pub center: [f64; 2],
    /// `[x, y, width, height]` in canvas pixels.
    pub bounds: [f64; 4],
    pub interaction: Interaction,
    pub filters: FilterSet,
}

/// Ordered set of named layers.
///
/// Mutations never trigger rendering; callers decide when to render.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: BTreeMap<LayerName, Layer>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `layer` under its name, returning the layer it replaced.
    ///
    /// Dropping the returned layer releases its pixels.
    pub fn upsert(&mut self, layer: Layer) -> Option<Layer> {
        self.layers.insert(layer.name(), layer)
    }

    pub fn remove(&mut self, name: LayerName) -> Option<Layer> {
        self.layers.remove(&name)
    }

    pub fn get(&self, name: LayerName) -> Option<&Layer> {
        self.layers.get(&name)
    }

    pub fn get_mut(&mut self, name: LayerName) -> Option<&mut Layer> {
        self.layers.get_mut(&name)
    }

    /// Layers in ascending z-order.
    pub fn all(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.layers.values_mut()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
