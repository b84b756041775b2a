//! The composed state of one rendering surface.

use crate::imaging::Dimensions;
use crate::layer::{LayerRecord, LayerStore};
use serde::Serialize;

/// Canvas size, export size and the layers drawn on the canvas.
///
/// Changing the canvas size re-derives every layer's fit in the same call,
/// so a render can never observe a stale fit.
#[derive(Debug)]
pub struct Scene {
    canvas_size: Dimensions,
    export_size: Dimensions,
    layers: LayerStore,
    dirty: bool,
}

impl Scene {
    pub fn new(canvas_size: Dimensions, export_size: Dimensions) -> Self {
        Self {
            canvas_size,
            export_size,
            layers: LayerStore::new(),
            dirty: true,
        }
    }

    pub fn canvas_size(&self) -> Dimensions {
        self.canvas_size
    }

    pub fn export_size(&self) -> Dimensions {
        self.export_size
    }

    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Mutable access to the store. Marks the scene dirty.
    pub fn layers_mut(&mut self) -> &mut LayerStore {
        self.dirty = true;
        &mut self.layers
    }

    pub fn set_canvas_size(&mut self, canvas_size: Dimensions, export_size: Dimensions) {
        self.canvas_size = canvas_size;
        self.export_size = export_size;
        for layer in self.layers.all_mut() {
            layer.refit(canvas_size);
        }
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn to_record(&self) -> SceneRecord {
        SceneRecord {
            canvas_size: self.canvas_size,
            export_size: self.export_size,
            layers: self.layers.all().map(|l| l.to_record()).collect(),
        }
    }
}

/// Serializable snapshot of a [`Scene`], layers bottom-to-top.
#[derive(Debug, Clone, Serialize)]
pub struct SceneRecord {
    pub canvas_size: Dimensions,
    pub export_size: Dimensions,
    pub layers: Vec<LayerRecord>,
}
