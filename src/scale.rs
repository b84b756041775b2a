//! Zoom factor → overlay geometry.
//!
//! The controller is a pure geometry mapper: any finite, non-negative factor
//! is accepted and the overlay is sized to `canvas * factor`, anchored at its
//! current centre. Range limits for sliders belong to the UI
//! ([`ScaleConfig`](crate::config::ScaleConfig)), not here.

use crate::layer::LayerName;
use crate::scene::Scene;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ScaleError {
    #[error("invalid scale factor {0} (must be finite and non-negative)")]
    InvalidScale(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleController {
    factor: f64,
}

impl ScaleController {
    /// Controller starting at `initial`, falling back to `1.0` if invalid.
    pub fn new(initial: f64) -> Self {
        Self {
            factor: if is_valid(initial) { initial } else { 1.0 },
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Record a new factor and resize the scene's overlay to match.
    ///
    /// On error nothing changes.
    pub fn set_scale(&mut self, scene: &mut Scene, factor: f64) -> Result<(), ScaleError> {
        if !is_valid(factor) {
            return Err(ScaleError::InvalidScale(factor));
        }
        self.factor = factor;
        self.apply(scene);
        Ok(())
    }

    /// Apply the current factor to the overlay, if there is one.
    ///
    /// Returns whether an overlay was resized.
    pub fn apply(&self, scene: &mut Scene) -> bool {
        if scene.layers().get(LayerName::Overlay).is_none() {
            return false;
        }
        if let Some(overlay) = scene.layers_mut().get_mut(LayerName::Overlay) {
            overlay.set_user_scale(self.factor);
        }
        true
    }
}

impl Default for ScaleController {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn is_valid(factor: f64) -> bool {
    factor.is_finite() && factor >= 0.0
}
