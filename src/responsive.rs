//! Viewport breakpoints and canvas size presets.
//!
//! There are exactly two supported canvas sizes, one per [`Breakpoint`].
//! The export size equals the canvas size of the active preset; the export
//! multiplier (see [`export`](crate::export)) is what makes downloads larger
//! than the on-screen canvas.
//!
//! ```text
//! viewport width  >= 768px  →  Wide    500×500 canvas, 500×500 export
//! viewport width  <  768px  →  Narrow  300×300 canvas, 300×300 export
//! ```
//!
//! The relayout a breakpoint change triggers lives in
//! [`CanvasSurface::on_breakpoint_change`](crate::surface::CanvasSurface::on_breakpoint_change).

use crate::config::CanvasConfig;
use crate::imaging::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Wide,
    Narrow,
}

impl Breakpoint {
    /// Breakpoint for a viewport width under the stock 768px threshold.
    pub fn for_viewport_width(px: u32) -> Breakpoint {
        ResponsivePolicy::default().breakpoint_for_width(px)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Breakpoint::Wide => "wide",
            Breakpoint::Narrow => "narrow",
        })
    }
}

/// Canvas and export dimensions for one breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePreset {
    pub canvas: Dimensions,
    pub export: Dimensions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsivePolicy {
    wide: Dimensions,
    narrow: Dimensions,
    min_wide_width: u32,
}

impl ResponsivePolicy {
    pub fn new(wide: Dimensions, narrow: Dimensions, min_wide_width: u32) -> Self {
        Self {
            wide,
            narrow,
            min_wide_width,
        }
    }

    pub fn from_config(config: &CanvasConfig) -> Self {
        Self::new(
            config.wide.dimensions(),
            config.narrow.dimensions(),
            config.breakpoint_min_width,
        )
    }

    pub fn breakpoint_for_width(&self, viewport_width: u32) -> Breakpoint {
        if viewport_width >= self.min_wide_width {
            Breakpoint::Wide
        } else {
            Breakpoint::Narrow
        }
    }

    pub fn preset(&self, breakpoint: Breakpoint) -> SizePreset {
        let size = match breakpoint {
            Breakpoint::Wide => self.wide,
            Breakpoint::Narrow => self.narrow,
        };
        SizePreset {
            canvas: size,
            export: size,
        }
    }
}

impl Default for ResponsivePolicy {
    fn default() -> Self {
        Self::from_config(&CanvasConfig::default())
    }
}
