//! Rasterized export.
//!
//! Export resolution depends only on the scene's export size and the
//! configured multiplier, never on the display: the wide preset always
//! exports 2000×2000 at the stock multiplier of 4.

use crate::config::ExportConfig;
use crate::imaging::{
    BackendError, Dimensions, EncodeFormat, EncodeParams, ImageBackend, Quality, export_pixel_size,
};
use crate::render;
use crate::scene::Scene;
use base64::Engine as _;
use base64::engine::general_purpose;
use image::Rgba;
use kurbo::Rect;

/// Title used in download names when none is given.
pub const DEFAULT_TITLE: &str = "Hut RI-79";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub multiplier: u32,
    pub quality: Quality,
    pub format: EncodeFormat,
}

impl ExportSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            multiplier: config.multiplier.max(1),
            quality: Quality::new(config.quality),
            format: config.format,
        }
    }

    pub fn encode_params(&self) -> EncodeParams {
        EncodeParams {
            format: self.format,
            quality: self.quality,
        }
    }

    /// Pixel size of an export of a scene whose export size is `export`.
    pub fn output_size(&self, export: Dimensions) -> Dimensions {
        export_pixel_size(export, self.multiplier)
    }

    /// File name offered for download, e.g. `Twibbon Hut RI-79.jpg`.
    pub fn download_name(&self, title: Option<&str>) -> String {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        format!("Twibbon {}.{}", title, self.format.extension())
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self::from_config(&ExportConfig::default())
    }
}

/// An encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: EncodeFormat,
    pub dimensions: Dimensions,
}

impl EncodedImage {
    /// `data:<mime>;base64,<payload>`
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Rasterize the export crop of `scene` and encode it.
///
/// The crop origin is the canvas origin, so export and display share the
/// same logical framing.
pub fn export_scene(
    scene: &Scene,
    background: Rgba<u8>,
    settings: &ExportSettings,
    backend: &dyn ImageBackend,
) -> Result<EncodedImage, BackendError> {
    let export = scene.export_size();
    let crop = Rect::new(0.0, 0.0, export.width as f64, export.height as f64);
    let frame = render::rasterize(scene, background, settings.multiplier as f64, crop);
    let bytes = backend.encode(&frame, &settings.encode_params())?;
    Ok(EncodedImage {
        bytes,
        format: settings.format,
        dimensions: Dimensions::new(frame.width(), frame.height()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::{FilterSet, RustBackend};
    use crate::layer::{Layer, LayerName};
    use crate::loader::DecodedImage;
    use crate::test_helpers::{RED, solid_image};
    use std::rc::Rc;

    const WIDE: Dimensions = Dimensions::new(500, 500);
    const GREY: Rgba<u8> = Rgba([0xEE, 0xEE, 0xF3, 255]);

    fn scene_with_background(size: Dimensions) -> Scene {
        let mut scene = Scene::new(size, size);
        let decoded = Rc::new(DecodedImage::new("bg.png", solid_image(8, 8, RED)));
        scene.layers_mut().upsert(Layer::new(
            LayerName::Background,
            decoded,
            FilterSet::empty(),
            size,
        ));
        scene
    }

    // =========================================================================
    // ExportSettings tests
    // =========================================================================

    #[test]
    fn default_settings_match_stock_export() {
        let settings = ExportSettings::default();
        assert_eq!(settings.multiplier, 4);
        assert_eq!(settings.quality.value(), 100);
        assert_eq!(settings.format, EncodeFormat::Jpeg);
        assert_eq!(settings.output_size(WIDE), Dimensions::new(2000, 2000));
    }

    #[test]
    fn download_name_defaults_title() {
        let settings = ExportSettings::default();
        assert_eq!(settings.download_name(None), "Twibbon Hut RI-79.jpg");
        assert_eq!(settings.download_name(Some("  ")), "Twibbon Hut RI-79.jpg");
        assert_eq!(settings.download_name(Some("Wisuda")), "Twibbon Wisuda.jpg");
    }

    #[test]
    fn download_name_follows_format() {
        let settings = ExportSettings {
            format: EncodeFormat::Png,
            ..ExportSettings::default()
        };
        assert_eq!(settings.download_name(Some("X")), "Twibbon X.png");
    }

    // =========================================================================
    // export_scene tests
    // =========================================================================

    #[test]
    fn export_encodes_at_multiplied_size() {
        let scene = scene_with_background(WIDE);
        let backend = MockBackend::new();
        let encoded = export_scene(&scene, GREY, &ExportSettings::default(), &backend).unwrap();

        assert_eq!(encoded.dimensions, Dimensions::new(2000, 2000));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Encode {
                width: 2000,
                height: 2000,
                format: EncodeFormat::Jpeg,
                quality: 100,
            }]
        );
    }

    #[test]
    fn export_size_independent_of_canvas_display() {
        let mut scene = scene_with_background(WIDE);
        scene.set_canvas_size(WIDE, Dimensions::new(300, 300));
        let backend = MockBackend::new();
        let settings = ExportSettings {
            multiplier: 2,
            ..ExportSettings::default()
        };
        let encoded = export_scene(&scene, GREY, &settings, &backend).unwrap();
        assert_eq!(encoded.dimensions, Dimensions::new(600, 600));
    }

    #[test]
    fn real_backend_produces_decodable_jpeg() {
        let scene = scene_with_background(Dimensions::new(20, 20));
        let backend = RustBackend::new();
        let encoded = export_scene(&scene, GREY, &ExportSettings::default(), &backend).unwrap();

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (80, 80));
        assert_eq!(
            image::guess_format(&encoded.bytes).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn data_url_has_mime_prefix() {
        let encoded = EncodedImage {
            bytes: vec![1, 2, 3],
            format: EncodeFormat::Jpeg,
            dimensions: Dimensions::new(1, 1),
        };
        assert_eq!(encoded.to_data_url(), "data:image/jpeg;base64,AQID");
    }
}
