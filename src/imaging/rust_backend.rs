//! Pure Rust compositing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image` crate (pure Rust decoders) |
//! | Rasterize SVG overlay | `resvg` (`usvg` parse + `tiny_skia` pixmap) |
//! | Resample raster overlay | `image::imageops::resize` with `Lanczos3` filter |
//! | Scale + rotate + translate | `imageproc::geometric_transformations::warp_into` |
//! | Alpha blend | `image::imageops::overlay` |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |

use super::backend::{BackendError, ImageBackend};
use super::calculations::plan_layer;
use super::params::{CompositeParams, Graphic, LayerPlan};
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use resvg::{tiny_skia, usvg};
use std::sync::LazyLock;

/// Upload formats accepted by the editor, by extension.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Sniff the content of an upload. Returns the format only if it is one we
/// accept as a photo; anything else is not an image as far as the editor
/// is concerned.
pub fn sniff_photo_format(bytes: &[u8]) -> Option<ImageFormat> {
    let format = image::guess_format(bytes).ok()?;
    PHOTO_CANDIDATES
        .iter()
        .any(|(_, candidate)| *candidate == format && format.reading_enabled())
        .then_some(format)
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Render an SVG document into a straight-alpha RGBA buffer.
fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<RgbaImage, BackendError> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())
        .map_err(|e| BackendError::Decode(format!("SVG parse failed: {e}")))?;
    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        BackendError::ProcessingFailed(format!("Cannot allocate {width}x{height} pixmap"))
    })?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied alpha; `image` blends straight alpha
    let raw: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    RgbaImage::from_raw(width, height, raw)
        .ok_or_else(|| BackendError::ProcessingFailed("Pixmap size mismatch".into()))
}

/// Warp one rasterized overlay onto the surface and alpha-blend it.
fn draw_layer(surface: &mut RgbaImage, layer: &RgbaImage, plan: &LayerPlan) {
    // Applied right to left: scale to the fractional size, rotate about the
    // placement's own origin, then move it into position.
    let projection = Projection::translate(plan.x, plan.y)
        * Projection::rotate(plan.radians)
        * Projection::scale(plan.scale_x, plan.scale_y);

    let mut warped = RgbaImage::new(surface.width(), surface.height());
    warp_into(
        layer,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut warped,
    );
    image::imageops::overlay(surface, &warped, 0, 0);
}

impl ImageBackend for RustBackend {
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| BackendError::Decode(format!("Failed to decode image: {e}")))?;
        Ok(img.to_rgba8())
    }

    fn rasterize(
        &self,
        graphic: &Graphic,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, BackendError> {
        match graphic {
            Graphic::Svg(svg) => rasterize_svg(svg, width, height),
            Graphic::Raster(img) => Ok(image::imageops::resize(
                img.as_ref(),
                width,
                height,
                FilterType::Lanczos3,
            )),
        }
    }

    fn composite(&self, params: &CompositeParams) -> Result<RgbaImage, BackendError> {
        let mut surface = params.base.as_ref().clone();

        for placement in &params.placements {
            let plan = plan_layer(placement);
            let layer = self.rasterize(&params.graphic, plan.raster_width, plan.raster_height)?;
            draw_layer(&mut surface, &layer, &plan);
        }

        Ok(surface)
    }

    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
        let mut buffer = Vec::new();
        PngEncoder::new(&mut buffer)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_test_png, solid_rgba};
    use crate::types::Placement;
    use std::sync::Arc;

    const RED_SQUARE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect width="10" height="10" fill="#ff0000"/></svg>"##;

    fn is_red(px: &Rgba<u8>) -> bool {
        px[0] > 240 && px[1] < 15 && px[2] < 15
    }

    fn is_white(px: &Rgba<u8>) -> bool {
        px[0] > 240 && px[1] > 240 && px[2] > 240
    }

    fn square(x: f64, y: f64, size: f64, rotation: f64) -> Placement {
        Placement {
            x,
            y,
            width: size,
            height: size,
            rotation,
            face_index: Some(0),
        }
    }

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn sniff_accepts_png_and_rejects_text() {
        assert_eq!(sniff_photo_format(&make_test_png(4, 4)), Some(ImageFormat::Png));
        assert_eq!(sniff_photo_format(b"just some text"), None);
    }

    #[test]
    fn decode_synthetic_png() {
        let img = RustBackend::new().decode(&make_test_png(64, 48)).unwrap();
        assert_eq!(img.dimensions(), (64, 48));
    }

    #[test]
    fn decode_garbage_errors() {
        let result = RustBackend::new().decode(b"\x89PNG\r\n\x1a\nbroken");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn rasterize_svg_at_requested_size() {
        let graphic = Graphic::Svg(Arc::from(RED_SQUARE_SVG));
        let img = RustBackend::new().rasterize(&graphic, 40, 16).unwrap();
        assert_eq!(img.dimensions(), (40, 16));
        assert!(is_red(img.get_pixel(20, 8)));
    }

    #[test]
    fn rasterize_invalid_svg_is_decode_error() {
        let graphic = Graphic::Svg(Arc::from("<not-svg"));
        let result = RustBackend::new().rasterize(&graphic, 10, 10);
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn rasterize_raster_resamples() {
        let graphic = Graphic::Raster(Arc::new(solid_rgba(8, 8, [0, 0, 255, 255])));
        let img = RustBackend::new().rasterize(&graphic, 20, 10).unwrap();
        assert_eq!(img.dimensions(), (20, 10));
    }

    #[test]
    fn composite_draws_overlay_in_placement() {
        let params = CompositeParams {
            base: Arc::new(solid_rgba(100, 100, [255, 255, 255, 255])),
            graphic: Graphic::Svg(Arc::from(RED_SQUARE_SVG)),
            placements: vec![square(20.0, 20.0, 20.0, 0.0)],
        };
        let out = RustBackend::new().composite(&params).unwrap();

        assert_eq!(out.dimensions(), (100, 100));
        assert!(is_red(out.get_pixel(30, 30)));
        assert!(is_white(out.get_pixel(5, 5)));
        assert!(is_white(out.get_pixel(50, 50)));
    }

    #[test]
    fn composite_rotates_about_placement_origin() {
        // 90° clockwise about (20, 20): the square now spans x ∈ [0, 20], y ∈ [20, 40]
        let params = CompositeParams {
            base: Arc::new(solid_rgba(100, 100, [255, 255, 255, 255])),
            graphic: Graphic::Svg(Arc::from(RED_SQUARE_SVG)),
            placements: vec![square(20.0, 20.0, 20.0, 90.0)],
        };
        let out = RustBackend::new().composite(&params).unwrap();

        assert!(is_red(out.get_pixel(10, 30)));
        assert!(is_white(out.get_pixel(30, 30)));
    }

    #[test]
    fn composite_draws_every_placement() {
        let params = CompositeParams {
            base: Arc::new(solid_rgba(100, 50, [255, 255, 255, 255])),
            graphic: Graphic::Svg(Arc::from(RED_SQUARE_SVG)),
            placements: vec![square(5.0, 5.0, 20.0, 0.0), square(60.0, 5.0, 20.0, 0.0)],
        };
        let out = RustBackend::new().composite(&params).unwrap();
        assert!(is_red(out.get_pixel(15, 15)));
        assert!(is_red(out.get_pixel(70, 15)));
        assert!(is_white(out.get_pixel(45, 15)));
    }

    #[test]
    fn composite_leaves_base_untouched() {
        let base = Arc::new(solid_rgba(30, 30, [255, 255, 255, 255]));
        let params = CompositeParams {
            base: Arc::clone(&base),
            graphic: Graphic::Svg(Arc::from(RED_SQUARE_SVG)),
            placements: vec![square(0.0, 0.0, 30.0, 0.0)],
        };
        RustBackend::new().composite(&params).unwrap();
        assert!(is_white(base.get_pixel(15, 15)));
    }

    #[test]
    fn encode_png_roundtrip_dimensions() {
        let backend = RustBackend::new();
        let png = backend.encode_png(&solid_rgba(12, 7, [1, 2, 3, 255])).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(backend.decode(&png).unwrap().dimensions(), (12, 7));
    }
}
