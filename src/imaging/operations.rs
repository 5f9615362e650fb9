//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take decoded inputs, compute parameters, and call the backend.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::plan_layer;
use super::params::{CompositeParams, Graphic, LayerPlan};
use crate::types::Placement;
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Decode raw bytes into an RGBA image and report its dimensions.
pub fn decode_photo(backend: &impl ImageBackend, bytes: &[u8]) -> Result<(RgbaImage, Dimensions)> {
    let img = backend.decode(bytes)?;
    let dims = Dimensions::of(&img);
    if dims.width == 0 || dims.height == 0 {
        return Err(BackendError::Decode("image dimensions are zero".into()));
    }
    Ok((img, dims))
}

/// Load an overlay graphic from disk.
///
/// `.svg` files stay vector and are rasterized per placement; anything else
/// is decoded as a raster image up front.
pub fn load_graphic(backend: &impl ImageBackend, path: &Path) -> Result<Graphic> {
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    if is_svg {
        let text = std::fs::read_to_string(path)?;
        return Ok(Graphic::Svg(Arc::from(text)));
    }
    let bytes = std::fs::read(path)?;
    Ok(Graphic::Raster(Arc::new(backend.decode(&bytes)?)))
}

/// Plan every layer of a composite without drawing anything.
///
/// Useful for testing parameter generation.
pub fn plan_layers(placements: &[Placement]) -> Vec<LayerPlan> {
    placements.iter().map(plan_layer).collect()
}

/// Composite and encode in one step.
pub fn compose_png(backend: &impl ImageBackend, params: &CompositeParams) -> Result<Vec<u8>> {
    let surface = backend.composite(params)?;
    backend.encode_png(&surface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::RustBackend;
    use crate::test_helpers::make_test_png;

    #[test]
    fn decode_photo_reports_dimensions() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1920,
            height: 1080,
        }]);
        let (_, dims) = decode_photo(&backend, b"bytes").unwrap();
        assert_eq!(dims.as_tuple(), (1920, 1080));
    }

    #[test]
    fn decode_photo_rejects_empty_image() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 0,
            height: 10,
        }]);
        assert!(decode_photo(&backend, b"bytes").is_err());
    }

    #[test]
    fn compose_png_composites_then_encodes() {
        let backend = MockBackend::new();
        let params = CompositeParams {
            base: Arc::new(RgbaImage::new(50, 40)),
            graphic: Graphic::Svg(Arc::from("<svg/>")),
            placements: vec![],
        };
        let png = compose_png(&backend, &params).unwrap();
        assert!(png.starts_with(b"\x89PNG"));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], RecordedOp::Composite { placements: 0, .. }));
        assert!(matches!(ops[1], RecordedOp::EncodePng { width: 50, height: 40 }));
    }

    #[test]
    fn plan_layers_one_per_placement() {
        let p = Placement {
            x: 1.0,
            y: 2.0,
            width: 10.0,
            height: 4.0,
            rotation: 0.0,
            face_index: None,
        };
        let plans = plan_layers(&[p, p]);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].raster_width, 10);
    }

    #[test]
    fn load_graphic_keeps_svg_vector() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tash.svg");
        std::fs::write(&path, "<svg xmlns=\"http://www.w3.org/2000/svg\"/>").unwrap();
        let graphic = load_graphic(&RustBackend::new(), &path).unwrap();
        assert!(matches!(graphic, Graphic::Svg(_)));
    }

    #[test]
    fn load_graphic_decodes_raster() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tash.png");
        std::fs::write(&path, make_test_png(16, 8)).unwrap();
        match load_graphic(&RustBackend::new(), &path).unwrap() {
            Graphic::Raster(img) => assert_eq!(img.dimensions(), (16, 8)),
            Graphic::Svg(_) => panic!("expected raster graphic"),
        }
    }

    #[test]
    fn load_graphic_missing_file_is_io_error() {
        let result = load_graphic(&RustBackend::new(), Path::new("/nonexistent/tash.svg"));
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
