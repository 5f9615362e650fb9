//! Shared test utilities for the stache-stash test suite.
//!
//! Synthetic images and face fixtures so unit tests never depend on files
//! outside the crate.
//!
//! # Usage
//!
//! ```rust
//! use crate::imaging::mouth_anchor;
//! use crate::test_helpers::*;
//!
//! let png = make_test_png(64, 48);
//! let face = reference_face();
//! let anchor = mouth_anchor(&face.mouth_contour).unwrap();
//! assert_eq!((anchor.x, anchor.y), (20.0, 55.0));
//! ```

use crate::types::{BoundingBox, DetectedFace, Point};
use image::{ImageEncoder, Rgba, RgbaImage};

// =========================================================================
// Images
// =========================================================================

/// A gradient PNG of the given size. Gradient rather than flat so decoders
/// and resamplers have something to chew on.
pub fn make_test_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    });
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
    buffer
}

/// A single-color RGBA image.
pub fn solid_rgba(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

// =========================================================================
// Faces
// =========================================================================

/// A 100px-wide face whose mouth contour averages to (20, 55).
///
/// With stock placement ratios its overlay is 60×24 at (-10, 35.8) before
/// clamping.
pub fn reference_face() -> DetectedFace {
    DetectedFace {
        bounding_box: BoundingBox {
            x: 0.0,
            y: 20.0,
            width: 100.0,
            height: 120.0,
        },
        mouth_contour: vec![
            Point::new(10.0, 50.0),
            Point::new(20.0, 55.0),
            Point::new(30.0, 55.0),
            Point::new(20.0, 60.0),
        ],
    }
}

/// A face of the given width with its mouth centered on `(cx, cy)`.
pub fn face_at(cx: f64, cy: f64, width: f64) -> DetectedFace {
    DetectedFace {
        bounding_box: BoundingBox {
            x: cx - width / 2.0,
            y: cy - width,
            width,
            height: width * 1.2,
        },
        mouth_contour: vec![
            Point::new(cx - 10.0, cy),
            Point::new(cx, cy - 4.0),
            Point::new(cx + 10.0, cy),
            Point::new(cx, cy + 4.0),
        ],
    }
}

/// A face the detector found without mouth landmarks.
pub fn face_without_mouth(width: f64) -> DetectedFace {
    DetectedFace {
        bounding_box: BoundingBox {
            x: 0.0,
            y: 0.0,
            width,
            height: width,
        },
        mouth_contour: Vec::new(),
    }
}

// =========================================================================
// Assertions
// =========================================================================

/// Assert two floats agree to within 1e-9, with a readable message.
#[track_caller]
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
