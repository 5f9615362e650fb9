//! Compositing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations every backend must
//! support: decode, rasterize, composite and encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and statically
//! linked into the binary.

use super::params::{CompositeParams, Graphic};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Trait for compositing backends.
///
/// Every backend must implement all four operations so the editor and batch
/// code stay backend-agnostic.
pub trait ImageBackend: Sync {
    /// Decode an uploaded or overlay raster file into RGBA pixels.
    fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError>;

    /// Render a graphic at exactly `width × height` pixels.
    fn rasterize(&self, graphic: &Graphic, width: u32, height: u32)
    -> Result<RgbaImage, BackendError>;

    /// Draw the base image and one overlay per placement onto a fresh surface.
    fn composite(&self, params: &CompositeParams) -> Result<RgbaImage, BackendError>;

    /// Encode a finished surface as PNG.
    fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations without touching pixels.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<Dimensions>>,
        pub fail_composite: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(usize),
        Rasterize {
            width: u32,
            height: u32,
        },
        Composite {
            width: u32,
            height: u32,
            placements: usize,
        },
        EncodePng {
            width: u32,
            height: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn failing_composite() -> Self {
            Self {
                fail_composite: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn composite_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Composite { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, bytes: &[u8]) -> Result<RgbaImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(bytes.len()));

            self.decode_results
                .lock()
                .unwrap()
                .pop()
                .map(|d| RgbaImage::new(d.width, d.height))
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))
        }

        fn rasterize(
            &self,
            _graphic: &Graphic,
            width: u32,
            height: u32,
        ) -> Result<RgbaImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Rasterize { width, height });
            Ok(RgbaImage::new(width, height))
        }

        fn composite(&self, params: &CompositeParams) -> Result<RgbaImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Composite {
                width: params.base.width(),
                height: params.base.height(),
                placements: params.placements.len(),
            });
            if self.fail_composite {
                return Err(BackendError::Decode("mock overlay decode failure".to_string()));
            }
            Ok(params.base.as_ref().clone())
        }

        fn encode_png(&self, image: &RgbaImage) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::EncodePng {
                width: image.width(),
                height: image.height(),
            });
            Ok(b"\x89PNG mock".to_vec())
        }
    }

    #[test]
    fn mock_records_decode() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let img = backend.decode(&[1, 2, 3]).unwrap();
        assert_eq!(Dimensions::of(&img).as_tuple(), (800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Decode(3)]);
    }

    #[test]
    fn mock_decode_without_dimensions_errors() {
        let backend = MockBackend::new();
        assert!(matches!(backend.decode(&[]), Err(BackendError::Decode(_))));
    }

    #[test]
    fn mock_records_composite() {
        use crate::types::Placement;
        use std::sync::Arc;

        let backend = MockBackend::new();
        let params = CompositeParams {
            base: Arc::new(RgbaImage::new(40, 30)),
            graphic: Graphic::Svg(Arc::from("<svg/>")),
            placements: vec![Placement {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 4.0,
                rotation: 0.0,
                face_index: None,
            }],
        };
        let out = backend.composite(&params).unwrap();
        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Composite {
                width: 40,
                height: 30,
                placements: 1
            }]
        );
        assert_eq!(backend.composite_count(), 1);
    }
}
