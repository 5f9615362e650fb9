//! Detector adapter: the only boundary to face detection.
//!
//! The rest of the crate never sees a detector library's native types.
//! A [`FaceModel`] backend produces [`DetectedFace`] values; the [`Detector`]
//! wraps one backend and owns its load state, so "are the models loaded?"
//! is a property of the adapter instance rather than process-global.
//!
//! ## Backends
//!
//! | Backend | Source of faces |
//! |---|---|
//! | [`LandmarkFile`] | JSON exported by an external landmark detector |
//! | `SeetaFaceModel` | SeetaFace frontal detector (`rustface` feature) |
//! | [`NoModel`] | none: detection disabled, always fails to load |
//!
//! ## Contract
//!
//! - [`Detector::load_models`] is idempotent once it has succeeded.
//! - [`Detector::detect_faces`] fails with [`DetectError::NotLoaded`] until then.
//! - Face order is stable within one call and nothing more.

use crate::config::{DetectionConfig, DetectorKind};
use crate::types::{BoundingBox, DetectedFace, Point};
use image::RgbaImage;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("failed to load face detection models: {0}")]
    ModelLoad(String),
    #[error("face detection models not loaded")]
    NotLoaded,
    #[error("face detection failed: {0}")]
    Detection(String),
}

/// A pluggable face detection backend.
///
/// Implement this to integrate another detector (ONNX, dlib, a web service
/// client, …) and hand it to [`Detector::new`].
pub trait FaceModel: Send + Sync {
    /// Short human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Fetch/parse model weights. Called at most once per successful load.
    fn load(&mut self) -> Result<(), DetectError>;

    /// Find faces in a decoded image.
    fn detect(&self, image: &RgbaImage) -> Result<Vec<DetectedFace>, DetectError>;
}

/// Load state of a [`Detector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Unloaded,
    Loaded,
    /// The last load attempt failed. Another attempt may be made.
    Failed,
}

/// Adapter around one [`FaceModel`].
pub struct Detector {
    model: Box<dyn FaceModel>,
    state: ModelState,
}

impl Detector {
    pub fn new(model: Box<dyn FaceModel>) -> Self {
        Self {
            model,
            state: ModelState::Unloaded,
        }
    }

    /// Build the backend selected in config. Nothing is loaded yet.
    pub fn from_config(config: &DetectionConfig) -> Self {
        let model: Box<dyn FaceModel> = match config.backend {
            DetectorKind::None => Box::new(NoModel::new("face detection disabled in config")),
            DetectorKind::Landmarks => match &config.model_path {
                Some(path) => Box::new(LandmarkFile::new(path)),
                None => Box::new(NoModel::new("detection.model_path is not set")),
            },
            DetectorKind::Seetaface => seetaface_model(config),
        };
        Self::new(model)
    }

    /// Load model weights. A no-op once loaded.
    pub fn load_models(&mut self) -> Result<(), DetectError> {
        if self.state == ModelState::Loaded {
            return Ok(());
        }
        match self.model.load() {
            Ok(()) => {
                self.state = ModelState::Loaded;
                info!("Face detection models loaded ({})", self.model.name());
                Ok(())
            }
            Err(e) => {
                self.state = ModelState::Failed;
                warn!("Face detection unavailable ({}): {e}", self.model.name());
                Err(match e {
                    DetectError::ModelLoad(_) => e,
                    other => DetectError::ModelLoad(other.to_string()),
                })
            }
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ModelState::Loaded
    }

    /// Detect faces. Requires a successful [`load_models`](Self::load_models).
    pub fn detect_faces(&self, image: &RgbaImage) -> Result<Vec<DetectedFace>, DetectError> {
        if !self.is_loaded() {
            return Err(DetectError::NotLoaded);
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::Detection("image has no pixels".into()));
        }
        let faces = self.model.detect(image)?;
        debug!("Detected {} face(s) with {}", faces.len(), self.model.name());
        Ok(faces)
    }
}

// =============================================================================
// Backends
// =============================================================================

/// Backend that can never load. Used when detection is disabled or the
/// configured backend is unavailable in this build.
pub struct NoModel {
    reason: String,
}

impl NoModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl FaceModel for NoModel {
    fn name(&self) -> &str {
        "none"
    }

    fn load(&mut self) -> Result<(), DetectError> {
        Err(DetectError::ModelLoad(self.reason.clone()))
    }

    fn detect(&self, _image: &RgbaImage) -> Result<Vec<DetectedFace>, DetectError> {
        Err(DetectError::NotLoaded)
    }
}

/// Faces exported by an external landmark detector as JSON:
///
/// ```json
/// [{ "bounding_box": {"x": 0, "y": 0, "width": 100, "height": 120},
///    "mouth_contour": [[10, 50], [20, 55], [30, 55], [20, 60]] }]
/// ```
///
/// Loading reads and validates the file; detection returns its faces.
pub struct LandmarkFile {
    path: PathBuf,
    faces: Vec<DetectedFace>,
}

impl LandmarkFile {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            faces: Vec::new(),
        }
    }
}

impl FaceModel for LandmarkFile {
    fn name(&self) -> &str {
        "landmark-file"
    }

    fn load(&mut self) -> Result<(), DetectError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", self.path.display())))?;
        let faces: Vec<DetectedFace> = serde_json::from_str(&text)
            .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", self.path.display())))?;
        if let Some(bad) = faces.iter().position(|f| f.bounding_box.width <= 0.0) {
            return Err(DetectError::ModelLoad(format!(
                "{}: face {bad} has a non-positive bounding box width",
                self.path.display()
            )));
        }
        self.faces = faces;
        Ok(())
    }

    fn detect(&self, image: &RgbaImage) -> Result<Vec<DetectedFace>, DetectError> {
        let (w, h) = (image.width() as f64, image.height() as f64);
        let outside = self
            .faces
            .iter()
            .any(|f| f.bounding_box.x >= w || f.bounding_box.y >= h);
        if outside {
            return Err(DetectError::Detection(format!(
                "landmarks in {} do not fit a {}x{} image",
                self.path.display(),
                image.width(),
                image.height()
            )));
        }
        Ok(self.faces.clone())
    }
}

/// Estimate a mouth outline from a face box alone.
///
/// For detectors that report boxes without landmarks. Uses typical frontal
/// proportions: mouth center at 78% of the box height, corners at ±20% of
/// the width. Returns left corner, upper lip, right corner, lower lip.
pub fn estimate_mouth_contour(face: &BoundingBox) -> Vec<Point> {
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height * 0.78;
    let half_w = face.width * 0.2;
    let half_h = face.height * 0.05;
    vec![
        Point::new(cx - half_w, cy),
        Point::new(cx, cy - half_h),
        Point::new(cx + half_w, cy),
        Point::new(cx, cy + half_h),
    ]
}

#[cfg(feature = "rustface")]
fn seetaface_model(config: &DetectionConfig) -> Box<dyn FaceModel> {
    match &config.model_path {
        Some(path) => Box::new(seeta::SeetaFaceModel::new(path, config.min_face_size)),
        None => Box::new(NoModel::new("detection.model_path is not set")),
    }
}

#[cfg(not(feature = "rustface"))]
fn seetaface_model(_config: &DetectionConfig) -> Box<dyn FaceModel> {
    Box::new(NoModel::new("built without the `rustface` feature"))
}

#[cfg(feature = "rustface")]
pub use seeta::SeetaFaceModel;

#[cfg(feature = "rustface")]
mod seeta {
    use super::{DetectError, FaceModel, estimate_mouth_contour};
    use crate::types::{BoundingBox, DetectedFace};
    use image::RgbaImage;
    use std::path::{Path, PathBuf};

    /// SeetaFace frontal detector backed by the `rustface` crate.
    pub struct SeetaFaceModel {
        path: PathBuf,
        min_face_size: u32,
        model: Option<rustface::Model>,
    }

    impl SeetaFaceModel {
        pub fn new(path: &Path, min_face_size: u32) -> Self {
            Self {
                path: path.to_path_buf(),
                min_face_size,
                model: None,
            }
        }
    }

    impl FaceModel for SeetaFaceModel {
        fn name(&self) -> &str {
            "seetaface"
        }

        fn load(&mut self) -> Result<(), DetectError> {
            let bytes = std::fs::read(&self.path)
                .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", self.path.display())))?;
            let model = rustface::read_model(std::io::Cursor::new(bytes))
                .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", self.path.display())))?;
            self.model = Some(model);
            Ok(())
        }

        fn detect(&self, image: &RgbaImage) -> Result<Vec<DetectedFace>, DetectError> {
            let model = self.model.as_ref().ok_or(DetectError::NotLoaded)?;
            let mut detector = rustface::create_detector_with_model(model.clone());
            detector.set_min_face_size(self.min_face_size);
            detector.set_score_thresh(2.0);
            detector.set_pyramid_scale_factor(0.8);
            detector.set_slide_window_step(4, 4);

            let gray = image::imageops::grayscale(image);
            let faces = detector.detect(&rustface::ImageData::new(
                gray.as_raw(),
                gray.width(),
                gray.height(),
            ));

            Ok(faces
                .iter()
                .map(|face| {
                    let bbox = face.bbox();
                    let bounding_box = BoundingBox {
                        x: bbox.x() as f64,
                        y: bbox.y() as f64,
                        width: bbox.width() as f64,
                        height: bbox.height() as f64,
                    };
                    DetectedFace {
                        mouth_contour: estimate_mouth_contour(&bounding_box),
                        bounding_box,
                    }
                })
                .collect())
        }
    }
}
