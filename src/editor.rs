//! Editor session: the state behind one photo being decorated.
//!
//! The [`Editor`] owns the detector adapter, the original and processed
//! images, the detected faces, the current placements and the selected
//! overlay. Front ends (the CLI, or anything embedding the library) drive it
//! through plain method calls:
//!
//! ```text
//! init_detection ─▶ upload ─▶ select_style ─▶ render ─▶ export_png / save_png
//!                      │                         ▲
//!                      └─ manual edits ──────────┘
//!                         (begin_pointer / rotate / set_placements)
//! ```
//!
//! ## Recomposition
//!
//! Mutations never composite on their own. Every change that affects the
//! output (upload, style selection, drag, resize, rotate, `set_placements`)
//! only bumps a generation counter; the caller must call [`Editor::render`]
//! after each mutation to see it in [`Editor::processed`].
//! [`Editor::export_png`] renders first, so exports are always current.
//!
//! [`Editor::prepare_render`] snapshots the state into a [`RenderJob`] that
//! can run on any thread; [`Editor::commit`] only accepts a result whose
//! generation is still current, so a slow stale render never replaces a
//! newer one. [`Editor::render`] does all three steps synchronously and is a
//! no-op when the processed image is already up to date.
//!
//! ## Notices
//!
//! User-facing messages ("Found 2 face(s)", "Invalid file type", …) are
//! queued as [`Notice`]s and drained with [`Editor::take_notices`]. They are
//! also logged.

use crate::adjust::{AdjustError, Adjuster, Handle, PointerState, RotateDirection, Viewport};
use crate::catalog::{self, OverlayStyle};
use crate::config::StacheConfig;
use crate::detect::{DetectError, Detector, ModelState};
use crate::imaging::{
    BackendError, CompositeParams, Dimensions, Graphic, ImageBackend, PlacementRatios,
    ResizeLimits, bounded, decode_photo, normalize_rotation, sniff_photo_format,
};
use crate::placement::initial_placements;
use crate::types::{DetectedFace, Placement};
use image::RgbaImage;
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("invalid file type: {0}")]
    InvalidFileType(String),
    #[error("face detection unavailable: {0}")]
    ModelLoad(String),
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("could not render image: {0}")]
    Decode(#[from] BackendError),
    #[error("no image uploaded")]
    NoImage,
    #[error("no overlay style selected")]
    NoStyle,
    #[error("unknown style '{0}'")]
    UnknownStyle(String),
    #[error("manual mode is off")]
    NotManual,
    #[error("placement {index} out of range ({len} placements)")]
    PlacementOutOfRange { index: usize, len: usize },
    #[error("another pointer session is already active")]
    SessionActive,
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AdjustError> for EditorError {
    fn from(e: AdjustError) -> Self {
        match e {
            AdjustError::OutOfRange { index, len } => EditorError::PlacementOutOfRange { index, len },
            AdjustError::SessionActive => EditorError::SessionActive,
            AdjustError::InvalidViewport { width, height } => {
                EditorError::InvalidViewport { width, height }
            }
        }
    }
}

// =============================================================================
// Notices
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A short user-facing message, shown by the front end as it sees fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

// =============================================================================
// Overlay selection
// =============================================================================

/// What gets drawn into every placement.
#[derive(Debug, Clone)]
pub enum Overlay {
    /// A built-in catalog style.
    Style(&'static OverlayStyle),
    /// A user-supplied graphic (`--overlay-file`).
    Custom { name: String, graphic: Graphic },
}

impl Overlay {
    pub fn name(&self) -> &str {
        match self {
            Overlay::Style(style) => style.display_name,
            Overlay::Custom { name, .. } => name,
        }
    }

    pub fn graphic(&self) -> Graphic {
        match self {
            Overlay::Style(style) => style.graphic(),
            Overlay::Custom { graphic, .. } => graphic.clone(),
        }
    }

    fn applied_title(&self) -> &'static str {
        match self {
            Overlay::Style(style) if style.is_accessory() => "Accessory applied!",
            Overlay::Style(_) => "Mustache applied!",
            Overlay::Custom { .. } => "Overlay applied!",
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// The parts of [`StacheConfig`] an editor session needs.
#[derive(Debug, Clone)]
pub struct EditorSettings {
    pub ratios: PlacementRatios,
    pub limits: ResizeLimits,
    pub rotate_step: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self::from_config(&StacheConfig::default())
    }
}

impl EditorSettings {
    pub fn from_config(config: &StacheConfig) -> Self {
        Self {
            ratios: config.placement.ratios(),
            limits: config.adjust.limits(),
            rotate_step: config.adjust.rotate_step,
        }
    }
}

// =============================================================================
// Render jobs
// =============================================================================

/// A snapshot of everything one recomposition needs. `Send`, so it can be
/// run off the editor's thread.
#[derive(Debug, Clone)]
pub struct RenderJob {
    generation: u64,
    params: CompositeParams,
}

/// The result of running a [`RenderJob`], to hand back to [`Editor::commit`].
#[derive(Debug)]
pub struct RenderOutcome {
    generation: u64,
    result: Result<RgbaImage, BackendError>,
}

impl RenderJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> &CompositeParams {
        &self.params
    }

    pub fn run(&self, backend: &impl ImageBackend) -> RenderOutcome {
        RenderOutcome {
            generation: self.generation,
            result: backend.composite(&self.params),
        }
    }
}

impl RenderOutcome {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// =============================================================================
// Editor
// =============================================================================

pub struct Editor<B: ImageBackend> {
    backend: B,
    detector: Detector,
    settings: EditorSettings,
    adjuster: Adjuster,
    viewport: Option<Viewport>,

    original: Option<Arc<RgbaImage>>,
    processed: Option<Arc<RgbaImage>>,
    faces: Vec<DetectedFace>,
    placements: Vec<Placement>,
    overlay: Option<Overlay>,
    manual_mode: bool,

    generation: u64,
    rendered_generation: Option<u64>,
    announce_render: bool,
    notices: Vec<Notice>,
}

impl<B: ImageBackend> Editor<B> {
    pub fn new(backend: B, detector: Detector, settings: EditorSettings) -> Self {
        let adjuster = Adjuster::new(settings.limits, settings.rotate_step);
        Self {
            backend,
            detector,
            settings,
            adjuster,
            viewport: None,
            original: None,
            processed: None,
            faces: Vec::new(),
            placements: Vec::new(),
            overlay: None,
            manual_mode: false,
            generation: 0,
            rendered_generation: None,
            announce_render: false,
            notices: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn detection_state(&self) -> ModelState {
        self.detector.state()
    }

    pub fn original(&self) -> Option<&RgbaImage> {
        self.original.as_deref()
    }

    pub fn processed(&self) -> Option<&RgbaImage> {
        self.processed.as_deref()
    }

    pub fn image_dimensions(&self) -> Option<Dimensions> {
        self.original.as_deref().map(Dimensions::of)
    }

    pub fn faces(&self) -> &[DetectedFace] {
        &self.faces
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn manual_mode(&self) -> bool {
        self.manual_mode
    }

    pub fn pointer_state(&self) -> PointerState {
        self.adjuster.state()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True when an image and overlay exist but the processed image is older
    /// than the current state.
    pub fn needs_render(&self) -> bool {
        self.original.is_some()
            && self.overlay.is_some()
            && self.rendered_generation != Some(self.generation)
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, title: impl Into<String>, description: &str) {
        let notice = Notice {
            level,
            title: title.into(),
            description: description.to_string(),
        };
        match level {
            NoticeLevel::Info => info!("{}: {}", notice.title, notice.description),
            NoticeLevel::Error => warn!("{}: {}", notice.title, notice.description),
        }
        self.notices.push(notice);
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    fn image_size(&self) -> Result<(u32, u32), EditorError> {
        self.image_dimensions()
            .map(Dimensions::as_tuple)
            .ok_or(EditorError::NoImage)
    }

    fn require_manual(&self) -> Result<(), EditorError> {
        if self.manual_mode {
            Ok(())
        } else {
            Err(EditorError::NotManual)
        }
    }

    // -------------------------------------------------------------------------
    // Detection
    // -------------------------------------------------------------------------

    /// Load detector models. On failure detection stays off and manual mode
    /// is forced on; the editor remains fully usable.
    pub fn init_detection(&mut self) -> Result<(), EditorError> {
        if self.detector.state() == ModelState::Loaded {
            return Ok(());
        }
        match self.detector.load_models() {
            Ok(()) => {
                self.notify(
                    NoticeLevel::Info,
                    "Face detection ready",
                    "Upload a photo to get started!",
                );
                Ok(())
            }
            Err(e) => {
                self.manual_mode = true;
                self.notify(
                    NoticeLevel::Error,
                    "Face detection unavailable",
                    "You can still manually position mustaches",
                );
                Err(EditorError::ModelLoad(e.to_string()))
            }
        }
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Accept a new photo.
    ///
    /// `declared_mime` is whatever content type the caller was told, if any;
    /// it must start with `image/`. The bytes themselves must sniff as JPEG,
    /// PNG or WebP. On rejection nothing changes.
    ///
    /// Detection failures are not errors here: they are reported as notices
    /// and the default placement is used.
    pub fn upload(
        &mut self,
        bytes: &[u8],
        declared_mime: Option<&str>,
    ) -> Result<Dimensions, EditorError> {
        if let Some(mime) = declared_mime.filter(|m| !m.starts_with("image/")) {
            return Err(self.reject_upload(format!("declared type {mime}")));
        }
        let Some(format) = sniff_photo_format(bytes) else {
            return Err(self.reject_upload("content is not a JPEG, PNG or WebP image".into()));
        };
        debug!("Upload sniffed as {format:?}, {} bytes", bytes.len());

        let (image, dims) = match decode_photo(&self.backend, bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.notify(NoticeLevel::Error, "Could not read image", &e.to_string());
                return Err(EditorError::Decode(e));
            }
        };
        info!("Loaded {}x{} photo", dims.width, dims.height);

        self.adjuster.end();
        self.original = Some(Arc::new(image));
        self.processed = None;
        self.rendered_generation = None;
        self.faces = self.detect_uploaded();
        self.placements = initial_placements(&self.faces, dims.as_tuple(), &self.settings.ratios);
        self.announce_render = true;
        self.bump();
        Ok(dims)
    }

    fn reject_upload(&mut self, reason: String) -> EditorError {
        self.notify(
            NoticeLevel::Error,
            "Invalid file type",
            "Please upload a JPG, PNG or WebP image",
        );
        EditorError::InvalidFileType(reason)
    }

    fn detect_uploaded(&mut self) -> Vec<DetectedFace> {
        let Some(image) = self.original.clone() else {
            return Vec::new();
        };
        if !self.detector.is_loaded() {
            return Vec::new();
        }
        match self.detector.detect_faces(&image) {
            Ok(faces) => {
                self.notify(
                    NoticeLevel::Info,
                    format!("Found {} face(s)", faces.len()),
                    "Select a mustache style to apply",
                );
                faces
            }
            Err(e) => {
                debug!("Detection error: {e}");
                self.notify(
                    NoticeLevel::Error,
                    "Face detection failed",
                    "You can still add mustaches manually",
                );
                Vec::new()
            }
        }
    }

    /// Re-run detection on the current image and replace the placements.
    pub fn redetect(&mut self) -> Result<usize, EditorError> {
        let image = self.original.clone().ok_or(EditorError::NoImage)?;
        let faces = self.detector.detect_faces(&image).map_err(|e| match e {
            DetectError::NotLoaded | DetectError::ModelLoad(_) => {
                EditorError::ModelLoad(e.to_string())
            }
            DetectError::Detection(msg) => EditorError::Detection(msg),
        })?;
        let size = self.image_size()?;
        self.placements = initial_placements(&faces, size, &self.settings.ratios);
        self.faces = faces;
        self.bump();
        Ok(self.faces.len())
    }

    // -------------------------------------------------------------------------
    // Overlay selection and mode
    // -------------------------------------------------------------------------

    /// Select a catalog style by id.
    pub fn select_style(&mut self, id: &str) -> Result<&'static OverlayStyle, EditorError> {
        let style = catalog::find_style(id).ok_or_else(|| EditorError::UnknownStyle(id.into()))?;
        self.select_overlay(Overlay::Style(style));
        Ok(style)
    }

    /// Select any overlay, catalog or custom.
    pub fn select_overlay(&mut self, overlay: Overlay) {
        debug!("Selected overlay {}", overlay.name());
        self.overlay = Some(overlay);
        self.announce_render = true;
        self.bump();
    }

    /// Switch who controls the placements. Placements are kept either way.
    pub fn set_manual_mode(&mut self, on: bool) {
        self.manual_mode = on;
    }

    /// Tell the editor how large the preview is drawn, for pointer mapping.
    pub fn set_viewport(&mut self, width: f64, height: f64) -> Result<(), EditorError> {
        self.viewport = Some(Viewport::new(width, height)?);
        Ok(())
    }

    fn effective_viewport(&self, image: (u32, u32)) -> Viewport {
        self.viewport.unwrap_or_else(|| Viewport::natural(image))
    }

    // -------------------------------------------------------------------------
    // Manual adjustment
    // -------------------------------------------------------------------------

    /// Pointer down on a placement. The returned guard receives moves and
    /// returns the editor to idle when dropped.
    pub fn begin_pointer(
        &mut self,
        index: usize,
        handle: Handle,
        at: (f64, f64),
    ) -> Result<PointerSession<'_, B>, EditorError> {
        self.image_size()?;
        self.require_manual()?;
        self.adjuster.begin(&self.placements, index, handle, at)?;
        debug!("Pointer session started on placement {index} ({handle:?})");
        Ok(PointerSession {
            editor: self,
            index,
        })
    }

    /// Rotate one placement by the configured step.
    pub fn rotate(&mut self, index: usize, direction: RotateDirection) -> Result<(), EditorError> {
        self.image_size()?;
        self.require_manual()?;
        self.placements = self.adjuster.rotate(&self.placements, index, direction)?;
        self.bump();
        Ok(())
    }

    /// Rotate one placement by an arbitrary angle in degrees.
    pub fn rotate_by(&mut self, index: usize, degrees: f64) -> Result<(), EditorError> {
        self.image_size()?;
        self.require_manual()?;
        self.placements = crate::adjust::rotate_by(&self.placements, index, degrees)?;
        self.bump();
        Ok(())
    }

    /// Replace all placements, e.g. from an edited JSON file.
    ///
    /// Each rectangle gets the resize bounds, is clamped into the image and
    /// has its rotation normalized.
    pub fn set_placements(&mut self, placements: Vec<Placement>) -> Result<(), EditorError> {
        let size = self.image_size()?;
        self.require_manual()?;
        let limits = self.settings.limits;
        self.placements = placements
            .into_iter()
            .map(|p| {
                bounded(
                    Placement {
                        rotation: normalize_rotation(p.rotation),
                        ..p
                    },
                    size,
                    &limits,
                )
            })
            .collect();
        self.bump();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Snapshot the current state for recomposition.
    pub fn prepare_render(&self) -> Result<RenderJob, EditorError> {
        let base = self.original.clone().ok_or(EditorError::NoImage)?;
        let overlay = self.overlay.as_ref().ok_or(EditorError::NoStyle)?;
        Ok(RenderJob {
            generation: self.generation,
            params: CompositeParams {
                base,
                graphic: overlay.graphic(),
                placements: self.placements.clone(),
            },
        })
    }

    /// Accept a finished render if it is still current.
    ///
    /// Returns `Ok(false)` for a stale outcome, which is dropped. A failed
    /// current render leaves the previous processed image in place.
    pub fn commit(&mut self, outcome: RenderOutcome) -> Result<bool, EditorError> {
        if outcome.generation != self.generation {
            debug!(
                "Dropping stale render (generation {} < {})",
                outcome.generation, self.generation
            );
            return Ok(false);
        }
        match outcome.result {
            Ok(image) => {
                self.processed = Some(Arc::new(image));
                self.rendered_generation = Some(outcome.generation);
                if std::mem::take(&mut self.announce_render) {
                    let title = self
                        .overlay
                        .as_ref()
                        .map_or("Overlay applied!", Overlay::applied_title);
                    self.notify(
                        NoticeLevel::Info,
                        title,
                        "Your distinguished photo is ready for download",
                    );
                }
                Ok(true)
            }
            Err(e) => {
                self.notify(NoticeLevel::Error, "Could not apply overlay", &e.to_string());
                Err(EditorError::Decode(e))
            }
        }
    }

    /// Recompose synchronously if anything changed since the last render.
    pub fn render(&mut self) -> Result<(), EditorError> {
        if !self.needs_render() {
            // surface NoImage / NoStyle instead of silently succeeding
            if self.rendered_generation.is_none() {
                self.prepare_render()?;
            }
            return Ok(());
        }
        let outcome = self.prepare_render()?.run(&self.backend);
        self.commit(outcome)?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Render if needed, then encode the processed image as PNG.
    pub fn export_png(&mut self) -> Result<Vec<u8>, EditorError> {
        self.render()?;
        let processed = self.processed.as_deref().ok_or(EditorError::NoImage)?;
        Ok(self.backend.encode_png(processed)?)
    }

    /// Export and write to `path`.
    pub fn save_png(&mut self, path: &Path) -> Result<(), EditorError> {
        let png = self.export_png()?;
        std::fs::write(path, png)?;
        self.notify(
            NoticeLevel::Info,
            "Download complete!",
            "Your distinguished photo has been saved",
        );
        Ok(())
    }

    /// Forget the image, overlay, faces and placements.
    pub fn reset(&mut self) {
        self.adjuster.end();
        self.original = None;
        self.processed = None;
        self.overlay = None;
        self.faces.clear();
        self.placements.clear();
        self.rendered_generation = None;
        self.announce_render = false;
        self.bump();
    }
}

// =============================================================================
// Pointer sessions
// =============================================================================

/// An active drag or resize. Holding it borrows the editor exclusively;
/// dropping it (or calling [`finish`](Self::finish)) returns to idle.
pub struct PointerSession<'a, B: ImageBackend> {
    editor: &'a mut Editor<B>,
    index: usize,
}

impl<B: ImageBackend> PointerSession<'_, B> {
    /// Pointer moved to displayed position `at`. Returns the updated placement.
    pub fn move_to(&mut self, at: (f64, f64)) -> Result<Placement, EditorError> {
        let editor = &mut *self.editor;
        let size = editor.image_size()?;
        let viewport = editor.effective_viewport(size);
        if let Some(next) = editor
            .adjuster
            .update(&editor.placements, at, size, &viewport)
        {
            editor.placements = next;
            editor.bump();
        }
        Ok(editor.placements[self.index])
    }

    /// Pointer up.
    pub fn finish(self) {}
}

impl<B: ImageBackend> Drop for PointerSession<'_, B> {
    fn drop(&mut self) {
        self.editor.adjuster.end();
        debug!("Pointer session ended");
    }
}
