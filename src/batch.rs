//! Batch mode: decorate every photo under a directory.
//!
//! Each image goes through the same pipeline as the interactive editor,
//! minus the manual step: decode, detect, place, composite, write PNG.
//! Images are processed in parallel using [rayon](https://docs.rs/rayon);
//! the pool size comes from `[processing] max_processes`.
//!
//! A failing image never aborts the batch. It is reported as a
//! [`BatchEvent::ImageFailed`] and counted in the [`BatchSummary`].
//!
//! ## Output Structure
//!
//! ```text
//! photos/                      out/
//! ├── beach.jpg         ──▶    ├── beach-distinguished.png
//! └── 2024/                    └── 2024/
//!     └── party.webp    ──▶        └── party-distinguished.png
//! ```

use crate::detect::Detector;
use crate::imaging::{
    BackendError, CompositeParams, Graphic, ImageBackend, PlacementRatios, compose_png,
    decode_photo, supported_input_extensions,
};
use crate::placement::initial_placements;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

/// Suffix added to every output file stem.
pub const OUTPUT_SUFFIX: &str = "-distinguished";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Why one image could not be decorated.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// How detection went for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStatus {
    /// Detector ran; this many faces were found.
    Found(usize),
    /// No detector loaded, default placement used.
    Unavailable,
    /// Detector errored, default placement used.
    Failed,
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ImageDone {
        index: usize,
        source: PathBuf,
        output: PathBuf,
        detection: DetectionStatus,
        placements: usize,
    },
    ImageFailed {
        index: usize,
        source: PathBuf,
        error: String,
    },
}

/// Totals for a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub faces: usize,
}

/// What to draw and how to place it.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub graphic: Graphic,
    pub ratios: PlacementRatios,
    pub output_dir: PathBuf,
}

/// Find every supported photo under `root`, sorted. Skips `exclude` (the
/// output directory, when it lives inside the input tree).
pub fn discover_images(root: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>, BatchError> {
    if !root.is_dir() {
        return Err(BatchError::NotADirectory(root.to_path_buf()));
    }
    let extensions = supported_input_extensions();
    let mut images = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| exclude.is_none_or(|ex| e.path() != ex));
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|s| s.eq_ignore_ascii_case(e)));
        if entry.file_type().is_file() && supported {
            images.push(path.to_path_buf());
        }
    }

    images.sort();
    Ok(images)
}

/// Where the decorated copy of `source` is written.
pub fn output_path(source: &Path, root: &Path, output_dir: &Path) -> PathBuf {
    let relative = source.strip_prefix(root).unwrap_or(source);
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("{stem}{OUTPUT_SUFFIX}.png");
    match relative.parent() {
        Some(parent) => output_dir.join(parent).join(file_name),
        None => output_dir.join(file_name),
    }
}

/// Decorate one image and write the PNG. Returns detection status and the
/// number of placements drawn.
pub fn process_image(
    backend: &impl ImageBackend,
    detector: &Detector,
    options: &BatchOptions,
    source: &Path,
    output: &Path,
) -> Result<(DetectionStatus, usize), ImageError> {
    let bytes = std::fs::read(source)?;
    let (image, dims) = decode_photo(backend, &bytes)?;

    let (faces, detection) = if detector.is_loaded() {
        match detector.detect_faces(&image) {
            Ok(faces) => {
                let n = faces.len();
                (faces, DetectionStatus::Found(n))
            }
            Err(e) => {
                warn!("Detection failed for {}: {e}", source.display());
                (Vec::new(), DetectionStatus::Failed)
            }
        }
    } else {
        (Vec::new(), DetectionStatus::Unavailable)
    };

    let placements = initial_placements(&faces, dims.as_tuple(), &options.ratios);
    let count = placements.len();
    let params = CompositeParams {
        base: Arc::new(image),
        graphic: options.graphic.clone(),
        placements,
    };
    let png = compose_png(backend, &params)?;

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, png)?;
    debug!("Wrote {}", output.display());
    Ok((detection, count))
}

/// `output_dir` spelled the way the walker reports it under `root`, when it
/// exists inside the input tree. Both sides are canonicalized so `.`, `..`
/// and relative spellings match.
fn nested_output_dir(root: &Path, output_dir: &Path) -> Option<PathBuf> {
    let root_abs = root.canonicalize().ok()?;
    let out_abs = output_dir.canonicalize().ok()?;
    let relative = out_abs.strip_prefix(&root_abs).ok()?;
    // writing into the input root itself: nothing to prune
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(relative))
}

/// Decorate every photo under `root`.
///
/// Runs on the current rayon pool. Progress is sent over `events` if given;
/// the receiver can print from another thread.
pub fn run_batch(
    backend: &impl ImageBackend,
    detector: &Detector,
    options: &BatchOptions,
    root: &Path,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let exclude = nested_output_dir(root, &options.output_dir);
    let images = discover_images(root, exclude.as_deref())?;
    info!("Batch: {} image(s) under {}", images.len(), root.display());

    if let Some(tx) = &events {
        tx.send(BatchEvent::Started {
            total: images.len(),
        })
        .ok();
    }

    let results: Vec<Result<DetectionStatus, ()>> = images
        .par_iter()
        .enumerate()
        .map_with(events, |tx, (i, source)| {
            let index = i + 1;
            let output = output_path(source, root, &options.output_dir);
            let (event, result) = match process_image(backend, detector, options, source, &output)
            {
                Ok((detection, placements)) => (
                    BatchEvent::ImageDone {
                        index,
                        source: source.clone(),
                        output,
                        detection,
                        placements,
                    },
                    Ok(detection),
                ),
                Err(e) => {
                    warn!("Skipping {}: {e}", source.display());
                    (
                        BatchEvent::ImageFailed {
                            index,
                            source: source.clone(),
                            error: e.to_string(),
                        },
                        Err(()),
                    )
                }
            };
            if let Some(tx) = tx {
                tx.send(event).ok();
            }
            result
        })
        .collect();

    let mut summary = BatchSummary::default();
    for result in results {
        match result {
            Ok(detection) => {
                summary.processed += 1;
                if let DetectionStatus::Found(n) = detection {
                    summary.faces += n;
                }
            }
            Err(()) => summary.failed += 1,
        }
    }
    Ok(summary)
}
