//! # Stache Stash
//!
//! Overlay distinguished mustaches and accessories onto the faces in a photo.
//! A face detector finds mouths, the placement engine sizes an overlay for
//! each one, and a manual adjustment layer lets the user drag, resize and
//! rotate any of them before the result is composited and exported as PNG.
//!
//! # Architecture: Leaf to Shell
//!
//! ```text
//! detect     image      →  faces            (detector adapter, pluggable backends)
//! placement  faces      →  placements       (pure geometry)
//! adjust     pointer    →  placements'      (drag / resize / rotate state machine)
//! imaging    placements →  RGBA surface     (rasterize overlays, composite, PNG)
//! editor     session state tying the above together
//! ```
//!
//! Every piece below the [`editor`] is a plain function or a small value type,
//! so unit tests exercise placement and adjustment math without decoding a
//! single image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`detect`] | Detector adapter: `FaceModel` trait, load state, landmark-file and SeetaFace backends |
//! | [`placement`] | Initial overlay rectangles from detected mouths, or a default when none |
//! | [`adjust`] | Pointer state machine, viewport mapping, drag/resize/rotate with clamping |
//! | [`imaging`] | Decode, SVG rasterization, rotated compositing, PNG export |
//! | [`catalog`] | Built-in mustache and accessory styles with embedded SVG artwork |
//! | [`editor`] | One editing session: upload, detection, style, render generations, notices |
//! | [`batch`] | Decorate a whole directory in parallel |
//! | [`config`] | `stache.toml` loading, validation and merging over stock defaults |
//! | [`types`] | Shared geometry: `Point`, `BoundingBox`, `DetectedFace`, `Placement` |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Original-Image Pixel Space
//!
//! Placements are always stored in the original image's pixels. The preview
//! may be drawn at any size; pointer deltas are scaled back per axis through
//! a [`adjust::Viewport`] before they touch a placement. Export therefore
//! never has to rescale anything.
//!
//! ## Full Recomposite, Versioned
//!
//! The processed image is never patched. Every change bumps a generation and
//! the next render draws the original plus all overlays from scratch. Render
//! results carry their generation so a slow, stale one is discarded instead
//! of overwriting a newer result.
//!
//! ## Detection Is Optional
//!
//! No detector, a failed model load, or a detector error all degrade to the
//! same thing: one default placement under manual control.

pub mod adjust;
pub mod batch;
pub mod catalog;
pub mod config;
pub mod detect;
pub mod editor;
pub mod imaging;
pub mod output;
pub mod placement;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
