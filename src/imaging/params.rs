//! Parameter types for placement math and compositing.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend) that does the pixel work, and between
//! [`config`](crate::config) and the pure [`calculations`](super::calculations).
//!
//! ## Types
//!
//! - [`PlacementRatios`]: proportions used to derive initial placements.
//! - [`ResizeLimits`]: gain and bounds applied by a manual resize.
//! - [`Graphic`]: an overlay graphic, vector or already-decoded raster.
//! - [`CompositeParams`]: base image, overlay and placements for one render.
//! - [`LayerPlan`]: per-placement raster size and surface transform.

use crate::types::Placement;
use image::RgbaImage;
use std::sync::Arc;

/// Proportions for the placement engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRatios {
    /// Overlay width as a fraction of the face bounding-box width.
    pub face_width: f64,
    /// Overlay height as a fraction of its width.
    pub aspect: f64,
    /// How far above the mouth center the box starts, as a fraction of its height.
    pub lift: f64,
    /// Default overlay width as a fraction of the image width (no faces).
    pub default_width: f64,
    /// Default overlay top edge as a fraction of the image height (no faces).
    pub default_top: f64,
}

impl Default for PlacementRatios {
    fn default() -> Self {
        Self {
            face_width: 0.6,
            aspect: 0.4,
            lift: 0.8,
            default_width: 0.15,
            default_top: 0.55,
        }
    }
}

/// Gain and bounds for a manual resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeLimits {
    /// Width change per image-space pixel of horizontal pointer movement.
    pub gain: f64,
    /// Height change per unit of width change.
    pub height_per_width: f64,
    pub min_width: f64,
    /// Upper width bound as a fraction of the image width.
    pub max_width_ratio: f64,
    pub min_height: f64,
    /// Upper height bound as a fraction of the image height.
    pub max_height_ratio: f64,
}

impl Default for ResizeLimits {
    fn default() -> Self {
        Self {
            gain: 0.5,
            height_per_width: 0.4,
            min_width: 20.0,
            max_width_ratio: 0.8,
            min_height: 10.0,
            max_height_ratio: 0.4,
        }
    }
}

/// An overlay graphic ready to be drawn.
///
/// SVG sources are rasterized at the exact size of each placement, so they
/// stay crisp at any scale. Raster sources are resampled.
#[derive(Debug, Clone)]
pub enum Graphic {
    Svg(Arc<str>),
    Raster(Arc<RgbaImage>),
}

/// Everything one recomposition needs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CompositeParams {
    pub base: Arc<RgbaImage>,
    pub graphic: Graphic,
    pub placements: Vec<Placement>,
}

/// How a single placement is turned into pixels.
///
/// The graphic is rasterized at `raster_width × raster_height`, scaled by
/// `(scale_x, scale_y)` to the exact fractional placement size, rotated by
/// `radians` about its top-left corner, then translated to `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlan {
    pub raster_width: u32,
    pub raster_height: u32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub radians: f32,
    pub x: f32,
    pub y: f32,
}
