//! Pure calculation functions for placement geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Coordinates are original-image pixels unless a parameter says otherwise.

use super::params::{LayerPlan, PlacementRatios, ResizeLimits};
use crate::types::{Placement, Point};

/// Arithmetic mean of the mouth contour, or `None` for an empty contour.
///
/// # Examples
/// ```
/// # use stache_stash::imaging::mouth_anchor;
/// # use stache_stash::types::Point;
/// let mouth = [Point::new(10.0, 50.0), Point::new(30.0, 60.0)];
/// assert_eq!(mouth_anchor(&mouth), Some(Point::new(20.0, 55.0)));
/// ```
pub fn mouth_anchor(contour: &[Point]) -> Option<Point> {
    if contour.is_empty() {
        return None;
    }
    let n = contour.len() as f64;
    let (sx, sy) = contour
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

/// Initial placement for a face: centered on the mouth anchor horizontally,
/// lifted toward the upper lip vertically. Not clamped.
pub fn face_placement(
    anchor: Point,
    face_width: f64,
    face_index: usize,
    ratios: &PlacementRatios,
) -> Placement {
    let width = face_width * ratios.face_width;
    let height = width * ratios.aspect;
    Placement {
        x: anchor.x - width / 2.0,
        y: anchor.y - height * ratios.lift,
        width,
        height,
        rotation: 0.0,
        face_index: Some(face_index),
    }
}

/// The single placement used when no face was detected: horizontally
/// centered, a little below the vertical middle of the image.
pub fn default_placement(image: (u32, u32), ratios: &PlacementRatios) -> Placement {
    let (img_w, img_h) = (image.0 as f64, image.1 as f64);
    let width = img_w * ratios.default_width;
    let height = width * ratios.aspect;
    Placement {
        x: img_w / 2.0 - width / 2.0,
        y: img_h * ratios.default_top,
        width,
        height,
        rotation: 0.0,
        face_index: None,
    }
}

/// Map a displayed-surface delta into original-image pixels.
///
/// Each axis is scaled independently by `original / displayed`, so a
/// non-uniformly stretched preview still maps correctly.
pub fn scale_delta(delta: (f64, f64), original: (u32, u32), displayed: (f64, f64)) -> (f64, f64) {
    let sx = original.0 as f64 / displayed.0;
    let sy = original.1 as f64 / displayed.1;
    (delta.0 * sx, delta.1 * sy)
}

/// Pull the placement back inside `[0, width] × [0, height]`.
///
/// Only the position moves; size is left alone. A placement larger than
/// the image is pinned to the top-left corner.
pub fn clamp_position(placement: Placement, image: (u32, u32)) -> Placement {
    let (img_w, img_h) = (image.0 as f64, image.1 as f64);
    Placement {
        x: placement.x.min(img_w - placement.width).max(0.0),
        y: placement.y.min(img_h - placement.height).max(0.0),
        ..placement
    }
}

/// Move by an image-space delta, then clamp into the image.
pub fn dragged(placement: Placement, delta: (f64, f64), image: (u32, u32)) -> Placement {
    clamp_position(
        Placement {
            x: placement.x + delta.0,
            y: placement.y + delta.1,
            ..placement
        },
        image,
    )
}

/// Grow or shrink from a horizontal image-space delta.
///
/// Width gets the primary degree of freedom; height follows at a fixed
/// fraction of the same increment, so an unclamped resize keeps the
/// height/width ratio. The position is re-clamped afterwards.
pub fn resized(
    placement: Placement,
    delta_x: f64,
    image: (u32, u32),
    limits: &ResizeLimits,
) -> Placement {
    let change = delta_x * limits.gain;
    bounded(
        Placement {
            width: placement.width + change,
            height: placement.height + change * limits.height_per_width,
            ..placement
        },
        image,
        limits,
    )
}

/// Bound width and height by `limits`, then clamp the position.
///
/// On images too small for both bounds to hold (`0.8 × width < 20`) the
/// minimum wins and the rectangle overhangs the right or bottom edge.
pub fn bounded(placement: Placement, image: (u32, u32), limits: &ResizeLimits) -> Placement {
    let (img_w, img_h) = (image.0 as f64, image.1 as f64);
    let width = placement
        .width
        .min(img_w * limits.max_width_ratio)
        .max(limits.min_width);
    let height = placement
        .height
        .min(img_h * limits.max_height_ratio)
        .max(limits.min_height);
    clamp_position(
        Placement {
            width,
            height,
            ..placement
        },
        image,
    )
}

/// Wrap any angle in degrees into `[0, 360)`.
///
/// # Examples
/// ```
/// # use stache_stash::imaging::normalize_rotation;
/// assert_eq!(normalize_rotation(-15.0), 345.0);
/// assert_eq!(normalize_rotation(375.0), 15.0);
/// ```
pub fn normalize_rotation(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Raster size and transform for drawing one placement.
pub fn plan_layer(placement: &Placement) -> LayerPlan {
    let raster_width = placement.width.ceil().max(1.0) as u32;
    let raster_height = placement.height.ceil().max(1.0) as u32;
    LayerPlan {
        raster_width,
        raster_height,
        scale_x: (placement.width.max(0.0) / raster_width as f64) as f32,
        scale_y: (placement.height.max(0.0) / raster_height as f64) as f32,
        radians: placement.rotation.to_radians() as f32,
        x: placement.x as f32,
        y: placement.y as f32,
    }
}
