//! Placement engine: detected faces in, initial overlay rectangles out.
//!
//! One placement per face that has a mouth contour, in detector order.
//! When nothing usable was detected a single default placement is produced
//! so there is always something to adjust. Results are not clamped; the
//! adjustment layer clamps on the first edit.

use crate::imaging::{PlacementRatios, default_placement, face_placement, mouth_anchor};
use crate::types::{DetectedFace, Placement};
use log::debug;

/// Compute starting placements for an image of `image` = `(width, height)`.
pub fn initial_placements(
    faces: &[DetectedFace],
    image: (u32, u32),
    ratios: &PlacementRatios,
) -> Vec<Placement> {
    let placements: Vec<Placement> = faces
        .iter()
        .enumerate()
        .filter_map(|(index, face)| match mouth_anchor(&face.mouth_contour) {
            Some(anchor) => Some(face_placement(
                anchor,
                face.bounding_box.width,
                index,
                ratios,
            )),
            None => {
                debug!("Face {index} has no mouth landmarks, skipping");
                None
            }
        })
        .collect();

    if placements.is_empty() {
        debug!(
            "No usable faces, using default placement for {}x{}",
            image.0, image.1
        );
        return vec![default_placement(image, ratios)];
    }
    placements
}
