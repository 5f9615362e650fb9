//! Shared geometry types used across detection, placement, adjustment and
//! compositing.
//!
//! Everything here lives in **original-image pixel space**. Display-space
//! values only exist transiently inside the [`adjust`](crate::adjust) layer.

use serde::{Deserialize, Serialize};

/// A 2D point in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Serialized as a `[x, y]` pair so landmark files stay compact.
impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned face bounding box reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A face found by the detector adapter.
///
/// Decoupled from any detector library's native result shape: backends
/// translate into this and the placement engine only ever sees this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bounding_box: BoundingBox,
    /// Ordered outline of the mouth. May be empty if the backend had no
    /// landmarks for this face.
    #[serde(with = "point_pairs")]
    pub mouth_contour: Vec<Point>,
}

/// Where one overlay graphic is drawn.
///
/// `rotation` is in degrees, always in `[0, 360)`. `face_index` is `None`
/// for the synthetic default placement used when no face was detected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_index: Option<usize>,
}

impl Placement {
    /// Right edge (`x + width`).
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// `Vec<Point>` <-> `[[x, y], ...]`.
mod point_pairs {
    use super::Point;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(points: &[Point], s: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<[f64; 2]> = points.iter().map(|p| [p.x, p.y]).collect();
        pairs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Point>, D::Error> {
        let pairs = Vec::<[f64; 2]>::deserialize(d)?;
        Ok(pairs.into_iter().map(Point::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detected_face_parses_point_pairs() {
        let json = r#"{
            "bounding_box": {"x": 0, "y": 0, "width": 100, "height": 120},
            "mouth_contour": [[10, 50], [20, 55]]
        }"#;
        let face: DetectedFace = serde_json::from_str(json).unwrap();
        assert_eq!(face.mouth_contour, vec![Point::new(10.0, 50.0), Point::new(20.0, 55.0)]);
        assert_eq!(face.bounding_box.width, 100.0);
    }

    #[test]
    fn placement_defaults_rotation_and_face() {
        let json = r#"{"x": 1, "y": 2, "width": 30, "height": 12}"#;
        let p: Placement = serde_json::from_str(json).unwrap();
        assert_eq!(p.rotation, 0.0);
        assert_eq!(p.face_index, None);
        assert_eq!(p.right(), 31.0);
        assert_eq!(p.bottom(), 14.0);
    }
}
