//! Image processing for the overlay compositor. Pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Overlay raster** | `resvg` for SVG, Lanczos3 resize for bitmaps |
//! | **Composite** | `imageproc` warp (scale → rotate → translate) + alpha overlay |
//! | **Export** | PNG encoder |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for placement geometry (unit testable)
//! - **Parameters**: Data structures describing placement rules and renders
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    bounded, clamp_position, default_placement, dragged, face_placement, mouth_anchor, normalize_rotation,
    plan_layer, resized, scale_delta,
};
pub use operations::{compose_png, decode_photo, load_graphic, plan_layers};
pub use params::{CompositeParams, Graphic, LayerPlan, PlacementRatios, ResizeLimits};
pub use rust_backend::{RustBackend, sniff_photo_format, supported_input_extensions};
