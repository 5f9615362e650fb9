//! Manual adjustment layer: drag, resize and rotate placements.
//!
//! Pointer input arrives in displayed-surface coordinates (whatever size the
//! preview is drawn at). A [`Viewport`] maps it back to original-image
//! pixels before any geometry runs.
//!
//! ## Pointer state machine
//!
//! ```text
//!            begin(Body)             end / cancel
//!   Idle ───────────────▶ Dragging ───────────────▶ Idle
//!     │      begin(Corner)           end / cancel
//!     └─────────────────▶ Resizing ───────────────▶ Idle
//! ```
//!
//! Only one session runs at a time. A session remembers the placement as it
//! was at pointer-down plus the pointer-down position, and every move is
//! computed from that anchor and the total delta so far. Intermediate
//! clamping therefore never accumulates.
//!
//! Every mutation returns a fresh placement collection; the input slice is
//! never modified.

use crate::imaging::{ResizeLimits, dragged, normalize_rotation, resized, scale_delta};
use crate::types::Placement;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdjustError {
    #[error("placement {index} out of range ({len} placements)")]
    OutOfRange { index: usize, len: usize },
    #[error("another pointer session is already active")]
    SessionActive,
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

/// Size at which the image is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f64,
    height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Result<Self, AdjustError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(width) || !valid(height) {
            return Err(AdjustError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    /// Displayed at the image's own pixel size.
    pub fn natural(image: (u32, u32)) -> Self {
        Self {
            width: image.0.max(1) as f64,
            height: image.1.max(1) as f64,
        }
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    /// Map a displayed-surface delta into image pixels.
    pub fn to_image(&self, delta: (f64, f64), image: (u32, u32)) -> (f64, f64) {
        scale_delta(delta, image, (self.width, self.height))
    }
}

/// Which part of a placement the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// Anywhere inside the rectangle: move it.
    Body,
    /// The resize handle at the bottom-right corner.
    Corner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

/// Pointer state. The active variants carry the pointer-down anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerState {
    Idle,
    Dragging {
        index: usize,
        start: (f64, f64),
        origin: Placement,
    },
    Resizing {
        index: usize,
        start: (f64, f64),
        origin: Placement,
    },
}

impl PointerState {
    pub fn is_idle(&self) -> bool {
        matches!(self, PointerState::Idle)
    }

    /// Index of the placement being manipulated, if any.
    pub fn active_index(&self) -> Option<usize> {
        match self {
            PointerState::Idle => None,
            PointerState::Dragging { index, .. } | PointerState::Resizing { index, .. } => {
                Some(*index)
            }
        }
    }
}

/// Drag/resize/rotate logic plus the pointer state machine.
#[derive(Debug, Clone)]
pub struct Adjuster {
    state: PointerState,
    limits: ResizeLimits,
    rotate_step: f64,
}

impl Adjuster {
    pub fn new(limits: ResizeLimits, rotate_step: f64) -> Self {
        Self {
            state: PointerState::Idle,
            limits,
            rotate_step,
        }
    }

    pub fn state(&self) -> PointerState {
        self.state
    }

    pub fn rotate_step(&self) -> f64 {
        self.rotate_step
    }

    /// Pointer down on `handle` of placement `index`, at displayed position `at`.
    pub fn begin(
        &mut self,
        placements: &[Placement],
        index: usize,
        handle: Handle,
        at: (f64, f64),
    ) -> Result<(), AdjustError> {
        if !self.state.is_idle() {
            return Err(AdjustError::SessionActive);
        }
        let origin = *placements.get(index).ok_or(AdjustError::OutOfRange {
            index,
            len: placements.len(),
        })?;
        self.state = match handle {
            Handle::Body => PointerState::Dragging {
                index,
                start: at,
                origin,
            },
            Handle::Corner => PointerState::Resizing {
                index,
                start: at,
                origin,
            },
        };
        Ok(())
    }

    /// Pointer moved to displayed position `at`.
    ///
    /// Returns the updated collection, or `None` when no session is active.
    pub fn update(
        &self,
        placements: &[Placement],
        at: (f64, f64),
        image: (u32, u32),
        viewport: &Viewport,
    ) -> Option<Vec<Placement>> {
        let (index, start, origin) = match self.state {
            PointerState::Idle => return None,
            PointerState::Dragging {
                index,
                start,
                origin,
            }
            | PointerState::Resizing {
                index,
                start,
                origin,
            } => (index, start, origin),
        };
        let delta = viewport.to_image((at.0 - start.0, at.1 - start.1), image);
        let moved = match self.state {
            PointerState::Resizing { .. } => resized(origin, delta.0, image, &self.limits),
            _ => dragged(origin, delta, image),
        };
        Some(replace_at(placements, index, moved))
    }

    /// Pointer up or cancelled.
    pub fn end(&mut self) {
        self.state = PointerState::Idle;
    }

    /// Rotate placement `index` by one step.
    pub fn rotate(
        &self,
        placements: &[Placement],
        index: usize,
        direction: RotateDirection,
    ) -> Result<Vec<Placement>, AdjustError> {
        let degrees = match direction {
            RotateDirection::Clockwise => self.rotate_step,
            RotateDirection::CounterClockwise => -self.rotate_step,
        };
        rotate_by(placements, index, degrees)
    }
}

/// Rotate placement `index` by an arbitrary number of degrees.
pub fn rotate_by(
    placements: &[Placement],
    index: usize,
    degrees: f64,
) -> Result<Vec<Placement>, AdjustError> {
    let current = placements.get(index).ok_or(AdjustError::OutOfRange {
        index,
        len: placements.len(),
    })?;
    let turned = Placement {
        rotation: normalize_rotation(current.rotation + degrees),
        ..*current
    };
    Ok(replace_at(placements, index, turned))
}

fn replace_at(placements: &[Placement], index: usize, placement: Placement) -> Vec<Placement> {
    let mut next = placements.to_vec();
    next[index] = placement;
    next
}
