//! Pointer Input
//!
//! Pointer positions arrive from the presentation layer in
//! playfield-relative fractional coordinates (`0.0` = left edge,
//! `1.0` = right edge).

use serde::{Serialize, Deserialize};

use crate::game::state::{AVATAR_MAX_X, AVATAR_MIN_X};

/// A pointer-move event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    /// Fraction of playfield width, nominally `0.0..=1.0`
    pub fractional_x: f64,
}

impl PointerInput {
    /// Create from a fractional position.
    pub fn new(fractional_x: f64) -> Self {
        Self { fractional_x }
    }

    /// Create from a pixel offset relative to the playfield's left edge.
    ///
    /// Returns `None` for a degenerate playfield width.
    pub fn from_pixels(offset_px: f64, playfield_width_px: f64) -> Option<Self> {
        if !(playfield_width_px.is_finite() && playfield_width_px > 0.0) {
            return None;
        }
        Some(Self::new(offset_px / playfield_width_px))
    }

    /// Avatar position this input maps to (percent, clamped to the avatar band).
    ///
    /// Returns `None` for non-finite input.
    pub fn avatar_x(&self) -> Option<f64> {
        if !self.fractional_x.is_finite() {
            return None;
        }
        Some((self.fractional_x * 100.0).clamp(AVATAR_MIN_X, AVATAR_MAX_X))
    }
}
