//! Downscale computation for snapshot buffers.

use crate::px::{Px, PxSize};

/// Computes the size of the scaled capture buffer for a given output
/// region size.
#[derive(Debug, Clone, Copy)]
pub struct SizeScaler {
    scale_factor: f32,
}

impl SizeScaler {
    /// Creates a scaler. `scale_factor` is expected to be ≥ 1.
    pub fn new(scale_factor: f32) -> Self {
        Self { scale_factor }
    }

    /// Scaled buffer size: `round(measured / scale_factor)` per axis,
    /// clamped to at least one pixel.
    pub fn scale(&self, measured: PxSize) -> PxSize {
        PxSize::new(self.scale_dimension(measured.width), self.scale_dimension(measured.height))
    }

    fn scale_dimension(&self, value: Px) -> Px {
        let scaled = (value.to_f32() / self.scale_factor).round();
        Px::saturating_from_f32(scaled).max(Px(1))
    }

    /// Whether this measured size defers buffer initialization: the region
    /// has no area yet, or the scale factor is exactly 1 (no downscale,
    /// nothing for the snapshot pipeline to do).
    pub fn is_zero_sized(&self, measured: PxSize) -> bool {
        measured.is_empty() || self.scale_factor == 1.0
    }
}
