//! Linear gradient shaders and the direction vocabulary shared by the
//! fade mask and the overlay gradient.

use glam::Vec2;

use crate::color::Color;

/// Direction of a linear transition across the output region.
///
/// Used both for the blur fade mask (where the blur strength transitions
/// from full to none) and for overlay gradients (where the overlay color
/// transitions from the start to the end color).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GradientDirection {
    /// No directional transition.
    #[default]
    None,
    TopToBottom,
    BottomToTop,
    LeftToRight,
    RightToLeft,
}

/// How a shader continues past its defining geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TileMode {
    /// Edge colors extend indefinitely.
    #[default]
    Clamp,
    /// The gradient repeats.
    Repeat,
    /// The gradient repeats, mirrored on every other repetition.
    Mirror,
}

/// A two-stop linear gradient between `start` and `end`.
///
/// Coordinates are in the user space of the surface the shader is drawn
/// on; the caches in [`gradient_cache`](crate::gradient_cache) bake the
/// current position offset into these points where required.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    pub start: Vec2,
    pub end: Vec2,
    pub start_color: Color,
    pub end_color: Color,
    pub tile_mode: TileMode,
}

impl LinearGradient {
    /// Creates a gradient running from `start` to `end`.
    pub fn new(start: Vec2, end: Vec2, start_color: Color, end_color: Color) -> Self {
        Self {
            start,
            end,
            start_color,
            end_color,
            tile_mode: TileMode::Clamp,
        }
    }

    /// Evaluates the gradient at a point by projecting it onto the
    /// start-to-end axis.
    ///
    /// A degenerate gradient (zero-length axis) evaluates to the start
    /// color everywhere.
    pub fn sample(&self, point: Vec2) -> Color {
        let axis = self.end - self.start;
        let len_sq = axis.length_squared();
        if len_sq <= f32::EPSILON {
            return self.start_color;
        }
        let t = (point - self.start).dot(axis) / len_sq;
        let t = match self.tile_mode {
            TileMode::Clamp => t.clamp(0.0, 1.0),
            TileMode::Repeat => t.rem_euclid(1.0),
            TileMode::Mirror => {
                let cycle = t.rem_euclid(2.0);
                if cycle > 1.0 { 2.0 - cycle } else { cycle }
            }
        };
        self.start_color.lerp(self.end_color, t)
    }
}
