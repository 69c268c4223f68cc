//! The drawing-surface abstraction controllers render through.
//!
//! ## Usage
//!
//! Hosts hand a [`Surface`] to [`BlurController::draw`](crate::BlurController::draw)
//! each frame; the crate's own capture canvases implement the same trait so
//! target content can be drawn into them with identical code.

use std::sync::Arc;

use downcast_rs::{Downcast, impl_downcast};
use image::RgbaImage;

use crate::{color::Color, node::SharedRenderNode, shader::LinearGradient};

/// An axis-aligned rectangle in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Creates a rectangle from its origin and extent.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle anchored at the origin.
    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when the rectangle covers no area.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Intersection of two rectangles; empty result when they do not
    /// overlap.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, (right - x).max(0.0), (bottom - y).max(0.0))
    }
}

/// Fill style for [`Surface::fill_rect`].
#[derive(Debug, Clone, Default)]
pub struct Paint {
    /// Solid fill color, used when no shader is set.
    pub color: Color,
    /// Gradient fill; takes precedence over `color`.
    pub shader: Option<Arc<LinearGradient>>,
}

impl Paint {
    /// Creates a solid paint.
    pub fn solid(color: Color) -> Self {
        Self {
            color,
            shader: None,
        }
    }

    /// Creates a shader paint.
    pub fn with_shader(shader: Arc<LinearGradient>) -> Self {
        Self {
            color: Color::TRANSPARENT,
            shader: Some(shader),
        }
    }
}

/// Something that can draw itself onto a surface.
///
/// Used for the frame-clear pre-fill and for the noise overlay; both are
/// supplied by the host.
pub trait Drawable: Send + Sync {
    fn draw(&self, surface: &mut dyn Surface);
}

/// A drawing surface with a transform/clip stack.
///
/// The transform model matches the usual 2D canvas contract: `translate`
/// and `scale` post-multiply the current matrix, so the most recently
/// issued operation applies to points first. `save`/`restore` snapshot
/// the transform and clip together.
pub trait Surface: Downcast {
    /// Pushes the current transform and clip onto the state stack.
    fn save(&mut self);

    /// Pops the most recently saved state. Unbalanced restores are ignored.
    fn restore(&mut self);

    fn translate(&mut self, dx: f32, dy: f32);

    fn scale(&mut self, sx: f32, sy: f32);

    /// Intersects the clip with `rect` (in current user space).
    fn clip_rect(&mut self, rect: Rect);

    /// Composites `color` over the whole clipped area.
    fn fill_color(&mut self, color: Color);

    /// Fills `rect` with `paint`, respecting the current transform and clip.
    fn fill_rect(&mut self, rect: Rect, paint: &Paint);

    /// Draws `bitmap` with its top-left corner at the user-space origin,
    /// stretched by the current transform.
    fn draw_bitmap(&mut self, bitmap: &RgbaImage);

    /// Composites a retained render node. Raster surfaces cannot execute
    /// node content and skip it.
    fn draw_node(&mut self, node: &SharedRenderNode);

    /// Whether this surface is executed by the accelerated rendering
    /// backend (and can therefore evaluate retained nodes and effects).
    fn is_hardware_accelerated(&self) -> bool;
}

impl_downcast!(Surface);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(40.0, 20.0, 100.0, 100.0);
        assert_eq!(a.intersect(&b), Rect::new(40.0, 20.0, 60.0, 30.0));
    }

    #[test]
    fn test_rect_intersect_disjoint_is_empty() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert!(a.intersect(&b).is_empty());
    }
}
