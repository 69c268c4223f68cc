//! Declarative filter effects for retained render nodes.
//!
//! ## Usage
//!
//! The effect-graph strategy composes these and attaches them to its
//! [`RenderNode`](crate::node::RenderNode); the host's accelerated backend
//! re-evaluates the attached effect every frame, so nothing here executes
//! on the controlling thread.

use std::sync::Arc;

use crate::shader::{LinearGradient, TileMode};

/// Pixel blend modes used when composing effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard source-over compositing.
    SrcOver,
    /// Keeps the destination only where the source is opaque.
    DstIn,
}

/// A filter applied to a render node's recorded content.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderEffect {
    /// Gaussian-style blur with independent horizontal/vertical radii.
    Blur {
        radius_x: f32,
        radius_y: f32,
        tile_mode: TileMode,
    },
    /// Renders a shader over the node's bounds.
    Shader(Arc<LinearGradient>),
    /// Blends the output of `src` into the output of `dst`.
    Blend {
        dst: Box<RenderEffect>,
        src: Box<RenderEffect>,
        mode: BlendMode,
    },
}

impl RenderEffect {
    /// Creates a blur effect.
    pub fn blur(radius_x: f32, radius_y: f32, tile_mode: TileMode) -> Self {
        Self::Blur {
            radius_x,
            radius_y,
            tile_mode,
        }
    }

    /// Creates a shader effect.
    pub fn shader(shader: Arc<LinearGradient>) -> Self {
        Self::Shader(shader)
    }

    /// Composes two effects under a blend mode.
    pub fn blend(dst: RenderEffect, src: RenderEffect, mode: BlendMode) -> Self {
        Self::Blend {
            dst: Box::new(dst),
            src: Box::new(src),
            mode,
        }
    }

    /// The blur radii of this effect, searching through blend compositions.
    /// Returns the first blur found depth-first on the `dst` side.
    pub fn blur_radii(&self) -> Option<(f32, f32)> {
        match self {
            Self::Blur {
                radius_x, radius_y, ..
            } => Some((*radius_x, *radius_y)),
            Self::Blend { dst, src, .. } => dst.blur_radii().or_else(|| src.blur_radii()),
            Self::Shader(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::color::Color;

    #[test]
    fn test_blur_radii_through_blend() {
        let mask = RenderEffect::shader(Arc::new(LinearGradient::new(
            Vec2::ZERO,
            Vec2::new(0.0, 10.0),
            Color::BLACK,
            Color::TRANSPARENT,
        )));
        let effect = RenderEffect::blend(
            RenderEffect::blur(40.0, 40.0, TileMode::Clamp),
            mask,
            BlendMode::DstIn,
        );
        assert_eq!(effect.blur_radii(), Some((40.0, 40.0)));
    }
}
