//! Single-entry memoization for the gradient shaders used every frame.
//!
//! ## Usage
//!
//! Both caches compare the requested key field-by-field against the key
//! that produced the cached shader and only synthesize a new gradient on
//! a mismatch, so steady-state frames reuse one shader allocation.

use std::sync::Arc;

use glam::Vec2;

use crate::{
    color::Color,
    px::Px,
    shader::{GradientDirection, LinearGradient},
};

/// Memoizes the fade-mask gradient for the effect-graph strategy.
///
/// The mask is opaque black at the "still blurred" end and transparent at
/// the "sharp" end; blended `DstIn` over the blur output it fades the
/// blur strength spatially. Coordinates are offset by the current
/// target/region position delta so the mask stays glued to the output
/// region as it moves.
#[derive(Default)]
pub struct MaskGradientCache {
    shader: Option<Arc<LinearGradient>>,
    width: Px,
    height: Px,
    left: Px,
    top: Px,
    direction: GradientDirection,
}

impl MaskGradientCache {
    /// Returns the mask shader for the given geometry, or `None` for
    /// direction [`GradientDirection::None`] (which also clears the
    /// cache, so the next directional request re-synthesizes).
    pub fn shader(
        &mut self,
        width: Px,
        height: Px,
        left: Px,
        top: Px,
        direction: GradientDirection,
    ) -> Option<Arc<LinearGradient>> {
        if direction == GradientDirection::None {
            self.shader = None;
            return None;
        }

        if self.is_cache_valid(width, height, left, top, direction) {
            return self.shader.clone();
        }

        let opaque = Color::BLACK;
        let transparent = Color::TRANSPARENT;

        let left_f = left.to_f32();
        let top_f = top.to_f32();
        let right_f = left_f + width.to_f32();
        let bottom_f = top_f + height.to_f32();

        let gradient = match direction {
            GradientDirection::TopToBottom => LinearGradient::new(
                Vec2::new(0.0, top_f),
                Vec2::new(0.0, bottom_f),
                opaque,
                transparent,
            ),
            GradientDirection::BottomToTop => LinearGradient::new(
                Vec2::new(0.0, bottom_f),
                Vec2::new(0.0, top_f),
                opaque,
                transparent,
            ),
            GradientDirection::LeftToRight => LinearGradient::new(
                Vec2::new(left_f, 0.0),
                Vec2::new(right_f, 0.0),
                opaque,
                transparent,
            ),
            GradientDirection::RightToLeft => LinearGradient::new(
                Vec2::new(right_f, 0.0),
                Vec2::new(left_f, 0.0),
                opaque,
                transparent,
            ),
            GradientDirection::None => unreachable!(),
        };

        let shader = Arc::new(gradient);
        self.shader = Some(shader.clone());
        self.width = width;
        self.height = height;
        self.left = left;
        self.top = top;
        self.direction = direction;

        Some(shader)
    }

    fn is_cache_valid(
        &self,
        width: Px,
        height: Px,
        left: Px,
        top: Px,
        direction: GradientDirection,
    ) -> bool {
        self.shader.is_some()
            && self.width == width
            && self.height == height
            && self.left == left
            && self.top == top
            && self.direction == direction
    }
}

/// Memoizes the overlay gradient drawn over the blurred content.
///
/// Unlike the fade mask, a requested overlay gradient is never dropped:
/// direction [`GradientDirection::None`] falls back to a vertical
/// top-to-bottom orientation. Whether `None` should instead mean "no
/// overlay gradient" is an open API question; the fallback is the current
/// contract.
#[derive(Default)]
pub struct OverlayGradientCache {
    shader: Option<Arc<LinearGradient>>,
    width: Px,
    height: Px,
    start_color: Color,
    end_color: Color,
    direction: GradientDirection,
}

impl OverlayGradientCache {
    /// Returns the overlay shader for the given geometry and colors.
    pub fn shader(
        &mut self,
        width: Px,
        height: Px,
        start_color: Color,
        end_color: Color,
        direction: GradientDirection,
    ) -> Arc<LinearGradient> {
        if self.is_cache_valid(width, height, start_color, end_color, direction)
            && let Some(shader) = &self.shader
        {
            return shader.clone();
        }

        let right = width.to_f32();
        let bottom = height.to_f32();

        let gradient = match direction {
            GradientDirection::BottomToTop => LinearGradient::new(
                Vec2::new(0.0, bottom),
                Vec2::new(0.0, 0.0),
                start_color,
                end_color,
            ),
            GradientDirection::LeftToRight => LinearGradient::new(
                Vec2::new(0.0, 0.0),
                Vec2::new(right, 0.0),
                start_color,
                end_color,
            ),
            GradientDirection::RightToLeft => LinearGradient::new(
                Vec2::new(right, 0.0),
                Vec2::new(0.0, 0.0),
                start_color,
                end_color,
            ),
            GradientDirection::TopToBottom | GradientDirection::None => LinearGradient::new(
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, bottom),
                start_color,
                end_color,
            ),
        };

        let shader = Arc::new(gradient);
        self.shader = Some(shader.clone());
        self.width = width;
        self.height = height;
        self.start_color = start_color;
        self.end_color = end_color;
        self.direction = direction;

        shader
    }

    fn is_cache_valid(
        &self,
        width: Px,
        height: Px,
        start_color: Color,
        end_color: Color,
        direction: GradientDirection,
    ) -> bool {
        self.shader.is_some()
            && self.width == width
            && self.height == height
            && self.start_color == start_color
            && self.end_color == end_color
            && self.direction == direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_cache_returns_same_instance_for_same_key() {
        let mut cache = MaskGradientCache::default();
        let a = cache
            .shader(Px(100), Px(200), Px(4), Px(8), GradientDirection::TopToBottom)
            .unwrap();
        let b = cache
            .shader(Px(100), Px(200), Px(4), Px(8), GradientDirection::TopToBottom)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_mask_cache_invalidates_on_any_field_change() {
        let mut cache = MaskGradientCache::default();
        let base = cache
            .shader(Px(100), Px(200), Px(4), Px(8), GradientDirection::TopToBottom)
            .unwrap();
        let keys = [
            (Px(101), Px(200), Px(4), Px(8), GradientDirection::TopToBottom),
            (Px(100), Px(201), Px(4), Px(8), GradientDirection::TopToBottom),
            (Px(100), Px(200), Px(5), Px(8), GradientDirection::TopToBottom),
            (Px(100), Px(200), Px(4), Px(9), GradientDirection::TopToBottom),
            (Px(100), Px(200), Px(4), Px(8), GradientDirection::BottomToTop),
        ];
        let mut previous = base;
        for (w, h, left, top, direction) in keys {
            let next = cache.shader(w, h, left, top, direction).unwrap();
            assert!(!Arc::ptr_eq(&previous, &next));
            previous = next;
        }
    }

    #[test]
    fn test_mask_cache_none_clears_and_yields_nothing() {
        let mut cache = MaskGradientCache::default();
        let first = cache
            .shader(Px(100), Px(200), Px(0), Px(0), GradientDirection::TopToBottom)
            .unwrap();
        assert!(
            cache
                .shader(Px(100), Px(200), Px(0), Px(0), GradientDirection::None)
                .is_none()
        );
        // The cache was cleared: the same directional key synthesizes a
        // fresh shader.
        let second = cache
            .shader(Px(100), Px(200), Px(0), Px(0), GradientDirection::TopToBottom)
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_mask_gradient_geometry_includes_position_offset() {
        let mut cache = MaskGradientCache::default();
        let shader = cache
            .shader(Px(100), Px(200), Px(30), Px(40), GradientDirection::TopToBottom)
            .unwrap();
        assert_eq!(shader.start, Vec2::new(0.0, 40.0));
        assert_eq!(shader.end, Vec2::new(0.0, 240.0));
        assert_eq!(shader.start_color, Color::BLACK);
        assert_eq!(shader.end_color, Color::TRANSPARENT);

        let horizontal = cache
            .shader(Px(100), Px(200), Px(30), Px(40), GradientDirection::RightToLeft)
            .unwrap();
        assert_eq!(horizontal.start, Vec2::new(130.0, 0.0));
        assert_eq!(horizontal.end, Vec2::new(30.0, 0.0));
    }

    #[test]
    fn test_overlay_cache_identity_and_invalidation() {
        let mut cache = OverlayGradientCache::default();
        let a = cache.shader(
            Px(100),
            Px(50),
            Color::RED,
            Color::TRANSPARENT,
            GradientDirection::LeftToRight,
        );
        let b = cache.shader(
            Px(100),
            Px(50),
            Color::RED,
            Color::TRANSPARENT,
            GradientDirection::LeftToRight,
        );
        assert!(Arc::ptr_eq(&a, &b));
        let c = cache.shader(
            Px(100),
            Px(50),
            Color::GREEN,
            Color::TRANSPARENT,
            GradientDirection::LeftToRight,
        );
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_overlay_cache_none_falls_back_to_vertical() {
        let mut cache = OverlayGradientCache::default();
        let shader = cache.shader(
            Px(80),
            Px(120),
            Color::WHITE,
            Color::TRANSPARENT,
            GradientDirection::None,
        );
        assert_eq!(shader.start, Vec2::new(0.0, 0.0));
        assert_eq!(shader.end, Vec2::new(0.0, 120.0));
    }
}
