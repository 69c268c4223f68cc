//! Overlay color state shared by both controller strategies.

use crate::{
    color::Color,
    gradient_cache::OverlayGradientCache,
    px::PxSize,
    shader::GradientDirection,
    surface::{Paint, Rect, Surface},
};

/// Solid and gradient overlay configuration plus the compositing step.
///
/// A gradient is "active" while either of its colors is non-transparent;
/// an active gradient supersedes the solid color without clearing it.
/// Setting the solid color clears the gradient.
pub(crate) struct OverlayState {
    color: Color,
    start_color: Color,
    end_color: Color,
    direction: GradientDirection,
    cache: OverlayGradientCache,
}

impl OverlayState {
    pub(crate) fn new(color: Color) -> Self {
        Self {
            color,
            start_color: Color::TRANSPARENT,
            end_color: Color::TRANSPARENT,
            direction: GradientDirection::None,
            cache: OverlayGradientCache::default(),
        }
    }

    /// Sets the solid overlay color and clears the gradient. Returns
    /// whether anything changed.
    pub(crate) fn set_color(&mut self, color: Color) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color;
        self.start_color = Color::TRANSPARENT;
        self.end_color = Color::TRANSPARENT;
        true
    }

    /// Sets the overlay gradient. Returns whether anything changed.
    pub(crate) fn set_gradient(
        &mut self,
        start_color: Color,
        end_color: Color,
        direction: GradientDirection,
    ) -> bool {
        if self.start_color == start_color
            && self.end_color == end_color
            && self.direction == direction
        {
            return false;
        }
        self.start_color = start_color;
        self.end_color = end_color;
        self.direction = direction;
        true
    }

    pub(crate) fn gradient_active(&self) -> bool {
        !self.start_color.is_transparent() || !self.end_color.is_transparent()
    }

    /// Composites the overlay over `size` on `surface`: the gradient when
    /// active, else the solid color when set, else nothing.
    pub(crate) fn composite(&mut self, surface: &mut dyn Surface, size: PxSize) {
        if self.gradient_active() {
            if size.is_empty() {
                return;
            }
            let shader = self.cache.shader(
                size.width,
                size.height,
                self.start_color,
                self.end_color,
                self.direction,
            );
            surface.fill_rect(
                Rect::from_size(size.width.to_f32(), size.height.to_f32()),
                &Paint::with_shader(shader),
            );
        } else if !self.color.is_transparent() {
            surface.fill_color(self.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_clears_gradient() {
        let mut overlay = OverlayState::new(Color::TRANSPARENT);
        assert!(overlay.set_gradient(
            Color::RED,
            Color::TRANSPARENT,
            GradientDirection::TopToBottom
        ));
        assert!(overlay.gradient_active());
        assert!(overlay.set_color(Color::BLUE));
        assert!(!overlay.gradient_active());
    }

    #[test]
    fn test_gradient_supersedes_solid_without_clearing_it() {
        let mut overlay = OverlayState::new(Color::BLUE);
        assert!(overlay.set_gradient(
            Color::RED,
            Color::GREEN,
            GradientDirection::LeftToRight
        ));
        assert!(overlay.gradient_active());
        // The solid color is untouched; it resumes when the gradient is
        // cleared again.
        assert!(overlay.set_gradient(
            Color::TRANSPARENT,
            Color::TRANSPARENT,
            GradientDirection::LeftToRight
        ));
        assert!(!overlay.gradient_active());
    }

    #[test]
    fn test_setters_detect_no_ops() {
        let mut overlay = OverlayState::new(Color::BLUE);
        assert!(!overlay.set_color(Color::BLUE));
        overlay.set_gradient(Color::RED, Color::GREEN, GradientDirection::None);
        assert!(!overlay.set_gradient(Color::RED, Color::GREEN, GradientDirection::None));
    }
}
