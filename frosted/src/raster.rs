//! Software canvas over an RGBA raster buffer.
//!
//! ## Usage
//!
//! Backs the snapshot strategy's internal capture buffer and the
//! effect-graph strategy's raster fallback. Supports the subset of canvas
//! state the capture pipeline needs: translate/scale transforms, clip
//! intersection, src-over fills, per-pixel gradient evaluation and
//! bilinear scaled blits.

use glam::{Affine2, Vec2};
use image::{Rgba, RgbaImage};
use smallvec::SmallVec;

use crate::{
    color::Color,
    node::SharedRenderNode,
    px::{Px, PxSize},
    surface::{Paint, Rect, Surface},
};

#[derive(Clone, Copy)]
struct SavedState {
    transform: Affine2,
    clip: Rect,
}

/// A plain software canvas.
///
/// The transform is restricted to translation and scale (all the capture
/// pipeline ever issues), so transformed rectangles stay axis-aligned and
/// fills never need coverage computation.
pub struct RasterCanvas {
    buffer: RgbaImage,
    transform: Affine2,
    clip: Rect,
    stack: SmallVec<[SavedState; 4]>,
}

impl RasterCanvas {
    /// Allocates a zeroed (fully transparent) canvas of the given size.
    /// Non-positive dimensions produce an empty canvas.
    pub fn new(size: PxSize) -> Self {
        let width = size.width.0.max(0) as u32;
        let height = size.height.0.max(0) as u32;
        let buffer = RgbaImage::new(width, height);
        Self {
            clip: Rect::from_size(width as f32, height as f32),
            buffer,
            transform: Affine2::IDENTITY,
            stack: SmallVec::new(),
        }
    }

    /// The canvas size in pixels.
    pub fn size(&self) -> PxSize {
        PxSize::new(
            Px(self.buffer.width() as i32),
            Px(self.buffer.height() as i32),
        )
    }

    /// Read access to the backing buffer.
    pub fn bitmap(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Overwrites every pixel with `color`, without blending.
    pub fn erase(&mut self, color: Color) {
        let pixel = Rgba(color.to_rgba_u8());
        for dst in self.buffer.pixels_mut() {
            *dst = pixel;
        }
    }

    /// Takes the backing buffer out of the canvas, leaving it empty.
    /// Pair with [`RasterCanvas::set_buffer`] to hand the buffer to a blur
    /// algorithm and accept whichever buffer it returns.
    pub fn take_buffer(&mut self) -> RgbaImage {
        std::mem::replace(&mut self.buffer, RgbaImage::new(0, 0))
    }

    /// Installs `buffer` as the backing store and resets transform, clip
    /// and the state stack.
    pub fn set_buffer(&mut self, buffer: RgbaImage) {
        self.clip = Rect::from_size(buffer.width() as f32, buffer.height() as f32);
        self.buffer = buffer;
        self.transform = Affine2::IDENTITY;
        self.stack.clear();
    }

    fn map_rect(&self, rect: Rect) -> Rect {
        let a = self.transform.transform_point2(Vec2::new(rect.x, rect.y));
        let b = self
            .transform
            .transform_point2(Vec2::new(rect.right(), rect.bottom()));
        let min = a.min(b);
        let max = a.max(b);
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Iterates the device pixels whose centers fall inside `device_rect`,
    /// clipped to the buffer, and feeds each center to `shade`.
    fn fill_device_rect(&mut self, device_rect: Rect, mut shade: impl FnMut(Vec2) -> Color) {
        let area = device_rect.intersect(&self.clip);
        if area.is_empty() {
            return;
        }
        let x0 = area.x.floor().max(0.0) as u32;
        let y0 = area.y.floor().max(0.0) as u32;
        let x1 = (area.right().ceil().max(0.0) as u32).min(self.buffer.width());
        let y1 = (area.bottom().ceil().max(0.0) as u32).min(self.buffer.height());
        for y in y0..y1 {
            for x in x0..x1 {
                let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if center.x < area.x
                    || center.x >= area.right()
                    || center.y < area.y
                    || center.y >= area.bottom()
                {
                    continue;
                }
                let color = shade(center);
                blend_pixel(self.buffer.get_pixel_mut(x, y), color);
            }
        }
    }
}

impl Surface for RasterCanvas {
    fn save(&mut self) {
        self.stack.push(SavedState {
            transform: self.transform,
            clip: self.clip,
        });
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.transform = state.transform;
            self.clip = state.clip;
        }
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform * Affine2::from_translation(Vec2::new(dx, dy));
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform = self.transform * Affine2::from_scale(Vec2::new(sx, sy));
    }

    fn clip_rect(&mut self, rect: Rect) {
        let device = self.map_rect(rect);
        self.clip = self.clip.intersect(&device);
    }

    fn fill_color(&mut self, color: Color) {
        let clip = self.clip;
        self.fill_device_rect(clip, |_| color);
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let device = self.map_rect(rect);
        match &paint.shader {
            Some(shader) => {
                let shader = shader.clone();
                let inverse = self.transform.inverse();
                self.fill_device_rect(device, move |center| {
                    shader.sample(inverse.transform_point2(center))
                });
            }
            None => {
                let color = paint.color;
                self.fill_device_rect(device, |_| color);
            }
        }
    }

    fn draw_bitmap(&mut self, bitmap: &RgbaImage) {
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return;
        }
        let device = self.map_rect(Rect::from_size(
            bitmap.width() as f32,
            bitmap.height() as f32,
        ));
        let inverse = self.transform.inverse();
        self.fill_device_rect(device, |center| {
            let src = inverse.transform_point2(center);
            sample_bilinear(bitmap, src)
        });
    }

    fn draw_node(&mut self, _node: &SharedRenderNode) {
        tracing::warn!("render nodes cannot be executed on a raster surface; skipping");
    }

    fn is_hardware_accelerated(&self) -> bool {
        false
    }
}

fn blend_pixel(dst: &mut Rgba<u8>, src: Color) {
    let sa = src.a.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let channel = |s: f32, d: u8| {
        let d = d as f32 / 255.0;
        let out = (s * sa + d * da * (1.0 - sa)) / out_a;
        (out.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    *dst = Rgba([
        channel(src.r, dst[0]),
        channel(src.g, dst[1]),
        channel(src.b, dst[2]),
        (out_a.clamp(0.0, 1.0) * 255.0).round() as u8,
    ]);
}

/// Samples `bitmap` at a fractional position with bilinear filtering,
/// clamping to the edge pixels.
fn sample_bilinear(bitmap: &RgbaImage, pos: Vec2) -> Color {
    let max_x = (bitmap.width() - 1) as f32;
    let max_y = (bitmap.height() - 1) as f32;
    let fx = (pos.x - 0.5).clamp(0.0, max_x);
    let fy = (pos.y - 0.5).clamp(0.0, max_y);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(bitmap.width() - 1);
    let y1 = (y0 + 1).min(bitmap.height() - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let at = |x: u32, y: u32| {
        let p = bitmap.get_pixel(x, y);
        Color::from_rgba_u8(p[0], p[1], p[2], p[3])
    };
    let top = at(x0, y0).lerp(at(x1, y0), tx);
    let bottom = at(x0, y1).lerp(at(x1, y1), tx);
    top.lerp(bottom, ty)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::shader::LinearGradient;

    fn canvas(w: i32, h: i32) -> RasterCanvas {
        RasterCanvas::new(PxSize::new(Px(w), Px(h)))
    }

    #[test]
    fn test_erase_overwrites_without_blending() {
        let mut canvas = canvas(2, 2);
        canvas.erase(Color::RED);
        canvas.erase(Color::new(0.0, 0.0, 1.0, 0.5));
        let px = canvas.bitmap().get_pixel(0, 0);
        assert_eq!(px[2], 255);
        assert_eq!(px[3], 128);
    }

    #[test]
    fn test_fill_respects_clip() {
        let mut canvas = canvas(4, 4);
        canvas.clip_rect(Rect::new(0.0, 0.0, 2.0, 4.0));
        canvas.fill_color(Color::WHITE);
        assert_eq!(canvas.bitmap().get_pixel(1, 1)[0], 255);
        assert_eq!(canvas.bitmap().get_pixel(2, 1)[3], 0);
    }

    #[test]
    fn test_capture_matrix_round_trip() {
        // Region of 8x8 at offset (8, 4) inside the target's space, scaled
        // into a 4x4 buffer: drawing the region's source area must cover
        // the whole buffer, content outside must not land anywhere.
        let mut canvas = canvas(4, 4);
        canvas.save();
        canvas.translate(-8.0 / 2.0, -4.0 / 2.0);
        canvas.scale(1.0 / 2.0, 1.0 / 2.0);
        canvas.fill_rect(Rect::new(8.0, 4.0, 8.0, 8.0), &Paint::solid(Color::RED));
        canvas.restore();
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(canvas.bitmap().get_pixel(x, y)[0], 255, "({x}, {y})");
            }
        }

        let mut other = RasterCanvas::new(PxSize::new(Px(4), Px(4)));
        other.translate(-8.0 / 2.0, -4.0 / 2.0);
        other.scale(0.5, 0.5);
        other.fill_rect(Rect::new(0.0, 0.0, 8.0, 4.0), &Paint::solid(Color::GREEN));
        // That rect lies entirely above/left of the region's source area.
        assert_eq!(other.bitmap().get_pixel(0, 0)[1], 0);
    }

    #[test]
    fn test_draw_bitmap_scales_up() {
        let mut small = RgbaImage::new(2, 2);
        for p in small.pixels_mut() {
            *p = Rgba([0, 255, 0, 255]);
        }
        let mut canvas = canvas(4, 4);
        canvas.scale(2.0, 2.0);
        canvas.draw_bitmap(&small);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(canvas.bitmap().get_pixel(x, y)[1], 255);
            }
        }
    }

    #[test]
    fn test_gradient_fill_samples_user_space() {
        let shader = Arc::new(LinearGradient::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 4.0),
            Color::WHITE,
            Color::TRANSPARENT,
        ));
        let mut canvas = canvas(4, 4);
        canvas.fill_rect(Rect::from_size(4.0, 4.0), &Paint::with_shader(shader));
        let top = canvas.bitmap().get_pixel(0, 0)[3];
        let bottom = canvas.bitmap().get_pixel(0, 3)[3];
        assert!(top > bottom);
    }

    #[test]
    fn test_unbalanced_restore_is_ignored() {
        let mut canvas = canvas(2, 2);
        canvas.restore();
        canvas.translate(1.0, 0.0);
        canvas.restore();
        canvas.fill_color(Color::WHITE);
        assert_eq!(canvas.bitmap().get_pixel(0, 0)[3], 255);
    }
}
