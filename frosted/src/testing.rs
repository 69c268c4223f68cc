//! Test doubles for the host collaborators.
//!
//! ## Usage
//!
//! Available to downstream crates through the `testing` feature, and used
//! by this crate's own tests: fake target/region implementations with
//! settable geometry, instrumented blur algorithms, and an op-logging
//! surface for asserting present sequences.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::{
    algorithm::BlurAlgorithm,
    color::Color,
    error::CaptureError,
    host::{BlurRegion, BlurTarget, PreDrawRegistry},
    node::SharedRenderNode,
    px::{PxPosition, PxSize},
    surface::{Paint, Rect, Surface},
};

/// A fake blur target that paints solid rectangles in its local space.
pub struct TestTarget {
    size: Mutex<PxSize>,
    location: Mutex<PxPosition>,
    registry: Arc<PreDrawRegistry>,
    node: Option<SharedRenderNode>,
    fill: Option<Color>,
    patches: Vec<(Rect, Color)>,
    fail: AtomicBool,
    draw_calls: AtomicUsize,
}

impl TestTarget {
    pub fn new(
        size: impl Into<PxSize>,
        location: impl Into<PxPosition>,
        registry: Arc<PreDrawRegistry>,
    ) -> Self {
        Self {
            size: Mutex::new(size.into()),
            location: Mutex::new(location.into()),
            registry,
            node: None,
            fill: None,
            patches: Vec::new(),
            fail: AtomicBool::new(false),
            draw_calls: AtomicUsize::new(0),
        }
    }

    /// Advertises a recorded render node, selecting the effect-graph
    /// strategy at controller construction.
    pub fn with_render_node(mut self, node: SharedRenderNode) -> Self {
        self.node = Some(node);
        self
    }

    /// Fills the whole target bounds with `color` on every draw.
    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    /// Additionally fills `rect` (target-local coordinates) with `color`.
    pub fn with_patch(mut self, rect: Rect, color: Color) -> Self {
        self.patches.push((rect, color));
        self
    }

    /// Makes every capture attempt fail like an unsupported backing
    /// resource would.
    pub fn failing_capture(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_location(&self, location: impl Into<PxPosition>) {
        *self.location.lock() = location.into();
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls.load(Ordering::SeqCst)
    }
}

impl BlurTarget for TestTarget {
    fn size(&self) -> PxSize {
        *self.size.lock()
    }

    fn location_on_screen(&self) -> PxPosition {
        *self.location.lock()
    }

    fn draw(&self, surface: &mut dyn Surface) -> Result<(), CaptureError> {
        self.draw_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CaptureError::UnsupportedBackingResource(
                "test backing resource".into(),
            ));
        }
        let size = self.size();
        if let Some(fill) = self.fill {
            surface.fill_rect(
                Rect::from_size(size.width.to_f32(), size.height.to_f32()),
                &Paint::solid(fill),
            );
        }
        for (rect, color) in &self.patches {
            surface.fill_rect(*rect, &Paint::solid(*color));
        }
        Ok(())
    }

    fn render_node(&self) -> Option<SharedRenderNode> {
        self.node.clone()
    }

    fn pre_draw_registry(&self) -> Arc<PreDrawRegistry> {
        self.registry.clone()
    }
}

/// A fake output region with settable geometry and a redraw counter.
pub struct TestRegion {
    size: Mutex<PxSize>,
    location: Mutex<PxPosition>,
    registry: Arc<PreDrawRegistry>,
    redraw_requests: AtomicUsize,
}

impl TestRegion {
    pub fn new(
        size: impl Into<PxSize>,
        location: impl Into<PxPosition>,
        registry: Arc<PreDrawRegistry>,
    ) -> Self {
        Self {
            size: Mutex::new(size.into()),
            location: Mutex::new(location.into()),
            registry,
            redraw_requests: AtomicUsize::new(0),
        }
    }

    pub fn set_size(&self, size: impl Into<PxSize>) {
        *self.size.lock() = size.into();
    }

    pub fn set_location(&self, location: impl Into<PxPosition>) {
        *self.location.lock() = location.into();
    }

    pub fn redraw_requests(&self) -> usize {
        self.redraw_requests.load(Ordering::SeqCst)
    }
}

impl BlurRegion for TestRegion {
    fn size(&self) -> PxSize {
        *self.size.lock()
    }

    fn location_on_screen(&self) -> PxPosition {
        *self.location.lock()
    }

    fn request_redraw(&self) {
        self.redraw_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn pre_draw_registry(&self) -> Arc<PreDrawRegistry> {
        self.registry.clone()
    }
}

/// A blur algorithm that returns its input untouched.
#[derive(Default)]
pub struct NoopBlur;

impl BlurAlgorithm for NoopBlur {
    fn blur(&mut self, buffer: RgbaImage, _radius: f32) -> RgbaImage {
        buffer
    }
}

/// A blur algorithm that records invocations, and can return a
/// replacement buffer to exercise the ownership-transfer contract.
#[derive(Default)]
pub struct CountingBlur {
    calls: Arc<AtomicUsize>,
    last_radius: Arc<Mutex<Option<f32>>>,
    replacement: Option<Color>,
}

impl CountingBlur {
    /// Shared call counter, valid after the algorithm is moved into a
    /// controller.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    /// Shared record of the most recent radius argument.
    pub fn last_radius(&self) -> Arc<Mutex<Option<f32>>> {
        self.last_radius.clone()
    }

    /// Returns a brand-new buffer filled with `color` instead of mutating
    /// the input in place.
    pub fn replace_with(mut self, color: Color) -> Self {
        self.replacement = Some(color);
        self
    }
}

impl BlurAlgorithm for CountingBlur {
    fn blur(&mut self, buffer: RgbaImage, radius: f32) -> RgbaImage {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_radius.lock() = Some(radius);
        match self.replacement {
            Some(color) => {
                let mut replacement = RgbaImage::new(buffer.width(), buffer.height());
                let pixel = Rgba(color.to_rgba_u8());
                for dst in replacement.pixels_mut() {
                    *dst = pixel;
                }
                replacement
            }
            None => buffer,
        }
    }
}

/// One logged [`Surface`] call.
#[derive(Debug, Clone)]
pub enum SurfaceOp {
    Save,
    Restore,
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
    ClipRect(Rect),
    FillColor(Color),
    FillRect { rect: Rect, has_shader: bool },
    DrawBitmap { width: u32, height: u32 },
    DrawNode(SharedRenderNode),
}

/// A surface that logs calls instead of rendering.
pub struct OpLogSurface {
    ops: Vec<SurfaceOp>,
    hardware_accelerated: bool,
}

impl OpLogSurface {
    pub fn new(hardware_accelerated: bool) -> Self {
        Self {
            ops: Vec::new(),
            hardware_accelerated,
        }
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }
}

impl Surface for OpLogSurface {
    fn save(&mut self) {
        self.ops.push(SurfaceOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(SurfaceOp::Restore);
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.ops.push(SurfaceOp::Translate { dx, dy });
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.ops.push(SurfaceOp::Scale { sx, sy });
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.ops.push(SurfaceOp::ClipRect(rect));
    }

    fn fill_color(&mut self, color: Color) {
        self.ops.push(SurfaceOp::FillColor(color));
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.ops.push(SurfaceOp::FillRect {
            rect,
            has_shader: paint.shader.is_some(),
        });
    }

    fn draw_bitmap(&mut self, bitmap: &RgbaImage) {
        self.ops.push(SurfaceOp::DrawBitmap {
            width: bitmap.width(),
            height: bitmap.height(),
        });
    }

    fn draw_node(&mut self, node: &SharedRenderNode) {
        self.ops.push(SurfaceOp::DrawNode(node.clone()));
    }

    fn is_hardware_accelerated(&self) -> bool {
        self.hardware_accelerated
    }
}
