//! Snapshot-then-filter blur strategy.
//!
//! ## Usage
//!
//! Selected by [`BlurControllerBuilder`](crate::BlurControllerBuilder) for
//! targets without a recorded render node. Captures the hierarchy behind
//! the output region into a downscaled raster buffer on every pre-draw,
//! runs the pluggable blur algorithm over it, and presents the result
//! stretched back to the region's full size.

use std::sync::{Arc, Weak};

use image::RgbaImage;
use parking_lot::Mutex;

use crate::{
    algorithm::BlurAlgorithm,
    color::Color,
    controller::{BlurController, DEFAULT_BLUR_RADIUS},
    coordinates::CoordinateTracker,
    host::{BlurRegion, BlurTarget, ListenerId, PreDrawListener},
    overlay::OverlayState,
    px::PxSize,
    raster::RasterCanvas,
    scaler::SizeScaler,
    shader::GradientDirection,
    surface::{Drawable, Paint, Rect, Surface},
};

/// The snapshot strategy's internal capture canvas.
///
/// A distinct type so that [`SnapshotBlurController::draw`] can recognize
/// when its destination is another controller's capture buffer and refuse
/// to draw, which is what breaks the otherwise unbounded recursion of
/// blurred regions capturing each other (or themselves).
pub struct SnapshotCanvas {
    inner: RasterCanvas,
}

impl SnapshotCanvas {
    pub(crate) fn new(size: PxSize) -> Self {
        Self {
            inner: RasterCanvas::new(size),
        }
    }

    pub fn size(&self) -> PxSize {
        self.inner.size()
    }

    pub fn bitmap(&self) -> &RgbaImage {
        self.inner.bitmap()
    }

    pub(crate) fn erase(&mut self, color: Color) {
        self.inner.erase(color);
    }

    pub(crate) fn take_buffer(&mut self) -> RgbaImage {
        self.inner.take_buffer()
    }

    pub(crate) fn set_buffer(&mut self, buffer: RgbaImage) {
        self.inner.set_buffer(buffer);
    }
}

impl Surface for SnapshotCanvas {
    fn save(&mut self) {
        self.inner.save();
    }

    fn restore(&mut self) {
        self.inner.restore();
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.inner.translate(dx, dy);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.inner.scale(sx, sy);
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.inner.clip_rect(rect);
    }

    fn fill_color(&mut self, color: Color) {
        self.inner.fill_color(color);
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.inner.fill_rect(rect, paint);
    }

    fn draw_bitmap(&mut self, bitmap: &RgbaImage) {
        self.inner.draw_bitmap(bitmap);
    }

    fn draw_node(&mut self, node: &crate::node::SharedRenderNode) {
        self.inner.draw_node(node);
    }

    fn is_hardware_accelerated(&self) -> bool {
        false
    }
}

struct SnapshotCore {
    self_weak: Weak<Mutex<SnapshotCore>>,
    target: Arc<dyn BlurTarget>,
    region: Arc<dyn BlurRegion>,
    algorithm: Box<dyn BlurAlgorithm>,
    scale_factor: f32,
    noise: Option<Arc<dyn Drawable>>,
    frame_clear: Option<Arc<dyn Drawable>>,
    canvas: Option<SnapshotCanvas>,
    tracker: CoordinateTracker,
    overlay: OverlayState,
    blur_radius: f32,
    blur_enabled: bool,
    initialized: bool,
    destroyed: bool,
    fade_direction: GradientDirection,
    target_subscription: Option<ListenerId>,
    region_subscription: Option<ListenerId>,
}

impl SnapshotCore {
    fn init(&mut self, measured: PxSize) {
        if self.destroyed {
            return;
        }
        self.set_auto_update(true);
        let scaler = SizeScaler::new(self.scale_factor);
        if scaler.is_zero_sized(measured) {
            // Initialized later, when the region reports a usable size.
            self.initialized = false;
            return;
        }
        self.ensure_buffer(measured);
        self.initialized = true;
        // One eager capture so the first presented frame is valid even when
        // the pre-draw hook lives in a different window than the region.
        self.update_blur();
    }

    fn ensure_buffer(&mut self, measured: PxSize) {
        let scaled = SizeScaler::new(self.scale_factor).scale(measured);
        let needs_realloc = self
            .canvas
            .as_ref()
            .map(|canvas| canvas.size() != scaled)
            .unwrap_or(true);
        if needs_realloc {
            self.canvas = Some(SnapshotCanvas::new(scaled));
        }
    }

    /// Re-captures and re-blurs the buffer. Runs on every pre-draw.
    fn update_blur(&mut self) {
        if !self.blur_enabled || !self.initialized || self.destroyed {
            return;
        }
        let measured = self.region.size();
        let scaler = SizeScaler::new(self.scale_factor);
        if scaler.is_zero_sized(measured) {
            return;
        }
        self.ensure_buffer(measured);

        self.tracker.refresh(self.target.as_ref(), self.region.as_ref());
        let offset = self.tracker.offset();
        let target = self.target.clone();
        let frame_clear = self.frame_clear.clone();

        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        match &frame_clear {
            Some(drawable) => drawable.draw(canvas),
            None => canvas.erase(Color::TRANSPARENT),
        }

        canvas.save();
        let buffer_size = canvas.size();
        // Per-axis factors: rounding can make the two axes differ.
        let scale_w = measured.width.to_f32() / buffer_size.width.to_f32();
        let scale_h = measured.height.to_f32() / buffer_size.height.to_f32();
        canvas.translate(-offset.x.to_f32() / scale_w, -offset.y.to_f32() / scale_h);
        canvas.scale(1.0 / scale_w, 1.0 / scale_h);
        if let Err(error) = target.draw(canvas) {
            // Can fail on backing resources the capture path cannot read;
            // keep whatever was drawn and try again next frame.
            tracing::error!("error during snapshot capture: {error}");
        }
        canvas.restore();

        let buffer = canvas.take_buffer();
        let blurred = self.algorithm.blur(buffer, self.blur_radius);
        canvas.set_buffer(blurred);
    }

    fn present(&mut self, surface: &mut dyn Surface) -> bool {
        if !self.blur_enabled || !self.initialized || self.destroyed {
            return false;
        }
        if surface.is::<SnapshotCanvas>() {
            return false;
        }
        let Some(canvas) = self.canvas.as_ref() else {
            return false;
        };
        let buffer_size = canvas.size();
        if buffer_size.is_empty() {
            return false;
        }

        let size = self.region.size();
        let width = size.width.to_f32();
        let height = size.height.to_f32();
        let scale_w = width / buffer_size.width.to_f32();
        let scale_h = height / buffer_size.height.to_f32();

        surface.save();
        surface.clip_rect(Rect::from_size(width, height));
        surface.save();
        surface.scale(scale_w, scale_h);
        surface.draw_bitmap(canvas.bitmap());
        // Back to unscaled space so the noise texture is not stretched.
        surface.restore();
        if let Some(noise) = &self.noise {
            noise.draw(surface);
        }
        self.overlay.composite(surface, size);
        surface.restore();
        true
    }

    fn set_auto_update(&mut self, enabled: bool) {
        let target_registry = self.target.pre_draw_registry();
        let region_registry = self.region.pre_draw_registry();
        if let Some(id) = self.target_subscription.take() {
            target_registry.unsubscribe(id);
        }
        if let Some(id) = self.region_subscription.take() {
            region_registry.unsubscribe(id);
        }
        if !enabled {
            return;
        }
        let listener = self.make_listener();
        self.target_subscription = Some(target_registry.subscribe(listener.clone()));
        // The region may live in another window (a dialog, a sheet) whose
        // frames are driven separately; track that window too.
        if !Arc::ptr_eq(&target_registry, &region_registry) {
            self.region_subscription = Some(region_registry.subscribe(listener));
        }
    }

    fn make_listener(&self) -> PreDrawListener {
        let weak = self.self_weak.clone();
        Arc::new(move || {
            if let Some(core) = weak.upgrade() {
                core.lock().update_blur();
            }
        })
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.set_auto_update(false);
        self.algorithm.destroy();
        self.initialized = false;
        self.destroyed = true;
    }
}

/// CPU snapshot-then-filter implementation of [`BlurController`].
pub struct SnapshotBlurController {
    core: Arc<Mutex<SnapshotCore>>,
}

impl SnapshotBlurController {
    pub(crate) fn new(
        target: Arc<dyn BlurTarget>,
        region: Arc<dyn BlurRegion>,
        algorithm: Box<dyn BlurAlgorithm>,
        overlay_color: Color,
        scale_factor: f32,
        noise: Option<Arc<dyn Drawable>>,
        frame_clear: Option<Arc<dyn Drawable>>,
    ) -> Self {
        let core = Arc::new_cyclic(|self_weak: &Weak<Mutex<SnapshotCore>>| {
            Mutex::new(SnapshotCore {
                self_weak: self_weak.clone(),
                target,
                region,
                algorithm,
                scale_factor,
                noise,
                frame_clear,
                canvas: None,
                tracker: CoordinateTracker::default(),
                overlay: OverlayState::new(overlay_color),
                blur_radius: DEFAULT_BLUR_RADIUS,
                blur_enabled: true,
                initialized: false,
                destroyed: false,
                fade_direction: GradientDirection::None,
                target_subscription: None,
                region_subscription: None,
            })
        });
        {
            let mut core = core.lock();
            let measured = core.region.size();
            core.init(measured);
        }
        Self { core }
    }

    /// The configured fade direction. The snapshot strategy stores it for
    /// the contract's sake but renders no mask; fading the blur spatially
    /// is an effect-graph feature.
    pub fn blur_gradient(&self) -> GradientDirection {
        self.core.lock().fade_direction
    }
}

impl BlurController for SnapshotBlurController {
    fn draw(&mut self, surface: &mut dyn Surface) -> bool {
        self.core.lock().present(surface)
    }

    fn update_size(&mut self) {
        let mut core = self.core.lock();
        if core.destroyed {
            return;
        }
        let measured = core.region.size();
        core.init(measured);
    }

    fn destroy(&mut self) {
        self.core.lock().destroy();
    }

    fn set_blur_enabled(&mut self, enabled: bool) {
        let mut core = self.core.lock();
        if core.blur_enabled == enabled {
            return;
        }
        core.blur_enabled = enabled;
        core.set_auto_update(enabled);
        core.region.request_redraw();
    }

    fn set_blur_auto_update(&mut self, enabled: bool) {
        self.core.lock().set_auto_update(enabled);
    }

    fn set_frame_clear_drawable(&mut self, drawable: Option<Arc<dyn Drawable>>) {
        self.core.lock().frame_clear = drawable;
    }

    fn set_blur_radius(&mut self, radius: f32) {
        let mut core = self.core.lock();
        if core.blur_radius == radius {
            return;
        }
        // Takes effect on the next captured frame.
        core.blur_radius = radius;
    }

    fn set_overlay_color(&mut self, color: Color) {
        let mut core = self.core.lock();
        if core.overlay.set_color(color) {
            core.region.request_redraw();
        }
    }

    fn set_blur_gradient(&mut self, direction: GradientDirection) {
        self.core.lock().fade_direction = direction;
    }

    fn set_overlay_gradient_color(
        &mut self,
        start_color: Color,
        end_color: Color,
        direction: GradientDirection,
    ) {
        let mut core = self.core.lock();
        if core.overlay.set_gradient(start_color, end_color, direction) {
            core.region.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::PreDrawRegistry,
        px::Px,
        testing::{CountingBlur, NoopBlur, OpLogSurface, SurfaceOp, TestRegion, TestTarget},
    };

    fn controller_with(
        target: Arc<TestTarget>,
        region: Arc<TestRegion>,
        algorithm: Box<dyn BlurAlgorithm>,
        scale_factor: f32,
    ) -> SnapshotBlurController {
        SnapshotBlurController::new(
            target,
            region,
            algorithm,
            Color::TRANSPARENT,
            scale_factor,
            None,
            None,
        )
    }

    fn simple_setup() -> (Arc<TestTarget>, Arc<TestRegion>, Arc<PreDrawRegistry>) {
        let registry = Arc::new(PreDrawRegistry::new());
        let target = Arc::new(TestTarget::new([400, 300], [0, 0], registry.clone()));
        let region = Arc::new(TestRegion::new([200, 100], [20, 40], registry.clone()));
        (target, region, registry)
    }

    #[test]
    fn test_buffer_sized_by_scale_factor() {
        let (target, region, _registry) = simple_setup();
        let controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        let size = controller.core.lock().canvas.as_ref().unwrap().size();
        assert_eq!(size, PxSize::new(Px(50), Px(25)));
    }

    #[test]
    fn test_zero_sized_region_defers_initialization() {
        let registry = Arc::new(PreDrawRegistry::new());
        let target = Arc::new(TestTarget::new([400, 300], [0, 0], registry.clone()));
        let region = Arc::new(TestRegion::new([0, 0], [0, 0], registry));
        let mut controller =
            controller_with(target, region.clone(), Box::new(NoopBlur::default()), 4.0);
        let mut surface = OpLogSurface::new(true);
        assert!(!controller.draw(&mut surface));

        // Once the host reports a real size, update_size() initializes.
        region.set_size([200, 100]);
        controller.update_size();
        assert!(controller.draw(&mut surface));
    }

    #[test]
    fn test_scale_factor_one_defers_initialization() {
        let (target, region, _registry) = simple_setup();
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 1.0);
        let mut surface = OpLogSurface::new(true);
        assert!(!controller.draw(&mut surface));
    }

    #[test]
    fn test_capture_aligns_with_region_location() {
        let registry = Arc::new(PreDrawRegistry::new());
        // Target fills its own 32x32 space with green, except the region's
        // footprint (an 8x8 area at local (8, 4)), which is red.
        let target = Arc::new(
            TestTarget::new([32, 32], [4, 6], registry.clone())
                .with_fill(Color::GREEN)
                .with_patch(Rect::new(8.0, 4.0, 8.0, 8.0), Color::RED),
        );
        let region = Arc::new(TestRegion::new([8, 8], [12, 10], registry.clone()));
        let controller = controller_with(target, region, Box::new(NoopBlur::default()), 2.0);

        let core = controller.core.lock();
        let canvas = core.canvas.as_ref().unwrap();
        assert_eq!(canvas.size(), PxSize::new(Px(4), Px(4)));
        // Every buffer pixel comes from the red patch behind the region.
        for y in 0..4 {
            for x in 0..4 {
                let pixel = canvas.bitmap().get_pixel(x, y);
                assert_eq!((pixel[0], pixel[1]), (255, 0), "({x}, {y})");
            }
        }
    }

    #[test]
    fn test_pre_draw_dispatch_recaptures() {
        let (target, region, registry) = simple_setup();
        let counting = CountingBlur::default();
        let calls = counting.calls();
        let _controller = controller_with(target, region, Box::new(counting), 4.0);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        registry.dispatch();
        registry.dispatch();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_blur_radius_reaches_algorithm_unscaled() {
        let (target, region, registry) = simple_setup();
        let counting = CountingBlur::default();
        let radius = counting.last_radius();
        let mut controller = controller_with(target, region, Box::new(counting), 4.0);
        controller.set_blur_radius(10.0);
        registry.dispatch();
        // The snapshot strategy applies the requested radius directly to
        // the downscaled buffer; no amplification happens here.
        assert_eq!(radius.lock().unwrap(), 10.0);
    }

    #[test]
    fn test_algorithm_replacement_buffer_is_adopted() {
        let (target, region, registry) = simple_setup();
        let replacing = CountingBlur::default().replace_with(Color::BLUE);
        let controller = controller_with(target, region, Box::new(replacing), 4.0);
        registry.dispatch();
        let core = controller.core.lock();
        let pixel = *core.canvas.as_ref().unwrap().bitmap().get_pixel(0, 0);
        assert_eq!(pixel[2], 255);
    }

    #[test]
    fn test_draw_refuses_snapshot_canvas_destination() {
        let (target, region, _registry) = simple_setup();
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        let mut capture = SnapshotCanvas::new(PxSize::new(Px(50), Px(25)));
        assert!(!controller.draw(&mut capture));

        // A plain raster canvas is a legitimate destination.
        let mut raster = RasterCanvas::new(PxSize::new(Px(200), Px(100)));
        assert!(controller.draw(&mut raster));
    }

    #[test]
    fn test_draw_presents_scaled_blit_then_overlay() {
        let (target, region, _registry) = simple_setup();
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        controller.set_overlay_color(Color::from_argb(0x40000000));
        let mut surface = OpLogSurface::new(true);
        assert!(controller.draw(&mut surface));

        let ops = surface.ops();
        assert!(matches!(ops[0], SurfaceOp::Save));
        assert!(matches!(ops[1], SurfaceOp::ClipRect(rect) if rect.width == 200.0));
        assert!(matches!(ops[3], SurfaceOp::Scale { sx, sy } if sx == 4.0 && sy == 4.0));
        assert!(matches!(
            ops[4],
            SurfaceOp::DrawBitmap { width: 50, height: 25 }
        ));
        assert!(ops.iter().any(|op| matches!(op, SurfaceOp::FillColor(_))));
    }

    #[test]
    fn test_overlay_gradient_supersedes_solid() {
        let (target, region, _registry) = simple_setup();
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        controller.set_overlay_color(Color::BLUE);
        controller.set_overlay_gradient_color(
            Color::RED,
            Color::TRANSPARENT,
            GradientDirection::TopToBottom,
        );
        let mut surface = OpLogSurface::new(true);
        controller.draw(&mut surface);
        assert!(
            surface
                .ops()
                .iter()
                .any(|op| matches!(op, SurfaceOp::FillRect { has_shader: true, .. }))
        );
        assert!(
            !surface
                .ops()
                .iter()
                .any(|op| matches!(op, SurfaceOp::FillColor(_)))
        );
    }

    #[test]
    fn test_disabled_controller_does_not_draw_and_detaches() {
        let (target, region, registry) = simple_setup();
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        assert_eq!(registry.len(), 1);
        controller.set_blur_enabled(false);
        assert!(registry.is_empty());
        let mut surface = OpLogSurface::new(true);
        assert!(!controller.draw(&mut surface));

        controller.set_blur_enabled(true);
        assert_eq!(registry.len(), 1);
        assert!(controller.draw(&mut surface));
    }

    #[test]
    fn test_destroy_unsubscribes_and_is_terminal() {
        let (target, region, registry) = simple_setup();
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        controller.destroy();
        assert!(registry.is_empty());
        let mut surface = OpLogSurface::new(true);
        assert!(!controller.draw(&mut surface));

        // Terminal: update_size must not resurrect the controller.
        controller.update_size();
        assert!(!controller.draw(&mut surface));
        controller.destroy();
    }

    #[test]
    fn test_dual_registry_subscription() {
        let root_registry = Arc::new(PreDrawRegistry::new());
        let dialog_registry = Arc::new(PreDrawRegistry::new());
        let target = Arc::new(TestTarget::new([400, 300], [0, 0], root_registry.clone()));
        let region = Arc::new(TestRegion::new([200, 100], [20, 40], dialog_registry.clone()));
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        assert_eq!(root_registry.len(), 1);
        assert_eq!(dialog_registry.len(), 1);
        controller.set_blur_auto_update(false);
        assert!(root_registry.is_empty());
        assert!(dialog_registry.is_empty());
    }

    #[test]
    fn test_capture_error_is_swallowed() {
        let registry = Arc::new(PreDrawRegistry::new());
        let target =
            Arc::new(TestTarget::new([400, 300], [0, 0], registry.clone()).failing_capture());
        let region = Arc::new(TestRegion::new([200, 100], [20, 40], registry.clone()));
        let mut controller = controller_with(target, region, Box::new(NoopBlur::default()), 4.0);
        registry.dispatch();
        let mut surface = OpLogSurface::new(true);
        assert!(controller.draw(&mut surface));
    }

    #[test]
    fn test_buffer_reallocates_only_on_size_change() {
        let registry = Arc::new(PreDrawRegistry::new());
        let target = Arc::new(TestTarget::new([400, 300], [0, 0], registry.clone()));
        let region = Arc::new(TestRegion::new([200, 100], [20, 40], registry.clone()));
        let controller =
            controller_with(target, region.clone(), Box::new(NoopBlur::default()), 4.0);
        registry.dispatch();
        assert_eq!(
            controller.core.lock().canvas.as_ref().unwrap().size(),
            PxSize::new(Px(50), Px(25))
        );

        region.set_size([100, 100]);
        registry.dispatch();
        assert_eq!(
            controller.core.lock().canvas.as_ref().unwrap().size(),
            PxSize::new(Px(25), Px(25))
        );
    }
}
