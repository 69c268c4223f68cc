//! Effect-graph blur strategy.
//!
//! ## Usage
//!
//! Selected by [`BlurControllerBuilder`](crate::BlurControllerBuilder) for
//! targets that expose a recorded render node. Keeps one persistent
//! [`RenderNode`] whose content is re-recorded each frame and whose
//! attached [`RenderEffect`] the host backend re-evaluates, so no
//! CPU-side re-blur happens on the accelerated path.

use std::sync::{Arc, Weak};

use glam::Vec2;
use parking_lot::Mutex;

use crate::{
    algorithm::BlurAlgorithm,
    color::Color,
    controller::BlurController,
    coordinates::CoordinateTracker,
    effect::{BlendMode, RenderEffect},
    gradient_cache::MaskGradientCache,
    host::{BlurRegion, BlurTarget, ListenerId, PreDrawListener},
    node::{RecordingCanvas, RenderNode, SharedRenderNode},
    overlay::OverlayState,
    raster::RasterCanvas,
    scaler::SizeScaler,
    shader::{GradientDirection, TileMode},
    surface::{Drawable, Rect, Surface},
};

struct EffectNodeCore {
    self_weak: Weak<Mutex<EffectNodeCore>>,
    target: Arc<dyn BlurTarget>,
    region: Arc<dyn BlurRegion>,
    /// The target's recorded draw output; re-referenced on every record.
    target_node: SharedRenderNode,
    /// The persistent node this controller owns and composites.
    node: SharedRenderNode,
    scale_factor: f32,
    noise: Option<Arc<dyn Drawable>>,
    frame_clear: Option<Arc<dyn Drawable>>,
    overlay: OverlayState,
    mask_cache: MaskGradientCache,
    tracker: CoordinateTracker,
    blur_radius: f32,
    enabled: bool,
    fade_direction: GradientDirection,
    /// Some backend revisions do not re-render a node after a
    /// transform-only change; re-attaching the effect forces it.
    reapply_effect_each_frame: bool,
    /// Used only when drawing onto a non-accelerated surface.
    fallback: Option<Box<dyn BlurAlgorithm>>,
    fallback_canvas: Option<RasterCanvas>,
    subscription: Option<ListenerId>,
    destroyed: bool,
}

impl EffectNodeCore {
    fn present(&mut self, surface: &mut dyn Surface) -> bool {
        if !self.enabled || self.destroyed {
            return false;
        }
        self.tracker.refresh(self.target.as_ref(), self.region.as_ref());
        if surface.is_hardware_accelerated() {
            self.hardware_path(surface);
            true
        } else {
            // A software destination: a programmatic screenshot or another
            // region's capture pass. Slow, and not the common case here.
            self.software_path(surface)
        }
    }

    fn hardware_path(&mut self, surface: &mut dyn Surface) {
        // Sized to the target rather than the region so translation and
        // rotation animations on the region do not clip the captured
        // content. Transformed regions can reveal content beyond their
        // visible bounds because of this; a known trade-off.
        let target_size = self.target.size();
        self.node
            .write()
            .set_position(target_size.width, target_size.height);
        self.update_node_properties();

        self.record_content();

        let size = self.region.size();
        surface.save();
        // Stay inside the region even when the parent does not clip its
        // children.
        surface.clip_rect(Rect::from_size(size.width.to_f32(), size.height.to_f32()));
        surface.draw_node(&self.node);
        if let Some(noise) = &self.noise {
            noise.draw(surface);
        }
        self.overlay.composite(surface, size);
        surface.restore();
    }

    /// Repositions the node so its content lands where the target sits
    /// relative to the region, whatever either one's transform is.
    fn update_node_properties(&mut self) {
        let offset = self.tracker.offset();
        let translation = Vec2::new(-offset.x.to_f32(), -offset.y.to_f32());
        let size = self.region.size();
        {
            let mut node = self.node.write();
            node.set_pivot(Vec2::new(
                size.width.to_f32() / 2.0 - translation.x,
                size.height.to_f32() / 2.0 - translation.y,
            ));
            node.set_translation(translation);
        }
        if self.reapply_effect_each_frame {
            self.apply_blur();
        }
    }

    fn record_content(&mut self) {
        let mut recording = RecordingCanvas::new();
        if let Some(frame_clear) = &self.frame_clear {
            frame_clear.draw(&mut recording);
        }
        recording.draw_node(&self.target_node);
        self.node.write().set_display_list(recording.finish());
        self.apply_blur();
    }

    /// Recomposes and attaches the blur (+ fade mask) effect.
    fn apply_blur(&mut self) {
        // The scale factor only amplifies the radius: the backend already
        // downsamples its input in proportion to the blur radius, so no
        // separate buffer downscale exists on this path.
        let radius = self.blur_radius * self.scale_factor;
        let mut effect = RenderEffect::blur(radius, radius, TileMode::Clamp);

        let size = self.region.size();
        if self.fade_direction != GradientDirection::None && !size.is_empty() {
            let offset = self.tracker.offset();
            if let Some(mask) = self.mask_cache.shader(
                size.width,
                size.height,
                offset.x,
                offset.y,
                self.fade_direction,
            ) {
                // Keep the blurred output only where the mask is opaque;
                // the transparent end shows the sharp content underneath.
                effect = RenderEffect::blend(effect, RenderEffect::shader(mask), BlendMode::DstIn);
            }
        }

        self.node.write().set_effect(Some(effect));
    }

    fn software_path(&mut self, surface: &mut dyn Surface) -> bool {
        if self.fallback.is_none() {
            tracing::warn!("no blur algorithm configured for the raster fallback; not drawing");
            return false;
        }
        let measured = self.region.size();
        if measured.is_empty() {
            return false;
        }
        let scaled = SizeScaler::new(self.scale_factor).scale(measured);
        let needs_realloc = self
            .fallback_canvas
            .as_ref()
            .map(|canvas| canvas.size() != scaled)
            .unwrap_or(true);
        if needs_realloc {
            self.fallback_canvas = Some(RasterCanvas::new(scaled));
        }

        let offset = self.tracker.offset();
        let target = self.target.clone();
        let frame_clear = self.frame_clear.clone();
        let Some(canvas) = self.fallback_canvas.as_mut() else {
            return false;
        };
        match &frame_clear {
            Some(drawable) => drawable.draw(canvas),
            None => canvas.erase(Color::TRANSPARENT),
        }

        let scale_w = measured.width.to_f32() / scaled.width.to_f32();
        let scale_h = measured.height.to_f32() / scaled.height.to_f32();
        canvas.save();
        canvas.translate(-offset.x.to_f32() / scale_w, -offset.y.to_f32() / scale_h);
        canvas.scale(1.0 / scale_w, 1.0 / scale_h);
        if let Err(error) = target.draw(canvas) {
            tracing::error!("error during snapshot capture: {error}");
        }
        canvas.restore();

        let buffer = canvas.take_buffer();
        let buffer = match self.fallback.as_mut() {
            Some(algorithm) => algorithm.blur(buffer, self.blur_radius),
            None => buffer,
        };
        canvas.set_buffer(buffer);

        surface.save();
        surface.clip_rect(Rect::from_size(measured.width.to_f32(), measured.height.to_f32()));
        surface.save();
        surface.scale(scale_w, scale_h);
        surface.draw_bitmap(canvas.bitmap());
        surface.restore();
        if let Some(noise) = &self.noise {
            noise.draw(surface);
        }
        self.overlay.composite(surface, measured);
        surface.restore();
        true
    }

    fn set_auto_update(&mut self, enabled: bool) {
        let registry = self.region.pre_draw_registry();
        if let Some(id) = self.subscription.take() {
            registry.unsubscribe(id);
        }
        if enabled {
            self.subscription = Some(registry.subscribe(self.make_listener()));
        }
    }

    fn make_listener(&self) -> PreDrawListener {
        let weak = self.self_weak.clone();
        Arc::new(move || {
            if let Some(core) = weak.upgrade() {
                let mut guard = core.lock();
                let core = &mut *guard;
                core.tracker.refresh(core.target.as_ref(), core.region.as_ref());
                core.update_node_properties();
            }
        })
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        // Unsubscribe first; a listener surviving the node teardown would
        // keep poking destroyed state.
        self.set_auto_update(false);
        self.node.write().discard_display_list();
        if let Some(fallback) = self.fallback.as_mut() {
            fallback.destroy();
        }
        self.destroyed = true;
    }
}

/// Effect-graph implementation of [`BlurController`].
pub struct EffectNodeBlurController {
    core: Arc<Mutex<EffectNodeCore>>,
}

impl EffectNodeBlurController {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        target: Arc<dyn BlurTarget>,
        region: Arc<dyn BlurRegion>,
        overlay_color: Color,
        scale_factor: f32,
        noise: Option<Arc<dyn Drawable>>,
        frame_clear: Option<Arc<dyn Drawable>>,
        fallback: Option<Box<dyn BlurAlgorithm>>,
        reapply_effect_each_frame: bool,
    ) -> Self {
        let target_node = target
            .render_node()
            .expect("the effect-graph strategy requires a target render node");
        let core = Arc::new_cyclic(|self_weak: &Weak<Mutex<EffectNodeCore>>| {
            Mutex::new(EffectNodeCore {
                self_weak: self_weak.clone(),
                target,
                region,
                target_node,
                node: RenderNode::shared("blur node"),
                scale_factor,
                noise,
                frame_clear,
                overlay: OverlayState::new(overlay_color),
                mask_cache: MaskGradientCache::default(),
                tracker: CoordinateTracker::default(),
                blur_radius: 1.0,
                enabled: true,
                fade_direction: GradientDirection::None,
                reapply_effect_each_frame,
                fallback,
                fallback_canvas: None,
                subscription: None,
                destroyed: false,
            })
        });
        core.lock().set_auto_update(true);
        Self { core }
    }

    /// The persistent node this controller drives. Exposed so hosts can
    /// wire it into their scene.
    pub fn render_node(&self) -> SharedRenderNode {
        self.core.lock().node.clone()
    }

    /// Compensates a rotation applied to the output region so the
    /// captured content stays upright.
    pub fn update_rotation(&mut self, rotation: f32) {
        let core = self.core.lock();
        core.node.write().set_rotation_z(-rotation);
    }

    /// Compensates a horizontal scale applied to the output region.
    pub fn update_scale_x(&mut self, scale_x: f32) {
        let core = self.core.lock();
        core.node.write().set_scale_x(1.0 / scale_x);
    }

    /// Compensates a vertical scale applied to the output region.
    pub fn update_scale_y(&mut self, scale_y: f32) {
        let core = self.core.lock();
        core.node.write().set_scale_y(1.0 / scale_y);
    }
}

impl BlurController for EffectNodeBlurController {
    fn draw(&mut self, surface: &mut dyn Surface) -> bool {
        self.core.lock().present(surface)
    }

    fn update_size(&mut self) {
        // The node is re-sized from the target during draw; nothing is
        // cached against the region's size on the accelerated path.
    }

    fn destroy(&mut self) {
        self.core.lock().destroy();
    }

    fn set_blur_enabled(&mut self, enabled: bool) {
        let mut core = self.core.lock();
        if core.enabled == enabled {
            return;
        }
        core.enabled = enabled;
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
        core.blur_radius = radius;
        core.apply_blur();
    }

    fn set_overlay_color(&mut self, color: Color) {
        let mut core = self.core.lock();
        if core.overlay.set_color(color) {
            core.region.request_redraw();
        }
    }

    fn set_blur_gradient(&mut self, direction: GradientDirection) {
        let mut core = self.core.lock();
        if core.fade_direction == direction {
            return;
        }
        core.fade_direction = direction;
        core.apply_blur();
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
