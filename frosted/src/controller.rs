//! The controller contract shared by both backend strategies, and the
//! builder that selects a strategy at construction time.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use frosted::{BlurControllerBuilder, Color};
//! # use frosted::{
//! #     BlurAlgorithm, BlurRegion, BlurTarget, CaptureError, PreDrawRegistry, PxPosition,
//! #     PxSize, Surface,
//! # };
//! # struct Backdrop(Arc<PreDrawRegistry>);
//! # impl BlurTarget for Backdrop {
//! #     fn size(&self) -> PxSize { PxSize::new(400.into(), 300.into()) }
//! #     fn location_on_screen(&self) -> PxPosition { PxPosition::ZERO }
//! #     fn draw(&self, _surface: &mut dyn Surface) -> Result<(), CaptureError> { Ok(()) }
//! #     fn pre_draw_registry(&self) -> Arc<PreDrawRegistry> { self.0.clone() }
//! # }
//! # struct Panel(Arc<PreDrawRegistry>);
//! # impl BlurRegion for Panel {
//! #     fn size(&self) -> PxSize { PxSize::new(200.into(), 100.into()) }
//! #     fn location_on_screen(&self) -> PxPosition { PxPosition::ZERO }
//! #     fn request_redraw(&self) {}
//! #     fn pre_draw_registry(&self) -> Arc<PreDrawRegistry> { self.0.clone() }
//! # }
//! # struct PassThroughBlur;
//! # impl BlurAlgorithm for PassThroughBlur {
//! #     fn blur(&mut self, buffer: image::RgbaImage, _radius: f32) -> image::RgbaImage {
//! #         buffer
//! #     }
//! # }
//! # let registry = Arc::new(PreDrawRegistry::new());
//! # let target = Arc::new(Backdrop(registry.clone()));
//! # let region = Arc::new(Panel(registry));
//! let mut controller = BlurControllerBuilder::new(target, region)
//!     .algorithm(Box::new(PassThroughBlur))
//!     .scale_factor(4.0)
//!     .overlay_color(Color::from_argb(0x40FFFFFF))
//!     .build();
//! controller.set_blur_radius(10.0);
//! ```

use std::sync::Arc;

use downcast_rs::{Downcast, impl_downcast};

use crate::{
    algorithm::BlurAlgorithm,
    color::Color,
    effect_node::EffectNodeBlurController,
    host::{BlurRegion, BlurTarget},
    shader::GradientDirection,
    snapshot::SnapshotBlurController,
    surface::{Drawable, Surface},
};

/// Default blur radius, in output-region pixels before downscaling.
pub const DEFAULT_BLUR_RADIUS: f32 = 16.0;

/// Default snapshot downscale factor. Stronger blur and cheaper capture
/// at the expense of precision.
pub const DEFAULT_SCALE_FACTOR: f32 = 4.0;

/// Per-frame blur compositing controller.
///
/// One controller serves one output region. The host calls
/// [`BlurController::draw`] from the region's draw entry point every
/// frame; everything else is configuration.
pub trait BlurController: Downcast + Send + Sync {
    /// Renders the blurred content onto `surface`.
    ///
    /// Returns whether this controller drew anything; `false` (disabled,
    /// not yet initialized, or a refused recursive capture) lets the
    /// caller fall back to its default drawing.
    fn draw(&mut self, surface: &mut dyn Surface) -> bool;

    /// Re-derives internal buffers and caches from the output region's
    /// current measured size.
    fn update_size(&mut self);

    /// Unsubscribes update hooks and releases owned graphics resources.
    /// Idempotent; the controller stays unusable afterwards.
    fn destroy(&mut self);

    /// Toggles whether blur is computed and drawn at all.
    fn set_blur_enabled(&mut self, enabled: bool);

    /// Toggles the per-frame automatic refresh subscription.
    fn set_blur_auto_update(&mut self, enabled: bool);

    /// Sets or clears the pre-fill drawn into the capture buffer before
    /// the target's content. Useful when the target hierarchy has no
    /// opaque background of its own.
    fn set_frame_clear_drawable(&mut self, drawable: Option<Arc<dyn Drawable>>);

    /// Sets the blur radius (≥ 0). Takes effect on the next frame; the
    /// effect-graph strategy recomposes its effect immediately.
    fn set_blur_radius(&mut self, radius: f32);

    /// Sets the solid overlay color composited over the blurred content.
    /// Clears any overlay gradient. [`Color::TRANSPARENT`] means none.
    fn set_overlay_color(&mut self, color: Color);

    /// Sets or clears the direction in which the blur strength fades.
    fn set_blur_gradient(&mut self, direction: GradientDirection);

    /// Sets the overlay gradient. While either color is non-transparent
    /// the gradient supersedes the solid overlay color.
    fn set_overlay_gradient_color(
        &mut self,
        start_color: Color,
        end_color: Color,
        direction: GradientDirection,
    );
}

impl_downcast!(BlurController);

/// Configures and builds a [`BlurController`].
///
/// Strategy selection happens once in [`BlurControllerBuilder::build`]:
/// targets that expose a recorded render node get the effect-graph
/// strategy, everything else gets the snapshot strategy. Switching
/// afterwards is not supported.
pub struct BlurControllerBuilder {
    target: Arc<dyn BlurTarget>,
    region: Arc<dyn BlurRegion>,
    algorithm: Option<Box<dyn BlurAlgorithm>>,
    overlay_color: Color,
    scale_factor: f32,
    noise: Option<Arc<dyn Drawable>>,
    frame_clear: Option<Arc<dyn Drawable>>,
    reapply_effect_each_frame: bool,
}

impl BlurControllerBuilder {
    /// Starts a builder for blurring `target`'s content behind `region`.
    pub fn new(target: Arc<dyn BlurTarget>, region: Arc<dyn BlurRegion>) -> Self {
        Self {
            target,
            region,
            algorithm: None,
            overlay_color: Color::TRANSPARENT,
            scale_factor: DEFAULT_SCALE_FACTOR,
            noise: None,
            frame_clear: None,
            reapply_effect_each_frame: false,
        }
    }

    /// The blur filter. Required for the snapshot strategy; the
    /// effect-graph strategy uses it only as the raster fallback.
    pub fn algorithm(mut self, algorithm: Box<dyn BlurAlgorithm>) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Initial solid overlay color.
    pub fn overlay_color(mut self, color: Color) -> Self {
        self.overlay_color = color;
        self
    }

    /// Snapshot downscale factor (the effect-graph strategy instead
    /// multiplies it into the blur radius).
    pub fn scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Noise texture composited over the blurred content for dithering.
    pub fn noise(mut self, noise: Arc<dyn Drawable>) -> Self {
        self.noise = Some(noise);
        self
    }

    /// Pre-fill drawn before capturing the target's content.
    pub fn frame_clear_drawable(mut self, drawable: Arc<dyn Drawable>) -> Self {
        self.frame_clear = Some(drawable);
        self
    }

    /// Works around backends whose nodes do not re-render after a
    /// transform-only change: re-attach the filter effect every frame.
    pub fn reapply_effect_each_frame(mut self, reapply: bool) -> Self {
        self.reapply_effect_each_frame = reapply;
        self
    }

    /// Builds the controller, selecting the backend strategy from the
    /// target's capabilities.
    ///
    /// # Panics
    ///
    /// Panics when the snapshot strategy is selected without a configured
    /// blur algorithm.
    pub fn build(self) -> Box<dyn BlurController> {
        if self.target.render_node().is_some() {
            Box::new(EffectNodeBlurController::new(
                self.target,
                self.region,
                self.overlay_color,
                self.scale_factor,
                self.noise,
                self.frame_clear,
                self.algorithm,
                self.reapply_effect_each_frame,
            ))
        } else {
            let algorithm = self
                .algorithm
                .expect("the snapshot strategy requires a blur algorithm");
            Box::new(SnapshotBlurController::new(
                self.target,
                self.region,
                algorithm,
                self.overlay_color,
                self.scale_factor,
                self.noise,
                self.frame_clear,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{NoopBlur, TestRegion, TestTarget};
    use crate::{host::PreDrawRegistry, node::RenderNode};

    #[test]
    fn test_build_selects_strategy_by_capability() {
        let registry = Arc::new(PreDrawRegistry::new());
        let target = Arc::new(TestTarget::new([400, 300], [0, 0], registry.clone()));
        let region = Arc::new(TestRegion::new([200, 100], [10, 10], registry.clone()));
        let controller = BlurControllerBuilder::new(target, region)
            .algorithm(Box::new(NoopBlur::default()))
            .build();
        assert!(controller.is::<SnapshotBlurController>());

        let node = RenderNode::shared("target content");
        let target = Arc::new(
            TestTarget::new([400, 300], [0, 0], registry.clone()).with_render_node(node),
        );
        let region = Arc::new(TestRegion::new([200, 100], [10, 10], registry));
        let controller = BlurControllerBuilder::new(target, region).build();
        assert!(controller.is::<EffectNodeBlurController>());
    }

    #[test]
    #[should_panic(expected = "requires a blur algorithm")]
    fn test_snapshot_strategy_without_algorithm_panics() {
        let registry = Arc::new(PreDrawRegistry::new());
        let target = Arc::new(TestTarget::new([400, 300], [0, 0], registry.clone()));
        let region = Arc::new(TestRegion::new([200, 100], [10, 10], registry));
        let _ = BlurControllerBuilder::new(target, region).build();
    }
}
