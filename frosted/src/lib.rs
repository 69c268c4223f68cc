//! frosted renders a live, continuously updated blurred copy of the
//! content sitting behind a designated screen region, composited with
//! optional directional fade masks and color overlays. It is the
//! machinery behind "frosted glass" surfaces that track scrolling,
//! animation and resizing in real time.
//!
//! # Architecture
//!
//! One [`BlurController`] serves one output region. The host widget layer
//! implements two collaborator traits, [`BlurTarget`] for the content
//! behind the blur and [`BlurRegion`] for the widget displaying the
//! result, and calls [`BlurController::draw`] from the region's draw
//! entry point each frame. A [`PreDrawRegistry`], dispatched by the host
//! before every frame, drives the automatic refresh of the captured
//! content so capture always precedes presentation within a frame.
//!
//! Two backend strategies implement the controller contract, selected
//! once at construction by [`BlurControllerBuilder::build`]:
//!
//! - [`EffectNodeBlurController`] for backends that maintain recorded
//!   render nodes: blur and fade mask are expressed as a declarative
//!   [`RenderEffect`] the backend re-evaluates each frame, with no
//!   CPU-side re-blur.
//! - [`SnapshotBlurController`] for everything else: the hierarchy behind
//!   the region is rasterized into a downscaled buffer and run through a
//!   pluggable [`BlurAlgorithm`] on the controlling thread.
//!
//! The blur convolution itself is not part of this crate; implement
//! [`BlurAlgorithm`] with whatever filter suits the platform.
//!
//! # Feature flags
//!
//! - `testing`: host fakes and an op-logging surface for writing tests
//!   against controllers.

pub mod algorithm;
pub mod color;
pub mod controller;
pub mod coordinates;
pub mod effect;
pub mod effect_node;
pub mod error;
pub mod gradient_cache;
pub mod host;
pub mod node;
mod overlay;
pub mod px;
pub mod raster;
pub mod scaler;
pub mod shader;
pub mod snapshot;
pub mod surface;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use algorithm::BlurAlgorithm;
pub use color::Color;
pub use controller::{
    BlurController, BlurControllerBuilder, DEFAULT_BLUR_RADIUS, DEFAULT_SCALE_FACTOR,
};
pub use coordinates::CoordinateTracker;
pub use effect::{BlendMode, RenderEffect};
pub use effect_node::EffectNodeBlurController;
pub use error::CaptureError;
pub use gradient_cache::{MaskGradientCache, OverlayGradientCache};
pub use host::{BlurRegion, BlurTarget, ListenerId, PreDrawListener, PreDrawRegistry};
pub use node::{CanvasOp, DisplayList, RecordingCanvas, RenderNode, SharedRenderNode};
pub use px::{Px, PxPosition, PxSize};
pub use raster::RasterCanvas;
pub use scaler::SizeScaler;
pub use shader::{GradientDirection, LinearGradient, TileMode};
pub use snapshot::{SnapshotBlurController, SnapshotCanvas};
pub use surface::{Drawable, Paint, Rect, Surface};
