//! Retained render nodes and display-list recording.
//!
//! ## Usage
//!
//! A [`RenderNode`] holds recorded draw output plus the transform
//! properties and filter effect the accelerated backend applies when it
//! executes the node. Content is (re)recorded through a
//! [`RecordingCanvas`], which captures [`Surface`] calls as a display
//! list instead of rasterizing them.

use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;
use parking_lot::RwLock;

use crate::{
    color::Color,
    effect::RenderEffect,
    px::{Px, PxSize},
    surface::{Paint, Rect, Surface},
};

/// A single recorded canvas operation.
#[derive(Debug, Clone)]
pub enum CanvasOp {
    Save,
    Restore,
    Translate { dx: f32, dy: f32 },
    Scale { sx: f32, sy: f32 },
    ClipRect(Rect),
    FillColor(Color),
    FillRect { rect: Rect, paint: Paint },
    DrawBitmap(RgbaImage),
    DrawNode(SharedRenderNode),
}

/// Recorded draw output, replayed by the backend when the node executes.
pub type DisplayList = Vec<CanvasOp>;

/// A render node shared between its owner and the surfaces that
/// composite it.
pub type SharedRenderNode = Arc<RwLock<RenderNode>>;

/// A retained node in the host's effect graph.
///
/// The controlling thread mutates properties and re-records content; the
/// accelerated backend executes the display list with the attached
/// [`RenderEffect`] each frame.
#[derive(Debug)]
pub struct RenderNode {
    label: &'static str,
    size: PxSize,
    pivot: Vec2,
    translation: Vec2,
    scale: Vec2,
    rotation_z: f32,
    effect: Option<RenderEffect>,
    display_list: DisplayList,
}

impl RenderNode {
    /// Creates an empty node.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            size: PxSize::ZERO,
            pivot: Vec2::ZERO,
            translation: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation_z: 0.0,
            effect: None,
            display_list: Vec::new(),
        }
    }

    /// Creates an empty node behind the shared handle type.
    pub fn shared(label: &'static str) -> SharedRenderNode {
        Arc::new(RwLock::new(Self::new(label)))
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Sets the node's bounds to `(0, 0, width, height)`.
    pub fn set_position(&mut self, width: Px, height: Px) {
        self.size = PxSize::new(width, height);
    }

    pub fn size(&self) -> PxSize {
        self.size
    }

    /// Pivot point for rotation and scale, in node-local coordinates.
    pub fn set_pivot(&mut self, pivot: Vec2) {
        self.pivot = pivot;
    }

    pub fn pivot(&self) -> Vec2 {
        self.pivot
    }

    pub fn set_translation(&mut self, translation: Vec2) {
        self.translation = translation;
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn set_rotation_z(&mut self, rotation_z: f32) {
        self.rotation_z = rotation_z;
    }

    pub fn rotation_z(&self) -> f32 {
        self.rotation_z
    }

    pub fn set_scale_x(&mut self, sx: f32) {
        self.scale.x = sx;
    }

    pub fn set_scale_y(&mut self, sy: f32) {
        self.scale.y = sy;
    }

    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Attaches (or clears) the filter effect the backend applies when
    /// executing this node.
    pub fn set_effect(&mut self, effect: Option<RenderEffect>) {
        self.effect = effect;
    }

    pub fn effect(&self) -> Option<&RenderEffect> {
        self.effect.as_ref()
    }

    /// Replaces the node's recorded content.
    pub fn set_display_list(&mut self, display_list: DisplayList) {
        self.display_list = display_list;
    }

    pub fn display_list(&self) -> &[CanvasOp] {
        &self.display_list
    }

    /// Drops the recorded content, releasing whatever it referenced.
    pub fn discard_display_list(&mut self) {
        self.display_list = Vec::new();
    }
}

/// A surface that records operations into a [`DisplayList`] instead of
/// executing them.
#[derive(Default)]
pub struct RecordingCanvas {
    ops: DisplayList,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finishes recording and returns the captured display list.
    pub fn finish(self) -> DisplayList {
        self.ops
    }
}

impl Surface for RecordingCanvas {
    fn save(&mut self) {
        self.ops.push(CanvasOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(CanvasOp::Restore);
    }

    fn translate(&mut self, dx: f32, dy: f32) {
        self.ops.push(CanvasOp::Translate { dx, dy });
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.ops.push(CanvasOp::Scale { sx, sy });
    }

    fn clip_rect(&mut self, rect: Rect) {
        self.ops.push(CanvasOp::ClipRect(rect));
    }

    fn fill_color(&mut self, color: Color) {
        self.ops.push(CanvasOp::FillColor(color));
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.ops.push(CanvasOp::FillRect {
            rect,
            paint: paint.clone(),
        });
    }

    fn draw_bitmap(&mut self, bitmap: &RgbaImage) {
        self.ops.push(CanvasOp::DrawBitmap(bitmap.clone()));
    }

    fn draw_node(&mut self, node: &SharedRenderNode) {
        self.ops.push(CanvasOp::DrawNode(node.clone()));
    }

    fn is_hardware_accelerated(&self) -> bool {
        true
    }
}
