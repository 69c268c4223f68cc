//! The pluggable blur algorithm seam.

use image::RgbaImage;

/// A blur filter for raster buffers.
///
/// The snapshot strategy calls this once per frame on its scaled capture
/// buffer; the effect-graph strategy only uses it on the raster fallback
/// path. Implementations receive the buffer by value and return either
/// the same buffer mutated in place or a replacement, which the
/// controller adopts as its new owned buffer.
pub trait BlurAlgorithm: Send + Sync {
    /// Blurs `buffer` with the given radius (in buffer pixels).
    fn blur(&mut self, buffer: RgbaImage, radius: f32) -> RgbaImage;

    /// Releases resources held by the algorithm. Called from
    /// [`BlurController::destroy`](crate::BlurController::destroy).
    fn destroy(&mut self) {}
}
