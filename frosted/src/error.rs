//! Error types for the capture path.

use thiserror::Error;

/// Errors a [`BlurTarget`](crate::BlurTarget) may raise while drawing its
/// content into a capture surface.
///
/// Controllers catch these, log them, and continue the frame with whatever
/// partial content was drawn. They are never fatal.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The target's backing resource cannot be rendered through the capture
    /// path (for example a texture that only the accelerated backend can
    /// read).
    #[error("backing resource not supported by the capture path: {0}")]
    UnsupportedBackingResource(String),

    /// The target is no longer attached to a host surface.
    #[error("target region is detached from the host surface")]
    TargetDetached,
}
