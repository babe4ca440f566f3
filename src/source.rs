//! Frame source trait for camera collaborators

use crate::Result;
use crate::types::{Frame, FrameFormat};

/// Trait for frame producers
///
/// Sources abstract over the camera driver (live sensor, replayed images, test
/// fixtures). A source is shared between the capture and decode contexts, so every
/// method takes `&self` and implementations use interior mutability for their pool.
///
/// Ownership protocol:
/// - `acquire` hands out a [`Frame`] that the caller owns exclusively
/// - `release` takes it back; every acquired frame is released exactly once
/// - `shutdown` frees camera resources; `release` must still be accepted afterwards
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync + 'static {
    /// Acquire the next frame
    ///
    /// Returns:
    /// - `Ok(frame)` - New frame available, owned by the caller
    /// - `Err(e)` - Transient unavailability; the caller backs off and retries
    ///
    /// Must be cancel safe: the capture loop races it against shutdown, and a
    /// dropped future must not leave a frame checked out.
    async fn acquire(&self) -> Result<Frame>;

    /// Return a frame's buffer to the source
    ///
    /// The buffer is not reused until this call returns.
    fn release(&self, frame: Frame);

    /// Release all camera resources
    ///
    /// Called once by the shutdown coordinator. Subsequent `acquire` calls may fail.
    fn shutdown(&self);

    /// Negotiated frame geometry and pixel layout
    fn format(&self) -> FrameFormat;
}
