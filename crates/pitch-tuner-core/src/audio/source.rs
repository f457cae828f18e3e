//! Contract between a capture backend and the tuning pipeline.

use crate::{AudioFrame, CoreResult, TunerError};

use std::sync::Arc;

/// Receives frames and faults from an [`AudioSource`].
///
/// Called from the source's delivery thread, one call at a time. Implementations
/// must return quickly; a slow handler causes the source to drop frames.
pub trait FrameHandler: Send + Sync {
    /// A complete frame is available.
    fn on_frame(&self, frame: AudioFrame);

    /// The capture stream failed. No further frames follow.
    fn on_fault(&self, error: TunerError);
}

/// A microphone (or stand-in) that produces fixed-size frames.
pub trait AudioSource: Send {
    /// Acquires the capture stream and begins delivering frames of
    /// `frame_size` samples at `sample_rate_hz`. A no-op if already capturing.
    ///
    /// # Errors
    ///
    /// [`TunerError::PermissionDenied`] when microphone access is refused,
    /// [`TunerError::DeviceUnavailable`] when there is no usable device, or
    /// [`TunerError::DeviceError`] for other backend failures.
    fn start(&mut self, sample_rate_hz: u32, frame_size: usize) -> CoreResult<()>;

    /// Releases the capture stream. Idempotent. No frame is delivered after
    /// this returns, apart from one already in flight on the delivery thread.
    fn stop(&mut self);

    /// Installs the handler that receives frames, detaching any previous one.
    /// `None` detaches without replacement; frames are then discarded.
    fn set_frame_handler(&mut self, handler: Option<Arc<dyn FrameHandler>>);

    /// Whether a capture stream is currently held.
    fn is_capturing(&self) -> bool;
}
