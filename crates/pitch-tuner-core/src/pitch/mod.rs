mod yin;

pub use yin::{YinConfig, YinEstimator};

use crate::AudioFrame;

/// Estimates the fundamental frequency of a frame.
///
/// Any algorithm with this shape can drive a [`TuningSession`](crate::TuningSession).
/// Closures of type `FnMut(&AudioFrame) -> Option<f64>` implement it directly.
pub trait PitchEstimator: Send {
    /// Returns the fundamental in Hz, or `None` when the frame has no
    /// reliable pitch (silence, noise, transients).
    fn estimate(&mut self, frame: &AudioFrame) -> Option<f64>;
}

impl<F> PitchEstimator for F
where
    F: FnMut(&AudioFrame) -> Option<f64> + Send,
{
    fn estimate(&mut self, frame: &AudioFrame) -> Option<f64> {
        self(frame)
    }
}
