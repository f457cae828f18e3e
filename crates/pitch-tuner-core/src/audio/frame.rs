use std::sync::Arc;

/// A fixed-length block of mono samples tagged with its capture rate.
///
/// Immutable once built. Cloning shares the sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Arc<[f32]>,
    sample_rate_hz: u32,
}

impl AudioFrame {
    /// Wraps `samples` captured at `sample_rate_hz`.
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate_hz,
        }
    }

    /// The samples, oldest first.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Rate the samples were captured (or resampled) at.
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the frame carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
