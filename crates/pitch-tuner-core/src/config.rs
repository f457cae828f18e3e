use crate::{CoreResult, TunerError};

use std::panic::Location;

use error_location::ErrorLocation;

/// Default capture rate handed to the pitch estimator.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 22_050;
/// Default number of samples per analysis frame.
pub const DEFAULT_FRAME_SIZE: usize = 2048;
/// Concert pitch A4.
pub const DEFAULT_REFERENCE_PITCH_HZ: f64 = 440.0;
/// MIDI note number of A4.
pub const DEFAULT_REFERENCE_MIDI_INDEX: i32 = 69;
/// Consecutive agreeing frames needed before a note is reported.
pub const DEFAULT_CONFIRMATION_FRAMES: usize = 2;

/// Smallest frame the estimator can do anything useful with.
pub(crate) const MIN_FRAME_SIZE: usize = 64;

/// Settings for a [`TuningSession`](crate::TuningSession).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TunerConfig {
    /// Rate of the frames delivered to the estimator.
    pub sample_rate_hz: u32,
    /// Samples per frame.
    pub frame_size: usize,
    /// Frequency of the reference note.
    pub reference_pitch_hz: f64,
    /// Note index of the reference note.
    pub reference_midi_index: i32,
    /// How many consecutive frames must agree on a pitch class.
    pub confirmation_frames: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            frame_size: DEFAULT_FRAME_SIZE,
            reference_pitch_hz: DEFAULT_REFERENCE_PITCH_HZ,
            reference_midi_index: DEFAULT_REFERENCE_MIDI_INDEX,
            confirmation_frames: DEFAULT_CONFIRMATION_FRAMES,
        }
    }
}

impl TunerConfig {
    /// Checks that every setting is usable.
    ///
    /// # Errors
    ///
    /// Returns [`TunerError::InvalidConfig`] naming the first bad setting.
    #[track_caller]
    pub fn validate(&self) -> CoreResult<()> {
        let reason = if self.sample_rate_hz == 0 {
            Some("sample_rate_hz must be greater than zero".to_string())
        } else if self.frame_size < MIN_FRAME_SIZE {
            Some(format!(
                "frame_size must be at least {} samples, got {}",
                MIN_FRAME_SIZE, self.frame_size
            ))
        } else if !self.reference_pitch_hz.is_finite() || self.reference_pitch_hz <= 0.0 {
            Some(format!(
                "reference_pitch_hz must be positive and finite, got {}",
                self.reference_pitch_hz
            ))
        } else if self.confirmation_frames == 0 {
            Some("confirmation_frames must be at least 1".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(TunerError::InvalidConfig {
                reason,
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }
}
