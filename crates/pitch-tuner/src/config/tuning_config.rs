use crate::config::{
    default_confirmation_frames, default_in_tune_cents, default_reference_midi_index,
    default_reference_pitch_hz,
};

use serde::{Deserialize, Serialize};

/// Reference pitch, debounce and display tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Frequency of the reference note (A4 by default).
    #[serde(default = "default_reference_pitch_hz")]
    pub reference_pitch_hz: f64,

    /// Note index of the reference note.
    #[serde(default = "default_reference_midi_index")]
    pub reference_midi_index: i32,

    /// Consecutive frames that must agree before a reading is shown.
    #[serde(default = "default_confirmation_frames")]
    pub confirmation_frames: usize,

    /// Deviation under which a reading is marked in tune.
    #[serde(default = "default_in_tune_cents")]
    pub in_tune_cents: u32,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            reference_pitch_hz: default_reference_pitch_hz(),
            reference_midi_index: default_reference_midi_index(),
            confirmation_frames: default_confirmation_frames(),
            in_tune_cents: default_in_tune_cents(),
        }
    }
}
