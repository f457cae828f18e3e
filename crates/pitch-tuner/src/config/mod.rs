mod audio_config;
#[allow(clippy::module_inception)]
mod config;
mod estimator_config;
mod tuning_config;

pub(crate) use {
    audio_config::AudioConfig, config::Config, estimator_config::EstimatorConfig,
    tuning_config::TuningConfig,
};

use pitch_tuner_core::{
    DEFAULT_CONFIRMATION_FRAMES, DEFAULT_FRAME_SIZE, DEFAULT_REFERENCE_MIDI_INDEX,
    DEFAULT_REFERENCE_PITCH_HZ, DEFAULT_SAMPLE_RATE_HZ, YinConfig,
};

/// Readings closer than this many cents to the reference are shown as in tune.
pub(crate) const DEFAULT_IN_TUNE_CENTS: u32 = 5;

pub(crate) fn default_sample_rate_hz() -> u32 {
    DEFAULT_SAMPLE_RATE_HZ
}

pub(crate) fn default_frame_size() -> usize {
    DEFAULT_FRAME_SIZE
}

pub(crate) fn default_reference_pitch_hz() -> f64 {
    DEFAULT_REFERENCE_PITCH_HZ
}

pub(crate) fn default_reference_midi_index() -> i32 {
    DEFAULT_REFERENCE_MIDI_INDEX
}

pub(crate) fn default_confirmation_frames() -> usize {
    DEFAULT_CONFIRMATION_FRAMES
}

pub(crate) fn default_in_tune_cents() -> u32 {
    DEFAULT_IN_TUNE_CENTS
}

pub(crate) fn default_threshold() -> f32 {
    YinConfig::default().threshold
}

pub(crate) fn default_amplitude_threshold() -> f32 {
    YinConfig::default().amplitude_threshold
}
