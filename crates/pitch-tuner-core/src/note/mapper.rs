//! Frequency to note conversion in twelve-tone equal temperament.
//!
//! The note index rounds half up, the octave floors and the cents deviation
//! floors.

use crate::{
    CoreResult, TunerError,
    config::{DEFAULT_REFERENCE_MIDI_INDEX, DEFAULT_REFERENCE_PITCH_HZ},
    note::{NoteObservation, PitchClass},
};

use std::panic::Location;

use error_location::ErrorLocation;

const SEMITONES_PER_OCTAVE: f64 = 12.0;
const CENTS_PER_OCTAVE: f64 = 1200.0;

/// Maps frequencies onto notes relative to a reference pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteMapper {
    reference_pitch_hz: f64,
    reference_midi_index: i32,
}

impl Default for NoteMapper {
    fn default() -> Self {
        Self {
            reference_pitch_hz: DEFAULT_REFERENCE_PITCH_HZ,
            reference_midi_index: DEFAULT_REFERENCE_MIDI_INDEX,
        }
    }
}

impl NoteMapper {
    /// Creates a mapper where `reference_midi_index` sounds at `reference_pitch_hz`.
    ///
    /// # Errors
    ///
    /// Returns [`TunerError::InvalidConfig`] if the reference pitch is not a
    /// positive finite number.
    #[track_caller]
    pub fn new(reference_pitch_hz: f64, reference_midi_index: i32) -> CoreResult<Self> {
        if !reference_pitch_hz.is_finite() || reference_pitch_hz <= 0.0 {
            return Err(TunerError::InvalidConfig {
                reason: format!(
                    "reference pitch must be positive and finite, got {}",
                    reference_pitch_hz
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            reference_pitch_hz,
            reference_midi_index,
        })
    }

    /// Frequency of the reference note.
    pub fn reference_pitch_hz(&self) -> f64 {
        self.reference_pitch_hz
    }

    /// Index of the reference note.
    pub fn reference_midi_index(&self) -> i32 {
        self.reference_midi_index
    }

    /// Equal-tempered frequency of `note_index`.
    pub fn reference_frequency(&self, note_index: i32) -> f64 {
        let semitones = f64::from(note_index) - f64::from(self.reference_midi_index);
        self.reference_pitch_hz * 2.0_f64.powf(semitones / SEMITONES_PER_OCTAVE)
    }

    /// Resolves `frequency_hz` to the nearest note and its cents deviation.
    ///
    /// Frequencies outside any instrument's range are still mapped.
    ///
    /// # Errors
    ///
    /// Returns [`TunerError::InvalidFrequency`] if `frequency_hz` is zero,
    /// negative, NaN or infinite.
    #[track_caller]
    pub fn frequency_to_note(&self, frequency_hz: f64) -> CoreResult<NoteObservation> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(TunerError::InvalidFrequency {
                frequency_hz,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let semitone_offset =
            SEMITONES_PER_OCTAVE * (frequency_hz / self.reference_pitch_hz).log2();
        let note_index = round_half_up(semitone_offset).saturating_add(self.reference_midi_index);
        let reference_frequency_hz = self.reference_frequency(note_index);

        Ok(NoteObservation {
            note_index,
            name: PitchClass::from_note_index(note_index),
            octave: note_index.div_euclid(12) - 1,
            observed_frequency_hz: frequency_hz,
            reference_frequency_hz,
            cents_deviation: cents_between(frequency_hz, reference_frequency_hz),
        })
    }
}

/// Converts `frequency_hz` using an explicit reference.
///
/// # Errors
///
/// Returns [`TunerError::InvalidFrequency`] for unmappable frequencies and
/// [`TunerError::InvalidConfig`] for an unusable reference pitch.
#[track_caller]
pub fn frequency_to_note(
    frequency_hz: f64,
    reference_pitch_hz: f64,
    reference_midi_index: i32,
) -> CoreResult<NoteObservation> {
    NoteMapper::new(reference_pitch_hz, reference_midi_index)?.frequency_to_note(frequency_hz)
}

/// Interval from `reference_hz` to `observed_hz` in cents, floored.
pub fn cents_between(observed_hz: f64, reference_hz: f64) -> i32 {
    (CENTS_PER_OCTAVE * (observed_hz / reference_hz).log2()).floor() as i32
}

// Ties go toward +inf, so -0.5 rounds to 0 rather than -1.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
