use crate::note::PitchClass;

use std::fmt;

/// A detected frequency resolved to its nearest equal-tempered note.
///
/// Built only by [`NoteMapper`](crate::NoteMapper); every field is a pure
/// function of the observed frequency and the mapper's reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteObservation {
    /// Semitone index (MIDI numbering with the default reference).
    pub note_index: i32,
    /// Pitch class of `note_index`.
    pub name: PitchClass,
    /// Scientific pitch octave; C4 is middle C.
    pub octave: i32,
    /// Frequency reported by the estimator.
    pub observed_frequency_hz: f64,
    /// Equal-tempered frequency of `note_index`.
    pub reference_frequency_hz: f64,
    /// Signed deviation from the reference, floored to whole cents.
    pub cents_deviation: i32,
}

impl fmt::Display for NoteObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {:+}¢ ({:.1} Hz)",
            self.name, self.octave, self.cents_deviation, self.observed_frequency_hz
        )
    }
}
