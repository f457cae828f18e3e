mod mapper;
mod observation;
mod pitch_class;

pub use {
    mapper::{NoteMapper, cents_between, frequency_to_note},
    observation::NoteObservation,
    pitch_class::PitchClass,
};
