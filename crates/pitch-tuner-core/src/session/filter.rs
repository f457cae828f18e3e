use crate::note::{NoteObservation, PitchClass};

/// Debounce on pitch class: N consecutive observations must agree before one
/// is accepted.
///
/// Once a pitch class is confirmed every further frame of it is accepted, so
/// a held note updates on each frame. A different pitch class starts a new run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilityFilter {
    required: usize,
    candidate: Option<PitchClass>,
    agreeing: usize,
}

impl StabilityFilter {
    /// Filter needing `required` agreeing frames. Zero is treated as one.
    pub fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            candidate: None,
            agreeing: 0,
        }
    }

    /// Feeds one raw observation. Returns `true` once the current run has
    /// reached the required length.
    pub fn observe(&mut self, observation: &NoteObservation) -> bool {
        if self.candidate == Some(observation.name) {
            self.agreeing = self.agreeing.saturating_add(1);
        } else {
            self.candidate = Some(observation.name);
            self.agreeing = 1;
        }

        self.agreeing >= self.required
    }

    /// Forgets the pending candidate.
    pub fn reset(&mut self) {
        self.candidate = None;
        self.agreeing = 0;
    }

    /// Pitch class waiting for confirmation, if any.
    pub fn candidate(&self) -> Option<PitchClass> {
        self.candidate
    }

    /// Frames needed per confirmation.
    pub fn required(&self) -> usize {
        self.required
    }
}
