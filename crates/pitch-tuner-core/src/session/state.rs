use crate::{
    note::{NoteObservation, PitchClass},
    session::StabilityFilter,
};

/// Lifecycle of a [`TuningSession`](crate::TuningSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No capture stream held. Initial and final state.
    Idle,
    /// Acquiring the capture stream.
    Starting,
    /// Frames are flowing through the pipeline.
    Running,
    /// Releasing the capture stream.
    Stopping,
}

/// The accepted reading plus the debounce memory behind it.
#[derive(Debug, Clone)]
pub struct TuningState {
    last_stable: Option<NoteObservation>,
    filter: StabilityFilter,
}

impl TuningState {
    pub(crate) fn new(confirmation_frames: usize) -> Self {
        Self {
            last_stable: None,
            filter: StabilityFilter::new(confirmation_frames),
        }
    }

    /// Runs `observation` through the filter; on acceptance it becomes the
    /// last stable reading and `true` is returned.
    pub(crate) fn observe(&mut self, observation: NoteObservation) -> bool {
        if self.filter.observe(&observation) {
            self.last_stable = Some(observation);
            true
        } else {
            false
        }
    }

    pub(crate) fn clear_candidate(&mut self) {
        self.filter.reset();
    }

    /// Most recent accepted reading.
    pub fn last_stable(&self) -> Option<NoteObservation> {
        self.last_stable
    }

    /// Pitch class awaiting confirmation.
    pub fn candidate(&self) -> Option<PitchClass> {
        self.filter.candidate()
    }
}
