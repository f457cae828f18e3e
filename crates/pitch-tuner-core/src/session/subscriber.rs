use crate::{TunerError, note::NoteObservation};

/// Consumer of a session's stable readings.
///
/// Callbacks run on the capture delivery thread with no session lock held, so
/// they may call back into the session (including `stop()`). They should
/// return quickly; a slow subscriber makes the source drop frames.
pub trait TuningSubscriber: Send + Sync {
    /// A note was confirmed by the stability filter.
    fn on_note_update(&self, observation: &NoteObservation);

    /// The session ended because capture failed.
    fn on_error(&self, _error: &TunerError) {}
}

/// Handle returned by [`TuningSession::subscribe`](crate::TuningSession::subscribe).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
