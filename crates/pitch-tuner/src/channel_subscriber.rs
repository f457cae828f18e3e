use pitch_tuner_core::{NoteObservation, TunerError, TuningSubscriber};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    watch,
};
use tracing::{debug, trace};

/// Bridges session callbacks, which run on the capture delivery thread, into
/// the async application loop.
///
/// Readings go through a bounded channel and are dropped when the loop falls
/// behind; a newer reading is coming anyway. Capture loss is published on a
/// watch channel so it is never dropped.
pub struct ChannelSubscriber {
    note_tx: mpsc::Sender<NoteObservation>,
    lost_tx: watch::Sender<Option<String>>,
}

impl ChannelSubscriber {
    /// Forward readings to `note_tx` and capture loss to `lost_tx`.
    pub fn new(
        note_tx: mpsc::Sender<NoteObservation>,
        lost_tx: watch::Sender<Option<String>>,
    ) -> Self {
        Self { note_tx, lost_tx }
    }
}

impl TuningSubscriber for ChannelSubscriber {
    fn on_note_update(&self, observation: &NoteObservation) {
        match self.note_tx.try_send(*observation) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("Display behind, reading dropped"),
            Err(TrySendError::Closed(_)) => debug!("Display closed, reading dropped"),
        }
    }

    fn on_error(&self, error: &TunerError) {
        self.lost_tx.send_replace(Some(error.to_string()));
    }
}
