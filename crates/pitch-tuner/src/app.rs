use crate::{AppError, AppResult, NoteDisplay};

use std::panic::Location;

use error_location::ErrorLocation;
use pitch_tuner_core::{NoteObservation, TuningSession};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, instrument};

/// Console front end for one tuning session.
///
/// Runs on the async runtime. Readings arrive from the session's subscriber
/// through `note_rx`; capture loss arrives on `lost_rx`.
pub struct App {
    pub(crate) session: TuningSession,
    pub(crate) display: NoteDisplay,
    pub(crate) note_rx: mpsc::Receiver<NoteObservation>,
    pub(crate) lost_rx: watch::Receiver<Option<String>>,
}

impl App {
    /// Start the session and print readings until Ctrl-C or capture loss.
    ///
    /// The session is stopped on every exit path.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        self.session.start()?;
        info!(
            session_id = %self.session.id(),
            reference_hz = self.session.config().reference_pitch_hz,
            "Pitch tuner listening, press Ctrl-C to quit"
        );

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let result = loop {
            tokio::select! {
                Some(observation) = self.note_rx.recv() => {
                    println!("{}", self.display.render(&observation));
                }

                changed = self.lost_rx.changed() => {
                    if changed.is_err() {
                        info!("Session subscriber gone, shutting down");
                        break Ok(());
                    }
                    let lost = self.lost_rx.borrow_and_update().clone();
                    if let Some(reason) = lost {
                        error!(reason = %reason, "Audio input lost");
                        break Err(AppError::RuntimeError {
                            reason: format!("Audio input lost: {}", reason),
                            location: ErrorLocation::from(Location::caller()),
                        });
                    }
                }

                signal = &mut ctrl_c => {
                    if let Err(e) = signal {
                        error!(error = ?e, "Failed to listen for Ctrl-C");
                    }
                    info!("Shutdown requested");
                    break Ok(());
                }
            }
        };

        self.session.stop();
        info!("Pitch tuner shut down");

        result
    }
}
