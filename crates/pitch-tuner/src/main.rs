//! Pitch Tuner: console instrument tuner on the default microphone.

mod app;
mod channel_subscriber;
mod config;
mod error;
mod note_display;

pub(crate) use {
    app::App,
    channel_subscriber::ChannelSubscriber,
    error::{AppError, Result as AppResult},
    note_display::NoteDisplay,
};

use crate::config::Config;

use std::{panic::Location, sync::Arc};

use error_location::ErrorLocation;
use pitch_tuner_core::{CpalAudioSource, TuningSession, YinEstimator};
use tokio::sync::{mpsc, watch};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "pitch_tuner=info,pitch_tuner_core=info";

/// Readings buffered between the capture thread and the console.
const NOTE_CHANNEL_CAPACITY: usize = 8;

/// Application entry point.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    if let Err(e) = run() {
        error!("Pitch tuner failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> AppResult<()> {
    let config = Config::load()?;

    let session = TuningSession::new(
        config.tuner_config(),
        Box::new(CpalAudioSource::new()),
        Box::new(YinEstimator::new(config.yin_config())),
    )?;

    let (note_tx, note_rx) = mpsc::channel(NOTE_CHANNEL_CAPACITY);
    let (lost_tx, lost_rx) = watch::channel(None);
    session.subscribe(Arc::new(ChannelSubscriber::new(note_tx, lost_tx)));

    let rt = tokio::runtime::Runtime::new().map_err(|e| AppError::RuntimeError {
        reason: format!("Failed to create tokio runtime: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let app = App {
        session,
        display: NoteDisplay::new(config.tuning.in_tune_cents),
        note_rx,
        lost_rx,
    };

    rt.block_on(app.run())
}
