//! Pitch Tuner Core Library
//!
//! Headless instrument-tuner pipeline: microphone capture with CPAL and
//! Rubato, YIN pitch estimation, equal-tempered note mapping and a debounced
//! session that reports stable note/cents readings to subscribers.
//!
//! # Example
//!
//! ```no_run
//! use pitch_tuner_core::{
//!     CoreResult, CpalAudioSource, NoteObservation, TunerConfig, TuningSession,
//!     TuningSubscriber, YinEstimator,
//! };
//!
//! use std::{sync::Arc, thread::sleep, time::Duration};
//!
//! struct Printer;
//!
//! impl TuningSubscriber for Printer {
//!     fn on_note_update(&self, observation: &NoteObservation) {
//!         println!("{}", observation);
//!     }
//! }
//!
//! fn main() -> CoreResult<()> {
//!     let session = TuningSession::new(
//!         TunerConfig::default(),
//!         Box::new(CpalAudioSource::new()),
//!         Box::new(YinEstimator::default()),
//!     )?;
//!     session.subscribe(Arc::new(Printer));
//!
//!     session.start()?;
//!     sleep(Duration::from_secs(10));
//!     session.stop();
//!     Ok(())
//! }
//! ```

mod audio;
mod config;
mod error;
mod note;
mod pitch;
mod session;

pub use {
    audio::{AudioFrame, AudioSource, CpalAudioSource, FrameAssembler, FrameHandler},
    config::{
        DEFAULT_CONFIRMATION_FRAMES, DEFAULT_FRAME_SIZE, DEFAULT_REFERENCE_MIDI_INDEX,
        DEFAULT_REFERENCE_PITCH_HZ, DEFAULT_SAMPLE_RATE_HZ, TunerConfig,
    },
    error::{Result as CoreResult, TunerError},
    note::{NoteMapper, NoteObservation, PitchClass, cents_between, frequency_to_note},
    pitch::{PitchEstimator, YinConfig, YinEstimator},
    session::{
        SessionState, StabilityFilter, SubscriptionId, TuningSession, TuningState,
        TuningSubscriber,
    },
};
