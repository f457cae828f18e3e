use crate::{
    AudioFrame, CoreResult, TunerConfig, TunerError,
    audio::{AudioSource, FrameHandler},
    note::{NoteMapper, NoteObservation, PitchClass},
    pitch::PitchEstimator,
    session::{SessionState, SubscriptionId, TuningState, TuningSubscriber},
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex, MutexGuard, TryLockError, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

/// Drives the audio → pitch → note pipeline and reports stable readings.
///
/// A session owns its audio source, estimator and tuning state outright; two
/// sessions never share anything. The handle is cheap to clone and every
/// operation takes `&self`, so a subscriber may hold a clone and stop the
/// session from inside its own callback.
///
/// # Thread Safety
///
/// Frames are processed one at a time. A frame that arrives while the previous
/// one is still being processed (including subscriber notification) is
/// dropped rather than queued. Reading the accessors never drops frames.
#[derive(Clone)]
pub struct TuningSession {
    shared: Arc<SessionShared>,
}

struct SessionShared {
    id: Uuid,
    config: TunerConfig,
    mapper: NoteMapper,
    core: Mutex<SessionCore>,
    /// Held for a whole frame cycle; `try_lock` failure means a cycle is in flight.
    pipeline: Mutex<Box<dyn PitchEstimator>>,
    /// Taken while holding `core` only by `start()` leaving Idle.
    source: Mutex<Box<dyn AudioSource>>,
    subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn TuningSubscriber>)>>,
    next_subscription: AtomicU64,
}

struct SessionCore {
    state: SessionState,
    /// Bumped on every start and stop; handlers from older runs are ignored.
    generation: u64,
    /// Set by `stop()` while the source is still being acquired.
    stop_requested: bool,
    tuning: TuningState,
}

/// Handler registered with the source for one run of the session.
struct SessionFrameHandler {
    session: Weak<SessionShared>,
    generation: u64,
}

impl TuningSession {
    /// Builds an idle session around `source` and `estimator`.
    ///
    /// # Errors
    ///
    /// Returns [`TunerError::InvalidConfig`] if `config` fails validation.
    #[track_caller]
    #[instrument(skip(source, estimator))]
    pub fn new(
        config: TunerConfig,
        source: Box<dyn AudioSource>,
        estimator: Box<dyn PitchEstimator>,
    ) -> CoreResult<Self> {
        config.validate()?;
        let mapper = NoteMapper::new(config.reference_pitch_hz, config.reference_midi_index)?;
        let id = Uuid::new_v4();

        info!(session_id = %id, "Tuning session created");

        Ok(Self {
            shared: Arc::new(SessionShared {
                id,
                config,
                mapper,
                core: Mutex::new(SessionCore {
                    state: SessionState::Idle,
                    generation: 0,
                    stop_requested: false,
                    tuning: TuningState::new(config.confirmation_frames),
                }),
                pipeline: Mutex::new(estimator),
                source: Mutex::new(source),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
            }),
        })
    }

    /// Acquires the audio source and begins processing frames.
    ///
    /// Clears the previous session's reading. Calling it while not idle
    /// changes nothing and returns the current state.
    ///
    /// # Errors
    ///
    /// Passes through the source's [`TunerError::PermissionDenied`],
    /// [`TunerError::DeviceUnavailable`] or [`TunerError::DeviceError`]; the
    /// session is back in [`SessionState::Idle`] and may be started again.
    #[instrument(skip(self))]
    pub fn start(&self) -> CoreResult<SessionState> {
        let shared = &self.shared;

        let (generation, mut source) = {
            let mut core = lock(&shared.core, "session state");
            if core.state != SessionState::Idle {
                debug!(session_id = %shared.id, state = ?core.state, "Start ignored");
                return Ok(core.state);
            }
            core.state = SessionState::Starting;
            core.generation += 1;
            core.stop_requested = false;
            core.tuning = TuningState::new(shared.config.confirmation_frames);
            // Taken before leaving Idle's critical section so a concurrent
            // stop() that sees Starting waits here for the acquisition.
            (core.generation, lock(&shared.source, "audio source"))
        };

        if let Err(e) = source.start(shared.config.sample_rate_hz, shared.config.frame_size) {
            lock(&shared.core, "session state").state = SessionState::Idle;
            warn!(session_id = %shared.id, error = %e, "Audio source failed to start");
            return Err(e);
        }

        {
            let mut core = lock(&shared.core, "session state");
            if core.stop_requested {
                core.state = SessionState::Stopping;
                core.generation += 1;
                drop(core);

                source.stop();
                lock(&shared.core, "session state").state = SessionState::Idle;
                info!(session_id = %shared.id, "Stop requested during start, audio source released");
                return Ok(SessionState::Idle);
            }
            core.state = SessionState::Running;
        }

        source.set_frame_handler(Some(Arc::new(SessionFrameHandler {
            session: Arc::downgrade(shared),
            generation,
        })));

        info!(
            session_id = %shared.id,
            sample_rate = shared.config.sample_rate_hz,
            frame_size = shared.config.frame_size,
            "Tuning session running"
        );

        Ok(SessionState::Running)
    }

    /// Releases the audio source and returns to [`SessionState::Idle`].
    ///
    /// The pending candidate is discarded; the last stable reading stays
    /// readable until the next start. Called while the source is still being
    /// acquired, it waits for the acquisition and releases it again. A no-op
    /// when idle or already stopping.
    #[instrument(skip(self))]
    pub fn stop(&self) -> SessionState {
        let shared = &self.shared;

        {
            let mut core = lock(&shared.core, "session state");
            let state = core.state;
            match state {
                SessionState::Running => {
                    core.state = SessionState::Stopping;
                    core.generation += 1;
                    core.tuning.clear_candidate();
                }
                SessionState::Starting => {
                    core.stop_requested = true;
                    drop(core);
                    // start() holds the source until it has either released
                    // it again or registered its handler.
                    drop(lock(&shared.source, "audio source"));
                    debug!(session_id = %shared.id, "Stop waited for start to finish");
                    return self.stop();
                }
                SessionState::Idle | SessionState::Stopping => {
                    debug!(session_id = %shared.id, ?state, "Stop ignored");
                    return state;
                }
            }
        }

        shared.release_source();
        lock(&shared.core, "session state").state = SessionState::Idle;

        info!(session_id = %shared.id, "Tuning session stopped");

        SessionState::Idle
    }

    /// Registers `subscriber` for note updates and capture faults.
    pub fn subscribe(&self, subscriber: Arc<dyn TuningSubscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.subscribers, "subscribers").push((id, subscriber));
        debug!(session_id = %self.shared.id, subscription = id.0, "Subscriber added");
        id
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.shared.subscribers, "subscribers");
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        before != subscribers.len()
    }

    /// Identifier used in this session's log records.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Settings the session was built with.
    pub fn config(&self) -> &TunerConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        lock(&self.shared.core, "session state").state
    }

    /// Most recent reading accepted by the stability filter.
    pub fn last_stable(&self) -> Option<NoteObservation> {
        lock(&self.shared.core, "session state").tuning.last_stable()
    }

    /// Pitch class waiting for confirmation.
    pub fn candidate(&self) -> Option<PitchClass> {
        lock(&self.shared.core, "session state").tuning.candidate()
    }

    /// Snapshot of the tuning state.
    pub fn tuning_state(&self) -> TuningState {
        lock(&self.shared.core, "session state").tuning.clone()
    }
}

impl SessionShared {
    fn release_source(&self) {
        let mut source = lock(&self.source, "audio source");
        source.set_frame_handler(None);
        source.stop();
    }

    fn process_frame(&self, generation: u64, frame: &AudioFrame) {
        let mut estimator = match self.pipeline.try_lock() {
            Ok(estimator) => estimator,
            Err(TryLockError::WouldBlock) => {
                trace!(session_id = %self.id, "Pipeline busy, frame dropped");
                return;
            }
            Err(TryLockError::Poisoned(e)) => {
                error!("Pipeline lock poisoned, recovering: {}", e);
                e.into_inner()
            }
        };

        if !self.is_current(generation) {
            return;
        }

        let Some(frequency_hz) = estimator.estimate(frame) else {
            return;
        };

        let observation = match self.mapper.frequency_to_note(frequency_hz) {
            Ok(observation) => observation,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Unmappable pitch estimate, frame skipped");
                return;
            }
        };

        trace!(
            session_id = %self.id,
            note = %observation.name,
            frequency_hz,
            "Raw observation"
        );

        {
            let mut core = lock(&self.core, "session state");
            // A stop may have landed while the estimator ran.
            if core.state != SessionState::Running || core.generation != generation {
                return;
            }
            if !core.tuning.observe(observation) {
                return;
            }
        }

        debug!(
            session_id = %self.id,
            note = %observation.name,
            octave = observation.octave,
            cents = observation.cents_deviation,
            "Stable note"
        );

        // The pipeline stays held so frames delivered from a callback are
        // dropped; the state lock is free so callbacks may stop the session.
        for subscriber in self.subscriber_snapshot() {
            subscriber.on_note_update(&observation);
        }
        drop(estimator);
    }

    fn is_current(&self, generation: u64) -> bool {
        let core = lock(&self.core, "session state");
        core.state == SessionState::Running && core.generation == generation
    }

    fn fail(&self, generation: u64, error: TunerError) {
        {
            let mut core = lock(&self.core, "session state");
            if core.state != SessionState::Running || core.generation != generation {
                debug!(session_id = %self.id, error = %error, "Fault from a finished run ignored");
                return;
            }
            core.state = SessionState::Stopping;
            core.generation += 1;
            core.tuning.clear_candidate();
        }

        self.release_source();
        lock(&self.core, "session state").state = SessionState::Idle;

        let error = match error {
            lost @ TunerError::AudioSourceLost { .. } => lost,
            other => TunerError::AudioSourceLost {
                reason: other.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        };

        error!(session_id = %self.id, error = %error, "Audio source lost, session stopped");

        for subscriber in self.subscriber_snapshot() {
            subscriber.on_error(&error);
        }
    }

    fn subscriber_snapshot(&self) -> Vec<Arc<dyn TuningSubscriber>> {
        lock(&self.subscribers, "subscribers")
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect()
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        let source = self.source.get_mut().unwrap_or_else(|e| e.into_inner());
        source.set_frame_handler(None);
        source.stop();
        debug!(session_id = %self.id, "Tuning session dropped");
    }
}

impl FrameHandler for SessionFrameHandler {
    fn on_frame(&self, frame: AudioFrame) {
        if let Some(session) = self.session.upgrade() {
            session.process_frame(self.generation, &frame);
        }
    }

    fn on_fault(&self, error: TunerError) {
        if let Some(session) = self.session.upgrade() {
            session.fail(self.generation, error);
        }
    }
}

fn lock<'a, T: ?Sized>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        error!("{} lock poisoned, recovering: {}", what, e);
        e.into_inner()
    })
}
