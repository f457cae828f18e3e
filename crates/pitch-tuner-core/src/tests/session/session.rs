use crate::{
    AudioFrame, AudioSource, CoreResult, FrameHandler, NoteObservation, PitchClass, SessionState,
    TunerConfig, TunerError, TuningSession, TuningSubscriber,
    tests::session::support::{
        A4, B4, C5, RecordingSubscriber, SAMPLE_RATE, SILENCE, ScriptedHandle, StartFailure,
        encoded_pitch, scripted_source, tone,
    },
};

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

fn new_session(config: TunerConfig) -> (TuningSession, ScriptedHandle, Arc<RecordingSubscriber>) {
    let (source, handle) = scripted_source();
    #[allow(clippy::unwrap_used)]
    let session = TuningSession::new(config, source, Box::new(encoded_pitch)).unwrap();
    let subscriber = Arc::new(RecordingSubscriber::default());
    session.subscribe(subscriber.clone());
    (session, handle, subscriber)
}

fn running_session() -> (TuningSession, ScriptedHandle, Arc<RecordingSubscriber>) {
    let (session, handle, subscriber) = new_session(TunerConfig::default());
    #[allow(clippy::unwrap_used)]
    session.start().unwrap();
    (session, handle, subscriber)
}

fn names(notes: &[NoteObservation]) -> Vec<PitchClass> {
    notes.iter().map(|n| n.name).collect()
}

/// WHAT: A new session starts idle and starting it acquires the source once
/// WHY: The lifecycle begins at Idle and Running means frames flow
#[test]
#[allow(clippy::unwrap_used)]
fn given_new_session_when_started_then_running_with_configured_capture() {
    // Given: An idle session
    let (session, handle, _) = new_session(TunerConfig::default());
    assert_eq!(session.state(), SessionState::Idle);

    // When: Starting it
    let state = session.start().unwrap();

    // Then: Running, source opened at 22050 Hz x 2048, one handler registered
    assert_eq!(state, SessionState::Running);
    assert_eq!(session.state(), SessionState::Running);
    handle.with_log(|log| {
        assert_eq!(log.acquisitions, 1);
        assert_eq!(log.handler_registrations, 1);
        assert_eq!(log.last_request, Some((SAMPLE_RATE, 2048)));
    });
}

/// WHAT: A note change needs two agreeing frames; [A, A, B, B, B] gives A, B, B
/// WHY: Single-frame jitter must never reach the display
#[test]
fn given_a_a_b_b_b_when_processed_then_first_frame_of_each_note_held_back() {
    // Given: A running session
    let (session, handle, subscriber) = running_session();

    // When: Playing A, A, B, B, B
    handle.play_all(&[A4, A4, B4, B4, B4]);

    // Then: Nothing for the first A or the first B
    let notes = subscriber.notes();
    assert_eq!(names(&notes), vec![PitchClass::A, PitchClass::B, PitchClass::B]);
    assert_eq!(session.last_stable().map(|n| n.name), Some(PitchClass::B));
    assert_eq!(session.candidate(), Some(PitchClass::B));
}

/// WHAT: Alternating notes never produce an update
/// WHY: Two consecutive equal pitch classes are required
#[test]
fn given_alternating_a_b_when_processed_then_no_updates() {
    // Given: A running session
    let (session, handle, subscriber) = running_session();

    // When: Playing A, B, A, B
    handle.play_all(&[A4, B4, A4, B4]);

    // Then: Nothing emitted, no stable reading
    assert!(subscriber.notes().is_empty());
    assert_eq!(session.last_stable(), None);
}

/// WHAT: A confirmed note updates on every following frame
/// WHY: The cents needle has to follow the string while it is tuned
#[test]
fn given_held_note_when_processed_then_update_every_frame_after_first() {
    // Given: A running session
    let (_session, handle, subscriber) = running_session();

    // When: Six frames of A at slightly different pitches
    handle.play_all(&[440.0, 441.0, 442.0, 443.0, 444.0, 445.0]);

    // Then: Five updates, one per frame from the second on
    let notes = subscriber.notes();
    let frequencies: Vec<f64> = notes.iter().map(|n| n.observed_frequency_hz).collect();
    assert_eq!(frequencies, vec![441.0, 442.0, 443.0, 444.0, 445.0]);
    assert!(notes[4].cents_deviation > notes[0].cents_deviation);
}

/// WHAT: Frames without a pitch leave the filter untouched
/// WHY: A silent gap between two agreeing frames is not a disagreement
#[test]
fn given_silence_between_agreeing_frames_when_processed_then_update_emitted() {
    // Given: A running session
    let (_session, handle, subscriber) = running_session();

    // When: A, silence, A
    handle.play_all(&[A4, SILENCE, A4]);

    // Then: The two A frames confirm each other
    assert_eq!(names(&subscriber.notes()), vec![PitchClass::A]);
}

/// WHAT: Octave does not break agreement, only the pitch class counts
/// WHY: Candidate memory holds a note name, not a note index
#[test]
fn given_same_class_different_octaves_when_processed_then_update_emitted() {
    // Given: A running session
    let (_session, handle, subscriber) = running_session();

    // When: A4 then A3
    handle.play_all(&[A4, 220.0]);

    // Then: Confirmed, reported with the A3 reading
    let notes = subscriber.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].octave, 3);
}

/// WHAT: Unmappable estimates are skipped without disturbing state
/// WHY: An estimator defect must not crash or corrupt the session
#[test]
#[allow(clippy::unwrap_used)]
fn given_estimator_returning_nan_when_processed_then_frame_skipped() {
    // Given: A session whose estimator returns NaN for negative-coded frames
    let (source, handle) = scripted_source();
    let estimator = |frame: &AudioFrame| {
        encoded_pitch(frame).map(|f| if f < 0.0 { f64::NAN } else { f })
    };
    let session =
        TuningSession::new(TunerConfig::default(), source, Box::new(estimator)).unwrap();
    let subscriber = Arc::new(RecordingSubscriber::default());
    session.subscribe(subscriber.clone());
    session.start().unwrap();

    // When: A, bad, A
    handle.play_all(&[A4, -1.0, A4]);

    // Then: Still running; the bad frame neither emitted nor reset the run
    assert_eq!(session.state(), SessionState::Running);
    assert_eq!(names(&subscriber.notes()), vec![PitchClass::A]);
}

/// WHAT: Starting twice does not reacquire the device
/// WHY: Duplicate handlers would double every update
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_session_when_started_again_then_no_op() {
    // Given: A running session
    let (session, handle, _) = running_session();

    // When: Starting again
    let state = session.start().unwrap();

    // Then: Running, source touched once, one handler
    assert_eq!(state, SessionState::Running);
    handle.with_log(|log| {
        assert_eq!(log.start_calls, 1);
        assert_eq!(log.handler_registrations, 1);
    });
}

/// WHAT: Stop releases the source and a second stop is a no-op
/// WHY: Callers may stop defensively without tracking state
#[test]
fn given_running_session_when_stopped_twice_then_second_is_no_op() {
    // Given: A running session
    let (session, handle, _) = running_session();

    // When: Stopping twice
    let first = session.stop();
    let second = session.stop();

    // Then: Idle both times, device released once, handler gone
    assert_eq!(first, SessionState::Idle);
    assert_eq!(second, SessionState::Idle);
    handle.with_log(|log| {
        assert_eq!(log.releases, 1);
        assert!(!log.capturing);
        assert!(log.handler.is_none());
    });
}

/// WHAT: Stopping an idle session does nothing
/// WHY: Stop in Idle is defined as a no-op
#[test]
fn given_idle_session_when_stopped_then_no_op() {
    // Given: A session never started
    let (session, handle, _) = new_session(TunerConfig::default());

    // When: Stopping
    let state = session.stop();

    // Then: Idle, source never touched
    assert_eq!(state, SessionState::Idle);
    handle.with_log(|log| assert_eq!(log.releases, 0));
}

/// WHAT: Stop keeps the last reading but forgets the candidate
/// WHY: The display keeps showing the result after the tuner is paused
#[test]
fn given_stable_reading_when_stopped_then_reading_kept_and_candidate_cleared() {
    // Given: A confirmed A followed by an unconfirmed B
    let (session, handle, _) = running_session();
    handle.play_all(&[A4, A4, B4]);
    assert_eq!(session.candidate(), Some(PitchClass::B));

    // When: Stopping
    session.stop();

    // Then: A still readable, no candidate
    assert_eq!(session.last_stable().map(|n| n.name), Some(PitchClass::A));
    assert_eq!(session.candidate(), None);
}

/// WHAT: Restarting clears the previous session's reading
/// WHY: A new session must not show stale results
#[test]
#[allow(clippy::unwrap_used)]
fn given_stopped_session_with_reading_when_restarted_then_reading_cleared() {
    // Given: A stopped session that had confirmed A
    let (session, handle, subscriber) = running_session();
    handle.play_all(&[A4, A4]);
    session.stop();

    // When: Starting again and confirming C
    session.start().unwrap();
    assert_eq!(session.last_stable(), None);
    handle.play_all(&[C5, C5]);

    // Then: C is the reading; the source was acquired twice
    assert_eq!(names(&subscriber.notes()), vec![PitchClass::A, PitchClass::C]);
    handle.with_log(|log| assert_eq!(log.acquisitions, 2));
}

/// WHAT: Frames from a handler of a finished run are ignored
/// WHY: No update may surface after stop returns
#[test]
#[allow(clippy::unwrap_used)]
fn given_stale_handler_when_delivering_after_stop_then_ignored() {
    // Given: The handler of a running session, kept past stop
    let (session, handle, subscriber) = running_session();
    let stale = handle.handler().unwrap();
    session.stop();

    // When: The stale handler delivers a confirming pair
    stale.on_frame(tone(A4));
    stale.on_frame(tone(A4));

    // Then: Nothing emitted
    assert!(subscriber.notes().is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}

/// WHAT: Permission refusal is surfaced and leaves the session idle
/// WHY: The caller re-prompts and calls start again
#[test]
#[allow(clippy::unwrap_used)]
fn given_permission_denied_when_starting_then_error_and_idle_then_retry_succeeds() {
    // Given: A source that refuses the first start
    let (session, handle, _) = new_session(TunerConfig::default());
    handle.fail_next_start(StartFailure::PermissionDenied);

    // When: Starting
    let result = session.start();

    // Then: PermissionDenied, Idle, no handler
    assert!(matches!(result, Err(TunerError::PermissionDenied { .. })));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(handle.handler().is_none());

    // And: A retry works
    assert_eq!(session.start().unwrap(), SessionState::Running);
}

/// WHAT: A missing device is surfaced as DeviceUnavailable
/// WHY: Distinct from a permission problem for the caller
#[test]
fn given_no_device_when_starting_then_device_unavailable() {
    // Given: A source with no device
    let (session, handle, _) = new_session(TunerConfig::default());
    handle.fail_next_start(StartFailure::DeviceUnavailable);

    // When/Then: DeviceUnavailable, Idle
    assert!(matches!(
        session.start(),
        Err(TunerError::DeviceUnavailable { .. })
    ));
    assert_eq!(session.state(), SessionState::Idle);
}

/// WHAT: Losing the device mid-session stops the session and reports it
/// WHY: The session does not self-heal; subscribers must learn why updates stopped
#[test]
fn given_running_session_when_device_lost_then_idle_and_subscribers_notified() {
    // Given: A running session with a confirmed A
    let (session, handle, subscriber) = running_session();
    handle.play_all(&[A4, A4]);

    // When: The device disappears
    handle.lose_device();

    // Then: Idle, source released, one AudioSourceLost reported
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(subscriber.source_lost_count(), 1);
    assert_eq!(subscriber.errors().len(), 1);
    handle.with_log(|log| {
        assert_eq!(log.releases, 1);
        assert!(log.handler.is_none());
    });
    assert_eq!(session.last_stable().map(|n| n.name), Some(PitchClass::A));
}

struct StopOnFirstUpdate {
    session: Mutex<Option<TuningSession>>,
    seen: Mutex<usize>,
}

impl TuningSubscriber for StopOnFirstUpdate {
    fn on_note_update(&self, _observation: &NoteObservation) {
        *self.seen.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        let session = self.session.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(session) = session {
            session.stop();
        }
    }
}

/// WHAT: A subscriber may stop the session from inside its callback
/// WHY: Stop must be safe mid-cycle without deadlocking
#[test]
#[allow(clippy::unwrap_used)]
fn given_subscriber_that_stops_when_update_emitted_then_session_idle() {
    // Given: A subscriber holding a clone of the session
    let (source, handle) = scripted_source();
    let session =
        TuningSession::new(TunerConfig::default(), source, Box::new(encoded_pitch)).unwrap();
    let stopper = Arc::new(StopOnFirstUpdate {
        session: Mutex::new(Some(session.clone())),
        seen: Mutex::new(0),
    });
    session.subscribe(stopper.clone());
    session.start().unwrap();

    // When: A confirmed A triggers the stop, then more frames arrive
    handle.play_all(&[A4, A4, B4, B4]);

    // Then: One update, session idle, device released
    assert_eq!(*stopper.seen.lock().unwrap(), 1);
    assert_eq!(session.state(), SessionState::Idle);
    handle.with_log(|log| assert_eq!(log.releases, 1));
}

/// WHAT: Unsubscribed consumers receive nothing further
/// WHY: Presentation layers come and go independently of the session
#[test]
fn given_unsubscribed_consumer_when_updates_emitted_then_not_called() {
    // Given: A second subscriber that unsubscribes after one update
    let (session, handle, first) = running_session();
    let second = Arc::new(RecordingSubscriber::default());
    let id = session.subscribe(second.clone());
    handle.play_all(&[A4, A4]);

    // When: Unsubscribing and confirming B
    assert!(session.unsubscribe(id));
    assert!(!session.unsubscribe(id));
    handle.play_all(&[B4, B4]);

    // Then: Only the remaining subscriber saw B
    assert_eq!(second.notes().len(), 1);
    assert_eq!(first.notes().len(), 2);
}

/// WHAT: Stricter confirmation needs three agreeing frames
/// WHY: The debounce generalises to N-of-N
#[test]
#[allow(clippy::unwrap_used)]
fn given_three_frame_confirmation_when_processed_then_third_frame_confirms() {
    // Given: confirmation_frames = 3
    let (session, handle, subscriber) = new_session(TunerConfig {
        confirmation_frames: 3,
        ..TunerConfig::default()
    });
    session.start().unwrap();

    // When: A, A, B, B, B
    handle.play_all(&[A4, A4, B4, B4, B4]);

    // Then: Only B is confirmed
    assert_eq!(names(&subscriber.notes()), vec![PitchClass::B]);
}

/// WHAT: Sessions share nothing
/// WHY: Parallel sessions (and parallel tests) must not interfere
#[test]
fn given_two_sessions_when_one_receives_frames_then_other_unaffected() {
    // Given: Two running sessions
    let (first, first_handle, first_sub) = running_session();
    let (second, _second_handle, second_sub) = running_session();

    // When: Only the first hears A, A
    first_handle.play_all(&[A4, A4]);

    // Then: Only the first reports it
    assert_eq!(first_sub.notes().len(), 1);
    assert!(second_sub.notes().is_empty());
    assert_eq!(second.last_stable(), None);
    assert_ne!(first.id(), second.id());
}

/// WHAT: Invalid settings are rejected at construction
/// WHY: A zero-size frame or zero confirmation count cannot run
#[test]
fn given_invalid_config_when_creating_session_then_invalid_config_error() {
    // Given: Zero confirmation frames
    let (source, _handle) = scripted_source();
    let config = TunerConfig {
        confirmation_frames: 0,
        ..TunerConfig::default()
    };

    // When: Creating a session
    let result = TuningSession::new(config, source, Box::new(encoded_pitch));

    // Then: InvalidConfig
    assert!(matches!(result, Err(TunerError::InvalidConfig { .. })));
}

/// WHAT: Dropping the last handle releases the device
/// WHY: A forgotten session must not keep the microphone open
#[test]
fn given_running_session_when_dropped_then_source_released() {
    // Given: A running session
    let (session, handle, _) = running_session();

    // When: Dropping it
    drop(session);

    // Then: Released, handler detached
    handle.with_log(|log| {
        assert_eq!(log.releases, 1);
        assert!(log.handler.is_none());
    });
}

/// WHAT: A frame delivered while a cycle is in flight is dropped
/// WHY: At most one frame is processed at a time; nothing queues behind it
#[test]
#[allow(clippy::unwrap_used)]
fn given_cycle_in_flight_when_second_frame_delivered_then_dropped() {
    // Given: An estimator that pushes a B frame into the session mid-estimate
    let (source, handle) = scripted_source();
    let nested = handle.clone();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let estimator = move |frame: &AudioFrame| {
        counted.fetch_add(1, Ordering::SeqCst);
        if counted.load(Ordering::SeqCst) == 1 {
            nested.play(B4);
        }
        encoded_pitch(frame)
    };
    let session =
        TuningSession::new(TunerConfig::default(), source, Box::new(estimator)).unwrap();
    let subscriber = Arc::new(RecordingSubscriber::default());
    session.subscribe(subscriber.clone());
    session.start().unwrap();

    // When: Two A frames arrive, the first one triggering the nested B
    handle.play_all(&[A4, A4]);

    // Then: B never reached the estimator or the filter; A confirmed as if B never came
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(names(&subscriber.notes()), vec![PitchClass::A]);
    assert_eq!(session.candidate(), Some(PitchClass::A));
}

struct ReplayFromCallback {
    handle: ScriptedHandle,
    replayed: AtomicBool,
    seen: Mutex<Vec<PitchClass>>,
}

impl TuningSubscriber for ReplayFromCallback {
    fn on_note_update(&self, observation: &NoteObservation) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observation.name);
        if !self.replayed.swap(true, Ordering::SeqCst) {
            self.handle.play(C5);
        }
    }
}

/// WHAT: A frame delivered from inside a subscriber callback is dropped
/// WHY: Emission is part of the cycle, so the filter must not move under it
#[test]
#[allow(clippy::unwrap_used)]
fn given_subscriber_delivering_frame_when_notified_then_frame_dropped() {
    // Given: A subscriber that plays C the first time it is notified
    let (session, handle, _) = running_session();
    let replay = Arc::new(ReplayFromCallback {
        handle: handle.clone(),
        replayed: AtomicBool::new(false),
        seen: Mutex::new(Vec::new()),
    });
    session.subscribe(replay.clone());

    // When: A is confirmed and then held
    handle.play_all(&[A4, A4, A4]);

    // Then: The C never became the candidate; A kept updating
    assert_eq!(
        *replay.seen.lock().unwrap(),
        vec![PitchClass::A, PitchClass::A]
    );
    assert_eq!(session.candidate(), Some(PitchClass::A));
}

/// WHAT: Reading session state between frames does not cost frames
/// WHY: A display polling the accessors must not starve the pipeline
#[test]
#[allow(clippy::unwrap_used)]
fn given_accessors_read_during_estimate_when_processing_then_frame_kept() {
    // Given: An estimator that reads the session state mid-cycle
    let (source, handle) = scripted_source();
    let observer: Arc<Mutex<Option<TuningSession>>> = Arc::new(Mutex::new(None));
    let seen_states = Arc::new(Mutex::new(Vec::new()));
    let (inner_observer, inner_states) = (Arc::clone(&observer), Arc::clone(&seen_states));
    let estimator = move |frame: &AudioFrame| {
        if let Some(session) = inner_observer.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            let _ = session.tuning_state();
            inner_states
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(session.state());
        }
        encoded_pitch(frame)
    };
    let session =
        TuningSession::new(TunerConfig::default(), source, Box::new(estimator)).unwrap();
    let subscriber = Arc::new(RecordingSubscriber::default());
    session.subscribe(subscriber.clone());
    *observer.lock().unwrap() = Some(session.clone());
    session.start().unwrap();

    // When: Two A frames
    handle.play_all(&[A4, A4]);

    // Then: Accessors answered and both frames counted
    assert_eq!(
        *seen_states.lock().unwrap(),
        vec![SessionState::Running, SessionState::Running]
    );
    assert_eq!(names(&subscriber.notes()), vec![PitchClass::A]);
    observer.lock().unwrap().take();
}

/// Source whose `start` blocks until the test lets it finish.
struct GatedSource {
    entered: mpsc::Sender<()>,
    proceed: mpsc::Receiver<()>,
    capturing: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<Arc<dyn FrameHandler>>>>,
}

impl AudioSource for GatedSource {
    fn start(&mut self, _sample_rate_hz: u32, _frame_size: usize) -> CoreResult<()> {
        let _ = self.entered.send(());
        let _ = self.proceed.recv();
        self.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.capturing.store(false, Ordering::SeqCst);
    }

    fn set_frame_handler(&mut self, handler: Option<Arc<dyn FrameHandler>>) {
        *self.handler.lock().unwrap_or_else(|e| e.into_inner()) = handler;
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }
}

/// WHAT: Stop during a slow start releases the device before returning
/// WHY: Stop is allowed at any time and must leave nothing capturing
#[test]
#[allow(clippy::unwrap_used)]
fn given_start_in_progress_when_stopped_then_device_released_and_idle() {
    // Given: A session whose source is stuck inside start
    let (entered_tx, entered_rx) = mpsc::channel();
    let (proceed_tx, proceed_rx) = mpsc::channel();
    let capturing = Arc::new(AtomicBool::new(false));
    let handler = Arc::new(Mutex::new(None));
    let source = GatedSource {
        entered: entered_tx,
        proceed: proceed_rx,
        capturing: Arc::clone(&capturing),
        handler: Arc::clone(&handler),
    };
    let session = TuningSession::new(
        TunerConfig::default(),
        Box::new(source),
        Box::new(encoded_pitch),
    )
    .unwrap();
    let starter = session.clone();
    let start = thread::spawn(move || starter.start());
    entered_rx.recv().unwrap();
    assert_eq!(session.state(), SessionState::Starting);

    // When: Stopping from another thread, then letting start finish
    let stopper = session.clone();
    let stop = thread::spawn(move || stopper.stop());
    thread::sleep(Duration::from_millis(50));
    proceed_tx.send(()).unwrap();
    let stopped = stop.join().unwrap();
    let started = start.join().unwrap();

    // Then: Idle, not capturing, no handler left behind
    assert!(started.is_ok());
    assert_eq!(stopped, SessionState::Idle);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!capturing.load(Ordering::SeqCst));
    assert!(handler.lock().unwrap().is_none());
}
