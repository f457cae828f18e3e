use crate::{
    AudioFrame, CoreResult, TunerError,
    audio::{AudioSource, FrameAssembler, FrameHandler},
};

use std::{
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, SyncSender, TrySendError},
    },
    thread::{self, JoinHandle},
};

use cpal::{
    BuildStreamError, DefaultStreamConfigError, PlayStreamError, Stream, StreamConfig,
    StreamError,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tracing::{debug, error, info, instrument, trace, warn};

/// Frames waiting for the handler. One slot: a busy handler means new frames
/// are dropped instead of queued.
pub(crate) const DELIVERY_SLOTS: usize = 1;

/// Backend messages that indicate the OS refused microphone access.
const PERMISSION_MARKERS: [&str; 4] = ["permission", "denied", "not authorized", "unauthorized"];

type HandlerSlot = Arc<Mutex<Option<Arc<dyn FrameHandler>>>>;

/// First capture fault of a run, waiting for the delivery thread.
pub(crate) type FaultSlot = Arc<Mutex<Option<TunerError>>>;

pub(crate) enum Delivery {
    Frame(AudioFrame),
    /// Wakes the delivery thread; the fault itself is in the [`FaultSlot`].
    Fault,
}

/// [`AudioSource`] backed by the default cpal input device.
///
/// The cpal callback assembles frames and posts them to a delivery thread,
/// which calls the registered [`FrameHandler`]. The audio thread never runs
/// handler code.
pub struct CpalAudioSource {
    stream: Option<Stream>,
    handler: HandlerSlot,
    /// Signals the audio callback to stop posting. Replaced on every start so
    /// a delivery thread left over from a self-issued stop cannot be revived.
    shutdown: Arc<AtomicBool>,
    delivery: Option<JoinHandle<()>>,
}

impl Default for CpalAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalAudioSource {
    /// Creates an idle source. The device is opened by [`AudioSource::start`].
    pub fn new() -> Self {
        Self {
            stream: None,
            handler: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(true)),
            delivery: None,
        }
    }

    #[track_caller]
    fn open_stream(
        &self,
        sample_rate_hz: u32,
        frame_size: usize,
        shutdown: Arc<AtomicBool>,
        frame_tx: SyncSender<Delivery>,
        faults: FaultSlot,
    ) -> CoreResult<Stream> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(TunerError::DeviceUnavailable {
                reason: "no default input device".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let supported = device
            .default_input_config()
            .map_err(|e| {
                if matches!(e, DefaultStreamConfigError::DeviceNotAvailable) {
                    TunerError::DeviceUnavailable {
                        reason: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    }
                } else {
                    classify_backend_error(
                        format!("Failed to get config: {}", e),
                        Location::caller(),
                    )
                }
            })?;
        let config: StreamConfig = supported.into();
        let device_rate = config.sample_rate;
        let channels = usize::from(config.channels);

        info!(
            device_id = ?device.id(),
            device_rate,
            channels,
            sample_rate = sample_rate_hz,
            frame_size,
            "Opening audio input"
        );

        let mut assembler = FrameAssembler::new(device_rate, sample_rate_hz, channels, frame_size)?;
        let fault_tx = frame_tx.clone();
        let fault_shutdown = Arc::clone(&shutdown);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Once stop() raises the flag nothing more is posted, even
                    // if the backend fires one last callback before the stream
                    // is torn down.
                    if shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    let frames = match assembler.push(data) {
                        Ok(frames) => frames,
                        Err(e) => {
                            warn!(error = %e, "Dropping capture buffer");
                            return;
                        }
                    };
                    for frame in frames {
                        match frame_tx.try_send(Delivery::Frame(frame)) {
                            Ok(()) => {}
                            Err(TrySendError::Full(_)) => trace!("Delivery slot full, frame dropped"),
                            Err(TrySendError::Disconnected(_)) => return,
                        }
                    }
                },
                move |err: StreamError| {
                    error!("Audio stream error: {}", err);
                    if fault_shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    let fault = TunerError::AudioSourceLost {
                        reason: err.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    };
                    post_fault(&fault_tx, &faults, fault);
                },
                None,
            )
            .map_err(|e| {
                if matches!(e, BuildStreamError::DeviceNotAvailable) {
                    TunerError::DeviceUnavailable {
                        reason: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    }
                } else {
                    classify_backend_error(
                        format!("Failed to build stream: {}", e),
                        Location::caller(),
                    )
                }
            })?;

        stream.play().map_err(|e| {
            if matches!(e, PlayStreamError::DeviceNotAvailable) {
                TunerError::DeviceUnavailable {
                    reason: e.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }
            } else {
                classify_backend_error(format!("Failed to start stream: {}", e), Location::caller())
            }
        })?;

        Ok(stream)
    }
}

impl AudioSource for CpalAudioSource {
    #[track_caller]
    #[instrument(skip(self))]
    fn start(&mut self, sample_rate_hz: u32, frame_size: usize) -> CoreResult<()> {
        if self.stream.is_some() {
            debug!("Audio capture already running");
            return Ok(());
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let (frame_tx, frame_rx) = mpsc::sync_channel(DELIVERY_SLOTS);
        let faults: FaultSlot = Arc::new(Mutex::new(None));

        let stream = self.open_stream(
            sample_rate_hz,
            frame_size,
            Arc::clone(&shutdown),
            frame_tx,
            Arc::clone(&faults),
        )?;

        let delivery = spawn_delivery(
            frame_rx,
            Arc::clone(&self.handler),
            faults,
            Arc::clone(&shutdown),
        )
            .map_err(|e| TunerError::DeviceError {
                reason: format!("Failed to spawn frame delivery thread: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        self.shutdown = shutdown;
        self.stream = Some(stream);
        self.delivery = Some(delivery);
        info!("Audio capture started");

        Ok(())
    }

    #[instrument(skip(self))]
    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        if let Some(stream) = self.stream.take() {
            // Dropping the stream releases the device and every sender held by
            // its callbacks, which ends the delivery loop.
            drop(stream);
            info!("Audio capture stopped");
        }

        if let Some(delivery) = self.delivery.take() {
            if delivery.thread().id() == thread::current().id() {
                // Stop issued by a handler: the loop exits after this frame.
                debug!("Capture stopped from the delivery thread");
            } else if delivery.join().is_err() {
                error!("Frame delivery thread panicked");
            }
        }
    }

    fn set_frame_handler(&mut self, handler: Option<Arc<dyn FrameHandler>>) {
        let mut slot = self.handler.lock().unwrap_or_else(|e| {
            error!("Frame handler lock poisoned, recovering: {}", e);
            e.into_inner()
        });
        *slot = handler;
    }

    fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalAudioSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_delivery(
    frame_rx: Receiver<Delivery>,
    handler: HandlerSlot,
    faults: FaultSlot,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tuner-frame-delivery".to_string())
        .spawn(move || run_delivery(frame_rx, handler, faults, shutdown))
}

/// Parks a fault for the delivery thread without waiting on it.
///
/// Runs on the audio thread. When the channel is full the queued delivery
/// wakes the thread, which checks the fault slot after every message.
pub(crate) fn post_fault(frame_tx: &SyncSender<Delivery>, faults: &FaultSlot, fault: TunerError) {
    {
        let mut slot = faults.lock().unwrap_or_else(|e| {
            error!("Fault slot lock poisoned, recovering: {}", e);
            e.into_inner()
        });
        if slot.is_some() {
            debug!(error = %fault, "Capture fault already pending, later fault dropped");
            return;
        }
        *slot = Some(fault);
    }

    match frame_tx.try_send(Delivery::Fault) {
        Ok(()) | Err(TrySendError::Full(_)) => {}
        Err(TrySendError::Disconnected(_)) => debug!("Delivery thread gone, fault not reported"),
    }
}

/// Hands each posted frame to the current handler until the senders are gone,
/// shutdown is raised or a fault has been reported.
pub(crate) fn run_delivery(
    frame_rx: Receiver<Delivery>,
    handler: HandlerSlot,
    faults: FaultSlot,
    shutdown: Arc<AtomicBool>,
) {
    while let Ok(delivery) = frame_rx.recv() {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        // Clone out of the slot so the lock is not held while the handler runs;
        // the handler may itself replace or clear the slot.
        let current = handler
            .lock()
            .unwrap_or_else(|e| {
                error!("Frame handler lock poisoned, recovering: {}", e);
                e.into_inner()
            })
            .clone();

        if let Delivery::Frame(frame) = delivery {
            match &current {
                Some(h) => h.on_frame(frame),
                None => trace!("No frame handler registered, frame discarded"),
            }
        }

        let fault = faults
            .lock()
            .unwrap_or_else(|e| {
                error!("Fault slot lock poisoned, recovering: {}", e);
                e.into_inner()
            })
            .take();
        if let Some(fault) = fault {
            match current {
                Some(h) => h.on_fault(fault),
                None => warn!(error = %fault, "Capture fault with no handler registered"),
            }
            break;
        }
    }

    debug!("Frame delivery loop finished");
}

pub(crate) fn classify_backend_error(reason: String, location: &'static Location<'static>) -> TunerError {
    let lowered = reason.to_lowercase();
    if PERMISSION_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        TunerError::PermissionDenied {
            reason,
            location: ErrorLocation::from(location),
        }
    } else {
        TunerError::DeviceError {
            reason,
            location: ErrorLocation::from(location),
        }
    }
}
