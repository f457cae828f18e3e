use error_location::ErrorLocation;
use thiserror::Error;

/// Tuner pipeline errors with source location tracking.
#[derive(Error, Debug)]
pub enum TunerError {
    /// The platform refused access to the microphone.
    #[error("Microphone permission denied: {reason} {location}")]
    PermissionDenied {
        /// Backend description of the refusal.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No capture device exists or the device cannot be opened.
    #[error("Audio input device unavailable: {reason} {location}")]
    DeviceUnavailable {
        /// Description of why the device is unavailable.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The capture stream failed while a session was running.
    #[error("Audio source lost: {reason} {location}")]
    AudioSourceLost {
        /// Description of the stream fault.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A frequency that cannot be mapped to a note (non-positive or non-finite).
    #[error("Invalid frequency: {frequency_hz} Hz {location}")]
    InvalidFrequency {
        /// The rejected frequency.
        frequency_hz: f64,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio device operation failed for a reason not covered above.
    #[error("Audio device error: {reason} {location}")]
    DeviceError {
        /// Description of the device error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    ResamplingError {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Tuner configuration rejected.
    #[error("Invalid configuration: {reason} {location}")]
    InvalidConfig {
        /// Which setting was rejected and why.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

/// Result type alias using [`TunerError`].
pub type Result<T> = std::result::Result<T, TunerError>;
