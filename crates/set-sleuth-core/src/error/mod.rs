use crate::session::FailureKind;

use error_location::ErrorLocation;
use thiserror::Error;

/// Identification session errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The user or the OS refused microphone access.
    #[error("Microphone permission denied {location}")]
    PermissionDenied {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio capture is not available on this runtime.
    #[error("Audio capture unsupported on this platform {location}")]
    PlatformUnsupported {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// No audio input device found.
    #[error("No input device found {location}")]
    NoInputDevice {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A recording is already live; the microphone is exclusive.
    #[error("Audio capture already in progress {location}")]
    CaptureBusy {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Starting, stopping or reading a recording failed.
    #[error("Recording failed: {reason} {location}")]
    RecordingFailed {
        /// Description of the recording failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The identify endpoint could not be reached.
    #[error("Network error: {reason} {location}")]
    NetworkError {
        /// Description of the transport failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The identify endpoint answered with a failure.
    #[error("Server error (status {status:?}): {reason} {location}")]
    ServerError {
        /// HTTP status, when the failure came from a non-success status.
        status: Option<u16>,
        /// Description reported by the server or the parser.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A session registry call failed.
    #[error("Session registry error: {reason} {location}")]
    RegistryError {
        /// Description of the registry failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The session controller task is no longer running.
    #[error("Session controller channel closed {location}")]
    ChannelClosed {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl CoreError {
    /// User-visible failure this error lands the controller in, if any.
    ///
    /// Registry and channel errors never reach the session state.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            CoreError::PermissionDenied { .. } => Some(FailureKind::PermissionDenied),
            CoreError::PlatformUnsupported { .. } => Some(FailureKind::PlatformUnsupported),
            CoreError::NoInputDevice { .. }
            | CoreError::CaptureBusy { .. }
            | CoreError::RecordingFailed { .. } => Some(FailureKind::RecordingFailure),
            CoreError::NetworkError { .. } => Some(FailureKind::NetworkError),
            CoreError::ServerError { .. } => Some(FailureKind::ServerError),
            CoreError::RegistryError { .. } | CoreError::ChannelClosed { .. } => None,
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
