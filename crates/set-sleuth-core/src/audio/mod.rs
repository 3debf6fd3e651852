mod capture;
mod device;
mod permission;
mod playback;
mod recorder;

pub use {
    capture::{AudioCapture, ClipInfo, ClipRef, RecordingHandle},
    device::CpalRecorder,
    permission::{InputDeviceAccess, MicrophoneAccess, Permission, PermissionGate},
    playback::{NoPlayback, PlaybackControl},
    recorder::{AudioFormat, RecordedFile, Recorder},
};

#[cfg(test)]
pub(crate) use device::write_wav_clip;

/// Default upper bound for a single recording.
pub const DEFAULT_MAX_DURATION_MS: u64 = 15_000;
