//! Set-sleuth Core Library
//!
//! Live audio identification: records a short clip from the microphone,
//! submits it to a remote fingerprinting service and, in continuous mode,
//! keeps looping while accumulating a history of identified tracks.
//!
//! # Example
//!
//! ```no_run
//! use set_sleuth_core::{
//!     CpalRecorder, CoreResult, FingerprintClient, InputDeviceAccess, ListenMode, NoPlayback,
//!     NullRegistry, SessionController, SessionDeps, SessionSettings, SessionState,
//! };
//!
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let settings = SessionSettings::default();
//!     let deps = SessionDeps {
//!         access: Arc::new(InputDeviceAccess),
//!         recorder: Arc::new(CpalRecorder::new(settings.max_duration)?),
//!         identifier: Arc::new(FingerprintClient::new("https://example.com", None)?),
//!         registry: Arc::new(NullRegistry),
//!         playback: Arc::new(NoPlayback),
//!     };
//!
//!     let (session, _task) = SessionController::spawn(deps, settings);
//!     session.begin(ListenMode::SingleShot).await?;
//!
//!     let mut updates = session.subscribe();
//!     let snapshot = updates
//!         .wait_for(|s| s.state.is_settled())
//!         .await
//!         .map(|s| s.clone());
//!     if let Ok(snapshot) = snapshot {
//!         if let SessionState::Matched { track } = snapshot.state {
//!             println!("{} - {}", track.artist(), track.title());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod audio;
mod error;
mod identify;
mod registry;
mod session;

pub use {
    audio::{
        AudioCapture, AudioFormat, ClipInfo, ClipRef, CpalRecorder, DEFAULT_MAX_DURATION_MS,
        InputDeviceAccess, MicrophoneAccess, NoPlayback, Permission, PermissionGate,
        PlaybackControl, RecordedFile, Recorder, RecordingHandle,
    },
    error::{CoreError, Result as CoreResult},
    identify::{FingerprintClient, IdentifiedTrack, Identification, Identifier},
    registry::{HttpSessionRegistry, NullRegistry, SessionRegistry},
    session::{
        ContinuousSession, DEFAULT_MATCHED_RESTART_MS, DEFAULT_NO_MATCH_RESTART_MS, FailureKind,
        ListenMode, RestartScheduler, RestartToken, SessionController, SessionDeps, SessionHandle,
        SessionSettings, SessionSnapshot, SessionState,
    },
};
