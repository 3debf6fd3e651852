use crate::{ClipInfo, ContinuousSession, IdentifiedTrack};

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// User-visible failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Microphone access refused.
    PermissionDenied,
    /// Capture unavailable on this runtime.
    PlatformUnsupported,
    /// Hardware or codec failure starting, stopping or reading a recording.
    RecordingFailure,
    /// Identify endpoint unreachable.
    NetworkError,
    /// Identify endpoint reachable but failed.
    ServerError,
}

impl FailureKind {
    /// Whether `retry()` can possibly succeed.
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::PlatformUnsupported)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::PermissionDenied => "microphone permission denied",
            FailureKind::PlatformUnsupported => "recording unsupported on this platform",
            FailureKind::RecordingFailure => "recording failed",
            FailureKind::NetworkError => "network error",
            FailureKind::ServerError => "server error",
        };
        f.write_str(text)
    }
}

/// Whether the controller loops after each result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenMode {
    /// One capture/identify cycle, then stay on the result.
    #[default]
    #[serde(alias = "single")]
    SingleShot,
    /// Keep capturing and accumulate a session history.
    Continuous,
}

/// The controller's current state. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing in progress.
    Idle,
    /// Microphone is capturing.
    Recording {
        /// When capture started.
        started_at: Instant,
        /// When capture is auto-finished.
        deadline: Instant,
    },
    /// Clip submitted, waiting for the identify endpoint.
    Analyzing {
        /// The submitted clip.
        clip: ClipInfo,
    },
    /// The clip was identified.
    Matched {
        /// The identified track.
        track: IdentifiedTrack,
    },
    /// The service recognised nothing.
    NoMatch,
    /// The cycle failed; needs an explicit retry.
    Failed {
        /// What went wrong.
        kind: FailureKind,
    },
}

impl SessionState {
    /// Whether a cycle has ended with a result.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionState::Matched { .. } | SessionState::NoMatch | SessionState::Failed { .. }
        )
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Recording { .. } => "recording",
            SessionState::Analyzing { .. } => "analyzing",
            SessionState::Matched { .. } => "matched",
            SessionState::NoMatch => "no_match",
            SessionState::Failed { .. } => "failed",
        }
    }
}

/// Everything a presentation layer needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,
    /// Mode of the current or last cycle.
    pub mode: ListenMode,
    /// Open continuous session, if any.
    pub continuous: Option<ContinuousSession>,
    /// Whether an automatic restart is scheduled.
    pub restart_pending: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            mode: ListenMode::default(),
            continuous: None,
            restart_pending: false,
        }
    }
}
