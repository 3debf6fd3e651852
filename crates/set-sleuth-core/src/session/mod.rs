mod continuous;
mod controller;
mod handle;
mod restart;
mod state;

pub use {
    continuous::ContinuousSession,
    controller::{SessionController, SessionDeps, SessionSettings},
    handle::SessionHandle,
    restart::{RestartScheduler, RestartToken},
    state::{FailureKind, ListenMode, SessionSnapshot, SessionState},
};

pub(crate) use handle::Command;

/// Default pause before the next capture after a match.
pub const DEFAULT_MATCHED_RESTART_MS: u64 = 3_000;
/// Default pause before the next capture after a no-match.
pub const DEFAULT_NO_MATCH_RESTART_MS: u64 = 2_000;
