use crate::config::{default_matched_restart_ms, default_no_match_restart_ms, default_session_title};

use set_sleuth_core::ListenMode;

use serde::{Deserialize, Serialize};

/// Listening behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Mode used by a bare `begin`.
    #[serde(default)]
    pub mode: ListenMode,
    /// Title given to remote continuous sessions.
    #[serde(default = "default_session_title")]
    pub title: String,
    /// Pause after a match before the next capture.
    #[serde(default = "default_matched_restart_ms")]
    pub matched_restart_ms: u64,
    /// Pause after a no-match before the next capture.
    #[serde(default = "default_no_match_restart_ms")]
    pub no_match_restart_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: ListenMode::default(),
            title: default_session_title(),
            matched_restart_ms: default_matched_restart_ms(),
            no_match_restart_ms: default_no_match_restart_ms(),
        }
    }
}
