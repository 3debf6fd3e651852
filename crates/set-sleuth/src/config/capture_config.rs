use crate::config::default_max_duration_ms;

use serde::{Deserialize, Serialize};

/// Microphone capture configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Recording is finished automatically after this many milliseconds.
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: default_max_duration_ms(),
        }
    }
}
