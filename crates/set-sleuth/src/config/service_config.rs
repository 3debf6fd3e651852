use crate::config::default_base_url;

use serde::{Deserialize, Serialize};

/// Remote identify and session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL; `/api/identify` and `/api/sessions` are appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Owner of continuous sessions. Empty disables the session registry.
    #[serde(default)]
    pub user_id: String,
    /// Per-request timeout. Absent means the HTTP client's own behaviour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_id: String::new(),
            request_timeout_ms: None,
        }
    }
}
