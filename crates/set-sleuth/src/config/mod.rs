mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod service_config;
mod session_config;

pub(crate) use {
    capture_config::CaptureConfig, config::Config, service_config::ServiceConfig,
    session_config::SessionConfig,
};

use set_sleuth_core::{
    DEFAULT_MATCHED_RESTART_MS, DEFAULT_MAX_DURATION_MS, DEFAULT_NO_MATCH_RESTART_MS,
};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub(crate) const DEFAULT_SESSION_TITLE: &str = "Live Session";

pub(crate) fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

pub(crate) fn default_max_duration_ms() -> u64 {
    DEFAULT_MAX_DURATION_MS
}

pub(crate) fn default_session_title() -> String {
    DEFAULT_SESSION_TITLE.to_string()
}

pub(crate) fn default_matched_restart_ms() -> u64 {
    DEFAULT_MATCHED_RESTART_MS
}

pub(crate) fn default_no_match_restart_ms() -> u64 {
    DEFAULT_NO_MATCH_RESTART_MS
}
