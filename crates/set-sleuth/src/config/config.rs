//! Configuration management for set-sleuth.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, defaults for missing keys, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{CaptureConfig, ServiceConfig, SessionConfig},
};

use set_sleuth_core::SessionSettings;

use std::{fs, io::Write, panic::Location, path::PathBuf, time::Duration};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Capture settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Listening behaviour.
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config = Self::parse(&contents)?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Parse and validate TOML, filling missing keys with defaults.
    #[track_caller]
    pub fn parse(contents: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the session cannot run with.
    #[track_caller]
    pub fn validate(&self) -> AppResult<()> {
        if self.capture.max_duration_ms == 0 {
            return Err(AppError::ConfigError {
                reason: "capture.max_duration_ms must be greater than zero".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let url = self.service.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::ConfigError {
                reason: format!(
                    "service.base_url must start with http:// or https://, got {:?}",
                    self.service.base_url
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Controller settings derived from this configuration.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_duration: Duration::from_millis(self.capture.max_duration_ms),
            matched_restart_delay: Duration::from_millis(self.session.matched_restart_ms),
            no_match_restart_delay: Duration::from_millis(self.session.no_match_restart_ms),
            user_id: self.service.user_id.clone(),
            session_title: self.session.title.clone(),
        }
    }

    /// Timeout applied to identify and registry requests, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.service.request_timeout_ms.map(Duration::from_millis)
    }

    /// Whether continuous sessions are mirrored to the remote registry.
    pub fn registry_enabled(&self) -> bool {
        !self.service.user_id.trim().is_empty()
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "set-sleuth", "Set-Sleuth").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get config directory".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }
}
