use crate::{CoreError, CoreResult};

use std::{
    panic::Location,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use cpal::traits::HostTrait;
use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

/// Outcome of a microphone permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Recording is allowed.
    Granted,
    /// The user or the OS refused access.
    Denied,
}

/// Platform microphone-permission capability.
#[async_trait]
pub trait MicrophoneAccess: Send + Sync {
    /// Whether this runtime can capture audio at all.
    fn is_supported(&self) -> bool;

    /// Ask for microphone access, prompting the user if needed.
    async fn request(&self) -> Permission;
}

/// Obtains and caches microphone authorization for one presentation.
pub struct PermissionGate {
    access: Arc<dyn MicrophoneAccess>,
    cached: Mutex<Option<Permission>>,
}

impl PermissionGate {
    /// Creates a gate over the platform `access` capability.
    pub fn new(access: Arc<dyn MicrophoneAccess>) -> Self {
        Self {
            access,
            cached: Mutex::new(None),
        }
    }

    /// Checks that recording may start.
    ///
    /// # Errors
    ///
    /// [`CoreError::PlatformUnsupported`] when capture is unavailable (no
    /// request is made), [`CoreError::PermissionDenied`] when access is refused.
    #[instrument(skip(self))]
    pub async fn check(&self) -> CoreResult<()> {
        if !self.access.is_supported() {
            warn!("Audio capture unsupported on this platform");
            return Err(CoreError::PlatformUnsupported {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let cached = *self.cached.lock().unwrap_or_else(|e| e.into_inner());
        let permission = match cached {
            Some(permission) => {
                debug!(?permission, "Using cached microphone permission");
                permission
            }
            None => {
                let permission = self.access.request().await;
                *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = Some(permission);
                info!(?permission, "Microphone permission resolved");
                permission
            }
        };

        match permission {
            Permission::Granted => Ok(()),
            Permission::Denied => Err(CoreError::PermissionDenied {
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Forget the cached outcome so the next check asks again.
    pub fn reset(&self) {
        *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Desktop permission model.
///
/// Desktop hosts do not prompt; access is granted whenever an input device
/// exists. An OS-level denial surfaces when the input stream is built.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputDeviceAccess;

#[async_trait]
impl MicrophoneAccess for InputDeviceAccess {
    fn is_supported(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    async fn request(&self) -> Permission {
        Permission::Granted
    }
}
