//! Server-side bookkeeping for continuous listening sessions.
//!
//! Every call is best-effort: the controller runs them as detached tasks and
//! only logs failures.

mod http;

pub use http::HttpSessionRegistry;
#[cfg(test)]
pub(crate) use http::{CreateSessionRequest, UpdateSessionRequest, parse_create_response};

use crate::{CoreError, CoreResult, IdentifiedTrack};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;

/// Remote session record store.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Create a session and return its server-assigned id.
    async fn create(&self, user_id: &str, title: &str) -> CoreResult<String>;

    /// Append an identified track to session `id`.
    async fn append(&self, id: &str, track: &IdentifiedTrack) -> CoreResult<()>;

    /// Close session `id`.
    async fn end(&self, id: &str) -> CoreResult<()>;
}

/// Registry for shells without a backend. History stays local-only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRegistry;

#[async_trait]
impl SessionRegistry for NullRegistry {
    async fn create(&self, _user_id: &str, _title: &str) -> CoreResult<String> {
        Err(CoreError::RegistryError {
            reason: "No session backend configured".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn append(&self, _id: &str, _track: &IdentifiedTrack) -> CoreResult<()> {
        Ok(())
    }

    async fn end(&self, _id: &str) -> CoreResult<()> {
        Ok(())
    }
}
