use crate::{CoreError, CoreResult, IdentifiedTrack, registry::SessionRegistry};

use std::{panic::Location, time::Duration};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("set-sleuth/", env!("CARGO_PKG_VERSION"));
const SESSIONS_PATH: &str = "/api/sessions";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSessionRequest<'a> {
    pub(crate) user_id: &'a str,
    pub(crate) title: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(default)]
    success: bool,
    session: Option<SessionRecord>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionRecord {
    id: SessionId,
}

/// Backends hand out either numeric or string ids.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionId {
    Text(String),
    Number(i64),
}

impl SessionId {
    fn into_string(self) -> String {
        match self {
            SessionId::Text(id) => id,
            SessionId::Number(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum UpdateSessionRequest<'a> {
    AddTrack { track: &'a IdentifiedTrack },
    End,
}

/// Extracts the session id from a create response body.
#[track_caller]
pub(crate) fn parse_create_response(body: &str) -> CoreResult<String> {
    let parsed: CreateSessionResponse =
        serde_json::from_str(body).map_err(|e| CoreError::RegistryError {
            reason: format!("Malformed session response: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    match parsed {
        CreateSessionResponse {
            success: true,
            session: Some(session),
            ..
        } => Ok(session.id.into_string()),
        CreateSessionResponse { error, .. } => Err(CoreError::RegistryError {
            reason: error.unwrap_or_else(|| "Session create failed".to_string()),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Session registry backed by the `/api/sessions` HTTP resource.
pub struct HttpSessionRegistry {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpSessionRegistry {
    /// Creates a registry for the backend rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RegistryError`] if the HTTP client cannot be built.
    #[track_caller]
    pub fn new(base_url: &str, timeout: Option<Duration>) -> CoreResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| CoreError::RegistryError {
            reason: format!("Failed to build HTTP client: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn session_url(&self, id: &str) -> String {
        format!("{}{}/{}", self.base_url, SESSIONS_PATH, id)
    }

    async fn update(&self, id: &str, request: &UpdateSessionRequest<'_>) -> CoreResult<()> {
        let response = self
            .http_client
            .put(self.session_url(id))
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::RegistryError {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::RegistryError {
                reason: format!("Session update returned {}: {}", status, body),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl SessionRegistry for HttpSessionRegistry {
    #[instrument(skip(self))]
    async fn create(&self, user_id: &str, title: &str) -> CoreResult<String> {
        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, SESSIONS_PATH))
            .json(&CreateSessionRequest { user_id, title })
            .send()
            .await
            .map_err(|e| CoreError::RegistryError {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::RegistryError {
                reason: format!("Session create returned {}: {}", status, body),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let body = response.text().await.map_err(|e| CoreError::RegistryError {
            reason: format!("Failed to read session response: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let id = parse_create_response(&body)?;
        debug!(session_id = %id, "Remote session created");
        Ok(id)
    }

    #[instrument(skip(self, track), fields(title = track.title()))]
    async fn append(&self, id: &str, track: &IdentifiedTrack) -> CoreResult<()> {
        self.update(id, &UpdateSessionRequest::AddTrack { track })
            .await
    }

    #[instrument(skip(self))]
    async fn end(&self, id: &str) -> CoreResult<()> {
        self.update(id, &UpdateSessionRequest::End).await
    }
}
