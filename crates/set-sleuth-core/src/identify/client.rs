use crate::{ClipRef, CoreError, CoreResult, identify::IdentifiedTrack};

use std::{panic::Location, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const USER_AGENT: &str = concat!("set-sleuth/", env!("CARGO_PKG_VERSION"));
const IDENTIFY_PATH: &str = "/api/identify";

/// Result of a successful identify round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    /// The clip matched a known track.
    Match(IdentifiedTrack),
    /// The service answered but recognised nothing. Not a failure.
    NoMatch,
}

/// Submits clips for identification.
#[async_trait]
pub trait Identifier: Send + Sync {
    /// Issue a single identify request for `clip`. Never retries.
    async fn submit(&self, clip: &ClipRef) -> CoreResult<Identification>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdentifyRequest<'a> {
    pub(crate) audio_base64: String,
    pub(crate) audio_format: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdentifyResponse {
    #[serde(default)]
    pub(crate) success: bool,
    #[serde(default)]
    pub(crate) result: Option<IdentifiedTrack>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// Map an HTTP status and body onto an identification outcome.
#[track_caller]
pub(crate) fn classify_response(status: u16, body: &[u8]) -> CoreResult<Identification> {
    if !(200..300).contains(&status) {
        let reason = serde_json::from_slice::<IdentifyResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
        return Err(CoreError::ServerError {
            status: Some(status),
            reason,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let response: IdentifyResponse =
        serde_json::from_slice(body).map_err(|e| CoreError::ServerError {
            status: Some(status),
            reason: format!("Malformed identify response: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    if !response.success {
        return Err(CoreError::ServerError {
            status: Some(status),
            reason: response
                .error
                .unwrap_or_else(|| "Identification failed".to_string()),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(match response.result {
        Some(track) => Identification::Match(track),
        None => Identification::NoMatch,
    })
}

/// HTTP client for the remote identify endpoint.
pub struct FingerprintClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl FingerprintClient {
    /// Creates a client for the service rooted at `base_url`.
    ///
    /// `timeout` is left unset unless explicitly configured, so a hung
    /// request keeps the controller in `Analyzing`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NetworkError`] if the HTTP client cannot be built.
    #[track_caller]
    pub fn new(base_url: &str, timeout: Option<Duration>) -> CoreResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| CoreError::NetworkError {
            reason: format!("Failed to build HTTP client: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self {
            http_client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), IDENTIFY_PATH),
        })
    }

    /// Full URL of the identify endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Identifier for FingerprintClient {
    #[instrument(skip(self, clip), fields(format = %clip.format(), byte_len = clip.bytes().len()))]
    async fn submit(&self, clip: &ClipRef) -> CoreResult<Identification> {
        let request = IdentifyRequest {
            audio_base64: STANDARD.encode(clip.bytes()),
            audio_format: clip.format().tag(),
        };

        debug!(endpoint = %self.endpoint, "Submitting clip for identification");
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::NetworkError {
                reason: e.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| CoreError::NetworkError {
            reason: format!("Failed to read identify response: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let outcome = classify_response(status, &body)?;

        match &outcome {
            Identification::Match(track) => info!(
                title = track.title(),
                artist = track.artist(),
                confidence = track.confidence(),
                duration_ms = start.elapsed().as_millis(),
                "Track identified"
            ),
            Identification::NoMatch => info!(
                duration_ms = start.elapsed().as_millis(),
                "No match for clip"
            ),
        }

        Ok(outcome)
    }
}
