use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A track recognised by the fingerprinting service.
///
/// Produced only from an identify response and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiedTrack {
    title: String,
    artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    release_date: Option<String>,
    #[serde(default, deserialize_with = "confidence_percent")]
    confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    links: BTreeMap<String, String>,
}

/// Accepts any JSON number and rounds it into 0..=100.
fn confidence_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if raw.is_nan() {
        return Ok(0);
    }
    Ok(raw.round().clamp(0.0, 100.0) as u8)
}

impl IdentifiedTrack {
    /// Creates a track with only the required fields.
    pub fn new(title: impl Into<String>, artist: impl Into<String>, confidence: u8) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: None,
            label: None,
            release_date: None,
            confidence: confidence.min(100),
            duration: None,
            links: BTreeMap::new(),
        }
    }

    /// Track title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Performing artist.
    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// Album, if known.
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    /// Record label, if known.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Release date as reported by the service.
    pub fn release_date(&self) -> Option<&str> {
        self.release_date.as_deref()
    }

    /// Match confidence, 0 to 100.
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    /// Track length in seconds.
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration
    }

    /// Streaming-platform links keyed by platform name.
    pub fn links(&self) -> &BTreeMap<String, String> {
        &self.links
    }
}
