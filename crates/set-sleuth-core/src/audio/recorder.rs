use crate::CoreResult;

use std::{fmt, path::PathBuf};

use async_trait::async_trait;

/// Codec tag sent alongside a clip so the identify endpoint can decode it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    /// AAC in an MPEG-4 audio container.
    M4a,
    /// MPEG-4 container.
    Mp4,
    /// Uncompressed RIFF/WAVE.
    Wav,
    /// Any other codec tag, passed through verbatim.
    Other(String),
}

impl AudioFormat {
    /// Wire tag for this format.
    pub fn tag(&self) -> &str {
        match self {
            AudioFormat::M4a => "m4a",
            AudioFormat::Mp4 => "mp4",
            AudioFormat::Wav => "wav",
            AudioFormat::Other(tag) => tag,
        }
    }

    /// Parse a wire tag or file extension (case-insensitive, leading dot allowed).
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim_start_matches('.').to_ascii_lowercase();
        match tag.as_str() {
            "m4a" => AudioFormat::M4a,
            "mp4" => AudioFormat::Mp4,
            "wav" => AudioFormat::Wav,
            _ => AudioFormat::Other(tag),
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Location of a finished recording in temporary storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFile {
    /// Path of the temporary clip file.
    pub path: PathBuf,
    /// Encoding of the file.
    pub format: AudioFormat,
}

/// Platform recording capability driven by [`AudioCapture`](crate::AudioCapture).
///
/// Implementations own the hardware stream and the temporary clip file.
/// `stop` must be idempotent: calling it after the stream already stopped
/// returns the same file again.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Begin capturing from the microphone.
    async fn start(&self) -> CoreResult<()>;

    /// Stop capturing and return the file holding the encoded clip.
    async fn stop(&self) -> CoreResult<RecordedFile>;

    /// Read the encoded clip bytes.
    async fn read(&self, file: &RecordedFile) -> CoreResult<Vec<u8>>;

    /// Delete the temporary clip file.
    fn discard(&self, file: &RecordedFile) -> CoreResult<()>;
}
