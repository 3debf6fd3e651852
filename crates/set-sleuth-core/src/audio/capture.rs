use crate::{
    CoreError, CoreResult,
    audio::{AudioFormat, RecordedFile, Recorder},
};

use std::{
    fmt,
    panic::Location,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use error_location::ErrorLocation;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Owns the lifecycle of one recording at a time.
///
/// The microphone is exclusive: while a [`RecordingHandle`] is alive every
/// other `start` is refused with [`CoreError::CaptureBusy`].
pub struct AudioCapture {
    recorder: Arc<dyn Recorder>,
    max_duration: Duration,
    live: Arc<AtomicBool>,
}

/// Proof of a live recording. Consumed by [`AudioCapture::finish`] or
/// [`AudioCapture::abort`], so a recording can be finished at most once.
pub struct RecordingHandle {
    started_at: Instant,
    deadline: Instant,
    _lease: CaptureLease,
}

impl RecordingHandle {
    /// When `start` was called.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// When the recording must be auto-finished.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

impl fmt::Debug for RecordingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingHandle")
            .field("started_at", &self.started_at)
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Releases the exclusive capture slot when dropped.
struct CaptureLease(Arc<AtomicBool>);

impl Drop for CaptureLease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Summary of a captured clip, cheap to clone into UI-facing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipInfo {
    /// Encoding of the clip.
    pub format: AudioFormat,
    /// Encoded size.
    pub byte_len: usize,
    /// Recorded length.
    pub duration: Duration,
}

/// An encoded clip ready for submission.
///
/// The temporary file backing the clip is deleted exactly once, when the
/// `ClipRef` is dropped.
pub struct ClipRef {
    bytes: Vec<u8>,
    format: AudioFormat,
    duration: Duration,
    _disposal: ClipDisposal,
}

impl ClipRef {
    /// Encoded clip bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoding of the clip.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Recorded length.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Cloneable summary of this clip.
    pub fn info(&self) -> ClipInfo {
        ClipInfo {
            format: self.format.clone(),
            byte_len: self.bytes.len(),
            duration: self.duration,
        }
    }
}

impl fmt::Debug for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipRef")
            .field("format", &self.format)
            .field("byte_len", &self.bytes.len())
            .field("duration", &self.duration)
            .finish()
    }
}

/// Deletes the temporary clip file on drop.
struct ClipDisposal {
    recorder: Arc<dyn Recorder>,
    file: Option<RecordedFile>,
}

impl ClipDisposal {
    fn new(recorder: Arc<dyn Recorder>, file: RecordedFile) -> Self {
        Self {
            recorder,
            file: Some(file),
        }
    }
}

impl Drop for ClipDisposal {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            match self.recorder.discard(&file) {
                Ok(()) => debug!(path = ?file.path, "Temporary clip deleted"),
                Err(e) => warn!(path = ?file.path, error = ?e, "Failed to delete temporary clip"),
            }
        }
    }
}

impl AudioCapture {
    /// Creates a capture driving `recorder` with a hard `max_duration`.
    pub fn new(recorder: Arc<dyn Recorder>, max_duration: Duration) -> Self {
        Self {
            recorder,
            max_duration,
            live: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Configured upper bound for one recording.
    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Whether a recording handle is currently alive.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Starts recording. The deadline is measured from this call.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CaptureBusy`] while another handle is alive, or
    /// the recorder's error if the stream cannot be started.
    #[instrument(skip(self))]
    pub async fn start(&self) -> CoreResult<RecordingHandle> {
        let started_at = Instant::now();

        if self
            .live
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CoreError::CaptureBusy {
                location: ErrorLocation::from(Location::caller()),
            });
        }

        // Dropping the lease on the error path frees the slot again.
        let lease = CaptureLease(Arc::clone(&self.live));
        self.recorder.start().await?;

        let deadline = started_at + self.max_duration;
        info!(
            max_duration_ms = self.max_duration.as_millis(),
            "Audio capture started"
        );

        Ok(RecordingHandle {
            started_at,
            deadline,
            _lease: lease,
        })
    }

    /// Stops the recording and reads the encoded clip.
    ///
    /// Safe to call after the recorder already stopped on its own.
    ///
    /// # Errors
    ///
    /// Returns error if the recorder cannot stop or the clip cannot be read.
    /// The temporary file is deleted on every path once it exists.
    #[instrument(skip(self, handle))]
    pub async fn finish(&self, handle: RecordingHandle) -> CoreResult<ClipRef> {
        let file = self.recorder.stop().await?;
        let elapsed = handle.started_at.elapsed().min(self.max_duration);
        drop(handle);

        let disposal = ClipDisposal::new(Arc::clone(&self.recorder), file.clone());
        let bytes = self.recorder.read(&file).await?;

        if bytes.is_empty() {
            return Err(CoreError::RecordingFailed {
                reason: "Captured clip is empty".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        info!(
            format = %file.format,
            byte_len = bytes.len(),
            duration_ms = elapsed.as_millis(),
            "Audio capture finished"
        );

        Ok(ClipRef {
            bytes,
            format: file.format,
            duration: elapsed,
            _disposal: disposal,
        })
    }

    /// Stops the recording and deletes anything it produced.
    #[instrument(skip(self, handle))]
    pub async fn abort(&self, handle: RecordingHandle) {
        match self.recorder.stop().await {
            Ok(file) => drop(ClipDisposal::new(Arc::clone(&self.recorder), file)),
            Err(e) => warn!(error = ?e, "Failed to stop recorder during abort"),
        }
        drop(handle);

        info!("Audio capture aborted");
    }
}
