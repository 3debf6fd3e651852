use tracing::debug;

/// Other audio producers in the host application.
///
/// Silenced before every capture so in-app playback does not leak into the clip.
pub trait PlaybackControl: Send + Sync {
    /// Stop all in-app audio playback.
    fn silence_others(&self);
}

/// Host without in-app playback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlayback;

impl PlaybackControl for NoPlayback {
    fn silence_others(&self) {
        debug!("No in-app playback to silence");
    }
}
