use crate::IdentifiedTrack;

use std::collections::VecDeque;

use uuid::Uuid;

/// History of one continuous listening run.
///
/// The server id is absent until the registry answers, and stays absent if
/// it never does; the history is kept locally either way.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousSession {
    local_id: Uuid,
    server_id: Option<String>,
    history: VecDeque<IdentifiedTrack>,
}

impl ContinuousSession {
    pub(crate) fn new() -> Self {
        Self {
            local_id: Uuid::new_v4(),
            server_id: None,
            history: VecDeque::new(),
        }
    }

    /// Client-side id used to correlate logs and registry replies.
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    /// Server-assigned id, once the registry has created the session.
    pub fn server_id(&self) -> Option<&str> {
        self.server_id.as_deref()
    }

    /// Identified tracks, most recent first.
    pub fn history(&self) -> &VecDeque<IdentifiedTrack> {
        &self.history
    }

    /// Number of matches recorded.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether nothing has been matched yet.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub(crate) fn attach_server_id(&mut self, id: String) {
        self.server_id = Some(id);
    }

    pub(crate) fn record(&mut self, track: IdentifiedTrack) {
        self.history.push_front(track);
    }
}
