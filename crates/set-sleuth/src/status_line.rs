use set_sleuth_core::{ListenMode, SessionSnapshot, SessionState};

/// One human-readable line describing `snapshot`.
pub(crate) fn describe(snapshot: &SessionSnapshot) -> String {
    let mut line = match &snapshot.state {
        SessionState::Idle => "Idle".to_string(),
        SessionState::Recording {
            started_at,
            deadline,
        } => format!(
            "Listening (up to {}s)...",
            deadline.saturating_duration_since(*started_at).as_secs()
        ),
        SessionState::Analyzing { clip } => format!(
            "Analyzing {:.1}s {} clip ({} bytes)...",
            clip.duration.as_secs_f32(),
            clip.format,
            clip.byte_len
        ),
        SessionState::Matched { track } => {
            let mut matched = format!(
                "Matched: {} - {} ({}%)",
                track.artist(),
                track.title(),
                track.confidence()
            );
            if let Some(album) = track.album() {
                matched.push_str(&format!(" from {}", album));
            }
            matched
        }
        SessionState::NoMatch => "No match".to_string(),
        SessionState::Failed { kind } if kind.is_retryable() => {
            format!("Failed: {} (type `retry` to try again)", kind)
        }
        SessionState::Failed { kind } => format!("Failed: {}", kind),
    };

    if snapshot.mode == ListenMode::Continuous {
        if let Some(session) = &snapshot.continuous {
            line.push_str(&format!(" | session: {} tracks", session.len()));
        }
        if snapshot.restart_pending {
            line.push_str(" | listening again shortly");
        }
    }

    line
}
