//! In-memory progress tracking for long-running analyses

use crate::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Progress snapshot for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Last completed step (0 = just started)
    pub current_step: usize,

    /// Total steps planned for this run
    pub total_steps: usize,

    /// Human-readable description of the current phase
    pub message: String,

    /// When tracking started
    pub started_at: DateTime<Utc>,

    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    /// Completion percentage, clamped to 100
    pub fn percent(&self) -> u8 {
        if self.total_steps == 0 {
            return 100;
        }
        let pct = self.current_step * 100 / self.total_steps;
        pct.min(100) as u8
    }
}

/// Tracks progress for concurrent sessions
///
/// Plain `RwLock` is enough here: updates are rare (one per workflow
/// phase) and readers only poll.
#[derive(Default)]
pub struct ProgressTracker {
    entries: RwLock<HashMap<SessionId, Progress>>,
}

impl ProgressTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin tracking a session
    pub fn start(&self, session: &SessionId, total_steps: usize) {
        let now = Utc::now();
        let progress = Progress {
            current_step: 0,
            total_steps,
            message: "started".to_string(),
            started_at: now,
            updated_at: now,
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(session.clone(), progress);
        }
    }

    /// Record a completed step
    pub fn update(&self, session: &SessionId, step: usize, message: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write()
            && let Some(progress) = entries.get_mut(session)
        {
            progress.current_step = step;
            progress.message = message.into();
            progress.updated_at = Utc::now();
        }
    }

    /// Mark a session finished
    pub fn complete(&self, session: &SessionId) {
        if let Ok(mut entries) = self.entries.write()
            && let Some(progress) = entries.get_mut(session)
        {
            progress.current_step = progress.total_steps;
            progress.message = "completed".to_string();
            progress.updated_at = Utc::now();
        }
    }

    /// Current snapshot for a session, if tracked
    pub fn get(&self, session: &SessionId) -> Option<Progress> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(session).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_lifecycle() {
        let tracker = ProgressTracker::new();
        let session = SessionId::generate();

        assert!(tracker.get(&session).is_none());

        tracker.start(&session, 4);
        let progress = tracker.get(&session).unwrap();
        assert_eq!(progress.current_step, 0);
        assert_eq!(progress.percent(), 0);

        tracker.update(&session, 2, "synthesizing");
        let progress = tracker.get(&session).unwrap();
        assert_eq!(progress.current_step, 2);
        assert_eq!(progress.message, "synthesizing");
        assert_eq!(progress.percent(), 50);

        tracker.complete(&session);
        let progress = tracker.get(&session).unwrap();
        assert_eq!(progress.percent(), 100);
        assert_eq!(progress.message, "completed");
    }

    #[test]
    fn test_update_unknown_session_is_noop() {
        let tracker = ProgressTracker::new();
        let session = SessionId::generate();
        tracker.update(&session, 1, "ignored");
        assert!(tracker.get(&session).is_none());
    }

    #[test]
    fn test_percent_with_zero_total() {
        let progress = Progress {
            current_step: 0,
            total_steps: 0,
            message: String::new(),
            started_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(progress.percent(), 100);
    }
}
