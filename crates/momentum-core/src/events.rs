use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fallback::FallbackTier;
use crate::session::{ExhaustionReason, SessionState};

/// Every session state change produces an event.
/// Callers forward them to their own store or audit sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    SessionCreated {
        session_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        task_ids: Vec<String>,
        /// Set when the playlist came from the fallback cascade
        fallback: Option<FallbackTier>,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session_id: String,
        at: DateTime<Utc>,
    },
    /// Only produced by an explicit user confirmation.
    SessionCompleted {
        session_id: String,
        confirmed_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    SessionExhausted {
        session_id: String,
        at: DateTime<Utc>,
    },
    SessionBlocked {
        session_id: String,
        reason: String,
        at: DateTime<Utc>,
    },
    /// A progress check suggested ending the session; state is unchanged.
    ExhaustionSuggested {
        session_id: String,
        reason: ExhaustionReason,
        at: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::SessionCreated { session_id, .. }
            | SessionEvent::SessionStarted { session_id, .. }
            | SessionEvent::SessionCompleted { session_id, .. }
            | SessionEvent::SessionExhausted { session_id, .. }
            | SessionEvent::SessionBlocked { session_id, .. }
            | SessionEvent::ExhaustionSuggested { session_id, .. } => session_id,
        }
    }

    /// State the session is in after this event, if it changed.
    pub fn resulting_state(&self) -> Option<SessionState> {
        match self {
            SessionEvent::SessionCreated { .. } => Some(SessionState::Planned),
            SessionEvent::SessionStarted { .. } => Some(SessionState::InProgress),
            SessionEvent::SessionCompleted { .. } => Some(SessionState::Completed),
            SessionEvent::SessionExhausted { .. } => Some(SessionState::Exhausted),
            SessionEvent::SessionBlocked { .. } => Some(SessionState::Blocked),
            SessionEvent::ExhaustionSuggested { .. } => None,
        }
    }
}
