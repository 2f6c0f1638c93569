//! Sessions and their state machine.
//!
//! ## State Transitions
//!
//! ```text
//! Planned -> InProgress -> (Completed | Exhausted | Blocked)
//! Planned -> Blocked
//! ```
//!
//! `Completed` is reachable only through [`SessionAction::Complete`], which
//! carries an explicit [`UserConfirmation`]. Elapsed time or finished tasks
//! never complete a session; [`check_progress`] can only suggest `Exhausted`.
//!
//! Transitions take a session by reference and return a new one, so callers
//! own storage and serialization of concurrent updates.

mod manager;

pub use manager::{SessionManager, SessionPlan, SessionRequest};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::energy::EnergyState;
use crate::error::SessionTransitionError;
use crate::events::SessionEvent;
use crate::playlist::Playlist;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Planned,
    InProgress,
    Completed,
    Exhausted,
    /// An external constraint prevents the session from going ahead.
    Blocked,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Planned => "PLANNED",
            SessionState::InProgress => "IN_PROGRESS",
            SessionState::Completed => "COMPLETED",
            SessionState::Exhausted => "EXHAUSTED",
            SessionState::Blocked => "BLOCKED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Exhausted | SessionState::Blocked
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof that the user explicitly confirmed completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfirmation {
    pub confirmed_at: DateTime<Utc>,
}

impl UserConfirmation {
    pub fn new(confirmed_at: DateTime<Utc>) -> Self {
        Self { confirmed_at }
    }
}

/// Caller-driven session events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionAction {
    Start,
    Complete { confirmation: UserConfirmation },
    Exhaust,
    Block { reason: String },
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            SessionAction::Start => "start",
            SessionAction::Complete { .. } => "complete",
            SessionAction::Exhaust => "exhaust",
            SessionAction::Block { .. } => "block",
        }
    }
}

/// A playlist bound to a time slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub state: SessionState,
    pub playlist: Playlist,
    pub predicted_energy: EnergyState,
    /// Scheduled tasks occupying part of the slot
    #[serde(default)]
    pub fixed_tasks: Vec<Task>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub blocked_reason: Option<String>,
}

impl Session {
    /// Apply an action, returning the next session and its event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionTransitionError`] when the action is not legal in the
    /// current state. The session is never coerced into another state.
    pub fn apply(
        &self,
        action: SessionAction,
        at: DateTime<Utc>,
    ) -> Result<(Session, SessionEvent), SessionTransitionError> {
        let illegal = || SessionTransitionError {
            from: self.state,
            event: action.name(),
        };
        let session_id = self.id.clone();

        let (state, event, blocked_reason) = match (&action, self.state) {
            (SessionAction::Start, SessionState::Planned) => (
                SessionState::InProgress,
                SessionEvent::SessionStarted { session_id, at },
                None,
            ),
            (SessionAction::Complete { confirmation }, SessionState::InProgress) => (
                SessionState::Completed,
                SessionEvent::SessionCompleted {
                    session_id,
                    confirmed_at: confirmation.confirmed_at,
                    at,
                },
                None,
            ),
            (SessionAction::Exhaust, SessionState::InProgress) => (
                SessionState::Exhausted,
                SessionEvent::SessionExhausted { session_id, at },
                None,
            ),
            (SessionAction::Block { reason }, SessionState::Planned | SessionState::InProgress) => (
                SessionState::Blocked,
                SessionEvent::SessionBlocked {
                    session_id,
                    reason: reason.clone(),
                    at,
                },
                Some(reason.clone()),
            ),
            _ => return Err(illegal()),
        };

        tracing::info!(session = %self.id, from = %self.state, to = %state, "session transition");
        let next = Session {
            state,
            blocked_reason,
            ..self.clone()
        };
        Ok((next, event))
    }

    pub fn start(&self, at: DateTime<Utc>) -> Result<(Session, SessionEvent), SessionTransitionError> {
        self.apply(SessionAction::Start, at)
    }

    pub fn complete(
        &self,
        confirmation: UserConfirmation,
        at: DateTime<Utc>,
    ) -> Result<(Session, SessionEvent), SessionTransitionError> {
        self.apply(SessionAction::Complete { confirmation }, at)
    }

    pub fn exhaust(&self, at: DateTime<Utc>) -> Result<(Session, SessionEvent), SessionTransitionError> {
        self.apply(SessionAction::Exhaust, at)
    }

    pub fn block(
        &self,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(Session, SessionEvent), SessionTransitionError> {
        self.apply(
            SessionAction::Block {
                reason: reason.into(),
            },
            at,
        )
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.playlist.task_ids()
    }
}

/// Why a progress check suggests ending a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionReason {
    TimeElapsed,
    AllTasksDone,
}

/// Non-binding suggestion to move a session to `Exhausted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustionSuggestion {
    pub session_id: String,
    pub reason: ExhaustionReason,
    pub suggested_state: SessionState,
    pub message: String,
    pub event: SessionEvent,
}

/// Inspect an in-progress session; never changes its state.
pub fn check_progress(
    session: &Session,
    now: DateTime<Utc>,
    done_task_ids: &[String],
) -> Option<ExhaustionSuggestion> {
    if session.state != SessionState::InProgress {
        return None;
    }

    let all_done = !session.playlist.is_empty()
        && session
            .playlist
            .tasks
            .iter()
            .all(|t| done_task_ids.contains(&t.id));

    let (reason, message) = if all_done {
        (
            ExhaustionReason::AllTasksDone,
            "Every task in this session is done. Confirm to close it, or keep going.",
        )
    } else if now >= session.end {
        (
            ExhaustionReason::TimeElapsed,
            "The planned time is up. Confirm to close the session when you are ready.",
        )
    } else {
        return None;
    };

    Some(ExhaustionSuggestion {
        session_id: session.id.clone(),
        reason,
        suggested_state: SessionState::Exhausted,
        message: message.to_string(),
        event: SessionEvent::ExhaustionSuggested {
            session_id: session.id.clone(),
            reason,
            at: now,
        },
    })
}
