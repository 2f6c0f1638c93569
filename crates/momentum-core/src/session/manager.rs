use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{check_progress, ExhaustionSuggestion, Session, SessionAction, SessionState};
use crate::capacity::CapacityBudget;
use crate::energy::EnergyState;
use crate::error::{Result, ValidationError};
use crate::events::SessionEvent;
use crate::fallback::{run_cascade, FallbackContext};
use crate::invariants::{validate_playlist, ValidationOutcome};
use crate::playlist::PlaylistSource;
use crate::selector::{generate_playlist, PlaylistRequest};
use crate::storage::EngineConfig;
use crate::task::Task;
use crate::timeline::{fixed_blocks, free_slots, FreeSlot, TimeConstraints};
use crate::trace::DecisionTrace;

/// Inputs for creating a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub tasks: Vec<Task>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Reported energy; predicted from the slot's hour when absent
    pub energy: Option<EnergyState>,
    /// The day's ledger; the session ceiling is carved out of it
    pub day_budget: CapacityBudget,
    pub recent_categories: Vec<String>,
    pub detox_days_above: Option<u32>,
    pub proceed_anyway: bool,
}

impl SessionRequest {
    pub fn new(tasks: Vec<Task>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            tasks,
            start,
            end,
            energy: None,
            day_budget: CapacityBudget::daily(),
            recent_categories: Vec::new(),
            detox_days_above: None,
            proceed_anyway: false,
        }
    }

    pub fn with_energy(mut self, energy: EnergyState) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_day_budget(mut self, budget: CapacityBudget) -> Self {
        self.day_budget = budget;
        self
    }
}

/// A freshly created session with its decision record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionPlan {
    pub session: Session,
    pub event: SessionEvent,
    /// Session ledger with the playlist admitted
    pub budget: CapacityBudget,
    pub trace: DecisionTrace,
}

/// Creates sessions and drives their transitions under one configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    config: EngineConfig,
}

impl SessionManager {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bind a playlist to a time slot.
    ///
    /// The playlist is built for the slot's predicted energy, bounded by its
    /// free minutes and its share of the day's capacity, then re-validated
    /// against the slot ceiling. A playlist that fails validation is replaced
    /// by the fallback cascade; creation itself never fails on rule
    /// violations.
    ///
    /// # Errors
    ///
    /// Returns an error when the slot is empty or inverted, the energy
    /// snapshot is malformed, or the configured day window is invalid.
    pub fn create(&self, request: &SessionRequest) -> Result<SessionPlan> {
        if request.end <= request.start {
            return Err(ValidationError::InvalidTimeRange {
                start: request.start,
                end: request.end,
            }
            .into());
        }
        let config = &self.config;
        let duration_minutes = (request.end - request.start).num_minutes().max(0) as u32;
        let day = request.start.date_naive();

        let energy = match request.energy {
            Some(energy) => energy,
            None => config.energy.predict(request.start.hour() as u8),
        };

        // Scheduled tasks inside the slot are fixed; later ones keep their own slot.
        let blocks = fixed_blocks(&request.tasks, day);
        let inside: Vec<_> = blocks
            .iter()
            .filter(|b| b.overlaps(request.start, request.end))
            .cloned()
            .collect();
        let fixed_tasks: Vec<Task> = request
            .tasks
            .iter()
            .filter(|t| inside.iter().any(|b| b.task_id == t.id))
            .cloned()
            .collect();
        let gaps = free_slots(&inside, request.start, request.end, config.day.buffer());
        let free_minutes: u32 = gaps.iter().map(FreeSlot::duration_minutes).sum();
        // A task cannot straddle a fixed block, so it must fit one gap.
        let largest_gap = gaps.iter().map(FreeSlot::duration_minutes).max().unwrap_or(0);
        let candidates: Vec<Task> = request
            .tasks
            .iter()
            .filter(|t| {
                !blocks
                    .iter()
                    .any(|b| b.task_id == t.id && b.end > request.start)
            })
            .filter(|t| t.duration <= largest_gap)
            .cloned()
            .collect();

        let day_plan = TimeConstraints::for_day(&request.tasks, day, &config.day)?;
        let available = day_plan.remaining_minutes(request.start).max(free_minutes);

        let budget = CapacityBudget::for_session(
            &request.day_budget,
            duration_minutes,
            config.capacity.session_load_per_hour,
        );
        let ceiling = budget.remaining();

        let mut builder = PlaylistRequest::builder()
            .tasks(candidates.clone())
            .energy(energy)
            .now(request.start)
            .budget(budget)
            .session_minutes(free_minutes)
            .available_minutes(available)
            .recent_categories(request.recent_categories.clone())
            .proceed_anyway(request.proceed_anyway);
        if let Some(days) = request.detox_days_above {
            builder = builder.detox_days_above(days);
        }
        let mut outcome = generate_playlist(&builder.build()?, config);

        if outcome.playlist.source == PlaylistSource::Selector {
            let checked = validate_playlist(outcome.playlist.clone(), &energy, ceiling, &config.selection);
            if let ValidationOutcome::Invalid {
                invalid_invariants, ..
            } = checked
            {
                let eligible: Vec<Task> = candidates
                    .iter()
                    .filter(|t| outcome.trace.eligible.contains(&t.id))
                    .cloned()
                    .collect();
                let ctx = FallbackContext {
                    candidates: &eligible,
                    energy: &energy,
                    ceiling,
                    time_limit: Some(free_minutes),
                    now: request.start,
                    failed: &invalid_invariants,
                    empty_selection: false,
                    triage: outcome.trace.load.as_ref().and_then(|l| l.triage.as_ref()),
                    limits: &config.selection,
                    survival_cap: config.triage.survival_cap,
                };
                let substitute = run_cascade(&ctx);
                tracing::info!(
                    invalid = ?invalid_invariants,
                    "session playlist failed validation; using fallback"
                );
                if let PlaylistSource::Fallback(tier) = substitute.source {
                    outcome.trace.fallback = Some(tier);
                }
                outcome.playlist = substitute;
            }
        }

        let session = Session {
            id: format!("session-{}", uuid::Uuid::new_v4()),
            start: request.start,
            end: request.end,
            state: SessionState::Planned,
            playlist: outcome.playlist,
            predicted_energy: energy,
            fixed_tasks,
            duration_minutes,
            blocked_reason: None,
        };
        let event = SessionEvent::SessionCreated {
            session_id: session.id.clone(),
            start: session.start,
            end: session.end,
            task_ids: session.task_ids().into_iter().map(String::from).collect(),
            fallback: outcome.trace.fallback,
            at: request.start,
        };
        tracing::info!(
            session = %session.id,
            tasks = session.playlist.len(),
            free_minutes,
            "session created"
        );

        Ok(SessionPlan {
            session,
            event,
            budget: outcome.budget,
            trace: outcome.trace,
        })
    }

    /// Apply a caller action to a session.
    ///
    /// # Errors
    ///
    /// Returns an error when the action is illegal in the session's state.
    pub fn transition(
        &self,
        session: &Session,
        action: SessionAction,
        at: DateTime<Utc>,
    ) -> Result<(Session, SessionEvent)> {
        Ok(session.apply(action, at)?)
    }

    pub fn check_progress(
        &self,
        session: &Session,
        now: DateTime<Utc>,
        done_task_ids: &[String],
    ) -> Option<ExhaustionSuggestion> {
        check_progress(session, now, done_task_ids)
    }
}
