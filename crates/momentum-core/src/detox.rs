//! Backlog staleness (Task Age Index) and the Detox friction ladder.
//!
//! ## Escalation
//!
//! | TAI / consecutive days above threshold | Phase | Effect |
//! |-----------------------------------------|-------|--------|
//! | TAI ≤ threshold | None | nothing |
//! | 0 days | Warning | soft notice |
//! | 1-2 days | Suggestion | recommend a review |
//! | ≥ 3 days | Block | SOON frozen, TODAY capped, new tasks need review |
//!
//! Detox only adds friction. Every phase can be bypassed by the caller
//! (`proceed_anyway`); the engine returns a label and recommendations, never
//! a refusal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::task::Task;

/// Detox thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetoxPolicy {
    /// TAI (days) above which the ladder engages
    pub tai_threshold: f64,
    /// Consecutive days above threshold that trigger Block
    pub block_after_days: u32,
    /// TODAY pool cap while blocked
    pub blocked_today_cap: usize,
}

impl Default for DetoxPolicy {
    fn default() -> Self {
        Self {
            tai_threshold: 2.0,
            block_after_days: 3,
            blocked_today_cap: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetoxPhase {
    None,
    Warning,
    Suggestion,
    Block,
}

/// Mean age in days of tasks with a known creation date; 0 when none.
pub fn task_age_index(tasks: &[Task], now: DateTime<Utc>) -> f64 {
    let ages: Vec<f64> = tasks
        .iter()
        .filter_map(|t| t.created_at)
        .map(|created| (now - created).num_seconds().max(0) as f64 / 86_400.0)
        .collect();

    if ages.is_empty() {
        return 0.0;
    }
    ages.iter().sum::<f64>() / ages.len() as f64
}

/// Ladder position for a TAI and a streak of days above threshold.
pub fn detox_phase(tai: f64, consecutive_days_above: u32, policy: &DetoxPolicy) -> DetoxPhase {
    if tai <= policy.tai_threshold {
        return DetoxPhase::None;
    }
    match consecutive_days_above {
        0 => DetoxPhase::Warning,
        d if d < policy.block_after_days => DetoxPhase::Suggestion,
        _ => DetoxPhase::Block,
    }
}

/// Recommended restrictions for a phase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DetoxRestrictions {
    pub freeze_soon: bool,
    pub today_cap: Option<usize>,
    pub review_new_tasks: bool,
}

/// Gate for adding a new task to the backlog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewTaskGate {
    Allowed,
    /// Adding is still possible; a review is recommended first.
    ReviewRecommended,
}

/// Outcome of a Detox evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetoxAssessment {
    pub tai: f64,
    pub consecutive_days_above: u32,
    pub phase: DetoxPhase,
    pub restrictions: DetoxRestrictions,
    /// Always true: every phase has a "proceed anyway" path.
    pub proceed_anyway_available: bool,
    pub message: Option<String>,
}

impl DetoxAssessment {
    pub fn new(tai: f64, consecutive_days_above: u32, policy: &DetoxPolicy) -> Self {
        let phase = detox_phase(tai, consecutive_days_above, policy);
        let (restrictions, message) = match phase {
            DetoxPhase::None => (DetoxRestrictions::default(), None),
            DetoxPhase::Warning => (
                DetoxRestrictions::default(),
                Some(format!("Your backlog is aging (average {tai:.1} days).")),
            ),
            DetoxPhase::Suggestion => (
                DetoxRestrictions::default(),
                Some("A short backlog review could lighten things up.".to_string()),
            ),
            DetoxPhase::Block => (
                DetoxRestrictions {
                    freeze_soon: true,
                    today_cap: Some(policy.blocked_today_cap),
                    review_new_tasks: true,
                },
                Some(
                    "Backlog review recommended: upcoming tasks are paused until then. \
                     You can proceed anyway."
                        .to_string(),
                ),
            ),
        };

        Self {
            tai,
            consecutive_days_above,
            phase,
            restrictions,
            proceed_anyway_available: true,
            message,
        }
    }

    pub fn new_task_gate(&self) -> NewTaskGate {
        if self.restrictions.review_new_tasks {
            NewTaskGate::ReviewRecommended
        } else {
            NewTaskGate::Allowed
        }
    }
}

/// Assess a task set directly.
pub fn assess(
    tasks: &[Task],
    now: DateTime<Utc>,
    consecutive_days_above: u32,
    policy: &DetoxPolicy,
) -> DetoxAssessment {
    DetoxAssessment::new(task_age_index(tasks, now), consecutive_days_above, policy)
}

/// Day-over-day streak of TAI above threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetoxTracker {
    /// First day of the current above-threshold streak
    pub above_since: Option<NaiveDate>,
    pub last_evaluated: Option<NaiveDate>,
}

impl DetoxTracker {
    /// Fold one daily observation into the streak.
    ///
    /// Re-evaluating the same day keeps the streak; skipping a day restarts it.
    pub fn evaluate(
        &self,
        tai: f64,
        day: NaiveDate,
        policy: &DetoxPolicy,
    ) -> (DetoxTracker, DetoxAssessment) {
        let above = tai > policy.tai_threshold;
        let contiguous = self
            .last_evaluated
            .map(|last| (0..=1).contains(&(day - last).num_days()))
            .unwrap_or(false);

        let above_since = match (above, self.above_since) {
            (false, _) => None,
            (true, Some(since)) if contiguous => Some(since),
            (true, _) => Some(day),
        };

        let next = DetoxTracker {
            above_since,
            last_evaluated: Some(day),
        };
        let assessment = DetoxAssessment::new(tai, next.consecutive_days_above(day), policy);
        (next, assessment)
    }

    /// Whole days elapsed since the streak began.
    pub fn consecutive_days_above(&self, day: NaiveDate) -> u32 {
        self.above_since
            .map(|since| (day - since).num_days().max(0) as u32)
            .unwrap_or(0)
    }
}
