//! Task records consumed by the selection engine.
//!
//! Tasks are value-like snapshots owned by the caller's store. The engine
//! reads them, never keeps references across calls, and never mutates them.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::energy::EnergyLevel;

pub mod pool;

pub use pool::{classify, is_movable, soon_score, Pool, PoolCounts, PoolLimits, TaskPools};

/// Default upper bound (minutes) for a quick-win task.
pub const QUICK_WIN_MINUTES: u32 = 15;

/// Default upper bound (minutes, exclusive) for a micro-task.
pub const MICRO_TASK_MINUTES: u32 = 5;

/// Sum of planned durations, saturating at `u32::MAX`.
pub fn total_minutes<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> u32 {
    tasks
        .into_iter()
        .fold(0u32, |acc, t| acc.saturating_add(t.duration))
}

/// How demanding a task is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    /// Ordinal value used by the effort-balance ratio (low=1, medium=2, high=3).
    pub fn rank(self) -> u8 {
        match self {
            Effort::Low => 1,
            Effort::Medium => 2,
            Effort::High => 3,
        }
    }
}

impl Default for Effort {
    fn default() -> Self {
        Effort::Medium
    }
}

/// How soon the task matters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Medium
    }
}

/// How much completing the task matters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    /// Ordinal value used by the effort-balance ratio (low=1, medium=2, high=3).
    pub fn rank(self) -> u8 {
        match self {
            Impact::Low => 1,
            Impact::Medium => 2,
            Impact::High => 3,
        }
    }
}

impl Default for Impact {
    fn default() -> Self {
        Impact::Medium
    }
}

/// Lifecycle status owned by the caller's store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Active,
    /// Parked (e.g. by a Detox review); not selectable.
    Frozen,
    /// Terminal; never selectable.
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

/// One historical completion of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRecord {
    pub date: DateTime<Utc>,
    /// Minutes actually spent
    pub actual_duration: u32,
    pub energy_at_completion: EnergyLevel,
}

/// A pending unit of work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task title
    pub title: String,
    /// Planned duration in minutes
    pub duration: u32,
    #[serde(default)]
    pub effort: Effort,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub impact: Impact,
    /// Calendar day the task is due
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    /// Fixed clock time; the task then occupies a fixed block
    #[serde(default, with = "crate::clock::optional_hhmm")]
    pub scheduled_time: Option<NaiveTime>,
    /// Free label used for diversity
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub completion_history: Vec<CompletionRecord>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
    /// How many times the task has been proposed in a playlist, when tracked
    #[serde(default)]
    pub times_proposed: Option<u32>,
}

impl Task {
    /// Create a todo task with medium effort, urgency and impact.
    pub fn new(title: impl Into<String>, duration: u32) -> Self {
        Task {
            id: format!("task-{}", uuid::Uuid::new_v4()),
            title: title.into(),
            duration,
            effort: Effort::default(),
            urgency: Urgency::default(),
            impact: Impact::default(),
            deadline: None,
            scheduled_time: None,
            category: String::new(),
            completion_history: Vec::new(),
            created_at: None,
            status: TaskStatus::Todo,
            times_proposed: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_deadline(mut self, deadline: NaiveDate) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_scheduled_time(mut self, time: NaiveTime) -> Self {
        self.scheduled_time = Some(time);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn with_completion(mut self, record: CompletionRecord) -> Self {
        self.completion_history.push(record);
        self
    }

    pub fn with_times_proposed(mut self, count: u32) -> Self {
        self.times_proposed = Some(count);
        self
    }

    /// Done and frozen tasks never enter a playlist.
    pub fn is_selectable(&self) -> bool {
        !matches!(self.status, TaskStatus::Done | TaskStatus::Frozen)
    }

    /// Short, low-effort task that seeds momentum.
    pub fn is_quick_win(&self) -> bool {
        self.is_quick_win_within(QUICK_WIN_MINUTES)
    }

    pub fn is_quick_win_within(&self, max_minutes: u32) -> bool {
        self.effort == Effort::Low && self.duration <= max_minutes
    }

    /// Strictly shorter than the micro-task threshold.
    pub fn is_micro(&self) -> bool {
        self.duration < MICRO_TASK_MINUTES
    }

    /// Has any recorded progress or is currently active.
    pub fn is_started(&self) -> bool {
        self.status == TaskStatus::Active || !self.completion_history.is_empty()
    }

    /// Latest of creation and completion timestamps.
    pub fn last_touched(&self) -> Option<DateTime<Utc>> {
        self.completion_history
            .iter()
            .map(|r| r.date)
            .chain(self.created_at)
            .max()
    }

    /// Mean of actual/planned duration over the history, if any.
    pub fn duration_ratio(&self) -> Option<f64> {
        if self.completion_history.is_empty() || self.duration == 0 {
            return None;
        }
        let planned = self.duration as f64;
        let sum: f64 = self
            .completion_history
            .iter()
            .map(|r| r.actual_duration as f64 / planned)
            .sum();
        Some(sum / self.completion_history.len() as f64)
    }

    /// Historical completion ratio in [0, 1].
    ///
    /// Uses completions over proposals when proposals are tracked; otherwise
    /// falls back to how closely actual durations matched the plan. A task
    /// without history is treated as fully reliable.
    pub fn completion_rate(&self) -> f64 {
        if let Some(proposed) = self.times_proposed.filter(|p| *p > 0) {
            return (self.completion_history.len() as f64 / proposed as f64).min(1.0);
        }
        if self.completion_history.is_empty() || self.duration == 0 {
            return 1.0;
        }
        let planned = self.duration as f64;
        let accuracy: f64 = self
            .completion_history
            .iter()
            .map(|r| (1.0 - (r.actual_duration as f64 / planned - 1.0).abs()).clamp(0.0, 1.0))
            .sum();
        accuracy / self.completion_history.len() as f64
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} min, {:?} effort)", self.title, self.duration, self.effort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(minutes: u32) -> CompletionRecord {
        CompletionRecord {
            date: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
            actual_duration: minutes,
            energy_at_completion: EnergyLevel::Medium,
        }
    }

    #[test]
    fn total_minutes_saturates() {
        let tasks = vec![Task::new("a", u32::MAX), Task::new("b", 10)];
        assert_eq!(total_minutes(&tasks), u32::MAX);
        assert_eq!(total_minutes(&tasks[1..]), 10);
    }

    #[test]
    fn done_and_frozen_are_not_selectable() {
        assert!(Task::new("a", 10).is_selectable());
        assert!(Task::new("a", 10).with_status(TaskStatus::Active).is_selectable());
        assert!(!Task::new("a", 10).with_status(TaskStatus::Done).is_selectable());
        assert!(!Task::new("a", 10).with_status(TaskStatus::Frozen).is_selectable());
    }

    #[test]
    fn quick_win_requires_low_effort_and_short_duration() {
        assert!(Task::new("mail", 15).with_effort(Effort::Low).is_quick_win());
        assert!(!Task::new("mail", 16).with_effort(Effort::Low).is_quick_win());
        assert!(!Task::new("mail", 10).with_effort(Effort::Medium).is_quick_win());
    }

    #[test]
    fn started_means_active_or_has_history() {
        assert!(!Task::new("a", 10).is_started());
        assert!(Task::new("a", 10).with_status(TaskStatus::Active).is_started());
        assert!(Task::new("a", 10).with_completion(record(10)).is_started());
    }

    #[test]
    fn duration_ratio_averages_history() {
        let task = Task::new("a", 20)
            .with_completion(record(10))
            .with_completion(record(30));
        assert!((task.duration_ratio().unwrap() - 1.0).abs() < 1e-9);
        assert!(Task::new("b", 20).duration_ratio().is_none());
    }

    #[test]
    fn completion_rate_prefers_proposal_counts() {
        let task = Task::new("a", 20)
            .with_completion(record(20))
            .with_times_proposed(4);
        assert!((task.completion_rate() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn completion_rate_falls_back_to_duration_accuracy() {
        let exact = Task::new("a", 20).with_completion(record(20));
        assert!((exact.completion_rate() - 1.0).abs() < 1e-9);

        let double = Task::new("b", 20).with_completion(record(40));
        assert!(double.completion_rate().abs() < 1e-9);

        assert_eq!(Task::new("c", 20).completion_rate(), 1.0);
    }

    #[test]
    fn last_touched_takes_latest_timestamp() {
        let created = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let task = Task::new("a", 10).created_at(created).with_completion(record(5));
        assert_eq!(task.last_touched(), Some(created + Duration::days(28) + Duration::hours(1)));
    }

    #[test]
    fn deserializes_minimal_json() {
        let json = r#"{"id":"t1","title":"Write","duration":30,"scheduled_time":"09:15"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.effort, Effort::Medium);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.scheduled_time, NaiveTime::from_hms_opt(9, 15, 0));
    }
}
