//! Temporal priority pools.
//!
//! Every selectable task lands in exactly one pool, derived from its deadline
//! and scheduled time against a reference instant. Pools are recomputed per
//! decision and never stored.
//!
//! Golden rule: while OVERDUE or TODAY holds anything, SOON and AVAILABLE are
//! invisible to selection.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::{Impact, Task, Urgency};
use crate::clock;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pool {
    Overdue,
    Today,
    Soon,
    Available,
}

/// Pool size limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolLimits {
    pub soon_cap: usize,
    pub available_cap: usize,
    /// Last day (inclusive) that still counts as SOON
    pub soon_horizon_days: i64,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            soon_cap: 3,
            available_cap: 10,
            soon_horizon_days: 7,
        }
    }
}

/// Classify a task against `now`.
///
/// Only the deadline places a task in time; a scheduled time without a
/// deadline leaves it AVAILABLE.
pub fn classify(task: &Task, now: DateTime<Utc>, limits: &PoolLimits) -> Pool {
    let today = now.date_naive();
    let Some(due) = task.deadline else {
        return Pool::Available;
    };

    if due < today {
        return Pool::Overdue;
    }

    if due == today {
        if let Some(time) = task.scheduled_time {
            if now - clock::at(today, time) >= Duration::minutes(1) {
                return Pool::Overdue;
            }
        }
        return Pool::Today;
    }

    let days_until = (due - today).num_days();
    if (2..=limits.soon_horizon_days).contains(&days_until) {
        Pool::Soon
    } else {
        Pool::Available
    }
}

/// A scheduled task is a fixed block, not a playlist candidate, until its
/// slot has been missed.
pub fn is_movable(task: &Task, now: DateTime<Utc>, limits: &PoolLimits) -> bool {
    task.scheduled_time.is_none() || classify(task, now, limits) == Pool::Overdue
}

/// Ranking score for the SOON pool, floored at 0.1.
pub fn soon_score(task: &Task, today: NaiveDate) -> f64 {
    let urgency_bonus = match task.urgency {
        Urgency::Urgent => 0.3,
        Urgency::High => 0.2,
        Urgency::Medium => 0.1,
        Urgency::Low => 0.0,
    };
    let impact_bonus = match task.impact {
        Impact::High => 0.2,
        Impact::Medium => 0.1,
        Impact::Low => 0.0,
    };
    let days_beyond = task
        .deadline
        .map(|d| ((d - today).num_days() - 2).max(0))
        .unwrap_or(0);

    (0.5 + urgency_bonus + impact_bonus - 0.1 * days_beyond as f64).max(0.1)
}

fn by_soon_score(today: NaiveDate) -> impl Fn(&Task, &Task) -> Ordering {
    move |a, b| {
        soon_score(b, today)
            .partial_cmp(&soon_score(a, today))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Number of tasks in each pool.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolCounts {
    pub overdue: usize,
    pub today: usize,
    pub soon: usize,
    pub available: usize,
    /// SOON tasks pushed down to AVAILABLE by the cap
    pub demoted: usize,
    /// AVAILABLE tasks hidden by the cap
    pub trimmed: usize,
}

/// Selectable tasks bucketed into pools, with caps applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPools {
    pub overdue: Vec<Task>,
    pub today: Vec<Task>,
    pub soon: Vec<Task>,
    pub available: Vec<Task>,
    demoted: usize,
    trimmed: usize,
}

impl TaskPools {
    /// Bucket every selectable task and apply the SOON and AVAILABLE caps.
    pub fn build(tasks: &[Task], now: DateTime<Utc>, limits: &PoolLimits) -> Self {
        let today = now.date_naive();
        let mut pools = TaskPools::default();

        for task in tasks.iter().filter(|t| t.is_selectable()) {
            let bucket = match classify(task, now, limits) {
                Pool::Overdue => &mut pools.overdue,
                Pool::Today => &mut pools.today,
                Pool::Soon => &mut pools.soon,
                Pool::Available => &mut pools.available,
            };
            bucket.push(task.clone());
        }

        pools.soon.sort_by(by_soon_score(today));
        if pools.soon.len() > limits.soon_cap {
            let demoted = pools.soon.split_off(limits.soon_cap);
            pools.demoted = demoted.len();
            pools.available.extend(demoted);
        }

        // Most recently touched first; untouched tasks go last.
        pools.available.sort_by(|a, b| {
            b.last_touched()
                .cmp(&a.last_touched())
                .then_with(|| a.id.cmp(&b.id))
        });
        if pools.available.len() > limits.available_cap {
            pools.trimmed = pools.available.len() - limits.available_cap;
            pools.available.truncate(limits.available_cap);
        }

        pools
    }

    /// OVERDUE or TODAY is non-empty.
    pub fn has_pressing(&self) -> bool {
        !self.overdue.is_empty() || !self.today.is_empty()
    }

    /// Tasks visible to selection under the golden rule, tagged with their pool.
    pub fn visible(&self) -> Vec<(Pool, &Task)> {
        let (first, second) = if self.has_pressing() {
            ((Pool::Overdue, &self.overdue), (Pool::Today, &self.today))
        } else {
            ((Pool::Soon, &self.soon), (Pool::Available, &self.available))
        };
        [first, second]
            .into_iter()
            .flat_map(|(pool, tasks)| tasks.iter().map(move |t| (pool, t)))
            .collect()
    }

    /// Keep at most `cap` TODAY tasks, highest SOON-style score first.
    pub fn cap_today(&mut self, cap: usize, today: NaiveDate) {
        self.today.sort_by(by_soon_score(today));
        self.today.truncate(cap);
    }

    /// Drop every SOON task from view.
    pub fn freeze_soon(&mut self) {
        self.soon.clear();
    }

    pub fn counts(&self) -> PoolCounts {
        PoolCounts {
            overdue: self.overdue.len(),
            today: self.today.len(),
            soon: self.soon.len(),
            available: self.available.len(),
            demoted: self.demoted,
            trimmed: self.trimmed,
        }
    }
}
