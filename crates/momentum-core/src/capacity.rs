//! Cognitive cost and load budgets.
//!
//! A task's cost is `hours × effort factor × stability penalty`. Budgets are
//! plain values: admitting a task returns a new budget plus the decision,
//! leaving the original untouched.

use serde::{Deserialize, Serialize};

use crate::energy::EnergyState;
use crate::task::{Effort, Task};

/// Default daily load ceiling.
pub const DEFAULT_DAILY_MAX_LOAD: f64 = 10.0;

/// Load units granted per hour of session time.
pub const DEFAULT_SESSION_LOAD_PER_HOUR: f64 = 1.5;

const NEAR_EXHAUSTION_RATIO: f64 = 0.4;
const EXHAUSTED_RATIO: f64 = 0.2;
const EPSILON: f64 = 1e-9;

pub fn effort_factor(effort: Effort) -> f64 {
    match effort {
        Effort::Low => 1.0,
        Effort::Medium => 1.5,
        Effort::High => 2.5,
    }
}

/// Cognitive cost of a task under the given energy snapshot.
pub fn task_cost(task: &Task, energy: &EnergyState) -> f64 {
    task.duration as f64 / 60.0 * effort_factor(task.effort) * energy.stability_penalty()
}

/// Sum of costs for a set of tasks.
pub fn total_cost<'a>(tasks: impl IntoIterator<Item = &'a Task>, energy: &EnergyState) -> f64 {
    tasks.into_iter().map(|t| task_cost(t, energy)).sum()
}

/// Budget sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CapacityPolicy {
    pub daily_max_load: f64,
    pub session_load_per_hour: f64,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            daily_max_load: DEFAULT_DAILY_MAX_LOAD,
            session_load_per_hour: DEFAULT_SESSION_LOAD_PER_HOUR,
        }
    }
}

impl CapacityPolicy {
    pub fn daily_budget(&self) -> CapacityBudget {
        CapacityBudget::new(self.daily_max_load)
    }
}

/// Status of a load entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Planned,
    Done,
    /// Released back to the budget
    Dropped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadRecord {
    pub task_id: String,
    pub cost: f64,
    pub status: LoadStatus,
}

/// Result of trying to add a cost to a budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Admission {
    Admitted { remaining: f64 },
    Rejected { needed: f64, remaining: f64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Load ledger with a fixed ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityBudget {
    pub max_load: f64,
    #[serde(default)]
    pub records: Vec<LoadRecord>,
}

impl CapacityBudget {
    pub fn new(max_load: f64) -> Self {
        Self {
            max_load: max_load.max(0.0),
            records: Vec::new(),
        }
    }

    /// Empty budget sized for a whole day.
    pub fn daily() -> Self {
        Self::new(DEFAULT_DAILY_MAX_LOAD)
    }

    /// Budget for a session, capped by what the day still has left.
    pub fn for_session(day: &CapacityBudget, session_minutes: u32, load_per_hour: f64) -> Self {
        let slot_cap = session_minutes as f64 / 60.0 * load_per_hour;
        Self::new(slot_cap.min(day.remaining()))
    }

    pub fn used_load(&self) -> f64 {
        self.records
            .iter()
            .filter(|r| r.status != LoadStatus::Dropped)
            .map(|r| r.cost)
            .sum()
    }

    pub fn remaining(&self) -> f64 {
        (self.max_load - self.used_load()).max(0.0)
    }

    /// Remaining share of the ceiling in [0, 1].
    pub fn remaining_ratio(&self) -> f64 {
        if self.max_load <= 0.0 {
            return 0.0;
        }
        self.remaining() / self.max_load
    }

    pub fn is_near_exhaustion(&self) -> bool {
        self.remaining_ratio() < NEAR_EXHAUSTION_RATIO
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_ratio() < EXHAUSTED_RATIO
    }

    pub fn can_add(&self, cost: f64) -> bool {
        self.remaining() + EPSILON >= cost
    }

    /// Try to add a cost; returns the updated budget and the decision.
    pub fn admit(&self, task_id: impl Into<String>, cost: f64) -> (CapacityBudget, Admission) {
        if !self.can_add(cost) {
            let rejected = Admission::Rejected {
                needed: cost,
                remaining: self.remaining(),
            };
            return (self.clone(), rejected);
        }

        let mut next = self.clone();
        next.records.push(LoadRecord {
            task_id: task_id.into(),
            cost,
            status: LoadStatus::Planned,
        });
        let remaining = next.remaining();
        (next, Admission::Admitted { remaining })
    }

    /// Update the status of every record for a task.
    pub fn settle(&self, task_id: &str, status: LoadStatus) -> CapacityBudget {
        let mut next = self.clone();
        for record in next.records.iter_mut().filter(|r| r.task_id == task_id) {
            record.status = status;
        }
        next
    }
}

impl Default for CapacityBudget {
    fn default() -> Self {
        Self::daily()
    }
}
