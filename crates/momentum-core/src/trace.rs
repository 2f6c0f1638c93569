//! Replayable record of a selection decision.
//!
//! The engine never writes the trace anywhere; callers hand it to their own
//! audit sink after the decision completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deadline::LoadAssessment;
use crate::detox::DetoxAssessment;
use crate::fallback::FallbackTier;
use crate::invariants::InvariantReport;
use crate::scoring::ScoredTask;
use crate::task::PoolCounts;

/// Why a candidate was left out of the playlist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    CountLimit,
    EnergyMismatch,
    Capacity,
    TimeBudget,
    /// Dropped by the category diversity pass
    Diversity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum AdmissionDecision {
    Admitted,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionRecord {
    pub task_id: String,
    pub decision: AdmissionDecision,
    /// Admitted through the quick-win reservation
    #[serde(default)]
    pub quick_win: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTrace {
    pub decided_at: DateTime<Utc>,
    pub pools: PoolCounts,
    pub detox: Option<DetoxAssessment>,
    /// Detox restrictions were bypassed by the caller
    pub proceed_anyway: bool,
    pub eligible: Vec<String>,
    pub scores: Vec<ScoredTask>,
    pub admissions: Vec<AdmissionRecord>,
    pub invariants: InvariantReport,
    pub load: Option<LoadAssessment>,
    pub fallback: Option<FallbackTier>,
    pub elapsed_ms: u64,
}

impl DecisionTrace {
    pub fn new(decided_at: DateTime<Utc>) -> Self {
        Self {
            decided_at,
            pools: PoolCounts::default(),
            detox: None,
            proceed_anyway: false,
            eligible: Vec::new(),
            scores: Vec::new(),
            admissions: Vec::new(),
            invariants: InvariantReport::default(),
            load: None,
            fallback: None,
            elapsed_ms: 0,
        }
    }

    pub fn record(&mut self, task_id: impl Into<String>, decision: AdmissionDecision) {
        self.admissions.push(AdmissionRecord {
            task_id: task_id.into(),
            decision,
            quick_win: false,
        });
    }

    pub fn record_quick_win(&mut self, task_id: impl Into<String>) {
        self.admissions.push(AdmissionRecord {
            task_id: task_id.into(),
            decision: AdmissionDecision::Admitted,
            quick_win: true,
        });
    }

    /// Latest decision recorded for a task.
    pub fn decision_for(&self, task_id: &str) -> Option<AdmissionDecision> {
        self.admissions
            .iter()
            .rev()
            .find(|r| r.task_id == task_id)
            .map(|r| r.decision)
    }

    pub fn used_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}
