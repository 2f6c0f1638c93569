//! Weighted desirability scoring.
//!
//! Each task receives an explainable breakdown of six objective terms:
//!
//! ```text
//! total = 0.40·energy_alignment + 0.20·urgency + 0.15·impact
//!       + 0.10·effort_balance   + 0.10·behavioral_pattern + 0.05·diversity
//! ```
//!
//! Weights are fixed; they are not user-tunable.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::energy::{is_energy_compatible, EnergyState, Stability};
use crate::task::{Impact, Task, Urgency};

/// Individual objective term with weight and score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveTerm {
    /// Term name
    pub name: String,
    /// Weight for this term (0.0 to 1.0)
    pub weight: f64,
    /// Raw score (0.0 to 1.0, higher is better)
    pub score: f64,
    /// Weighted contribution
    pub contribution: f64,
}

impl ObjectiveTerm {
    pub fn new(name: impl Into<String>, weight: f64, score: f64) -> Self {
        let weight = weight.clamp(0.0, 1.0);
        let score = score.clamp(0.0, 1.0);
        Self {
            name: name.into(),
            weight,
            score,
            contribution: weight * score,
        }
    }
}

/// Complete scoring breakdown for explainability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub terms: Vec<ObjectiveTerm>,
    /// Total weighted score (0.0 to 1.0)
    pub total_score: f64,
}

impl ScoreBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_term(&mut self, term: ObjectiveTerm) {
        self.total_score += term.contribution;
        self.terms.push(term);
    }

    /// Get the top contributing term
    pub fn top_term(&self) -> Option<&ObjectiveTerm> {
        self.terms.iter().max_by(|a, b| {
            a.contribution
                .partial_cmp(&b.contribution)
                .unwrap_or(Ordering::Equal)
        })
    }

    pub fn term(&self, name: &str) -> Option<&ObjectiveTerm> {
        self.terms.iter().find(|t| t.name == name)
    }
}

/// Fixed objective weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub energy_alignment: f64,
    pub urgency: f64,
    pub impact: f64,
    pub effort_balance: f64,
    pub behavioral_pattern: f64,
    pub diversity: f64,
}

pub const WEIGHTS: ObjectiveWeights = ObjectiveWeights {
    energy_alignment: 0.40,
    urgency: 0.20,
    impact: 0.15,
    effort_balance: 0.10,
    behavioral_pattern: 0.10,
    diversity: 0.05,
};

/// Inputs for scoring one task.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub task: &'a Task,
    pub energy: &'a EnergyState,
    /// Categories of recently selected tasks
    pub recent_categories: &'a [String],
}

pub fn energy_alignment(task: &Task, energy: &EnergyState) -> f64 {
    if !is_energy_compatible(task.effort, energy) {
        return 0.1;
    }
    match energy.stability {
        Stability::Stable => 0.9,
        Stability::Volatile => 0.7,
    }
}

pub fn urgency_score(urgency: Urgency) -> f64 {
    match urgency {
        Urgency::Urgent => 1.0,
        Urgency::High => 0.8,
        Urgency::Medium => 0.5,
        Urgency::Low => 0.2,
    }
}

pub fn impact_score(impact: Impact) -> f64 {
    match impact {
        Impact::High => 1.0,
        Impact::Medium => 0.6,
        Impact::Low => 0.3,
    }
}

/// Impact per unit of effort, normalized to [0, 1].
pub fn effort_balance(task: &Task) -> f64 {
    let ratio = task.impact.rank() as f64 / task.effort.rank() as f64;
    (ratio / 3.0).min(1.0)
}

/// How reliably the user finishes this task within plan.
pub fn behavioral_pattern(task: &Task) -> f64 {
    match task.duration_ratio() {
        None => 0.5,
        Some(r) if r < 0.8 => 0.9,
        Some(r) if r > 1.2 => 0.3,
        Some(_) => 0.7,
    }
}

/// 1.0 when the category is fresh, sliding to 0.1 as recent picks repeat it.
pub fn diversity(task: &Task, recent_categories: &[String]) -> f64 {
    if recent_categories.is_empty() {
        return 1.0;
    }
    let same = recent_categories
        .iter()
        .filter(|c| **c == task.category)
        .count();
    let fraction = same as f64 / recent_categories.len() as f64;
    (1.0 - 0.9 * fraction).max(0.1)
}

/// Score a single task in context.
pub fn score_task(ctx: &ScoringContext) -> ScoreBreakdown {
    let mut breakdown = ScoreBreakdown::new();
    let task = ctx.task;

    breakdown.add_term(ObjectiveTerm::new(
        "energy_alignment",
        WEIGHTS.energy_alignment,
        energy_alignment(task, ctx.energy),
    ));
    breakdown.add_term(ObjectiveTerm::new(
        "urgency",
        WEIGHTS.urgency,
        urgency_score(task.urgency),
    ));
    breakdown.add_term(ObjectiveTerm::new(
        "impact",
        WEIGHTS.impact,
        impact_score(task.impact),
    ));
    breakdown.add_term(ObjectiveTerm::new(
        "effort_balance",
        WEIGHTS.effort_balance,
        effort_balance(task),
    ));
    breakdown.add_term(ObjectiveTerm::new(
        "behavioral_pattern",
        WEIGHTS.behavioral_pattern,
        behavioral_pattern(task),
    ));
    breakdown.add_term(ObjectiveTerm::new(
        "diversity",
        WEIGHTS.diversity,
        diversity(task, ctx.recent_categories),
    ));

    breakdown
}

/// A task paired with its breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTask {
    pub task_id: String,
    pub breakdown: ScoreBreakdown,
}

impl ScoredTask {
    pub fn total(&self) -> f64 {
        self.breakdown.total_score
    }
}

/// Score every task and sort by total, highest first; ties keep input order.
pub fn rank_tasks<'a>(
    tasks: impl IntoIterator<Item = &'a Task>,
    energy: &EnergyState,
    recent_categories: &[String],
) -> Vec<(&'a Task, ScoreBreakdown)> {
    let mut scored: Vec<_> = tasks
        .into_iter()
        .map(|task| {
            let ctx = ScoringContext {
                task,
                energy,
                recent_categories,
            };
            (task, score_task(&ctx))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.total_score
            .partial_cmp(&a.1.total_score)
            .unwrap_or(Ordering::Equal)
    });
    scored
}
