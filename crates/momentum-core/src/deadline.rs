//! Daily load detection and triage.
//!
//! `load_ratio = required minutes / available minutes`. Above the threshold
//! (1.5 by default) the day is unsatisfiable and TRIAGE activates: the
//! overloaded tasks are ordered by urgency, impact, nearest deadline and
//! shortest duration, and the user is offered options for the rest. Options
//! are informational; nothing is applied automatically.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::task::{total_minutes, Task};

/// Default load ratio above which triage activates.
pub const DEFAULT_TRIAGE_THRESHOLD: f64 = 1.5;

/// Triage thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TriagePolicy {
    /// Load ratio above which triage activates
    pub load_ratio_threshold: f64,
    /// Most tasks a survival playlist may carry
    pub survival_cap: usize,
}

impl Default for TriagePolicy {
    fn default() -> Self {
        Self {
            load_ratio_threshold: DEFAULT_TRIAGE_THRESHOLD,
            survival_cap: 3,
        }
    }
}

/// What the user may do with work that does not fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriageOption {
    Defer,
    Negotiate,
    Delegate,
    Abandon,
}

impl TriageOption {
    pub const ALL: [TriageOption; 4] = [
        TriageOption::Defer,
        TriageOption::Negotiate,
        TriageOption::Delegate,
        TriageOption::Abandon,
    ];
}

/// Triage result for an overloaded day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriagePlan {
    /// Task ids, most important first
    pub priority_order: Vec<String>,
    /// Prefix of the ordering that fits the available time
    pub selected: Vec<String>,
    pub selected_minutes: u32,
    /// Tasks left over, each eligible for every option
    pub overflow: Vec<String>,
    pub options: Vec<TriageOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadAssessment {
    pub total_required_minutes: u32,
    pub available_minutes: u32,
    /// `f64::INFINITY` when no time is available
    #[serde(with = "ratio")]
    pub load_ratio: f64,
    pub triage: Option<TriagePlan>,
}

impl LoadAssessment {
    pub fn is_triage(&self) -> bool {
        self.triage.is_some()
    }
}

/// JSON has no infinity; store it as `null`.
mod ratio {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

pub fn load_ratio(required_minutes: u32, available_minutes: u32) -> f64 {
    if available_minutes == 0 {
        return if required_minutes == 0 { 0.0 } else { f64::INFINITY };
    }
    required_minutes as f64 / available_minutes as f64
}

/// Urgency, then impact (both descending), nearest deadline, shortest duration.
pub fn triage_cmp(a: &Task, b: &Task) -> Ordering {
    b.urgency
        .cmp(&a.urgency)
        .then_with(|| b.impact.cmp(&a.impact))
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.duration.cmp(&b.duration))
}

pub fn triage_order<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Vec<&'a Task> {
    let mut ordered: Vec<&Task> = tasks.into_iter().collect();
    ordered.sort_by(|a, b| triage_cmp(a, b));
    ordered
}

/// Walk the ordering and keep each task that still fits the remaining time.
pub fn triage_selection<'a>(ordered: &[&'a Task], available_minutes: u32) -> Vec<&'a Task> {
    let mut remaining = available_minutes;
    let mut selected = Vec::new();
    for task in ordered {
        if remaining == 0 {
            break;
        }
        if task.duration <= remaining {
            remaining -= task.duration;
            selected.push(*task);
        }
    }
    selected
}

/// Measure the load of selectable tasks against available time.
pub fn assess_load(tasks: &[Task], available_minutes: u32, threshold: f64) -> LoadAssessment {
    let pending: Vec<&Task> = tasks.iter().filter(|t| t.is_selectable()).collect();
    let total_required_minutes = total_minutes(pending.iter().copied());
    let ratio = load_ratio(total_required_minutes, available_minutes);

    let triage = (ratio > threshold).then(|| {
        let ordered = triage_order(pending.iter().copied());
        let selected = triage_selection(&ordered, available_minutes);
        let selected_ids: Vec<String> = selected.iter().map(|t| t.id.clone()).collect();
        let overflow = ordered
            .iter()
            .filter(|t| !selected_ids.contains(&t.id))
            .map(|t| t.id.clone())
            .collect();

        TriagePlan {
            priority_order: ordered.iter().map(|t| t.id.clone()).collect(),
            selected_minutes: total_minutes(selected.iter().copied()),
            selected: selected_ids,
            overflow,
            options: TriageOption::ALL.to_vec(),
        }
    });

    if triage.is_some() {
        tracing::info!(
            required = total_required_minutes,
            available = available_minutes,
            "daily load exceeds available time; triage active"
        );
    }

    LoadAssessment {
        total_required_minutes,
        available_minutes,
        load_ratio: ratio,
        triage,
    }
}
