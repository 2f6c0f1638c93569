//! Hard predicates every accepted playlist must satisfy.
//!
//! Each predicate reads its own closed context, so the data it needs is
//! fixed by its signature. A failing check is reported as data, never as an
//! error; the selector reacts by running the fallback cascade.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capacity::total_cost;
use crate::energy::{is_energy_compatible, EnergyState};
use crate::playlist::Playlist;
use crate::selector::SelectionLimits;
use crate::task::Task;

const LOAD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum InvariantId {
    MaxTasks,
    MinQuickWin,
    TotalLoad,
    EnergyMismatch,
    CompletionRate,
}

impl InvariantId {
    pub const ALL: [InvariantId; 5] = [
        InvariantId::EnergyMismatch,
        InvariantId::TotalLoad,
        InvariantId::MaxTasks,
        InvariantId::MinQuickWin,
        InvariantId::CompletionRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InvariantId::MaxTasks => "maxTasks",
            InvariantId::MinQuickWin => "minQuickWin",
            InvariantId::TotalLoad => "totalLoad",
            InvariantId::EnergyMismatch => "energyMismatch",
            InvariantId::CompletionRate => "completionRate",
        }
    }
}

impl fmt::Display for InvariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity band of an invariant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum InvariantLevel {
    /// Protects the user's wellbeing
    Safety,
    /// Protects the budget
    Capacity,
    /// Keeps playlists motivating
    Quality,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct InvariantRule {
    pub id: InvariantId,
    pub level: InvariantLevel,
    /// Lower is more important
    pub priority: u8,
    pub description: &'static str,
}

/// Invariants ordered by priority.
pub const HIERARCHY: [InvariantRule; 5] = [
    InvariantRule {
        id: InvariantId::EnergyMismatch,
        level: InvariantLevel::Safety,
        priority: 1,
        description: "no task demands more effort than current energy allows",
    },
    InvariantRule {
        id: InvariantId::TotalLoad,
        level: InvariantLevel::Capacity,
        priority: 2,
        description: "total cognitive cost stays within the capacity ceiling",
    },
    InvariantRule {
        id: InvariantId::MaxTasks,
        level: InvariantLevel::Capacity,
        priority: 3,
        description: "at most 5 tasks, or 7 when every candidate is a micro-task",
    },
    InvariantRule {
        id: InvariantId::MinQuickWin,
        level: InvariantLevel::Quality,
        priority: 4,
        description: "at least one quick win when one exists",
    },
    InvariantRule {
        id: InvariantId::CompletionRate,
        level: InvariantLevel::Quality,
        priority: 5,
        description: "historical completion rate averages at least 70%",
    },
];

/// Look up a rule by its external name; unknown names yield `None`.
pub fn find_rule(name: &str) -> Option<&'static InvariantRule> {
    HIERARCHY.iter().find(|rule| rule.id.as_str() == name)
}

pub fn priority_of(name: &str) -> Option<u8> {
    find_rule(name).map(|rule| rule.priority)
}

pub fn rule(id: InvariantId) -> &'static InvariantRule {
    let index = match id {
        InvariantId::EnergyMismatch => 0,
        InvariantId::TotalLoad => 1,
        InvariantId::MaxTasks => 2,
        InvariantId::MinQuickWin => 3,
        InvariantId::CompletionRate => 4,
    };
    &HIERARCHY[index]
}

/// Inputs for the task-count predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountContext {
    pub max_tasks: usize,
    pub micro_max_tasks: usize,
    /// Every candidate was a micro-task
    pub micro_relaxation: bool,
}

impl CountContext {
    pub fn limit(&self) -> usize {
        if self.micro_relaxation {
            self.micro_max_tasks
        } else {
            self.max_tasks
        }
    }
}

/// Inputs for the quick-win predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickWinContext {
    pub quick_win_minutes: u32,
    /// Some candidate qualified as a quick win
    pub quick_win_available: bool,
}

/// Inputs for the load predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadContext {
    pub energy: EnergyState,
    pub ceiling: f64,
}

/// Inputs for the energy predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyContext {
    pub energy: EnergyState,
}

/// Inputs for the completion-rate predicate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryContext {
    pub min_completion_rate: f64,
}

/// All predicate contexts for one check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvariantContext {
    pub count: CountContext,
    pub quick_win: QuickWinContext,
    pub load: LoadContext,
    pub energy: EnergyContext,
    pub history: HistoryContext,
}

impl InvariantContext {
    /// Derive contexts from the candidate set the playlist was drawn from.
    pub fn new(
        candidates: &[Task],
        energy: &EnergyState,
        ceiling: f64,
        limits: &SelectionLimits,
    ) -> Self {
        Self {
            count: CountContext {
                max_tasks: limits.max_tasks,
                micro_max_tasks: limits.micro_max_tasks,
                micro_relaxation: all_micro(candidates, limits.micro_task_minutes),
            },
            quick_win: QuickWinContext {
                quick_win_minutes: limits.quick_win_minutes,
                quick_win_available: candidates
                    .iter()
                    .any(|t| t.is_quick_win_within(limits.quick_win_minutes)),
            },
            load: LoadContext {
                energy: *energy,
                ceiling,
            },
            energy: EnergyContext { energy: *energy },
            history: HistoryContext {
                min_completion_rate: limits.min_completion_rate,
            },
        }
    }
}

/// True for a non-empty set where every task is shorter than `micro_minutes`.
pub fn all_micro(tasks: &[Task], micro_minutes: u32) -> bool {
    !tasks.is_empty() && tasks.iter().all(|t| t.duration < micro_minutes)
}

pub fn check_max_tasks(tasks: &[Task], ctx: &CountContext) -> bool {
    tasks.len() <= ctx.limit()
}

pub fn check_min_quick_win(tasks: &[Task], ctx: &QuickWinContext) -> bool {
    !ctx.quick_win_available
        || tasks
            .iter()
            .any(|t| t.is_quick_win_within(ctx.quick_win_minutes))
}

pub fn check_total_load(tasks: &[Task], ctx: &LoadContext) -> bool {
    total_cost(tasks, &ctx.energy) <= ctx.ceiling + LOAD_EPSILON
}

pub fn check_energy(tasks: &[Task], ctx: &EnergyContext) -> bool {
    tasks
        .iter()
        .all(|t| is_energy_compatible(t.effort, &ctx.energy))
}

pub fn check_completion_rate(tasks: &[Task], ctx: &HistoryContext) -> bool {
    if tasks.is_empty() {
        return true;
    }
    let mean = tasks.iter().map(Task::completion_rate).sum::<f64>() / tasks.len() as f64;
    mean >= ctx.min_completion_rate
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvariantResult {
    pub id: InvariantId,
    pub passed: bool,
}

/// Outcome of running every predicate, in hierarchy order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvariantReport {
    pub results: Vec<InvariantResult>,
}

impl InvariantReport {
    pub fn is_valid(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failed(&self) -> Vec<InvariantId> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.id)
            .collect()
    }

    pub fn has_failed(&self, id: InvariantId) -> bool {
        self.results.iter().any(|r| r.id == id && !r.passed)
    }
}

/// Run every predicate against a set of tasks.
pub fn check_all(tasks: &[Task], ctx: &InvariantContext) -> InvariantReport {
    let results = HIERARCHY
        .iter()
        .map(|rule| {
            let passed = match rule.id {
                InvariantId::MaxTasks => check_max_tasks(tasks, &ctx.count),
                InvariantId::MinQuickWin => check_min_quick_win(tasks, &ctx.quick_win),
                InvariantId::TotalLoad => check_total_load(tasks, &ctx.load),
                InvariantId::EnergyMismatch => check_energy(tasks, &ctx.energy),
                InvariantId::CompletionRate => check_completion_rate(tasks, &ctx.history),
            };
            InvariantResult {
                id: rule.id,
                passed,
            }
        })
        .collect();

    InvariantReport { results }
}

/// Result of the validation entry point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid {
        playlist: Playlist,
    },
    Invalid {
        error: String,
        invalid_invariants: Vec<InvariantId>,
    },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }
}

/// Validate a playlist against an explicit context.
pub fn validate_with(playlist: Playlist, ctx: &InvariantContext) -> ValidationOutcome {
    let report = check_all(&playlist.tasks, ctx);
    if report.is_valid() {
        return ValidationOutcome::Valid { playlist };
    }

    let failed = report.failed();
    let names: Vec<&str> = failed.iter().map(|id| id.as_str()).collect();
    ValidationOutcome::Invalid {
        error: format!("Playlist violates invariants: {}", names.join(", ")),
        invalid_invariants: failed,
    }
}

/// Validate a playlist given only its energy snapshot and a capacity ceiling.
///
/// The playlist's own tasks stand in for the candidate set, so the quick-win
/// predicate only fires when the caller uses [`validate_with`] with the full
/// candidate set.
pub fn validate_playlist(
    playlist: Playlist,
    energy: &EnergyState,
    ceiling: f64,
    limits: &SelectionLimits,
) -> ValidationOutcome {
    let ctx = InvariantContext::new(&playlist.tasks, energy, ceiling, limits);
    validate_with(playlist, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyLevel;
    use crate::playlist::PlaylistSource;
    use crate::task::{CompletionRecord, Effort};
    use chrono::Utc;

    fn limits() -> SelectionLimits {
        SelectionLimits::default()
    }

    fn tasks(n: usize, minutes: u32, effort: Effort) -> Vec<Task> {
        (0..n)
            .map(|i| Task::new(format!("t{i}"), minutes).with_effort(effort))
            .collect()
    }

    #[test]
    fn max_tasks_relaxes_for_micro_tasks() {
        let energy = EnergyState::stable(EnergyLevel::High);
        let micro = tasks(7, 4, Effort::Low);
        let ctx = InvariantContext::new(&micro, &energy, 100.0, &limits());
        assert!(check_max_tasks(&micro, &ctx.count));

        let normal = tasks(6, 10, Effort::Low);
        let ctx = InvariantContext::new(&normal, &energy, 100.0, &limits());
        assert!(!check_max_tasks(&normal, &ctx.count));
    }

    #[test]
    fn quick_win_waived_when_none_exists() {
        let heavy = tasks(2, 60, Effort::High);
        let ctx = QuickWinContext {
            quick_win_minutes: 15,
            quick_win_available: false,
        };
        assert!(check_min_quick_win(&heavy, &ctx));

        let required = QuickWinContext {
            quick_win_available: true,
            ..ctx
        };
        assert!(!check_min_quick_win(&heavy, &required));
    }

    #[test]
    fn load_and_energy_checks() {
        let energy = EnergyState::stable(EnergyLevel::Medium);
        let set = tasks(2, 60, Effort::Medium);
        assert!(check_total_load(&set, &LoadContext { energy, ceiling: 3.0 }));
        assert!(!check_total_load(&set, &LoadContext { energy, ceiling: 2.9 }));
        assert!(check_energy(&set, &EnergyContext { energy }));

        let hard = tasks(1, 10, Effort::High);
        assert!(!check_energy(&hard, &EnergyContext { energy }));
    }

    #[test]
    fn completion_rate_averages_over_playlist() {
        let reliable = Task::new("a", 30);
        let flaky = Task::new("b", 30)
            .with_completion(CompletionRecord {
                date: Utc::now(),
                actual_duration: 30,
                energy_at_completion: EnergyLevel::Low,
            })
            .with_times_proposed(5);
        let ctx = HistoryContext {
            min_completion_rate: 0.7,
        };
        assert!(check_completion_rate(&[], &ctx));
        assert!(check_completion_rate(&[reliable.clone()], &ctx));
        // (1.0 + 0.2) / 2 = 0.6
        assert!(!check_completion_rate(&[reliable, flaky], &ctx));
    }

    #[test]
    fn unknown_rule_lookup_is_none() {
        assert_eq!(priority_of("energyMismatch"), Some(1));
        assert_eq!(priority_of("completionRate"), Some(5));
        assert!(find_rule("noSuchRule").is_none());
        assert!(priority_of("").is_none());
    }

    #[test]
    fn hierarchy_covers_every_invariant_once() {
        for id in InvariantId::ALL {
            assert_eq!(HIERARCHY.iter().filter(|r| r.id == id).count(), 1);
            assert_eq!(rule(id).id, id);
        }
    }

    #[test]
    fn rule_lookup_follows_priority() {
        let priorities: Vec<u8> = InvariantId::ALL.iter().map(|id| rule(*id).priority).collect();
        assert_eq!(priorities, vec![1, 2, 3, 4, 5]);
        assert_eq!(rule(InvariantId::MinQuickWin).level, InvariantLevel::Quality);
    }

    #[test]
    fn validation_entry_point_returns_structured_failure() {
        let energy = EnergyState::stable(EnergyLevel::Low);
        let playlist = Playlist::new(
            tasks(6, 60, Effort::High),
            energy,
            Utc::now(),
            "too much",
            PlaylistSource::Selector,
        );

        match validate_playlist(playlist, &energy, 1.0, &limits()) {
            ValidationOutcome::Invalid {
                invalid_invariants,
                error,
            } => {
                assert_eq!(
                    invalid_invariants,
                    vec![
                        InvariantId::EnergyMismatch,
                        InvariantId::TotalLoad,
                        InvariantId::MaxTasks
                    ]
                );
                assert!(error.contains("energyMismatch"));
            }
            other => panic!("expected invalid outcome, got {other:?}"),
        }
    }

    #[test]
    fn valid_playlist_is_returned_unchanged() {
        let energy = EnergyState::stable(EnergyLevel::High);
        let playlist = Playlist::new(
            tasks(2, 10, Effort::Low),
            energy,
            Utc::now(),
            "fine",
            PlaylistSource::Selector,
        );
        let expected = playlist.clone();
        match validate_playlist(playlist, &energy, 10.0, &limits()) {
            ValidationOutcome::Valid { playlist } => assert_eq!(playlist, expected),
            other => panic!("expected valid outcome, got {other:?}"),
        }
    }
}
