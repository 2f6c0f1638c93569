//! Fallback cascade for unsatisfiable selections.
//!
//! The cascade is an ordered table of `(predicate, strategy)` rules. Rules
//! are tried top to bottom; the first rule whose predicate holds and whose
//! strategy produces a playlist wins. A strategy may decline (return `None`),
//! which passes control to the next rule. The final `Default` rule always
//! produces a playlist, so the cascade never fails.
//!
//! Every tier admits tasks through the same energy, count, time and capacity
//! checks as the normal path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::capacity::{task_cost, CapacityBudget};
use crate::deadline::TriagePlan;
use crate::energy::{EnergyLevel, EnergyState};
use crate::invariants::InvariantId;
use crate::playlist::{Playlist, PlaylistSource};
use crate::selector::SelectionLimits;
use crate::task::{Effort, Task};

/// Size of the small sets returned by the lenient tiers.
pub const SMALL_SET: usize = 3;

/// Accepted duration ratio band for the inconsistent-history tier.
pub const HISTORY_RATIO_BAND: (f64, f64) = (0.5, 2.0);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FallbackTier {
    LowEnergy,
    Overconstrained,
    InconsistentHistory,
    Survival,
    Default,
}

/// Everything the cascade may read.
#[derive(Debug, Clone, Copy)]
pub struct FallbackContext<'a> {
    /// Tasks the fallback may draw from
    pub candidates: &'a [Task],
    pub energy: &'a EnergyState,
    pub ceiling: f64,
    /// Session time budget in minutes, if any
    pub time_limit: Option<u32>,
    pub now: DateTime<Utc>,
    /// Invariants the normal path violated
    pub failed: &'a [InvariantId],
    /// The normal path admitted nothing
    pub empty_selection: bool,
    pub triage: Option<&'a TriagePlan>,
    pub limits: &'a SelectionLimits,
    pub survival_cap: usize,
}

impl FallbackContext<'_> {
    fn failed_any(&self, ids: &[InvariantId]) -> bool {
        self.failed.iter().any(|f| ids.contains(f))
    }
}

type Predicate = fn(&FallbackContext) -> bool;
type Strategy = fn(&FallbackContext) -> Option<Playlist>;

/// One entry of the cascade.
pub struct FallbackRule {
    pub tier: FallbackTier,
    pub applies: Predicate,
    pub strategy: Strategy,
}

/// The cascade, in precedence order.
pub const CASCADE: [FallbackRule; 5] = [
    FallbackRule {
        tier: FallbackTier::LowEnergy,
        applies: |ctx| ctx.energy.level == EnergyLevel::Low,
        strategy: low_energy,
    },
    FallbackRule {
        tier: FallbackTier::Overconstrained,
        applies: |ctx| {
            ctx.empty_selection
                || ctx.failed_any(&[
                    InvariantId::MaxTasks,
                    InvariantId::TotalLoad,
                    InvariantId::EnergyMismatch,
                    InvariantId::MinQuickWin,
                ])
        },
        strategy: overconstrained,
    },
    FallbackRule {
        tier: FallbackTier::InconsistentHistory,
        applies: |ctx| ctx.failed_any(&[InvariantId::CompletionRate]),
        strategy: inconsistent_history,
    },
    FallbackRule {
        tier: FallbackTier::Survival,
        applies: |ctx| ctx.triage.is_some(),
        strategy: survival,
    },
    FallbackRule {
        tier: FallbackTier::Default,
        applies: |_| true,
        strategy: |ctx| Some(default_playlist(ctx)),
    },
];

/// Run the cascade; always returns a playlist.
pub fn run_cascade(ctx: &FallbackContext) -> Playlist {
    for rule in CASCADE.iter() {
        if !(rule.applies)(ctx) {
            continue;
        }
        match (rule.strategy)(ctx) {
            Some(playlist) => {
                tracing::info!(tier = ?rule.tier, tasks = playlist.len(), "fallback selected");
                return playlist;
            }
            None => {
                tracing::debug!(tier = ?rule.tier, "fallback tier declined");
            }
        }
    }
    default_playlist(ctx)
}

/// Admit tasks in order while energy, count, time and capacity allow.
fn admit<'a>(
    ctx: &FallbackContext,
    ordered: impl IntoIterator<Item = &'a Task>,
    max_count: usize,
) -> Vec<Task> {
    let mut budget = CapacityBudget::new(ctx.ceiling);
    let mut minutes = 0u64;
    let mut picked = Vec::new();

    for task in ordered {
        if picked.len() >= max_count {
            break;
        }
        if !ctx.energy.is_compatible(task.effort) {
            continue;
        }
        if let Some(limit) = ctx.time_limit {
            if minutes + u64::from(task.duration) > u64::from(limit) {
                continue;
            }
        }
        let (next, admission) = budget.admit(task.id.clone(), task_cost(task, ctx.energy));
        if !admission.is_admitted() {
            continue;
        }
        budget = next;
        minutes += u64::from(task.duration);
        picked.push(task.clone());
    }
    picked
}

fn playlist(ctx: &FallbackContext, tasks: Vec<Task>, tier: FallbackTier, explanation: &str) -> Playlist {
    Playlist::new(
        tasks,
        *ctx.energy,
        ctx.now,
        explanation,
        PlaylistSource::Fallback(tier),
    )
}

fn by_duration(a: &&Task, b: &&Task) -> Ordering {
    a.duration.cmp(&b.duration).then_with(|| a.id.cmp(&b.id))
}

/// One short, easy task, or nothing; always with a gentle note.
fn low_energy(ctx: &FallbackContext) -> Option<Playlist> {
    let mut easy: Vec<&Task> = ctx
        .candidates
        .iter()
        .filter(|t| t.effort == Effort::Low && t.duration <= ctx.limits.quick_win_minutes)
        .collect();
    easy.sort_by(|a, b| b.urgency.cmp(&a.urgency).then_with(|| by_duration(a, b)));

    let tasks = admit(ctx, easy, 1);
    let explanation = if tasks.is_empty() {
        "Energy is low right now; nothing small enough fits, so resting is a fine choice."
    } else {
        "Energy is low right now, so here is one small, easy task."
    };
    Some(
        playlist(ctx, tasks, FallbackTier::LowEnergy, explanation)
            .with_warning("Low energy: keeping this session light."),
    )
}

/// The one or two shortest tasks that fit.
fn overconstrained(ctx: &FallbackContext) -> Option<Playlist> {
    let mut shortest: Vec<&Task> = ctx.candidates.iter().collect();
    shortest.sort_by(by_duration);

    let tasks = admit(ctx, shortest, 2);
    if tasks.is_empty() {
        return None;
    }
    Some(
        playlist(
            ctx,
            tasks,
            FallbackTier::Overconstrained,
            "The full plan did not fit today's limits, so here are the shortest tasks that do.",
        )
        .with_warning("Constraints could not all be met; showing a reduced plan."),
    )
}

/// Tasks whose past durations matched the plan reasonably well.
fn inconsistent_history(ctx: &FallbackContext) -> Option<Playlist> {
    let (lo, hi) = HISTORY_RATIO_BAND;
    let mut reliable: Vec<(&Task, f64)> = ctx
        .candidates
        .iter()
        .filter_map(|t| t.duration_ratio().map(|r| (t, r)))
        .filter(|(_, r)| (lo..=hi).contains(r))
        .collect();
    reliable.sort_by(|a, b| {
        (a.1 - 1.0)
            .abs()
            .partial_cmp(&(b.1 - 1.0).abs())
            .unwrap_or(Ordering::Equal)
    });

    let tasks = admit(ctx, reliable.into_iter().map(|(t, _)| t), SMALL_SET);
    if tasks.is_empty() {
        return None;
    }
    Some(
        playlist(
            ctx,
            tasks,
            FallbackTier::InconsistentHistory,
            "Picked tasks whose past timing has been predictable.",
        )
        .with_warning("Recent completion history was uneven; favoring predictable tasks."),
    )
}

/// Triage order, capped, within the available time.
fn survival(ctx: &FallbackContext) -> Option<Playlist> {
    let plan = ctx.triage?;
    let ordered = plan
        .selected
        .iter()
        .filter_map(|id| ctx.candidates.iter().find(|t| &t.id == id));

    let tasks = admit(ctx, ordered, ctx.survival_cap.min(ctx.limits.max_tasks));
    if tasks.is_empty() {
        return None;
    }
    Some(
        playlist(
            ctx,
            tasks,
            FallbackTier::Survival,
            "Today holds more than the time available; these are the most pressing tasks that fit.",
        )
        .with_warning("Survival mode: the day is overloaded. Consider deferring, negotiating, delegating or dropping the rest."),
    )
}

/// Up to three tasks in input order; may be empty.
pub fn default_playlist(ctx: &FallbackContext) -> Playlist {
    let tasks = admit(ctx, ctx.candidates, SMALL_SET.min(ctx.limits.max_tasks));
    playlist(
        ctx,
        tasks,
        FallbackTier::Default,
        "A small starting set while the full plan is unavailable.",
    )
    .with_warning("No plan satisfied every rule; showing a simple starting set.")
}
