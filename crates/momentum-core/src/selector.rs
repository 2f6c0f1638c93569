//! Playlist generation.
//!
//! One deterministic pass per call:
//!
//! 1. Set aside scheduled tasks (they are fixed blocks until missed), bucket
//!    the rest into pools and apply Detox restrictions.
//! 2. Keep the *eligible* visible tasks: overdue, due today, undated, or
//!    already started.
//! 3. Score and rank them.
//! 4. Admit the best quick win first, then the rest greedily while the task
//!    count, energy, capacity and time budgets allow.
//! 5. Drop the latest offenders while a category is over-represented.
//! 6. Check every invariant; on failure (or an empty selection) run the
//!    fallback cascade instead.
//!
//! Nothing here fails on a rule violation. The only errors are malformed
//! requests, caught when the request is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::capacity::{task_cost, CapacityBudget, LoadStatus};
use crate::deadline::{assess_load, LoadAssessment};
use crate::detox::{self, DetoxPhase};
use crate::energy::EnergyState;
use crate::error::{CoreError, Result};
use crate::fallback::{run_cascade, FallbackContext};
use crate::invariants::{all_micro, check_all, InvariantContext, InvariantReport};
use crate::playlist::{Playlist, PlaylistSource};
use crate::scoring::{rank_tasks, ScoreBreakdown, ScoredTask};
use crate::storage::EngineConfig;
use crate::task::{is_movable, Pool, Task, TaskPools, MICRO_TASK_MINUTES, QUICK_WIN_MINUTES};
use crate::trace::{AdmissionDecision, DecisionTrace, RejectReason};

/// Playlist shape limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectionLimits {
    pub max_tasks: usize,
    /// Count limit when every candidate is a micro-task
    pub micro_max_tasks: usize,
    /// Tasks strictly shorter than this are micro-tasks
    pub micro_task_minutes: u32,
    pub quick_win_minutes: u32,
    /// Most admitted tasks allowed to share one category
    pub max_same_category: usize,
    pub min_completion_rate: f64,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_tasks: 5,
            micro_max_tasks: 7,
            micro_task_minutes: MICRO_TASK_MINUTES,
            quick_win_minutes: QUICK_WIN_MINUTES,
            max_same_category: 2,
            min_completion_rate: 0.70,
        }
    }
}

/// Inputs for one selection decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistRequest {
    pub tasks: Vec<Task>,
    pub energy: EnergyState,
    pub now: DateTime<Utc>,
    /// Ledger the playlist draws from; its remaining load is the ceiling
    pub budget: CapacityBudget,
    /// Session length in minutes, bounding total task time
    pub session_minutes: Option<u32>,
    /// Time left in the day, for overload detection
    pub available_minutes: Option<u32>,
    /// Consecutive days the backlog age stayed above threshold
    pub detox_days_above: Option<u32>,
    pub recent_categories: Vec<String>,
    /// Bypass Detox restrictions
    pub proceed_anyway: bool,
}

impl PlaylistRequest {
    pub fn builder() -> PlaylistRequestBuilder {
        PlaylistRequestBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistRequestBuilder {
    tasks: Vec<Task>,
    energy: Option<EnergyState>,
    now: Option<DateTime<Utc>>,
    budget: Option<CapacityBudget>,
    session_minutes: Option<u32>,
    available_minutes: Option<u32>,
    detox_days_above: Option<u32>,
    recent_categories: Vec<String>,
    proceed_anyway: bool,
}

impl PlaylistRequestBuilder {
    pub fn tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn energy(mut self, energy: EnergyState) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn budget(mut self, budget: CapacityBudget) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn session_minutes(mut self, minutes: u32) -> Self {
        self.session_minutes = Some(minutes);
        self
    }

    pub fn available_minutes(mut self, minutes: u32) -> Self {
        self.available_minutes = Some(minutes);
        self
    }

    pub fn detox_days_above(mut self, days: u32) -> Self {
        self.detox_days_above = Some(days);
        self
    }

    pub fn recent_categories(mut self, categories: Vec<String>) -> Self {
        self.recent_categories = categories;
        self
    }

    pub fn proceed_anyway(mut self, proceed: bool) -> Self {
        self.proceed_anyway = proceed;
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Fails when no energy snapshot was given or its confidence is outside
    /// `[0, 1]`.
    pub fn build(self) -> Result<PlaylistRequest> {
        let energy = self.energy.ok_or(CoreError::MissingInput("energy"))?;
        energy.validate()?;

        Ok(PlaylistRequest {
            tasks: self.tasks,
            energy,
            now: self.now.unwrap_or_else(Utc::now),
            budget: self.budget.unwrap_or_default(),
            session_minutes: self.session_minutes,
            available_minutes: self.available_minutes,
            detox_days_above: self.detox_days_above,
            recent_categories: self.recent_categories,
            proceed_anyway: self.proceed_anyway,
        })
    }
}

/// A playlist plus everything needed to explain it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionOutcome {
    pub playlist: Playlist,
    /// Request budget with the playlist's tasks admitted
    pub budget: CapacityBudget,
    pub trace: DecisionTrace,
}

/// Overdue, due today, undated, or already started.
pub fn is_eligible(pool: Pool, task: &Task) -> bool {
    matches!(pool, Pool::Overdue | Pool::Today) || task.deadline.is_none() || task.is_started()
}

/// Greedy admission state for one selection pass.
struct Admitter<'a> {
    energy: &'a EnergyState,
    budget: CapacityBudget,
    minutes_left: Option<u32>,
    max_count: usize,
    picked: Vec<Task>,
}

impl<'a> Admitter<'a> {
    fn new(request: &'a PlaylistRequest, max_count: usize) -> Self {
        Self {
            energy: &request.energy,
            budget: request.budget.clone(),
            minutes_left: request.session_minutes,
            max_count,
            picked: Vec::new(),
        }
    }

    fn contains(&self, task: &Task) -> bool {
        self.picked.iter().any(|t| t.id == task.id)
    }

    fn offer(&mut self, task: &Task) -> AdmissionDecision {
        if self.picked.len() >= self.max_count {
            return AdmissionDecision::Rejected(RejectReason::CountLimit);
        }
        if !self.energy.is_compatible(task.effort) {
            return AdmissionDecision::Rejected(RejectReason::EnergyMismatch);
        }
        if self.minutes_left.is_some_and(|left| task.duration > left) {
            return AdmissionDecision::Rejected(RejectReason::TimeBudget);
        }

        let (next, admission) = self.budget.admit(task.id.clone(), task_cost(task, self.energy));
        if !admission.is_admitted() {
            return AdmissionDecision::Rejected(RejectReason::Capacity);
        }

        self.budget = next;
        if let Some(left) = self.minutes_left.as_mut() {
            *left -= task.duration;
        }
        self.picked.push(task.clone());
        AdmissionDecision::Admitted
    }

    /// Remove an admitted task and release its cost and time.
    fn drop_at(&mut self, index: usize) -> Task {
        let task = self.picked.remove(index);
        self.budget = self.budget.settle(&task.id, LoadStatus::Dropped);
        if let Some(left) = self.minutes_left.as_mut() {
            *left = left.saturating_add(task.duration);
        }
        task
    }
}

/// Index of the latest admitted task whose category is over the limit.
fn latest_category_offender(tasks: &[Task], max_same_category: usize) -> Option<usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for task in tasks.iter().filter(|t| !t.category.is_empty()) {
        *counts.entry(task.category.as_str()).or_default() += 1;
    }
    tasks
        .iter()
        .rposition(|t| counts.get(t.category.as_str()).is_some_and(|n| *n > max_same_category))
}

fn explain(tasks: &[Task], ranked: &[(&Task, ScoreBreakdown)], energy: &EnergyState) -> String {
    let Some(first) = tasks.first() else {
        return "Nothing to schedule right now.".to_string();
    };
    let reason = ranked
        .iter()
        .find(|(t, _)| t.id == first.id)
        .and_then(|(_, breakdown)| breakdown.top_term())
        .map(|term| term.name.replace('_', " "))
        .unwrap_or_else(|| "overall fit".to_string());

    format!(
        "{} task(s) for {:?} energy, starting with \"{}\" (strongest factor: {}).",
        tasks.len(),
        energy.level,
        first.title,
        reason
    )
}

/// Build the playlist for a request.
pub fn generate_playlist(request: &PlaylistRequest, config: &EngineConfig) -> SelectionOutcome {
    let started = Instant::now();
    let limits = &config.selection;
    let energy = &request.energy;
    let today = request.now.date_naive();
    let mut trace = DecisionTrace::new(request.now);
    let mut warnings: Vec<String> = Vec::new();

    // Pools and Detox.
    let movable: Vec<Task> = request
        .tasks
        .iter()
        .filter(|t| is_movable(t, request.now, &config.pools))
        .cloned()
        .collect();
    let mut pools = TaskPools::build(&movable, request.now, &config.pools);
    let backlog: Vec<Task> = request
        .tasks
        .iter()
        .filter(|t| t.is_selectable())
        .cloned()
        .collect();
    let detox = detox::assess(
        &backlog,
        request.now,
        request.detox_days_above.unwrap_or(0),
        &config.detox,
    );
    if detox.phase == DetoxPhase::Block && !request.proceed_anyway {
        if detox.restrictions.freeze_soon {
            pools.freeze_soon();
        }
        if let Some(cap) = detox.restrictions.today_cap {
            pools.cap_today(cap, today);
        }
    }
    if let Some(message) = &detox.message {
        warnings.push(message.clone());
    }
    trace.pools = pools.counts();
    trace.proceed_anyway = request.proceed_anyway;
    tracing::debug!(pools = ?trace.pools, phase = ?detox.phase, "pools built");

    // Eligibility.
    let visible: Vec<Task> = pools.visible().into_iter().map(|(_, t)| t.clone()).collect();
    let eligible: Vec<Task> = pools
        .visible()
        .into_iter()
        .filter(|(pool, task)| is_eligible(*pool, task))
        .map(|(_, task)| task.clone())
        .collect();
    trace.eligible = eligible.iter().map(|t| t.id.clone()).collect();
    trace.detox = Some(detox);

    let ceiling = request.budget.remaining();
    let inv_ctx = InvariantContext::new(&eligible, energy, ceiling, limits);
    let max_count = inv_ctx.count.limit();
    if all_micro(&eligible, limits.micro_task_minutes) {
        tracing::debug!(max_count, "all candidates are micro-tasks; count limit relaxed");
    }

    // Scoring.
    let ranked = rank_tasks(&eligible, energy, &request.recent_categories);
    trace.scores = ranked
        .iter()
        .map(|(task, breakdown)| ScoredTask {
            task_id: task.id.clone(),
            breakdown: breakdown.clone(),
        })
        .collect();

    // Admission, quick win first.
    let mut admitter = Admitter::new(request, max_count);
    for (task, _) in ranked
        .iter()
        .filter(|(t, _)| t.is_quick_win_within(limits.quick_win_minutes))
    {
        if admitter.offer(task) == AdmissionDecision::Admitted {
            trace.record_quick_win(task.id.clone());
            break;
        }
    }
    for (task, _) in &ranked {
        if admitter.contains(task) {
            continue;
        }
        let decision = admitter.offer(task);
        tracing::debug!(task = %task.id, ?decision, "admission");
        trace.record(task.id.clone(), decision);
    }

    // Diversity.
    while admitter.picked.len() > 1 {
        let Some(index) = latest_category_offender(&admitter.picked, limits.max_same_category)
        else {
            break;
        };
        let dropped = admitter.drop_at(index);
        trace.record(dropped.id, AdmissionDecision::Rejected(RejectReason::Diversity));
    }

    // Overload detection.
    let load: Option<LoadAssessment> = request
        .available_minutes
        .or(request.session_minutes)
        .map(|minutes| assess_load(&eligible, minutes, config.triage.load_ratio_threshold));
    if let Some(assessment) = load.as_ref().filter(|a| a.is_triage()) {
        warnings.push(format!(
            "Today needs {} minutes but only {} are available.",
            assessment.total_required_minutes, assessment.available_minutes
        ));
    }

    // Invariants, then fallback if needed.
    let report: InvariantReport = check_all(&admitter.picked, &inv_ctx);
    let failed = report.failed();
    let empty_selection = admitter.picked.is_empty();
    trace.invariants = report;

    let playlist = if failed.is_empty() && !empty_selection {
        let explanation = explain(&admitter.picked, &ranked, energy);
        Playlist::new(
            admitter.picked,
            *energy,
            request.now,
            explanation,
            PlaylistSource::Selector,
        )
    } else {
        let candidates = if eligible.is_empty() { &visible } else { &eligible };
        let ctx = FallbackContext {
            candidates,
            energy,
            ceiling,
            time_limit: request.session_minutes,
            now: request.now,
            failed: &failed,
            empty_selection,
            triage: load.as_ref().and_then(|a| a.triage.as_ref()),
            limits,
            survival_cap: config.triage.survival_cap,
        };
        let playlist = run_cascade(&ctx);
        if let PlaylistSource::Fallback(tier) = playlist.source {
            trace.fallback = Some(tier);
        }
        playlist
    };
    trace.load = load;

    // Settle the ledger against what was actually proposed.
    let budget = playlist.tasks.iter().fold(request.budget.clone(), |budget, task| {
        budget.admit(task.id.clone(), task_cost(task, energy)).0
    });
    if budget.is_exhausted() {
        warnings.push("Capacity is nearly used up; consider stopping after this.".to_string());
    } else if budget.is_near_exhaustion() {
        warnings.push("Less than 40% of today's capacity remains.".to_string());
    }

    let playlist = playlist.with_warnings(warnings);

    let elapsed = started.elapsed();
    trace.elapsed_ms = elapsed.as_millis() as u64;
    if trace.elapsed_ms > config.performance.soft_budget_ms {
        tracing::warn!(
            elapsed_ms = trace.elapsed_ms,
            budget_ms = config.performance.soft_budget_ms,
            "selection exceeded its soft time budget"
        );
    }

    SelectionOutcome {
        playlist,
        budget,
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyLevel;
    use crate::fallback::FallbackTier;
    use crate::task::{Effort, TaskStatus, Urgency};
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 12, 10, 0, 0).unwrap()
    }

    fn today() -> NaiveDate {
        now().date_naive()
    }

    fn request(tasks: Vec<Task>, level: EnergyLevel) -> PlaylistRequest {
        PlaylistRequest::builder()
            .tasks(tasks)
            .energy(EnergyState::stable(level))
            .now(now())
            .build()
            .unwrap()
    }

    fn run(req: &PlaylistRequest) -> SelectionOutcome {
        generate_playlist(req, &EngineConfig::default())
    }

    #[test]
    fn missing_energy_fails_fast() {
        let err = PlaylistRequest::builder().build().unwrap_err();
        assert!(matches!(err, CoreError::MissingInput("energy")));
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let err = PlaylistRequest::builder()
            .energy(EnergyState::stable(EnergyLevel::High).with_confidence(1.5))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn scheduled_task_without_deadline_is_not_a_candidate() {
        let mut tasks = vec![Task::new("standup", 15)
            .with_id("standup")
            .with_scheduled_time(chrono::NaiveTime::from_hms_opt(15, 0, 0).unwrap())];
        for id in ["a", "b", "c"] {
            tasks.push(Task::new(id, 10).with_id(id).with_effort(Effort::Low));
        }

        let outcome = run(&request(tasks, EnergyLevel::Medium));
        let ids = outcome.playlist.task_ids();
        assert_eq!(outcome.trace.eligible, vec!["a", "b", "c"]);
        assert!(!ids.contains(&"standup"));
        assert!(!ids.is_empty());
        assert_eq!(outcome.trace.pools.available, 3);
    }

    #[test]
    fn missed_scheduled_task_rejoins_the_pool() {
        let tasks = vec![Task::new("call back", 15)
            .with_id("call")
            .with_effort(Effort::Low)
            .with_deadline(today())
            .with_scheduled_time(chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap())];

        let outcome = run(&request(tasks, EnergyLevel::Medium));
        assert_eq!(outcome.trace.pools.overdue, 1);
        assert_eq!(outcome.playlist.task_ids(), vec!["call"]);
    }

    #[test]
    fn quick_win_is_reserved() {
        let tasks = vec![
            Task::new("deep", 60).with_id("deep").with_effort(Effort::Medium).with_urgency(Urgency::Urgent),
            Task::new("mail", 10).with_id("mail").with_effort(Effort::Low).with_urgency(Urgency::Low),
        ];
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert_eq!(outcome.playlist.source, PlaylistSource::Selector);
        assert!(outcome.playlist.contains_quick_win());
        assert_eq!(outcome.playlist.task_ids()[0], "mail");
        assert!(outcome.trace.admissions.iter().any(|r| r.quick_win && r.task_id == "mail"));
    }

    #[test]
    fn pressing_pools_hide_the_rest() {
        let tasks = vec![
            Task::new("due", 10).with_id("due").with_effort(Effort::Low).with_deadline(today()),
            Task::new("undated", 10).with_id("undated").with_effort(Effort::Low),
        ];
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert_eq!(outcome.trace.eligible, vec!["due"]);
        assert_eq!(outcome.playlist.task_ids(), vec!["due"]);
    }

    #[test]
    fn future_tasks_need_to_be_started() {
        let later = today() + Duration::days(4);
        let tasks = vec![
            Task::new("fresh", 10).with_id("fresh").with_effort(Effort::Low).with_deadline(later),
            Task::new("begun", 10)
                .with_id("begun")
                .with_effort(Effort::Low)
                .with_deadline(later)
                .with_status(TaskStatus::Active),
        ];
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert_eq!(outcome.trace.eligible, vec!["begun"]);
    }

    #[test]
    fn count_limit_holds() {
        let tasks: Vec<Task> = (0..9)
            .map(|i| {
                Task::new(format!("t{i}"), 10)
                    .with_effort(Effort::Low)
                    .with_category(format!("c{i}"))
            })
            .collect();
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert_eq!(outcome.playlist.len(), 5);
    }

    #[test]
    fn micro_tasks_relax_count_limit() {
        let tasks: Vec<Task> = (0..9)
            .map(|i| {
                Task::new(format!("t{i}"), 3)
                    .with_effort(Effort::Low)
                    .with_category(format!("c{i}"))
            })
            .collect();
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert_eq!(outcome.playlist.len(), 7);
    }

    #[test]
    fn diversity_caps_a_category() {
        let tasks: Vec<Task> = (0..4)
            .map(|i| {
                Task::new(format!("admin{i}"), 20)
                    .with_id(format!("admin{i}"))
                    .with_effort(Effort::Low)
                    .with_category("admin")
            })
            .collect();
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert_eq!(outcome.playlist.len(), 2);
        assert!(outcome
            .trace
            .admissions
            .iter()
            .any(|r| r.decision == AdmissionDecision::Rejected(RejectReason::Diversity)));
    }

    #[test]
    fn session_minutes_bound_total_time() {
        let tasks: Vec<Task> = (0..4)
            .map(|i| {
                Task::new(format!("t{i}"), 40)
                    .with_effort(Effort::Low)
                    .with_category(format!("c{i}"))
            })
            .collect();
        let req = PlaylistRequest::builder()
            .tasks(tasks)
            .energy(EnergyState::stable(EnergyLevel::High))
            .now(now())
            .session_minutes(90)
            .build()
            .unwrap();
        let outcome = run(&req);
        assert!(outcome.playlist.total_minutes() <= 90);
        assert_eq!(outcome.playlist.len(), 2);
    }

    #[test]
    fn low_energy_with_only_hard_work_falls_back() {
        let tasks: Vec<Task> = (0..6)
            .map(|i| Task::new(format!("big{i}"), 120).with_effort(Effort::High))
            .collect();
        let outcome = run(&request(tasks, EnergyLevel::Low));
        assert_eq!(
            outcome.playlist.source,
            PlaylistSource::Fallback(FallbackTier::LowEnergy)
        );
        assert!(outcome.playlist.len() <= 1);
        assert!(!outcome.playlist.warnings.is_empty());
        assert_eq!(outcome.trace.fallback, Some(FallbackTier::LowEnergy));
    }

    #[test]
    fn detox_block_freezes_soon_unless_bypassed() {
        let created = now() - Duration::days(6);
        let soon = today() + Duration::days(3);
        let tasks = vec![Task::new("soon", 10)
            .with_id("soon")
            .with_effort(Effort::Low)
            .with_deadline(soon)
            .with_status(TaskStatus::Active)
            .created_at(created)];

        let blocked = PlaylistRequest::builder()
            .tasks(tasks.clone())
            .energy(EnergyState::stable(EnergyLevel::High))
            .now(now())
            .detox_days_above(3)
            .build()
            .unwrap();
        let outcome = run(&blocked);
        assert!(outcome.trace.eligible.is_empty());
        assert_eq!(
            outcome.trace.detox.as_ref().map(|d| d.phase),
            Some(DetoxPhase::Block)
        );

        let bypass = PlaylistRequest {
            proceed_anyway: true,
            ..blocked
        };
        let outcome = run(&bypass);
        assert_eq!(outcome.playlist.task_ids(), vec!["soon"]);
    }

    #[test]
    fn returned_budget_includes_playlist_cost() {
        let tasks = vec![Task::new("a", 60).with_effort(Effort::Low)];
        let outcome = run(&request(tasks, EnergyLevel::High));
        assert!((outcome.budget.used_load() - outcome.playlist.energy_used).abs() < 1e-9);
    }

    #[test]
    fn near_exhaustion_adds_warning() {
        let tasks = vec![Task::new("a", 120).with_effort(Effort::Low)];
        let req = PlaylistRequest {
            budget: CapacityBudget::new(3.0),
            ..request(tasks, EnergyLevel::High)
        };
        let outcome = run(&req);
        assert_eq!(outcome.playlist.len(), 1);
        assert!(outcome.playlist.warnings.iter().any(|w| w.contains("capacity")));
    }
}
