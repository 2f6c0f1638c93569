//! Property-based tests for playlist selection.
//!
//! For any backlog of undated tasks and any energy snapshot:
//!
//! 1. The playlist never exceeds the task count limit.
//! 2. The playlist's cognitive cost stays within the capacity ceiling.
//! 3. Every proposed task fits the reported energy.
//! 4. Proposed tasks come from the input, without duplicates.
//! 5. A session length bounds the total planned minutes.
//! 6. A short, easy task in the backlog always yields a non-empty playlist.
//! 7. Pool classification follows deadline distance.
//! 8. A selector playlist keeps a quick win whenever the backlog has one.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use momentum_core::task::{classify, PoolLimits, MICRO_TASK_MINUTES};
use momentum_core::{
    generate_playlist, is_energy_compatible, CapacityBudget, Effort, EngineConfig, EnergyLevel,
    EnergyState, PlaylistRequest, PlaylistSource, Pool, Stability, Task, Urgency,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 6, 9, 0, 0).unwrap()
}

fn effort_strategy() -> impl Strategy<Value = Effort> {
    prop_oneof![Just(Effort::Low), Just(Effort::Medium), Just(Effort::High)]
}

fn urgency_strategy() -> impl Strategy<Value = Urgency> {
    prop_oneof![
        Just(Urgency::Low),
        Just(Urgency::Medium),
        Just(Urgency::High),
        Just(Urgency::Urgent),
    ]
}

fn energy_strategy() -> impl Strategy<Value = EnergyState> {
    (
        prop_oneof![
            Just(EnergyLevel::Low),
            Just(EnergyLevel::Medium),
            Just(EnergyLevel::High)
        ],
        any::<bool>(),
    )
        .prop_map(|(level, volatile)| {
            let stability = if volatile {
                Stability::Volatile
            } else {
                Stability::Stable
            };
            EnergyState::new(level, stability)
        })
}

fn category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("mail".to_string()),
        Just("code".to_string()),
        Just("admin".to_string()),
    ]
}

/// Undated tasks are always eligible, so the whole backlog is in play.
fn backlog_strategy() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(
        (
            1u32..=180,
            effort_strategy(),
            urgency_strategy(),
            category_strategy(),
        ),
        0..=10,
    )
    .prop_map(|rows| {
        rows
            .into_iter()
            .enumerate()
            .map(|(i, (duration, effort, urgency, category))| {
                Task::new(format!("task {i}"), duration)
                    .with_id(format!("t{i}"))
                    .with_effort(effort)
                    .with_urgency(urgency)
                    .with_category(category)
            })
            .collect()
    })
}

fn request(tasks: Vec<Task>, energy: EnergyState) -> PlaylistRequest {
    PlaylistRequest::builder()
        .tasks(tasks)
        .energy(energy)
        .now(now())
        .budget(CapacityBudget::daily())
        .build()
        .unwrap()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Count limit
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn playlist_respects_count_limit(tasks in backlog_strategy(), energy in energy_strategy()) {
        let config = EngineConfig::default();
        let all_micro = !tasks.is_empty()
            && tasks.iter().all(|t| t.duration < MICRO_TASK_MINUTES);
        let outcome = generate_playlist(&request(tasks, energy), &config);

        let limit = if all_micro {
            config.selection.micro_max_tasks
        } else {
            config.selection.max_tasks
        };
        prop_assert!(
            outcome.playlist.len() <= limit,
            "{} tasks exceeds limit {}",
            outcome.playlist.len(),
            limit
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Capacity
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn playlist_stays_within_capacity(
        tasks in backlog_strategy(),
        energy in energy_strategy(),
        max_load in 0.5f64..10.0,
    ) {
        let req = PlaylistRequest::builder()
            .tasks(tasks)
            .energy(energy)
            .now(now())
            .budget(CapacityBudget::new(max_load))
            .build()
            .unwrap();
        let outcome = generate_playlist(&req, &EngineConfig::default());

        prop_assert!(outcome.playlist.energy_used <= max_load + 1e-9);
        prop_assert!(outcome.budget.used_load() <= outcome.budget.max_load + 1e-9);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Energy soundness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_task_fits_energy(tasks in backlog_strategy(), energy in energy_strategy()) {
        let outcome = generate_playlist(&request(tasks, energy), &EngineConfig::default());
        for task in &outcome.playlist.tasks {
            prop_assert!(
                is_energy_compatible(task.effort, &energy),
                "{:?} task proposed at {:?} energy",
                task.effort,
                energy.level
            );
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Provenance
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn tasks_come_from_input_once(tasks in backlog_strategy(), energy in energy_strategy()) {
        let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let outcome = generate_playlist(&request(tasks, energy), &EngineConfig::default());

        let picked = outcome.playlist.task_ids();
        for id in &picked {
            prop_assert!(ids.iter().any(|i| i == id));
        }
        let mut unique = picked.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), picked.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Session time budget
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn session_minutes_bound_playlist(
        tasks in backlog_strategy(),
        energy in energy_strategy(),
        minutes in 5u32..=240,
    ) {
        let req = PlaylistRequest::builder()
            .tasks(tasks)
            .energy(energy)
            .now(now())
            .session_minutes(minutes)
            .build()
            .unwrap();
        let outcome = generate_playlist(&req, &EngineConfig::default());
        prop_assert!(outcome.playlist.total_minutes() <= minutes);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Never empty when something easy exists
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn easy_task_yields_non_empty_playlist(
        mut tasks in backlog_strategy(),
        energy in energy_strategy(),
        easy_minutes in 1u32..=15,
    ) {
        tasks.truncate(9);
        tasks.push(
            Task::new("easy", easy_minutes)
                .with_id("easy")
                .with_effort(Effort::Low),
        );
        let outcome = generate_playlist(&request(tasks, energy), &EngineConfig::default());
        prop_assert!(!outcome.playlist.is_empty());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Pool precedence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn pool_follows_deadline_distance(offset in -30i64..=30) {
        let limits = PoolLimits::default();
        let today = now().date_naive();
        let task = Task::new("dated", 30).with_deadline(today + Duration::days(offset));

        let expected = match offset {
            o if o < 0 => Pool::Overdue,
            0 => Pool::Today,
            o if (2..=limits.soon_horizon_days).contains(&o) => Pool::Soon,
            _ => Pool::Available,
        };
        prop_assert_eq!(classify(&task, now(), &limits), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 8. Quick-win guarantee
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn selector_keeps_a_quick_win(
        tasks in backlog_strategy(),
        energy in energy_strategy(),
        minutes in prop::option::of(15u32..=240),
    ) {
        let has_quick_win = tasks.iter().any(Task::is_quick_win);
        let mut builder = PlaylistRequest::builder()
            .tasks(tasks)
            .energy(energy)
            .now(now())
            .budget(CapacityBudget::daily());
        if let Some(minutes) = minutes {
            builder = builder.session_minutes(minutes);
        }
        let outcome = generate_playlist(&builder.build().unwrap(), &EngineConfig::default());

        if has_quick_win && outcome.playlist.source == PlaylistSource::Selector {
            prop_assert!(
                outcome.playlist.contains_quick_win(),
                "selector playlist {:?} has no quick win",
                outcome.playlist.task_ids()
            );
        }
    }
}
