//! Property-based tests for session creation around fixed blocks.
//!
//! For any slot holding one scheduled task and any backlog:
//!
//! 1. The scheduled task is fixed, never planned.
//! 2. Every planned task fits inside a single free gap.
//! 3. Planned minutes never exceed the free time in the slot.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use proptest::prelude::*;

use momentum_core::timeline::{fixed_blocks, free_slots, FreeSlot};
use momentum_core::{
    Effort, EnergyLevel, EnergyState, SessionManager, SessionRequest, Stability, Task,
};

fn slot_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 6, 9, 0, 0).unwrap()
}

fn slot_end() -> DateTime<Utc> {
    slot_start() + Duration::minutes(120)
}

fn effort_strategy() -> impl Strategy<Value = Effort> {
    prop_oneof![Just(Effort::Low), Just(Effort::Medium), Just(Effort::High)]
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

/// A meeting starting on a five-minute mark inside the slot.
fn meeting_strategy() -> impl Strategy<Value = Task> {
    (0u32..24, 10u32..=60).prop_map(|(step, duration)| {
        let minutes = step * 5;
        let start = NaiveTime::from_hms_opt(9 + minutes / 60, minutes % 60, 0).unwrap();
        Task::new("meeting", duration)
            .with_id("meeting")
            .with_scheduled_time(start)
    })
}

fn backlog_strategy() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec((5u32..=90, effort_strategy()), 0..=8).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (duration, effort))| {
                Task::new(format!("task {i}"), duration)
                    .with_id(format!("t{i}"))
                    .with_effort(effort)
            })
            .collect()
    })
}

fn gaps(manager: &SessionManager, tasks: &[Task]) -> Vec<FreeSlot> {
    let blocks = fixed_blocks(tasks, slot_start().date_naive());
    free_slots(
        &blocks,
        slot_start(),
        slot_end(),
        manager.config().day.buffer(),
    )
}

proptest! {
    #[test]
    fn planned_tasks_avoid_the_fixed_block(
        meeting in meeting_strategy(),
        backlog in backlog_strategy(),
        energy in energy_strategy(),
    ) {
        let mut tasks = backlog;
        tasks.push(meeting);
        let manager = SessionManager::default();
        let free = gaps(&manager, &tasks);

        let request = SessionRequest::new(tasks, slot_start(), slot_end()).with_energy(energy);
        let plan = manager.create(&request).unwrap();
        let session = plan.session;

        prop_assert!(session.fixed_tasks.iter().any(|t| t.id == "meeting"));
        prop_assert!(!session.task_ids().contains(&"meeting"));

        for task in &session.playlist.tasks {
            prop_assert!(
                free.iter().any(|g| g.can_fit(task.duration)),
                "{} ({} min) fits none of {:?}",
                task.id,
                task.duration,
                free
            );
        }

        let free_minutes: u32 = free.iter().map(FreeSlot::duration_minutes).sum();
        prop_assert!(session.playlist.total_minutes() <= free_minutes);
    }
}
