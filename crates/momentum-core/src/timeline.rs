//! Fixed time blocks and the free slots between them.
//!
//! Tasks with a scheduled time occupy `[start, start + duration)` on their
//! day. Free slots are the day window minus those blocks, each block padded
//! by a transition buffer on both sides. Slots shorter than the buffer are
//! discarded.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::error::ValidationError;
use crate::task::Task;

/// Working hours for a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DayWindow {
    #[serde(with = "clock::hhmm")]
    pub start: NaiveTime,
    #[serde(with = "clock::hhmm")]
    pub end: NaiveTime,
    pub transition_buffer_minutes: u32,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            transition_buffer_minutes: 10,
        }
    }
}

impl DayWindow {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end <= self.start {
            return Err(ValidationError::InvalidValue {
                field: "day.end".into(),
                message: format!(
                    "day must end after it starts ({} >= {})",
                    self.start.format("%H:%M"),
                    self.end.format("%H:%M")
                ),
            });
        }
        Ok(())
    }

    pub fn bounds(&self, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        (clock::at(day, self.start), clock::at(day, self.end))
    }

    pub fn buffer(&self) -> Duration {
        Duration::minutes(self.transition_buffer_minutes as i64)
    }
}

/// Half-open interval intersection test.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// A scheduled task pinned to the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixedBlock {
    pub task_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FixedBlock {
    /// Block for a task on `day`, if it is scheduled for that day.
    pub fn for_task(task: &Task, day: NaiveDate) -> Option<Self> {
        let time = task.scheduled_time?;
        if task.deadline.is_some_and(|d| d != day) {
            return None;
        }
        let start = clock::at(day, time);
        Some(Self {
            task_id: task.id.clone(),
            start,
            end: start + Duration::minutes(task.duration as i64),
        })
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, start, end)
    }
}

/// Fixed blocks for every selectable scheduled task on `day`, sorted by start.
pub fn fixed_blocks(tasks: &[Task], day: NaiveDate) -> Vec<FixedBlock> {
    let mut blocks: Vec<FixedBlock> = tasks
        .iter()
        .filter(|t| t.is_selectable())
        .filter_map(|t| FixedBlock::for_task(t, day))
        .collect();
    blocks.sort_by_key(|b| b.start);
    blocks
}

/// An unclaimed interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FreeSlot {
    pub fn duration_minutes(&self) -> u32 {
        (self.end - self.start).num_minutes().max(0) as u32
    }

    pub fn can_fit(&self, minutes: u32) -> bool {
        self.duration_minutes() >= minutes
    }
}

/// Free slots in `[start, end)` around `blocks`, each block padded by `buffer`.
pub fn free_slots(
    blocks: &[FixedBlock],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffer: Duration,
) -> Vec<FreeSlot> {
    let mut sorted: Vec<&FixedBlock> = blocks.iter().collect();
    sorted.sort_by_key(|b| b.start);

    let mut slots = Vec::new();
    let mut cursor = start;
    let mut push = |from: DateTime<Utc>, to: DateTime<Utc>| {
        if to > from && to - from >= buffer {
            slots.push(FreeSlot { start: from, end: to });
        }
    };

    for block in sorted {
        let padded_start = block.start - buffer;
        let padded_end = block.end + buffer;
        if padded_end <= cursor {
            continue;
        }
        if padded_start >= end {
            break;
        }
        if padded_start > cursor {
            push(cursor, padded_start);
        }
        cursor = cursor.max(padded_end);
    }
    if cursor < end {
        push(cursor, end);
    }

    slots
}

/// Fixed blocks and free slots for one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeConstraints {
    pub day: NaiveDate,
    pub window: DayWindow,
    pub blocks: Vec<FixedBlock>,
    pub slots: Vec<FreeSlot>,
}

impl TimeConstraints {
    /// Resolve the day's blocks and slots.
    ///
    /// # Errors
    ///
    /// Returns an error when the window ends before it starts.
    pub fn for_day(tasks: &[Task], day: NaiveDate, window: &DayWindow) -> Result<Self, ValidationError> {
        window.validate()?;
        let (start, end) = window.bounds(day);
        let blocks = fixed_blocks(tasks, day);
        let slots = free_slots(&blocks, start, end, window.buffer());
        Ok(Self {
            day,
            window: *window,
            blocks,
            slots,
        })
    }

    pub fn free_minutes(&self) -> u32 {
        self.slots.iter().map(FreeSlot::duration_minutes).sum()
    }

    /// The slot containing `instant`, if any.
    pub fn slot_at(&self, instant: DateTime<Utc>) -> Option<&FreeSlot> {
        self.slots
            .iter()
            .find(|s| s.start <= instant && instant < s.end)
    }

    /// Free minutes from `instant` until the end of the window.
    pub fn remaining_minutes(&self, instant: DateTime<Utc>) -> u32 {
        self.slots
            .iter()
            .filter(|s| s.end > instant)
            .map(|s| FreeSlot {
                start: s.start.max(instant),
                end: s.end,
            })
            .map(|s| s.duration_minutes())
            .sum()
    }

    /// Movable tasks that fit in `slot` without running into a fixed block.
    ///
    /// Each task is tried at the slot start; it is excluded when
    /// `[slot.start, slot.start + duration)` overlaps a buffered block or
    /// runs past the slot.
    pub fn candidates_for(&self, slot: &FreeSlot, tasks: &[Task]) -> Vec<Task> {
        let buffer = self.window.buffer();
        tasks
            .iter()
            .filter(|t| t.is_selectable() && t.scheduled_time.is_none())
            .filter(|t| {
                let end = slot.start + Duration::minutes(t.duration as i64);
                end <= slot.end
                    && !self
                        .blocks
                        .iter()
                        .any(|b| overlaps(b.start - buffer, b.end + buffer, slot.start, end))
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 20).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 20, h, m, 0).unwrap()
    }

    #[test]
    fn overlap_is_half_open() {
        assert!(overlaps(utc(9, 0), utc(10, 0), utc(9, 30), utc(11, 0)));
        assert!(!overlaps(utc(9, 0), utc(10, 0), utc(10, 0), utc(11, 0)));
        assert!(overlaps(utc(9, 0), utc(12, 0), utc(10, 0), utc(11, 0)));
    }

    #[test]
    fn blocks_only_for_matching_day() {
        let other = day().succ_opt().unwrap();
        let tasks = vec![
            Task::new("standup", 15).with_scheduled_time(hm(9, 0)),
            Task::new("tomorrow", 30).with_scheduled_time(hm(9, 0)).with_deadline(other),
            Task::new("loose", 30),
        ];
        let blocks = fixed_blocks(&tasks, day());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].end - blocks[0].start, Duration::minutes(15));
    }

    #[test]
    fn slots_subtract_buffered_blocks() {
        let tasks = vec![
            Task::new("meeting", 60).with_id("meeting").with_scheduled_time(hm(10, 0)),
            Task::new("lunch", 60).with_id("lunch").with_scheduled_time(hm(12, 0)),
        ];
        let window = DayWindow {
            start: hm(8, 0),
            end: hm(14, 0),
            transition_buffer_minutes: 10,
        };
        let plan = TimeConstraints::for_day(&tasks, day(), &window).unwrap();

        assert_eq!(
            plan.slots,
            vec![
                FreeSlot { start: utc(8, 0), end: utc(9, 50) },
                FreeSlot { start: utc(11, 10), end: utc(11, 50) },
                FreeSlot { start: utc(13, 10), end: utc(14, 0) },
            ]
        );
        assert_eq!(plan.free_minutes(), 110 + 40 + 50);
    }

    #[test]
    fn slivers_shorter_than_buffer_are_dropped() {
        let tasks = vec![
            Task::new("a", 30).with_scheduled_time(hm(9, 0)),
            Task::new("b", 30).with_scheduled_time(hm(9, 55)),
        ];
        let window = DayWindow {
            start: hm(8, 0),
            end: hm(11, 0),
            transition_buffer_minutes: 10,
        };
        let plan = TimeConstraints::for_day(&tasks, day(), &window).unwrap();
        // 9:40..9:45 is shorter than the buffer.
        assert_eq!(plan.slots.len(), 2);
        assert_eq!(plan.slots[1].start, utc(10, 35));
    }

    #[test]
    fn candidates_exclude_tasks_running_into_blocks() {
        let tasks = vec![
            Task::new("meeting", 60).with_id("meeting").with_scheduled_time(hm(10, 0)),
            Task::new("short", 30).with_id("short"),
            Task::new("long", 90).with_id("long"),
        ];
        let window = DayWindow {
            start: hm(9, 0),
            end: hm(12, 0),
            transition_buffer_minutes: 10,
        };
        let plan = TimeConstraints::for_day(&tasks, day(), &window).unwrap();
        let first = plan.slots[0];
        let ids: Vec<String> = plan
            .candidates_for(&first, &tasks)
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec!["short"]);
    }

    #[test]
    fn remaining_minutes_clips_current_slot() {
        let plan = TimeConstraints::for_day(
            &[],
            day(),
            &DayWindow {
                start: hm(8, 0),
                end: hm(10, 0),
                transition_buffer_minutes: 10,
            },
        )
        .unwrap();
        assert_eq!(plan.remaining_minutes(utc(9, 15)), 45);
        assert!(plan.slot_at(utc(9, 15)).is_some());
        assert!(plan.slot_at(utc(10, 0)).is_none());
    }

    #[test]
    fn inverted_window_is_rejected() {
        let window = DayWindow {
            start: hm(18, 0),
            end: hm(9, 0),
            transition_buffer_minutes: 0,
        };
        assert!(TimeConstraints::for_day(&[], day(), &window).is_err());
    }

    #[test]
    fn window_round_trips_as_clock_strings() {
        let json = serde_json::to_value(DayWindow::default()).unwrap();
        assert_eq!(json["start"], "08:00");
        assert_eq!(json["end"], "22:00");
    }
}
