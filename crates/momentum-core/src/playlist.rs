//! The bounded set of tasks proposed for a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capacity::total_cost;
use crate::energy::EnergyState;
use crate::fallback::FallbackTier;
use crate::task::{self, Task};

/// Which path produced a playlist.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "tier", rename_all = "snake_case")]
pub enum PlaylistSource {
    Selector,
    Fallback(FallbackTier),
}

/// Ordered, capacity-checked task proposal.
///
/// Built fresh per decision and never edited afterwards; helpers that add
/// information return a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    pub tasks: Vec<Task>,
    pub generated_at: DateTime<Utc>,
    /// Energy snapshot the playlist was built for
    pub energy: EnergyState,
    /// Total cognitive cost of the tasks
    pub energy_used: f64,
    pub explanation: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub source: PlaylistSource,
}

impl Playlist {
    pub fn new(
        tasks: Vec<Task>,
        energy: EnergyState,
        generated_at: DateTime<Utc>,
        explanation: impl Into<String>,
        source: PlaylistSource,
    ) -> Self {
        let energy_used = total_cost(&tasks, &energy);
        Self {
            tasks,
            generated_at,
            energy,
            energy_used,
            explanation: explanation.into(),
            warnings: Vec::new(),
            source,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
        self
    }

    pub fn with_warnings(self, warnings: impl IntoIterator<Item = String>) -> Self {
        warnings.into_iter().fold(self, Playlist::with_warning)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    pub fn total_minutes(&self) -> u32 {
        task::total_minutes(&self.tasks)
    }

    pub fn contains_quick_win(&self) -> bool {
        self.tasks.iter().any(Task::is_quick_win)
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, PlaylistSource::Fallback(_))
    }
}
