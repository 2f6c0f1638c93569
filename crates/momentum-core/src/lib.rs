//! # Momentum Core Library
//!
//! Decision engine for a personal task scheduler. Given pending tasks, a
//! self-reported energy snapshot and time constraints, it proposes a small,
//! bounded playlist of tasks and binds it to a session. Every operation is
//! also available through the `momentum-cli` binary.
//!
//! ## Architecture
//!
//! - **Selection**: pools, scoring, greedy admission and invariant checks,
//!   with a fallback cascade whenever the rules cannot all be met
//! - **Capacity**: cognitive cost per task and immutable load ledgers
//! - **Detox / Triage**: backlog staleness friction and overload handling
//! - **Timeline**: fixed time blocks and the free slots between them
//! - **Sessions**: an explicit state machine that never completes on its own
//! - **Storage**: TOML-based configuration
//!
//! Every decision is a pure function of its inputs. The engine performs no
//! I/O apart from configuration loading, which callers invoke explicitly.
//!
//! ## Key Components
//!
//! - [`generate_playlist`]: one selection decision
//! - [`validate_playlist`]: structured invariant check
//! - [`SessionManager`]: session creation and transitions
//! - [`EngineConfig`]: engine configuration management

pub mod capacity;
pub mod clock;
pub mod deadline;
pub mod detox;
pub mod energy;
pub mod error;
pub mod events;
pub mod fallback;
pub mod invariants;
pub mod playlist;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod storage;
pub mod task;
pub mod timeline;
pub mod trace;

pub use capacity::{task_cost, CapacityBudget, CapacityPolicy};
pub use deadline::{assess_load, LoadAssessment, TriagePlan};
pub use detox::{DetoxAssessment, DetoxPhase, DetoxTracker};
pub use energy::{is_energy_compatible, predict_energy_state, EnergyLevel, EnergyState, Stability};
pub use error::{ConfigError, CoreError, SessionTransitionError, ValidationError};
pub use events::SessionEvent;
pub use fallback::FallbackTier;
pub use invariants::{validate_playlist, InvariantId, ValidationOutcome};
pub use playlist::{Playlist, PlaylistSource};
pub use scoring::{score_task, ScoreBreakdown};
pub use selector::{generate_playlist, PlaylistRequest, SelectionLimits, SelectionOutcome};
pub use session::{
    check_progress, Session, SessionAction, SessionManager, SessionRequest, SessionState,
    UserConfirmation,
};
pub use storage::EngineConfig;
pub use task::{Effort, Impact, Pool, Task, TaskStatus, Urgency};
pub use timeline::{DayWindow, TimeConstraints};
pub use trace::DecisionTrace;
