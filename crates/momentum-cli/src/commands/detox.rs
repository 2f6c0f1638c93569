use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use momentum_core::detox::{assess, task_age_index, NewTaskGate};
use momentum_core::{DetoxAssessment, DetoxTracker};

use super::common::{self, CmdResult};

#[derive(Args, Debug)]
pub struct DetoxArgs {
    /// JSON file holding an array of tasks
    #[arg(long)]
    pub tasks: PathBuf,
    /// Evaluation instant (RFC 3339); defaults to now
    #[arg(long)]
    pub now: Option<String>,
    /// Consecutive days above threshold, when not tracked in a file
    #[arg(long, conflicts_with = "tracker")]
    pub days: Option<u32>,
    /// Streak file; read if present and rewritten with today's observation
    #[arg(long)]
    pub tracker: Option<PathBuf>,
}

#[derive(Serialize)]
struct DetoxReport {
    #[serde(flatten)]
    assessment: DetoxAssessment,
    new_task_gate: NewTaskGate,
}

pub fn run(args: DetoxArgs, config_path: Option<&Path>) -> CmdResult {
    let config = common::load_config(config_path)?;
    let tasks = common::read_tasks(&args.tasks)?;
    let now = common::parse_now(args.now.as_deref())?;

    let assessment = match &args.tracker {
        Some(path) => {
            let tracker: DetoxTracker = if path.exists() {
                common::read_json(path)?
            } else {
                DetoxTracker::default()
            };
            let tai = task_age_index(&tasks, now);
            let (next, assessment) = tracker.evaluate(tai, now.date_naive(), &config.detox);
            common::write_json(path, &next)?;
            assessment
        }
        None => assess(&tasks, now, args.days.unwrap_or(0), &config.detox),
    };

    let report = DetoxReport {
        new_task_gate: assessment.new_task_gate(),
        assessment,
    };
    common::print_json(&report)
}
