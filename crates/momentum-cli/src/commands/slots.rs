use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use momentum_core::timeline::FreeSlot;
use momentum_core::{Task, TimeConstraints};

use super::common::{self, CmdResult};

#[derive(Args, Debug)]
pub struct SlotsArgs {
    /// JSON file holding an array of tasks
    #[arg(long)]
    pub tasks: PathBuf,
    /// Day to resolve (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub date: Option<String>,
    /// List movable tasks that fit each slot
    #[arg(long)]
    pub candidates: bool,
}

#[derive(Serialize)]
struct SlotCandidates<'a> {
    slot: &'a FreeSlot,
    task_ids: Vec<String>,
}

#[derive(Serialize)]
struct SlotsReport<'a> {
    #[serde(flatten)]
    constraints: &'a TimeConstraints,
    free_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidates: Option<Vec<SlotCandidates<'a>>>,
}

pub fn run(args: SlotsArgs, config_path: Option<&Path>) -> CmdResult {
    let config = common::load_config(config_path)?;
    let tasks = common::read_tasks(&args.tasks)?;
    let day = match &args.date {
        Some(raw) => common::parse_date(raw)?,
        None => chrono::Utc::now().date_naive(),
    };

    let constraints = TimeConstraints::for_day(&tasks, day, &config.day)?;
    let candidates = args.candidates.then(|| {
        constraints
            .slots
            .iter()
            .map(|slot| SlotCandidates {
                slot,
                task_ids: constraints
                    .candidates_for(slot, &tasks)
                    .into_iter()
                    .map(|t: Task| t.id)
                    .collect(),
            })
            .collect()
    });

    common::print_json(&SlotsReport {
        constraints: &constraints,
        free_minutes: constraints.free_minutes(),
        candidates,
    })
}
