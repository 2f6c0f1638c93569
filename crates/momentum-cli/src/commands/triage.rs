use clap::Args;
use std::path::{Path, PathBuf};

use momentum_core::assess_load;

use super::common::{self, CmdResult};

#[derive(Args, Debug)]
pub struct TriageArgs {
    /// JSON file holding an array of tasks
    #[arg(long)]
    pub tasks: PathBuf,
    /// Minutes available for work today
    #[arg(long)]
    pub available_minutes: u32,
    /// Load ratio above which triage activates; defaults to the config value
    #[arg(long)]
    pub threshold: Option<f64>,
}

pub fn run(args: TriageArgs, config_path: Option<&Path>) -> CmdResult {
    let config = common::load_config(config_path)?;
    let tasks = common::read_tasks(&args.tasks)?;
    let threshold = args
        .threshold
        .unwrap_or(config.triage.load_ratio_threshold);

    let assessment = assess_load(&tasks, args.available_minutes, threshold);
    common::print_json(&assessment)
}
