use clap::Args;
use std::path::{Path, PathBuf};

use momentum_core::{generate_playlist, CapacityBudget, PlaylistRequest};

use super::common::{self, CmdResult, EnergyArgs};

#[derive(Args, Debug)]
pub struct PlaylistArgs {
    /// JSON file holding an array of tasks
    #[arg(long)]
    pub tasks: PathBuf,
    #[command(flatten)]
    pub energy: EnergyArgs,
    /// Decision instant (RFC 3339); defaults to now
    #[arg(long)]
    pub now: Option<String>,
    /// Session length in minutes
    #[arg(long)]
    pub session_minutes: Option<u32>,
    /// Minutes left in the day, for overload detection
    #[arg(long)]
    pub available_minutes: Option<u32>,
    /// Consecutive days the backlog age has stayed above threshold
    #[arg(long)]
    pub detox_days: Option<u32>,
    /// Comma-separated categories worked on recently
    #[arg(long)]
    pub recent: Option<String>,
    /// Ignore Detox restrictions
    #[arg(long)]
    pub proceed_anyway: bool,
    /// Capacity ledger JSON; defaults to a fresh daily budget
    #[arg(long)]
    pub budget: Option<PathBuf>,
    /// Write the updated ledger here
    #[arg(long)]
    pub budget_out: Option<PathBuf>,
    /// Print the full decision trace along with the playlist
    #[arg(long)]
    pub trace: bool,
}

pub fn run(args: PlaylistArgs, config_path: Option<&Path>) -> CmdResult {
    let config = common::load_config(config_path)?;
    let tasks = common::read_tasks(&args.tasks)?;

    let budget: CapacityBudget = match &args.budget {
        Some(path) => common::read_json(path)?,
        None => config.capacity.daily_budget(),
    };

    let mut builder = PlaylistRequest::builder()
        .tasks(tasks)
        .now(common::parse_now(args.now.as_deref())?)
        .budget(budget)
        .recent_categories(common::split_list(args.recent.as_deref()))
        .proceed_anyway(args.proceed_anyway);
    if let Some(energy) = args.energy.state() {
        builder = builder.energy(energy);
    }
    if let Some(minutes) = args.session_minutes {
        builder = builder.session_minutes(minutes);
    }
    if let Some(minutes) = args.available_minutes {
        builder = builder.available_minutes(minutes);
    }
    if let Some(days) = args.detox_days {
        builder = builder.detox_days_above(days);
    }
    let request = builder.build()?;

    let outcome = generate_playlist(&request, &config);
    if let Some(path) = &args.budget_out {
        common::write_json(path, &outcome.budget)?;
    }

    if args.trace {
        common::print_json(&outcome)
    } else {
        common::print_json(&outcome.playlist)
    }
}
