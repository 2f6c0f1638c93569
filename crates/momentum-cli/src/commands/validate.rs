use clap::Args;
use std::path::{Path, PathBuf};

use momentum_core::invariants::{validate_with, InvariantContext};
use momentum_core::{validate_playlist, CoreError, Playlist, PlaylistSource};

use super::common::{self, CmdResult, EnergyArgs};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON file holding the proposed tasks, in order
    #[arg(long)]
    pub tasks: PathBuf,
    /// Candidate set the proposal was drawn from, for the quick-win rule
    #[arg(long)]
    pub candidates: Option<PathBuf>,
    #[command(flatten)]
    pub energy: EnergyArgs,
    /// Capacity ceiling; defaults to the configured daily maximum
    #[arg(long)]
    pub ceiling: Option<f64>,
}

pub fn run(args: ValidateArgs, config_path: Option<&Path>) -> CmdResult {
    let config = common::load_config(config_path)?;
    let tasks = common::read_tasks(&args.tasks)?;
    let energy = args
        .energy
        .state()
        .ok_or(CoreError::MissingInput("energy"))?;
    energy.validate()?;
    let ceiling = args.ceiling.unwrap_or(config.capacity.daily_max_load);

    let playlist = Playlist::new(
        tasks,
        energy,
        chrono::Utc::now(),
        "Submitted for validation",
        PlaylistSource::Selector,
    );

    let outcome = match &args.candidates {
        Some(path) => {
            let candidates = common::read_tasks(path)?;
            let ctx = InvariantContext::new(&candidates, &energy, ceiling, &config.selection);
            validate_with(playlist, &ctx)
        }
        None => validate_playlist(playlist, &energy, ceiling, &config.selection),
    };
    common::print_json(&outcome)
}
