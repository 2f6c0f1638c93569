use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

use momentum_core::{
    CapacityBudget, Session, SessionAction, SessionManager, SessionRequest, UserConfirmation,
};

use super::common::{self, CmdResult, EnergyArgs};

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Bind a playlist to a time slot
    Create(CreateArgs),
    /// Begin a planned session
    Start(TransitionArgs),
    /// Close a session; requires explicit confirmation
    Complete {
        #[command(flatten)]
        target: TransitionArgs,
        /// Confirm that the session is really done
        #[arg(long)]
        confirm: bool,
    },
    /// Mark a running session as out of steam
    Exhaust(TransitionArgs),
    /// Stop a session that cannot proceed
    Block {
        #[command(flatten)]
        target: TransitionArgs,
        #[arg(long)]
        reason: String,
    },
    /// Ask whether a running session looks finished
    Check {
        /// Session JSON file
        #[arg(long)]
        session: PathBuf,
        /// Comma-separated ids of tasks already done
        #[arg(long)]
        done: Option<String>,
        /// Check instant (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// JSON file holding an array of tasks
    #[arg(long)]
    pub tasks: PathBuf,
    /// Slot start (RFC 3339)
    #[arg(long)]
    pub start: String,
    /// Slot end (RFC 3339)
    #[arg(long)]
    pub end: String,
    // Predicted from the slot hour when omitted
    #[command(flatten)]
    pub energy: EnergyArgs,
    /// Day capacity ledger JSON; defaults to a fresh daily budget
    #[arg(long)]
    pub budget: Option<PathBuf>,
    /// Comma-separated categories worked on recently
    #[arg(long)]
    pub recent: Option<String>,
    #[arg(long)]
    pub detox_days: Option<u32>,
    #[arg(long)]
    pub proceed_anyway: bool,
    /// Write the session JSON here
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TransitionArgs {
    /// Session JSON file
    #[arg(long)]
    pub session: PathBuf,
    /// Transition instant (RFC 3339); defaults to now
    #[arg(long)]
    pub at: Option<String>,
    /// Write the updated session here instead of back to --session
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(command: SessionCommand, config_path: Option<&Path>) -> CmdResult {
    let manager = SessionManager::new(common::load_config(config_path)?);

    match command {
        SessionCommand::Create(args) => create(&manager, args),
        SessionCommand::Start(target) => transition(&manager, &target, |_| SessionAction::Start),
        SessionCommand::Complete { target, confirm } => {
            if !confirm {
                return Err(
                    "completing a session requires explicit confirmation (pass --confirm)".into(),
                );
            }
            transition(&manager, &target, |at| SessionAction::Complete {
                confirmation: UserConfirmation::new(at),
            })
        }
        SessionCommand::Exhaust(target) => transition(&manager, &target, |_| SessionAction::Exhaust),
        SessionCommand::Block { target, reason } => {
            transition(&manager, &target, |_| SessionAction::Block { reason })
        }
        SessionCommand::Check { session, done, now } => {
            let session: Session = common::read_json(&session)?;
            let now = common::parse_now(now.as_deref())?;
            let done = common::split_list(done.as_deref());
            let suggestion = manager.check_progress(&session, now, &done);
            common::print_json(&suggestion)
        }
    }
}

fn create(manager: &SessionManager, args: CreateArgs) -> CmdResult {
    let tasks = common::read_tasks(&args.tasks)?;
    let start = common::parse_instant(&args.start)?;
    let end = common::parse_instant(&args.end)?;

    let day_budget: CapacityBudget = match &args.budget {
        Some(path) => common::read_json(path)?,
        None => manager.config().capacity.daily_budget(),
    };
    let mut request = SessionRequest::new(tasks, start, end).with_day_budget(day_budget);
    if let Some(energy) = args.energy.state() {
        request = request.with_energy(energy);
    }
    request.recent_categories = common::split_list(args.recent.as_deref());
    request.detox_days_above = args.detox_days;
    request.proceed_anyway = args.proceed_anyway;

    let plan = manager.create(&request)?;
    if let Some(out) = &args.out {
        common::write_json(out, &plan.session)?;
    }
    common::print_json(&plan)
}

fn transition(
    manager: &SessionManager,
    target: &TransitionArgs,
    action: impl FnOnce(DateTime<Utc>) -> SessionAction,
) -> CmdResult {
    let session: Session = common::read_json(&target.session)?;
    let at = common::parse_now(target.at.as_deref())?;
    let (next, event) = manager.transition(&session, action(at), at)?;

    let out = target.out.as_ref().unwrap_or(&target.session);
    common::write_json(out, &next)?;
    common::print_json(&event)
}
