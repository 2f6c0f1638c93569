use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "momentum-cli", version, about = "Momentum task selection CLI")]
struct Cli {
    /// Use this config file instead of ~/.config/momentum/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propose a playlist for right now
    Playlist(commands::playlist::PlaylistArgs),
    /// Check a set of tasks against the playlist invariants
    Validate(commands::validate::ValidateArgs),
    /// Session lifecycle
    Session {
        #[command(subcommand)]
        action: commands::session::SessionCommand,
    },
    /// Detect daily overload and show triage options
    Triage(commands::triage::TriageArgs),
    /// Backlog age and Detox phase
    Detox(commands::detox::DetoxArgs),
    /// Fixed blocks and free slots for a day
    Slots(commands::slots::SlotsArgs),
    /// Energy prediction
    Energy {
        #[command(subcommand)]
        action: commands::energy::EnergyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Playlist(args) => commands::playlist::run(args, config),
        Commands::Validate(args) => commands::validate::run(args, config),
        Commands::Session { action } => commands::session::run(action, config),
        Commands::Triage(args) => commands::triage::run(args, config),
        Commands::Detox(args) => commands::detox::run(args, config),
        Commands::Slots(args) => commands::slots::run(args, config),
        Commands::Energy { action } => commands::energy::run(action, config),
        Commands::Config { action } => commands::config::run(action, config),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "momentum-cli",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
