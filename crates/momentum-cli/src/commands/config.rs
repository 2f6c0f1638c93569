use clap::Subcommand;
use std::path::{Path, PathBuf};

use momentum_core::EngineConfig;

use super::common::{self, CmdResult};

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "selection.max_tasks", "day.start")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Print the config file location
    Path,
}

fn target_path(config_path: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match config_path {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(EngineConfig::path()?),
    }
}

pub fn run(action: ConfigAction, config_path: Option<&Path>) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let config = common::load_config(config_path)?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = common::load_config(config_path)?;
            config.set(&key, &value)?;
            config.save_to(&target_path(config_path)?)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = common::load_config(config_path)?;
            common::print_json(&config)?;
        }
        ConfigAction::Reset => {
            EngineConfig::default().save_to(&target_path(config_path)?)?;
            println!("config reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", target_path(config_path)?.display());
        }
    }
    Ok(())
}
