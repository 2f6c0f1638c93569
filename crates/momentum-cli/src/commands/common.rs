//! Shared argument parsing and I/O for commands.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::path::Path;

use momentum_core::{EngineConfig, EnergyLevel, EnergyState, Stability, Task};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Load the config from an explicit file, or the default location.
///
/// An explicit path that does not exist yields defaults without writing.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(p) if p.exists() => Ok(EngineConfig::load_from(p)?),
        Some(_) => Ok(EngineConfig::default()),
        None => Ok(EngineConfig::load()?),
    }
}

/// Read a JSON array of tasks.
pub fn read_tasks(path: &Path) -> Result<Vec<Task>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let tasks: Vec<Task> = serde_json::from_str(&content)
        .map_err(|e| format!("invalid task file {}: {e}", path.display()))?;
    Ok(tasks)
}

pub fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> CmdResult {
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// RFC 3339 timestamp, or now.
pub fn parse_now(value: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match value {
        Some(raw) => parse_instant(raw),
        None => Ok(Utc::now()),
    }
}

pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| format!("invalid timestamp '{raw}': {e}"))?
        .with_timezone(&Utc))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{raw}': {e}"))?)
}

pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LevelArg {
    Low,
    Medium,
    High,
}

impl From<LevelArg> for EnergyLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Low => EnergyLevel::Low,
            LevelArg::Medium => EnergyLevel::Medium,
            LevelArg::High => EnergyLevel::High,
        }
    }
}

/// Energy snapshot flags shared by several commands.
#[derive(Args, Debug, Clone)]
pub struct EnergyArgs {
    /// Current energy level
    #[arg(long, value_enum)]
    pub energy: Option<LevelArg>,
    /// Energy is fluctuating
    #[arg(long)]
    pub volatile: bool,
    /// Confidence in the reported level (0-1)
    #[arg(long)]
    pub confidence: Option<f64>,
}

impl EnergyArgs {
    pub fn state(&self) -> Option<EnergyState> {
        let level = self.energy?;
        let stability = if self.volatile {
            Stability::Volatile
        } else {
            Stability::Stable
        };
        let state = EnergyState::new(level.into(), stability);
        Some(match self.confidence {
            Some(c) => state.with_confidence(c),
            None => state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_skips_empty() {
        assert_eq!(split_list(Some("a, b,,c ")), vec!["a", "b", "c"]);
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn energy_args_build_state() {
        let args = EnergyArgs {
            energy: Some(LevelArg::Low),
            volatile: true,
            confidence: Some(0.4),
        };
        let state = args.state().unwrap();
        assert_eq!(state.level, EnergyLevel::Low);
        assert_eq!(state.stability, Stability::Volatile);
        assert_eq!(state.confidence, Some(0.4));

        let missing = EnergyArgs {
            energy: None,
            volatile: false,
            confidence: None,
        };
        assert!(missing.state().is_none());
    }
}
