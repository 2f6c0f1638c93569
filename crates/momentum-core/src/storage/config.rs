//! TOML-based engine configuration.
//!
//! Groups every tunable threshold:
//! - Playlist shape (task counts, quick-win and micro-task sizes)
//! - Capacity budgets
//! - Pool caps and the SOON horizon
//! - Detox and triage thresholds
//! - Working-day window and transition buffer
//! - Per-user energy overrides
//!
//! Scoring weights are deliberately absent; they are fixed.
//!
//! Configuration is stored at `~/.config/momentum/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::capacity::CapacityPolicy;
use crate::deadline::TriagePolicy;
use crate::detox::DetoxPolicy;
use crate::energy::EnergyPattern;
use crate::error::{ConfigError, Result};
use crate::selector::SelectionLimits;
use crate::task::PoolLimits;
use crate::timeline::DayWindow;

/// Soft real-time expectations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformanceConfig {
    /// Decisions slower than this are logged, never aborted
    #[serde(default = "default_soft_budget_ms")]
    pub soft_budget_ms: u64,
}

fn default_soft_budget_ms() -> u64 {
    100
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            soft_budget_ms: default_soft_budget_ms(),
        }
    }
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/momentum/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub selection: SelectionLimits,
    #[serde(default)]
    pub capacity: CapacityPolicy,
    #[serde(default)]
    pub pools: PoolLimits,
    #[serde(default)]
    pub detox: DetoxPolicy,
    #[serde(default)]
    pub triage: TriagePolicy,
    #[serde(default)]
    pub day: DayWindow,
    #[serde(default)]
    pub energy: EnergyPattern,
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl EngineConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        if key.is_empty() {
            return Err(unknown());
        }
        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }
        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => {
                if let Ok(n) = value.parse::<u64>() {
                    serde_json::Value::Number(n.into())
                } else if let Ok(n) = value.parse::<f64>() {
                    serde_json::Number::from_f64(n)
                        .map(serde_json::Value::Number)
                        .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                } else {
                    return Err(invalid(format!("cannot parse '{value}' as number")));
                }
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    /// Default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load from an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let cfg: EngineConfig = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
        cfg.day.validate()?;
        Ok(cfg)
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// existing type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: EngineConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.day.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: EngineConfig = toml::from_str("[selection]\nmax_tasks = 4\n").unwrap();
        assert_eq!(parsed.selection.max_tasks, 4);
        assert_eq!(parsed.selection.micro_max_tasks, 7);
        assert_eq!(parsed.pools.available_cap, 10);
        assert_eq!(parsed.performance.soft_budget_ms, 100);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.get("selection.max_tasks").as_deref(), Some("5"));
        assert_eq!(cfg.get("day.start").as_deref(), Some("08:00"));
        assert_eq!(cfg.get("detox.tai_threshold").as_deref(), Some("2.0"));
        assert!(cfg.get("selection.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = EngineConfig::default();
        cfg.set("capacity.daily_max_load", "8.5").unwrap();
        cfg.set("pools.soon_cap", "4").unwrap();
        cfg.set("day.end", "20:30").unwrap();
        assert_eq!(cfg.capacity.daily_max_load, 8.5);
        assert_eq!(cfg.pools.soon_cap, 4);
        assert_eq!(cfg.get("day.end").as_deref(), Some("20:30"));
    }

    #[test]
    fn set_accepts_integer_for_float_field() {
        let mut cfg = EngineConfig::default();
        cfg.set("capacity.daily_max_load", "12").unwrap();
        assert_eq!(cfg.capacity.daily_max_load, 12.0);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = EngineConfig::default();
        let err = cfg.set("selection.nonexistent", "1").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("selection.max_tasks", "many").is_err());
        assert!(cfg.set("day.start", "25:00").is_err());
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn set_rejects_inverted_day() {
        let mut cfg = EngineConfig::default();
        assert!(cfg.set("day.end", "07:00").is_err());
    }

    #[test]
    fn save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = EngineConfig::default();
        cfg.set("triage.survival_cap", "2").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.triage.survival_cap, 2);
    }

    #[test]
    fn load_from_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "selection = 3").unwrap();
        let err = EngineConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
