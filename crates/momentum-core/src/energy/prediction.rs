//! Circadian energy prediction.
//!
//! A default table maps each period of the day to an expected energy state.
//! Users may layer hour-range overrides on top of it.

use serde::{Deserialize, Serialize};

use super::{EnergyLevel, EnergyState, Stability};

/// Coarse period of the day used by the default table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    /// 06:00-10:59
    Morning,
    /// 11:00-13:59
    Midday,
    /// 14:00-17:59
    Afternoon,
    /// 18:00-21:59
    Evening,
    /// 22:00-05:59
    Night,
}

impl DayPeriod {
    pub fn from_hour(hour: u8) -> Self {
        match hour % 24 {
            6..=10 => DayPeriod::Morning,
            11..=13 => DayPeriod::Midday,
            14..=17 => DayPeriod::Afternoon,
            18..=21 => DayPeriod::Evening,
            _ => DayPeriod::Night,
        }
    }

    /// Default expected energy for this period.
    pub fn default_state(self) -> EnergyState {
        match self {
            DayPeriod::Morning => {
                EnergyState::new(EnergyLevel::Medium, Stability::Stable).with_confidence(0.7)
            }
            DayPeriod::Midday => {
                EnergyState::new(EnergyLevel::High, Stability::Stable).with_confidence(0.8)
            }
            DayPeriod::Afternoon => {
                EnergyState::new(EnergyLevel::Medium, Stability::Volatile).with_confidence(0.5)
            }
            DayPeriod::Evening => {
                EnergyState::new(EnergyLevel::Low, Stability::Stable).with_confidence(0.7)
            }
            DayPeriod::Night => {
                EnergyState::new(EnergyLevel::Low, Stability::Volatile).with_confidence(0.3)
            }
        }
    }
}

/// User-specific energy for an hour range `[start_hour, end_hour)`.
///
/// Ranges where `end_hour <= start_hour` wrap past midnight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnergyOverride {
    pub start_hour: u8,
    pub end_hour: u8,
    pub level: EnergyLevel,
    #[serde(default)]
    pub stability: Stability,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl EnergyOverride {
    pub fn covers(&self, hour: u8) -> bool {
        let hour = hour % 24;
        if self.start_hour < self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    fn state(&self) -> EnergyState {
        EnergyState {
            level: self.level,
            stability: self.stability,
            confidence: self.confidence,
        }
    }
}

/// Default circadian table plus user overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnergyPattern {
    /// Checked in order; first covering override wins.
    #[serde(default)]
    pub overrides: Vec<EnergyOverride>,
}

impl EnergyPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, entry: EnergyOverride) -> Self {
        self.overrides.push(entry);
        self
    }

    /// Predict the energy state for an hour of the day (0-23).
    pub fn predict(&self, hour_of_day: u8) -> EnergyState {
        self.overrides
            .iter()
            .find(|o| o.covers(hour_of_day))
            .map(EnergyOverride::state)
            .unwrap_or_else(|| DayPeriod::from_hour(hour_of_day).default_state())
    }
}

/// Predict energy from the default table only.
pub fn predict_energy_state(hour_of_day: u8) -> EnergyState {
    DayPeriod::from_hour(hour_of_day).default_state()
}
