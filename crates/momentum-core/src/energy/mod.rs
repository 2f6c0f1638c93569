//! Energy model.
//!
//! Normalizes the user's self-reported energy, judges whether a task's effort
//! fits it, and predicts energy for a time slot from a circadian table.

mod prediction;

pub use prediction::{predict_energy_state, DayPeriod, EnergyOverride, EnergyPattern};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::task::Effort;

/// Self-reported energy level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    /// Highest effort this level can sustain.
    pub fn max_effort(self) -> Effort {
        match self {
            EnergyLevel::Low => Effort::Low,
            EnergyLevel::Medium => Effort::Medium,
            EnergyLevel::High => Effort::High,
        }
    }
}

impl Default for EnergyLevel {
    fn default() -> Self {
        EnergyLevel::Medium
    }
}

/// Whether the energy level is holding steady.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Volatile,
}

impl Stability {
    /// Cost multiplier; never affects compatibility.
    pub fn penalty(self) -> f64 {
        match self {
            Stability::Stable => 1.0,
            Stability::Volatile => 1.3,
        }
    }
}

impl Default for Stability {
    fn default() -> Self {
        Stability::Stable
    }
}

/// Immutable energy snapshot for one decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EnergyState {
    pub level: EnergyLevel,
    #[serde(default)]
    pub stability: Stability,
    /// Confidence in [0, 1], when known
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl EnergyState {
    pub fn new(level: EnergyLevel, stability: Stability) -> Self {
        Self {
            level,
            stability,
            confidence: None,
        }
    }

    pub fn stable(level: EnergyLevel) -> Self {
        Self::new(level, Stability::Stable)
    }

    pub fn volatile(level: EnergyLevel) -> Self {
        Self::new(level, Stability::Volatile)
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Reject confidence values outside [0, 1].
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.confidence {
            Some(c) if !(0.0..=1.0).contains(&c) || c.is_nan() => {
                Err(ValidationError::InvalidValue {
                    field: "energy.confidence".into(),
                    message: format!("must be within [0, 1], got {c}"),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn stability_penalty(&self) -> f64 {
        self.stability.penalty()
    }

    pub fn is_compatible(&self, effort: Effort) -> bool {
        is_energy_compatible(effort, self)
    }
}

/// Low energy takes only low effort, medium takes up to medium, high takes anything.
pub fn is_energy_compatible(effort: Effort, energy: &EnergyState) -> bool {
    effort <= energy.level.max_effort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatibility_table() {
        let low = EnergyState::stable(EnergyLevel::Low);
        let medium = EnergyState::stable(EnergyLevel::Medium);
        let high = EnergyState::stable(EnergyLevel::High);

        assert!(is_energy_compatible(Effort::Low, &low));
        assert!(!is_energy_compatible(Effort::Medium, &low));
        assert!(!is_energy_compatible(Effort::High, &low));

        assert!(is_energy_compatible(Effort::Low, &medium));
        assert!(is_energy_compatible(Effort::Medium, &medium));
        assert!(!is_energy_compatible(Effort::High, &medium));

        assert!(is_energy_compatible(Effort::High, &high));
    }

    #[test]
    fn volatility_changes_cost_not_compatibility() {
        let volatile = EnergyState::volatile(EnergyLevel::Medium);
        assert_eq!(volatile.stability_penalty(), 1.3);
        assert!(volatile.is_compatible(Effort::Medium));
        assert_eq!(EnergyState::stable(EnergyLevel::Medium).stability_penalty(), 1.0);
    }

    #[test]
    fn confidence_must_be_a_probability() {
        assert!(EnergyState::stable(EnergyLevel::Low).with_confidence(0.4).validate().is_ok());
        assert!(EnergyState::stable(EnergyLevel::Low).with_confidence(1.4).validate().is_err());
        assert!(EnergyState::stable(EnergyLevel::Low).with_confidence(-0.1).validate().is_err());
        assert!(EnergyState::stable(EnergyLevel::Low).validate().is_ok());
    }

    #[test]
    fn stability_defaults_to_stable_when_omitted() {
        let state: EnergyState = serde_json::from_str(r#"{"level":"high"}"#).unwrap();
        assert_eq!(state.stability, Stability::Stable);
        assert!(state.confidence.is_none());
    }
}
