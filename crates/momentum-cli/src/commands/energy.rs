use chrono::Timelike;
use clap::Subcommand;
use serde::Serialize;
use std::path::Path;

use momentum_core::energy::DayPeriod;
use momentum_core::EnergyState;

use super::common::{self, CmdResult};

#[derive(Subcommand, Debug)]
pub enum EnergyAction {
    /// Predict energy for an hour of the day
    Predict {
        /// Hour 0-23; defaults to the current UTC hour
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
        hour: Option<u8>,
        /// Ignore configured overrides
        #[arg(long)]
        defaults_only: bool,
    },
    /// Show the predicted energy for every hour
    Curve,
}

#[derive(Serialize)]
struct HourPrediction {
    hour: u8,
    period: DayPeriod,
    #[serde(flatten)]
    state: EnergyState,
}

pub fn run(action: EnergyAction, config_path: Option<&Path>) -> CmdResult {
    let config = common::load_config(config_path)?;

    match action {
        EnergyAction::Predict {
            hour,
            defaults_only,
        } => {
            let hour = match hour {
                Some(h) => h,
                None => chrono::Utc::now().hour() as u8,
            };
            let state = if defaults_only {
                momentum_core::predict_energy_state(hour)
            } else {
                config.energy.predict(hour)
            };
            common::print_json(&HourPrediction {
                hour,
                period: DayPeriod::from_hour(hour),
                state,
            })
        }
        EnergyAction::Curve => {
            let curve: Vec<HourPrediction> = (0..24u8)
                .map(|hour| HourPrediction {
                    hour,
                    period: DayPeriod::from_hour(hour),
                    state: config.energy.predict(hour),
                })
                .collect();
            common::print_json(&curve)
        }
    }
}
