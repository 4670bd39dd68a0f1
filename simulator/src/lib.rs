//! House profitability simulator for wagerpool.
//!
//! Every simulated match runs through the real execution layer: the pool admin stakes, the
//! operator opens a match seeded with borrowed liquidity, random bettors place and cash out
//! positions, the match settles, winners claim and the owner repays the pool. The aggregated
//! [`Report`] shows how profitable the house is and how often it fails to repay its seed.

use std::path::Path;
use thiserror::Error;
use wagerpool_execution::QueryError;
use wagerpool_types::{house::HouseError, ConfigError, Genesis, GenesisConfig};

pub mod simulation;
pub mod stats;

pub use simulation::{run_match, simulate, weighted_bet_amount, MatchOutcome, SimulationConfig};
pub use stats::{Report, Stats, SweepReport};

#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("invalid genesis")]
    Genesis(#[from] ConfigError),
    #[error("{field} must be within [0, 1] (got {value})")]
    InvalidProbability { field: &'static str, value: f64 },
    #[error("{field} must not be empty or zero")]
    InvalidCount { field: &'static str },
    #[error("{step} failed: {reason}")]
    Execution { step: &'static str, reason: String },
    #[error("{step} rejected: {error}")]
    Rejected {
        step: &'static str,
        error: HouseError,
    },
    #[error("query failed")]
    Query(#[from] QueryError),
}

/// Validated genesis from `path`, or the defaults when none is given.
///
/// Roles and allocations in the file are replaced by the simulated accounts.
pub fn load_genesis(path: Option<&Path>) -> Result<Genesis, SimulatorError> {
    let config = match path {
        Some(path) => GenesisConfig::load(path)?,
        None => GenesisConfig::default(),
    };
    Ok(config.validate()?)
}
