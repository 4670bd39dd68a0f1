//! Genesis configuration.
//!
//! A raw [`GenesisConfig`] is read from YAML and validated into a [`Genesis`], which constructs the
//! pool and market instances and the role allow-list.

use crate::house::{
    Amount, Market, Role, Roles, StakePool, BASIS_POINTS, DEFAULT_BORROW_PERCENTAGE_BPS,
    DEFAULT_EARLY_WITHDRAWAL_PERCENT, DEFAULT_IMPLIED_PROBABILITY, DEFAULT_MAX_BET_TOKENS,
    DEFAULT_REWARDS_DURATION_SECS, MAX_IMPLIED_PROBABILITY, MIN_IMPLIED_PROBABILITY, ONE,
};
use commonware_codec::DecodeExt;
use commonware_cryptography::ed25519::PublicKey;
use commonware_utils::from_hex_formatted;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be hex: {value}")]
    InvalidHex { field: &'static str, value: String },
    #[error("{field} is invalid: {value}")]
    InvalidDecode {
        field: &'static str,
        value: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} must be within [{min}, {max}] (got {value})")]
    InvalidRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
    #[error("{field} overflows token precision: {value}")]
    InvalidTokens { field: &'static str, value: u64 },
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse genesis yaml")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoleGrantConfig {
    pub public_key: String,
    pub role: Role,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub public_key: String,
    pub tokens: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub borrow_percentage_bps: u16,
    pub rewards_duration_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            borrow_percentage_bps: DEFAULT_BORROW_PERCENTAGE_BPS,
            rewards_duration_secs: DEFAULT_REWARDS_DURATION_SECS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub max_bet_tokens: u64,
    pub implied_probability: u16,
    pub early_withdrawal_percent: u8,
    /// Whitelists the market as a pool borrower at genesis.
    pub market_can_borrow: bool,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            max_bet_tokens: DEFAULT_MAX_BET_TOKENS,
            implied_probability: DEFAULT_IMPLIED_PROBABILITY,
            early_withdrawal_percent: DEFAULT_EARLY_WITHDRAWAL_PERCENT,
            market_can_borrow: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    pub roles: Vec<RoleGrantConfig>,
    pub pool: PoolConfig,
    pub market: MarketConfig,
    pub allocations: Vec<AllocationConfig>,
}

/// Validated genesis: the initial pool, market, roles and balances.
#[derive(Clone, Debug)]
pub struct Genesis {
    pub roles: Roles,
    pub pool: StakePool,
    pub market: Market,
    pub market_can_borrow: bool,
    pub allocations: Vec<(PublicKey, Amount)>,
}

fn decode_public_key(field: &'static str, value: &str) -> Result<PublicKey, ConfigError> {
    let bytes = from_hex_formatted(value).ok_or_else(|| ConfigError::InvalidHex {
        field,
        value: value.to_string(),
    })?;
    PublicKey::decode(bytes.as_ref()).map_err(|source| ConfigError::InvalidDecode {
        field,
        value: value.to_string(),
        source,
    })
}

fn ensure_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::InvalidRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn tokens(field: &'static str, value: u64) -> Result<Amount, ConfigError> {
    (value as u128)
        .checked_mul(ONE)
        .ok_or(ConfigError::InvalidTokens { field, value })
}

impl GenesisConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn validate(self) -> Result<Genesis, ConfigError> {
        let mut roles = Roles::default();
        for grant in &self.roles {
            roles.grant(
                decode_public_key("roles.public_key", &grant.public_key)?,
                grant.role,
            );
        }

        ensure_range(
            "pool.borrow_percentage_bps",
            self.pool.borrow_percentage_bps as u64,
            0,
            BASIS_POINTS as u64,
        )?;
        if self.pool.rewards_duration_secs == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "pool.rewards_duration_secs",
                value: 0,
            });
        }
        ensure_range(
            "market.implied_probability",
            self.market.implied_probability as u64,
            MIN_IMPLIED_PROBABILITY as u64,
            MAX_IMPLIED_PROBABILITY as u64,
        )?;
        ensure_range(
            "market.early_withdrawal_percent",
            self.market.early_withdrawal_percent as u64,
            0,
            100,
        )?;
        if self.market.max_bet_tokens == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "market.max_bet_tokens",
                value: 0,
            });
        }

        let mut allocations = Vec::with_capacity(self.allocations.len());
        for allocation in &self.allocations {
            allocations.push((
                decode_public_key("allocations.public_key", &allocation.public_key)?,
                tokens("allocations.tokens", allocation.tokens)?,
            ));
        }

        Ok(Genesis {
            roles,
            pool: StakePool::new(
                self.pool.rewards_duration_secs,
                self.pool.borrow_percentage_bps,
            ),
            market: Market::new(
                tokens("market.max_bet_tokens", self.market.max_bet_tokens)?,
                self.market.implied_probability,
                self.market.early_withdrawal_percent as u16 * 100,
            ),
            market_can_borrow: self.market.market_can_borrow,
            allocations,
        })
    }
}
