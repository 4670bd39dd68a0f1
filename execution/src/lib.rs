//! Wagerpool execution layer.
//!
//! This crate contains the deterministic transaction execution logic (`Layer`) for the stake pool
//! and the wagering market, the block state transition, and read-only queries.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution; the block timestamp is the only clock.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Atomicity
//! Every transaction runs against the layer's pending overlay. A handler failing with a
//! [`wagerpool_types::house::HouseError`] discards the transaction's writes and emits a
//! rejection event; any other error aborts the block.
//!
//! The primary entrypoint is [`state_transition::execute_state_transition`].
//!
//! ## Minimal execution pipeline (example)
//! ```rust,ignore
//! use wagerpool_execution::{genesis::initialize, state_transition::execute_state_transition};
//! use wagerpool_types::GenesisConfig;
//!
//! let genesis = GenesisConfig::load("genesis.yaml")?.validate()?;
//! initialize(&mut state, &genesis).await?;
//! // Height must be exactly `committed_height + 1`.
//! let result = execute_state_transition(&mut state, &genesis.roles, 1, timestamp, txs).await?;
//! ```

pub mod genesis;
pub mod ledger;
pub mod query;
pub mod state_transition;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod layer;

mod state;

pub use layer::Layer;
pub use ledger::Ledger;
pub use query::{
    query_balance, query_bet, query_borrower, query_cash_out, query_earned, query_market,
    query_odds, query_pool, query_reward_per_token, query_settlement, query_staker, QueryError,
};
pub use state::{committed, nonce, PrepareError, State, Status};

#[cfg(any(test, feature = "mocks"))]
pub use state::Memory;
