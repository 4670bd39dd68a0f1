//! House domain types.
//!
//! Defines the stake pool, wagering market, ledger, role and error types used by the execution
//! layer and clients.

mod constants;
mod error;
mod fixed;
mod ledger;
mod market;
mod pool;
mod roles;

pub use constants::*;
pub use error::*;
pub use fixed::*;
pub use ledger::*;
pub use market::*;
pub use pool::*;
pub use roles::*;
