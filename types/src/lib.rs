pub mod execution;
pub mod genesis;
pub mod house;

pub use execution::{Event, Instruction, Key, Output, Transaction, Value, NAMESPACE};
pub use genesis::{ConfigError, Genesis, GenesisConfig};
