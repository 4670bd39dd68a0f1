use anyhow::{Context, Result};
use clap::Parser;
use rand::{rngs::OsRng, RngCore};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};
use wagerpool_simulator::{load_genesis, simulate, SimulationConfig};
use wagerpool_types::house::ONE;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Genesis YAML supplying pool and market parameters (defaults when omitted).
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Matches simulated per borrow percentage.
    #[arg(long, default_value_t = 100)]
    runs: usize,

    /// Bettors per match, each placing one bet.
    #[arg(long, default_value_t = 1_000)]
    bettors: usize,

    /// Seed for the random stream (random when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Tokens the pool admin stakes before each match.
    #[arg(long, default_value_t = 1_000_000)]
    pool_stake: u64,

    /// Chance that a bettor cashes out before the match ends.
    #[arg(long, default_value_t = 0.0)]
    early_exit_probability: f64,

    /// Chance that a match ends in a tie.
    #[arg(long, default_value_t = 0.0)]
    tie_probability: f64,

    /// Pool borrow limits to sweep, in basis points of the total stake.
    #[arg(long, value_delimiter = ',', default_value = "50,100,200,500")]
    borrow_percentages: Vec<u16>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> SimulationConfig {
        SimulationConfig {
            runs: self.runs,
            bettors: self.bettors,
            seed: self.seed.unwrap_or_else(|| OsRng.next_u64()),
            pool_stake: self.pool_stake as u128 * ONE,
            early_exit_probability: self.early_exit_probability,
            tie_probability: self.tie_probability,
            borrow_percentages: self.borrow_percentages.clone(),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = Level::from_str(&args.log_level).context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let genesis = load_genesis(args.genesis.as_deref()).context("load genesis")?;
    let config = args.config();
    info!(
        seed = config.seed,
        runs = config.runs,
        bettors = config.bettors,
        "starting simulation"
    );
    let report = futures::executor::block_on(simulate(&genesis, &config))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize report")?
    );
    Ok(())
}
