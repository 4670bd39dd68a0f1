//! One match per run, played as signed transactions against a fresh in-memory chain.

use crate::{
    stats::{Report, Stats},
    SimulatorError,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeSet;
use tracing::{debug, info};
use wagerpool_execution::{
    genesis::initialize,
    mocks::Actor,
    query_balance, query_market,
    state_transition::execute_state_transition,
    Memory,
};
use wagerpool_types::{
    execution::{Event, Instruction, Output, Transaction},
    house::{Amount, Holder, MatchResult, Role, Roles, Side},
    Genesis,
};

// Privileged seeds sit far above the bettor range.
const ADMIN_SEED: u64 = 1 << 40;
const OWNER_SEED: u64 = ADMIN_SEED + 1;
const OPERATOR_SEED: u64 = ADMIN_SEED + 2;

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub runs: usize,
    pub bettors: usize,
    pub seed: u64,
    /// Principal the pool admin stakes before the match.
    pub pool_stake: Amount,
    pub early_exit_probability: f64,
    pub tie_probability: f64,
    pub borrow_percentages: Vec<u16>,
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulatorError> {
        for (field, value) in [
            ("early_exit_probability", self.early_exit_probability),
            ("tie_probability", self.tie_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SimulatorError::InvalidProbability { field, value });
            }
        }
        if self.runs == 0 {
            return Err(SimulatorError::InvalidCount { field: "runs" });
        }
        if self.bettors == 0 {
            return Err(SimulatorError::InvalidCount { field: "bettors" });
        }
        if self.borrow_percentages.is_empty() {
            return Err(SimulatorError::InvalidCount {
                field: "borrow_percentages",
            });
        }
        Ok(())
    }
}

/// What one match did to the market.
#[derive(Clone, Debug, Default)]
pub struct MatchOutcome {
    pub result: MatchResult,
    /// Stake placed by bettors.
    pub volume: Amount,
    pub payouts: Amount,
    pub cash_outs: u64,
    pub cash_out_staked: Amount,
    pub cash_out_paid: Amount,
    pub rejected: u64,
    /// Market custody left once every claim and repayment has run.
    pub market_balance: Amount,
    /// Pool debt the market could not repay.
    pub shortfall: Amount,
}

impl MatchOutcome {
    /// House profit in whole tokens; the seed is owed back to the pool.
    pub fn profit(&self) -> f64 {
        crate::stats::as_tokens(self.market_balance) - crate::stats::as_tokens(self.shortfall)
    }

    pub fn profit_percentage(&self) -> f64 {
        if self.volume == 0 {
            return 0.0;
        }
        self.profit() / crate::stats::as_tokens(self.volume) * 100.0
    }
}

/// Bet size skewed towards the maximum: `(1 - u²) * max_bet + 1`, capped at `max_bet`.
pub fn weighted_bet_amount(rng: &mut impl Rng, max_bet: Amount) -> Amount {
    let u: f64 = rng.gen();
    let scaled = ((1.0 - u * u) * max_bet as f64) as Amount;
    scaled.saturating_add(1).min(max_bet)
}

struct Chain {
    state: Memory,
    roles: Roles,
    height: u64,
}

impl Chain {
    /// Executes `txs` as the next block, one second after the previous one.
    async fn block(
        &mut self,
        step: &'static str,
        txs: Vec<Transaction>,
    ) -> Result<Vec<Event>, SimulatorError> {
        self.height += 1;
        let result = execute_state_transition(
            &mut self.state,
            &self.roles,
            self.height,
            self.height,
            txs,
        )
        .await
        .map_err(|err| SimulatorError::Execution {
            step,
            reason: format!("{err:#}"),
        })?;
        Ok(result
            .outputs
            .into_iter()
            .filter_map(|output| match output {
                Output::Event(event) => Some(event),
                _ => None,
            })
            .collect())
    }

    /// Like [`Chain::block`], but any rejection fails the run.
    async fn required(
        &mut self,
        step: &'static str,
        txs: Vec<Transaction>,
    ) -> Result<Vec<Event>, SimulatorError> {
        let events = self.block(step, txs).await?;
        if let Some(error) = events.iter().find_map(Event::rejection) {
            return Err(SimulatorError::Rejected { step, error });
        }
        Ok(events)
    }
}

fn rejected(events: &[Event]) -> u64 {
    events.iter().filter(|e| e.rejection().is_some()).count() as u64
}

fn random_result(rng: &mut StdRng, tie_probability: f64) -> MatchResult {
    if rng.gen_bool(tie_probability) {
        MatchResult::Tie
    } else if rng.gen_bool(0.5) {
        MatchResult::TeamAWin
    } else {
        MatchResult::TeamBWin
    }
}

/// Plays a single match from genesis through repayment.
pub async fn run_match(
    genesis: &Genesis,
    config: &SimulationConfig,
    borrow_percentage_bps: u16,
    rng: &mut StdRng,
) -> Result<MatchOutcome, SimulatorError> {
    let mut admin = Actor::new(ADMIN_SEED);
    let mut owner = Actor::new(OWNER_SEED);
    let mut operator = Actor::new(OPERATOR_SEED);
    let mut bettors: Vec<Actor> = (1..=config.bettors as u64).map(Actor::new).collect();

    let mut genesis = genesis.clone();
    genesis.roles = Roles::new(vec![
        (admin.public.clone(), Role::PoolAdmin),
        (owner.public.clone(), Role::MarketOwner),
        (operator.public.clone(), Role::MarketOperator),
    ]);
    let max_bet = genesis.market.max_bet_amount;
    genesis.allocations = std::iter::once((admin.public.clone(), config.pool_stake))
        .chain(bettors.iter().map(|b| (b.public.clone(), max_bet)))
        .collect();
    let mut state = Memory::default();
    initialize(&mut state, &genesis)
        .await
        .map_err(|err| SimulatorError::Execution {
            step: "genesis",
            reason: format!("{err:#}"),
        })?;
    let mut chain = Chain {
        state,
        roles: genesis.roles,
        height: 0,
    };

    // Capital
    let txs = vec![
        admin.sign(Instruction::SetBorrowingStatus {
            borrower: Holder::Market,
            allowed: true,
        }),
        admin.sign(Instruction::SetBorrowPercentage {
            bps: borrow_percentage_bps,
        }),
        admin.sign(Instruction::Approve {
            spender: Holder::Pool,
            amount: config.pool_stake,
        }),
        admin.sign(Instruction::Stake {
            amount: config.pool_stake,
        }),
    ];
    chain.required("stake", txs).await?;
    chain
        .required("start", vec![operator.sign(Instruction::StartMatch)])
        .await?;
    let match_id = query_market(&chain.state).await?.match_id;

    // Bets
    let mut outcome = MatchOutcome::default();
    let mut positions = Vec::with_capacity(bettors.len());
    let mut txs = Vec::with_capacity(bettors.len() * 2);
    for bettor in bettors.iter_mut() {
        let amount = weighted_bet_amount(rng, max_bet);
        let side = if rng.gen_bool(0.5) {
            Side::TeamA
        } else {
            Side::TeamB
        };
        txs.push(bettor.sign(Instruction::Approve {
            spender: Holder::Market,
            amount,
        }));
        txs.push(bettor.sign(Instruction::PlaceBet { side, amount }));
        positions.push((side, amount));
        outcome.volume += amount;
    }
    chain.required("bet", txs).await?;

    // Early exits
    let mut txs = Vec::new();
    for (bettor, (side, amount)) in bettors.iter_mut().zip(&positions) {
        if rng.gen_bool(config.early_exit_probability) {
            txs.push(bettor.sign(Instruction::WithdrawBet {
                side: *side,
                amount: *amount,
            }));
            outcome.cash_out_staked += amount;
        }
    }
    let events = chain.block("cash out", txs).await?;
    outcome.rejected += rejected(&events);
    let exited: BTreeSet<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::BetWithdrawn { bettor, amount, .. } => {
                outcome.cash_outs += 1;
                outcome.cash_out_paid += amount;
                Some(bettor.clone())
            }
            _ => None,
        })
        .collect();

    // Settlement
    outcome.result = random_result(rng, config.tie_probability);
    chain
        .required(
            "settle",
            vec![operator.sign(Instruction::EndMatch {
                result: outcome.result,
            })],
        )
        .await?;

    if let Some(winner) = outcome.result.winner() {
        let txs: Vec<_> = bettors
            .iter_mut()
            .zip(&positions)
            .filter(|(bettor, (side, _))| *side == winner && !exited.contains(&bettor.public))
            .map(|(bettor, _)| bettor.sign(Instruction::WithdrawAfterMatch { match_id }))
            .collect();
        let events = chain.block("claim", txs).await?;
        outcome.rejected += rejected(&events);
        outcome.payouts = events
            .iter()
            .filter_map(|event| match event {
                Event::Payout { amount, .. } => Some(*amount),
                _ => None,
            })
            .sum();
    }
    chain
        .required("repay", vec![owner.sign(Instruction::RepayPool)])
        .await?;

    outcome.market_balance = query_balance(&chain.state, &Holder::Market).await?;
    outcome.shortfall = query_market(&chain.state).await?.borrowed_from_pool;
    debug!(
        match_id,
        result = ?outcome.result,
        volume = outcome.volume,
        payouts = outcome.payouts,
        cash_outs = outcome.cash_outs,
        shortfall = outcome.shortfall,
        "match simulated"
    );
    Ok(outcome)
}

/// Runs `config.runs` matches at every borrow percentage of the sweep.
///
/// Each sweep point replays the same random stream, so differences between points come from the
/// borrow limit alone.
pub async fn simulate(genesis: &Genesis, config: &SimulationConfig) -> Result<Report, SimulatorError> {
    config.validate()?;
    let mut sweeps = Vec::with_capacity(config.borrow_percentages.len());
    for &bps in &config.borrow_percentages {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut stats = Stats::default();
        for _ in 0..config.runs {
            let outcome = run_match(genesis, config, bps, &mut rng).await?;
            stats.add(&outcome);
        }
        info!(
            borrow_percentage_bps = bps,
            runs = stats.trials(),
            mean_profit_percentage = stats.mean_profit_percentage(),
            shortfall_frequency_percentage = stats.shortfall_frequency_percentage(),
            "sweep point complete"
        );
        sweeps.push(stats.report(bps));
    }
    Ok(Report {
        seed: config.seed,
        bettors: config.bettors,
        early_exit_probability: config.early_exit_probability,
        tie_probability: config.tie_probability,
        sweeps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_runtime::deterministic::Runner;
    use commonware_runtime::Runner as _;
    use wagerpool_types::house::{HouseError, ONE};
    use wagerpool_types::GenesisConfig;

    fn genesis() -> Genesis {
        GenesisConfig::default().validate().unwrap()
    }

    fn config() -> SimulationConfig {
        SimulationConfig {
            runs: 3,
            bettors: 12,
            seed: 7,
            pool_stake: 1_000_000 * ONE,
            early_exit_probability: 0.25,
            tie_probability: 0.0,
            borrow_percentages: vec![100],
        }
    }

    #[test]
    fn weighted_bets_stay_in_range_and_skew_high() {
        let mut rng = StdRng::seed_from_u64(1);
        let max_bet = 100 * ONE;
        let mut total = 0f64;
        for _ in 0..1_000 {
            let amount = weighted_bet_amount(&mut rng, max_bet);
            assert!((1..=max_bet).contains(&amount));
            total += amount as f64 / max_bet as f64;
        }
        // E[1 - u²] = 2/3
        let mean = total / 1_000.0;
        assert!((mean - 2.0 / 3.0).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn same_seed_same_report() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let genesis = genesis();
            let first = simulate(&genesis, &config()).await.unwrap();
            let second = simulate(&genesis, &config()).await.unwrap();
            assert_eq!(first, second);
            assert_eq!(first.sweeps.len(), 1);
            assert_eq!(first.sweeps[0].runs, 3);
            assert!(first.sweeps[0].mean_volume > 0.0);
        });
    }

    #[test]
    fn ties_leave_every_stake_with_the_house() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let config = SimulationConfig {
                early_exit_probability: 0.0,
                tie_probability: 1.0,
                ..config()
            };
            let mut rng = StdRng::seed_from_u64(config.seed);
            let outcome = run_match(&genesis(), &config, 100, &mut rng).await.unwrap();

            assert_eq!(outcome.result, MatchResult::Tie);
            assert_eq!(outcome.payouts, 0);
            assert_eq!(outcome.cash_outs, 0);
            assert_eq!(outcome.shortfall, 0);
            assert_eq!(outcome.market_balance, outcome.volume);
            assert_eq!(outcome.profit_percentage(), 100.0);
        });
    }

    #[test]
    fn settled_matches_account_for_every_token() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let config = SimulationConfig {
                early_exit_probability: 0.5,
                ..config()
            };
            let mut rng = StdRng::seed_from_u64(config.seed);
            for _ in 0..3 {
                let outcome = run_match(&genesis(), &config, 100, &mut rng).await.unwrap();
                assert_ne!(outcome.result, MatchResult::Tie);
                assert_eq!(outcome.rejected, 0);

                // The market starts empty and borrows the seed, so what it keeps plus what it
                // paid out is the stake it took in plus whatever it still owes the pool.
                let seed = genesis().market.seed_per_side().unwrap() * 2;
                let repaid = seed - outcome.shortfall;
                assert_eq!(
                    outcome.market_balance + outcome.payouts + outcome.cash_out_paid + repaid,
                    outcome.volume + seed
                );
            }
        });
    }

    #[test]
    fn seed_above_borrow_limit_fails_the_run() {
        let executor = Runner::default();
        executor.start(|_| async move {
            let config = SimulationConfig {
                borrow_percentages: vec![0],
                ..config()
            };
            let err = simulate(&genesis(), &config).await.unwrap_err();
            assert!(matches!(
                err,
                SimulatorError::Rejected {
                    step: "start",
                    error: HouseError::ExceedsBorrowLimit
                }
            ));
        });
    }

    #[test]
    fn invalid_config_is_refused() {
        let bad = SimulationConfig {
            early_exit_probability: 1.5,
            ..config()
        };
        assert!(matches!(
            bad.validate(),
            Err(SimulatorError::InvalidProbability {
                field: "early_exit_probability",
                ..
            })
        ));
        let bad = SimulationConfig {
            runs: 0,
            ..config()
        };
        assert!(matches!(
            bad.validate(),
            Err(SimulatorError::InvalidCount { field: "runs" })
        ));
    }
}
