use crate::simulation::MatchOutcome;
use serde::Serialize;
use wagerpool_types::house::{Amount, ONE};

/// Whole tokens as a float, for reporting only.
pub fn as_tokens(amount: Amount) -> f64 {
    amount as f64 / ONE as f64
}

/// Running totals over the matches simulated at one borrow percentage.
#[derive(Clone, Debug, Default)]
pub struct Stats {
    trials: u64,
    total_profit_pct: f64,
    total_profit_pct_sq: f64,
    total_volume: f64,
    shortfalls: u64,
    total_shortfall: f64,
    max_shortfall: f64,
    cash_outs: u64,
    cash_out_staked: f64,
    cash_out_paid: f64,
    payouts: f64,
    rejected: u64,
}

impl Stats {
    pub fn add(&mut self, outcome: &MatchOutcome) {
        let profit_pct = outcome.profit_percentage();
        let shortfall = as_tokens(outcome.shortfall);
        self.trials += 1;
        self.total_profit_pct += profit_pct;
        self.total_profit_pct_sq += profit_pct * profit_pct;
        self.total_volume += as_tokens(outcome.volume);
        if outcome.shortfall > 0 {
            self.shortfalls += 1;
        }
        self.total_shortfall += shortfall;
        self.max_shortfall = self.max_shortfall.max(shortfall);
        self.cash_outs += outcome.cash_outs;
        self.cash_out_staked += as_tokens(outcome.cash_out_staked);
        self.cash_out_paid += as_tokens(outcome.cash_out_paid);
        self.payouts += as_tokens(outcome.payouts);
        self.rejected += outcome.rejected;
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    fn per_trial(&self, total: f64) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            total / self.trials as f64
        }
    }

    pub fn mean_profit_percentage(&self) -> f64 {
        self.per_trial(self.total_profit_pct)
    }

    /// Population standard deviation of the per-match profit percentage.
    pub fn stddev_profit_percentage(&self) -> f64 {
        if self.trials <= 1 {
            return 0.0;
        }
        let mean = self.mean_profit_percentage();
        let var = self.per_trial(self.total_profit_pct_sq) - mean * mean;
        var.max(0.0).sqrt()
    }

    pub fn shortfall_frequency_percentage(&self) -> f64 {
        self.per_trial(self.shortfalls as f64) * 100.0
    }

    pub fn report(&self, borrow_percentage_bps: u16) -> SweepReport {
        SweepReport {
            borrow_percentage_bps,
            runs: self.trials,
            mean_profit_percentage: self.mean_profit_percentage(),
            stddev_profit_percentage: self.stddev_profit_percentage(),
            mean_volume: self.per_trial(self.total_volume),
            shortfall_frequency_percentage: self.shortfall_frequency_percentage(),
            mean_shortfall: self.per_trial(self.total_shortfall),
            max_shortfall: self.max_shortfall,
            cash_outs: self.cash_outs,
            cash_out_staked: self.cash_out_staked,
            cash_out_paid: self.cash_out_paid,
            payouts: self.payouts,
            rejected: self.rejected,
        }
    }
}

/// Aggregates for one point of the borrow-percentage sweep. Amounts are in whole tokens.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepReport {
    pub borrow_percentage_bps: u16,
    pub runs: u64,
    pub mean_profit_percentage: f64,
    pub stddev_profit_percentage: f64,
    pub mean_volume: f64,
    pub shortfall_frequency_percentage: f64,
    pub mean_shortfall: f64,
    pub max_shortfall: f64,
    pub cash_outs: u64,
    pub cash_out_staked: f64,
    pub cash_out_paid: f64,
    pub payouts: f64,
    /// Cash-outs and claims the market refused.
    pub rejected: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub seed: u64,
    pub bettors: usize,
    pub early_exit_probability: f64,
    pub tie_probability: f64,
    pub sweeps: Vec<SweepReport>,
}
