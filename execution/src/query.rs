//! Read-only views over pool and market state.
//!
//! Queries never write, so they may run against committed state or an in-flight [`crate::Layer`].
//!
//! ```rust,ignore
//! use wagerpool_execution::query::{query_earned, query_odds};
//!
//! let (odds_a, odds_b) = query_odds(&state).await?;
//! let pending = query_earned(&state, &staker, now).await?;
//! ```

use commonware_cryptography::ed25519::PublicKey;
use wagerpool_types::execution::{Key, Value};
use wagerpool_types::house::{
    cash_out_value, Amount, Bet, Borrower, Holder, HouseError, Market, Settlement, Side,
    StakePool, Staker,
};

use crate::state::State;

/// Error during queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Pool or market was never written by genesis.
    NotInitialized(&'static str),
    /// No settlement recorded for the match.
    SettlementNotFound(u64),
    /// The quoted operation would be rejected.
    Rejected(HouseError),
    /// State access error.
    StateError(String),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized(what) => write!(f, "{what} not initialized"),
            Self::SettlementNotFound(match_id) => {
                write!(f, "no settlement for match {match_id}")
            }
            Self::Rejected(error) => write!(f, "rejected: {error}"),
            Self::StateError(msg) => write!(f, "state error: {msg}"),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<HouseError> for QueryError {
    fn from(error: HouseError) -> Self {
        Self::Rejected(error)
    }
}

pub async fn query_pool<S: State>(state: &S) -> Result<StakePool, QueryError> {
    match load(state, &Key::Pool).await? {
        Some(Value::Pool(pool)) => Ok(pool),
        Some(_) => Err(unexpected("pool")),
        None => Err(QueryError::NotInitialized("pool")),
    }
}

pub async fn query_staker<S: State>(state: &S, staker: &PublicKey) -> Result<Staker, QueryError> {
    match load(state, &Key::Staker(staker.clone())).await? {
        Some(Value::Staker(record)) => Ok(record),
        Some(_) => Err(unexpected("staker")),
        None => Ok(Staker::default()),
    }
}

/// Reward-per-token accumulator as it would read at `now`.
pub async fn query_reward_per_token<S: State>(state: &S, now: u64) -> Result<u128, QueryError> {
    Ok(query_pool(state).await?.reward_per_token(now)?)
}

/// Rewards `staker` could claim at `now`, including accrual since the last checkpoint.
pub async fn query_earned<S: State>(
    state: &S,
    staker: &PublicKey,
    now: u64,
) -> Result<Amount, QueryError> {
    let reward_per_token = query_reward_per_token(state, now).await?;
    Ok(query_staker(state, staker)
        .await?
        .earned(reward_per_token)?)
}

pub async fn query_borrower<S: State>(
    state: &S,
    borrower: &Holder,
) -> Result<Borrower, QueryError> {
    match load(state, &Key::Borrower(borrower.clone())).await? {
        Some(Value::Borrower(record)) => Ok(record),
        Some(_) => Err(unexpected("borrower")),
        None => Ok(Borrower::default()),
    }
}

pub async fn query_market<S: State>(state: &S) -> Result<Market, QueryError> {
    match load(state, &Key::Market).await? {
        Some(Value::Market(market)) => Ok(market),
        Some(_) => Err(unexpected("market")),
        None => Err(QueryError::NotInitialized("market")),
    }
}

/// Current `(team_a, team_b)` decimal odds, scaled by `ONE`.
pub async fn query_odds<S: State>(state: &S) -> Result<(u128, u128), QueryError> {
    let market = query_market(state).await?;
    Ok((market.odds(Side::TeamA)?, market.odds(Side::TeamB)?))
}

pub async fn query_bet<S: State>(
    state: &S,
    match_id: u64,
    bettor: &PublicKey,
) -> Result<Bet, QueryError> {
    match load(state, &Key::Bet(match_id, bettor.clone())).await? {
        Some(Value::Bet(bet)) => Ok(bet),
        Some(_) => Err(unexpected("bet")),
        None => Ok(Bet::default()),
    }
}

pub async fn query_settlement<S: State>(
    state: &S,
    match_id: u64,
) -> Result<Settlement, QueryError> {
    match load(state, &Key::Settlement(match_id)).await? {
        Some(Value::Settlement(settlement)) => Ok(settlement),
        Some(_) => Err(unexpected("settlement")),
        None => Err(QueryError::SettlementNotFound(match_id)),
    }
}

/// Quote for withdrawing `amount` of `bettor`'s stake on `side` in the current match.
pub async fn query_cash_out<S: State>(
    state: &S,
    bettor: &PublicKey,
    side: Side,
    amount: Amount,
) -> Result<Amount, QueryError> {
    let market = query_market(state).await?;
    let bet = query_bet(state, market.match_id, bettor).await?;
    if amount > bet.amount(side) {
        return Err(HouseError::InsufficientBetAmount.into());
    }
    Ok(cash_out_value(
        amount,
        bet.placement_odds(side),
        market.odds(side)?,
        market.early_withdrawal_bps,
    )?)
}

pub async fn query_balance<S: State>(state: &S, holder: &Holder) -> Result<Amount, QueryError> {
    match load(state, &Key::Token(holder.clone())).await? {
        Some(Value::Token(account)) => Ok(account.balance),
        Some(_) => Err(unexpected("token account")),
        None => Ok(0),
    }
}

// -----------------------------------------------------------------------------
// Internal Helpers
// -----------------------------------------------------------------------------

async fn load<S: State>(state: &S, key: &Key) -> Result<Option<Value>, QueryError> {
    state
        .get(key)
        .await
        .map_err(|e| QueryError::StateError(e.to_string()))
}

fn unexpected(what: &str) -> QueryError {
    QueryError::StateError(format!("unexpected value type for {what} key"))
}
