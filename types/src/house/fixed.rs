//! Fixed-point helpers shared by the pool and the market.
//!
//! Amounts, odds and reward-per-token values are scaled by [`ONE`]. Intermediate products are
//! widened to 256 bits so `a * b / d` never overflows before the division.

use primitive_types::U256;

use super::{
    error::HouseError, Amount, BASIS_POINTS, CASH_OUT_SENSITIVITY_BPS, IMPLIED_PROBABILITY_SCALE,
    ONE,
};

fn narrow(value: U256) -> Result<u128, HouseError> {
    if value > U256::from(u128::MAX) {
        return Err(HouseError::Overflow);
    }
    Ok(value.low_u128())
}

/// Computes `a * b / denominator`, rounding down.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, HouseError> {
    if denominator == 0 {
        return Err(HouseError::Overflow);
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(denominator))
}

/// Share of `amount` expressed in basis points.
pub fn bps_of(amount: Amount, bps: u128) -> Result<Amount, HouseError> {
    mul_div(amount, bps, BASIS_POINTS)
}

/// Decimal odds (scaled by [`ONE`]) for a side holding `side_total` of a `total` book.
///
/// The fair odds `total / side_total` are scaled down by the implied probability overlay so the
/// implied probabilities of both sides always sum to `implied / 1000`. A side with no stake has
/// no quotable odds and returns zero.
pub fn decimal_odds(total: Amount, side_total: Amount, implied: u16) -> Result<u128, HouseError> {
    if side_total == 0 || implied == 0 {
        return Ok(0);
    }
    let denominator = side_total
        .checked_mul(implied as u128)
        .ok_or(HouseError::Overflow)?;
    mul_div(total, ONE * IMPLIED_PROBABILITY_SCALE, denominator)
}

/// Stake-weighted average of the odds held on an existing position and the odds of a new stake.
pub fn blend_odds(
    held_amount: Amount,
    held_odds: u128,
    added_amount: Amount,
    added_odds: u128,
) -> Result<u128, HouseError> {
    if held_amount == 0 {
        return Ok(added_odds);
    }
    let total = held_amount
        .checked_add(added_amount)
        .ok_or(HouseError::Overflow)?;
    let weighted = U256::from(held_amount) * U256::from(held_odds)
        + U256::from(added_amount) * U256::from(added_odds);
    narrow(weighted / U256::from(total))
}

/// Value paid for withdrawing `amount` early.
///
/// The stake is revalued by how far the side's odds moved since placement: each unit of relative
/// move changes the value by [`CASH_OUT_SENSITIVITY_BPS`]. The result is then discounted by
/// `early_withdrawal_bps` and capped at the payout the stake would earn at its placement odds.
pub fn cash_out_value(
    amount: Amount,
    placement_odds: u128,
    current_odds: u128,
    early_withdrawal_bps: u16,
) -> Result<Amount, HouseError> {
    if amount == 0 || placement_odds == 0 {
        return Ok(0);
    }
    let ratio = mul_div(current_odds, ONE, placement_odds)?;
    let multiplier = if ratio >= ONE {
        let gain = mul_div(ratio - ONE, CASH_OUT_SENSITIVITY_BPS, BASIS_POINTS)?;
        ONE.checked_add(gain).ok_or(HouseError::Overflow)?
    } else {
        let loss = mul_div(ONE - ratio, CASH_OUT_SENSITIVITY_BPS, BASIS_POINTS)?;
        ONE.saturating_sub(loss)
    };
    let revalued = mul_div(amount, multiplier, ONE)?;
    let value = bps_of(revalued, early_withdrawal_bps as u128)?;
    let cap = mul_div(amount, placement_odds, ONE)?;
    Ok(value.min(cap))
}

/// Payout for `amount` settled at `odds`.
pub fn payout_at(amount: Amount, odds: u128) -> Result<Amount, HouseError> {
    mul_div(amount, odds, ONE)
}
