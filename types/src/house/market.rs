use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

use super::{
    bps_of, decimal_odds, mul_div, payout_at, Amount, HouseError, BASIS_POINTS, SEED_LIQUIDITY_BPS,
};

/// Side of a two-outcome book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Side {
    TeamA = 0,
    TeamB = 1,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::TeamA => Self::TeamB,
            Self::TeamB => Self::TeamA,
        }
    }
}

impl Write for Side {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for Side {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::TeamA),
            1 => Ok(Self::TeamB),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for Side {
    const SIZE: usize = 1;
}

/// Lifecycle of the current match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum MatchStatus {
    #[default]
    NotStarted = 0,
    Active = 1,
    Ended = 2,
}

impl Write for MatchStatus {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for MatchStatus {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::NotStarted),
            1 => Ok(Self::Active),
            2 => Ok(Self::Ended),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for MatchStatus {
    const SIZE: usize = 1;
}

/// Outcome of a match, set exactly once when it ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum MatchResult {
    #[default]
    Undecided = 0,
    TeamAWin = 1,
    TeamBWin = 2,
    Tie = 3,
}

impl MatchResult {
    pub fn winner(self) -> Option<Side> {
        match self {
            Self::TeamAWin => Some(Side::TeamA),
            Self::TeamBWin => Some(Side::TeamB),
            Self::Undecided | Self::Tie => None,
        }
    }
}

impl Write for MatchResult {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for MatchResult {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        match value {
            0 => Ok(Self::Undecided),
            1 => Ok(Self::TeamAWin),
            2 => Ok(Self::TeamBWin),
            3 => Ok(Self::Tie),
            i => Err(Error::InvalidEnum(i)),
        }
    }
}

impl FixedSize for MatchResult {
    const SIZE: usize = 1;
}

/// Two-sided book of the current match plus the owner-tunable risk parameters.
///
/// Both side totals include the non-attributable house seed (`house_per_side`) borrowed from the
/// pool at match start. Odds are never stored while the match is live; they are derived from the
/// totals on demand and only frozen into a [`Settlement`] when the match ends.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Market {
    pub match_id: u64,
    pub status: MatchStatus,
    pub result: MatchResult,

    pub total_team_a: Amount,
    pub total_team_b: Amount,
    pub house_per_side: Amount,

    pub max_bet_amount: Amount,
    pub max_bet_amount_percentage_bps: u16,
    /// Parts per thousand (1025 = 102.5%).
    pub implied_probability: u16,
    pub early_withdrawal_bps: u16,

    pub borrowed_from_pool: Amount,
    /// Winnings settled but not yet withdrawn, across all ended matches.
    pub unclaimed_payouts: Amount,
    pub withdrawals_paused: bool,
}

impl Market {
    pub fn new(max_bet_amount: Amount, implied_probability: u16, early_withdrawal_bps: u16) -> Self {
        Self {
            max_bet_amount,
            implied_probability,
            early_withdrawal_bps,
            ..Default::default()
        }
    }

    pub fn total_bets(&self) -> Amount {
        self.total_team_a.saturating_add(self.total_team_b)
    }

    pub fn side_total(&self, side: Side) -> Amount {
        match side {
            Side::TeamA => self.total_team_a,
            Side::TeamB => self.total_team_b,
        }
    }

    pub fn side_total_mut(&mut self, side: Side) -> &mut Amount {
        match side {
            Side::TeamA => &mut self.total_team_a,
            Side::TeamB => &mut self.total_team_b,
        }
    }

    /// Current decimal odds for `side`, scaled by `ONE`.
    pub fn odds(&self, side: Side) -> Result<u128, HouseError> {
        decimal_odds(
            self.total_bets(),
            self.side_total(side),
            self.implied_probability,
        )
    }

    /// Seed placed on each side when a match starts (half of 80% of the max bet).
    pub fn seed_per_side(&self) -> Result<Amount, HouseError> {
        Ok(bps_of(self.max_bet_amount, SEED_LIQUIDITY_BPS)? / 2)
    }

    /// Freezes the current odds of both sides under `result`.
    pub fn settle(&self, result: MatchResult) -> Result<Settlement, HouseError> {
        Ok(Settlement {
            result,
            odds_team_a: self.odds(Side::TeamA)?,
            odds_team_b: self.odds(Side::TeamB)?,
        })
    }

    /// Total owed to bettors under `settlement`, excluding the house seed.
    pub fn winning_liability(&self, settlement: &Settlement) -> Result<Amount, HouseError> {
        let Some(winner) = settlement.result.winner() else {
            return Ok(0);
        };
        let bettor_stake = self.side_total(winner).saturating_sub(self.house_per_side);
        payout_at(bettor_stake, settlement.odds(winner))
    }

    /// Max bet derived as a basis-point share of the pool's total stake.
    pub fn max_bet_from_stake(total_staked: Amount, bps: u16) -> Result<Amount, HouseError> {
        mul_div(total_staked, bps as u128, BASIS_POINTS)
    }
}

impl Write for Market {
    fn write(&self, writer: &mut impl BufMut) {
        self.match_id.write(writer);
        self.status.write(writer);
        self.result.write(writer);
        self.total_team_a.write(writer);
        self.total_team_b.write(writer);
        self.house_per_side.write(writer);
        self.max_bet_amount.write(writer);
        self.max_bet_amount_percentage_bps.write(writer);
        self.implied_probability.write(writer);
        self.early_withdrawal_bps.write(writer);
        self.borrowed_from_pool.write(writer);
        self.unclaimed_payouts.write(writer);
        self.withdrawals_paused.write(writer);
    }
}

impl Read for Market {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            match_id: u64::read(reader)?,
            status: MatchStatus::read(reader)?,
            result: MatchResult::read(reader)?,
            total_team_a: u128::read(reader)?,
            total_team_b: u128::read(reader)?,
            house_per_side: u128::read(reader)?,
            max_bet_amount: u128::read(reader)?,
            max_bet_amount_percentage_bps: u16::read(reader)?,
            implied_probability: u16::read(reader)?,
            early_withdrawal_bps: u16::read(reader)?,
            borrowed_from_pool: u128::read(reader)?,
            unclaimed_payouts: u128::read(reader)?,
            withdrawals_paused: bool::read(reader)?,
        })
    }
}

impl FixedSize for Market {
    const SIZE: usize = u64::SIZE
        + MatchStatus::SIZE
        + MatchResult::SIZE
        + u128::SIZE * 4
        + u16::SIZE * 3
        + u128::SIZE * 2
        + bool::SIZE;
}

/// Outcome and frozen odds of an ended match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settlement {
    pub result: MatchResult,
    pub odds_team_a: u128,
    pub odds_team_b: u128,
}

impl Settlement {
    pub fn odds(&self, side: Side) -> u128 {
        match side {
            Side::TeamA => self.odds_team_a,
            Side::TeamB => self.odds_team_b,
        }
    }
}

impl Write for Settlement {
    fn write(&self, writer: &mut impl BufMut) {
        self.result.write(writer);
        self.odds_team_a.write(writer);
        self.odds_team_b.write(writer);
    }
}

impl Read for Settlement {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            result: MatchResult::read(reader)?,
            odds_team_a: u128::read(reader)?,
            odds_team_b: u128::read(reader)?,
        })
    }
}

impl FixedSize for Settlement {
    const SIZE: usize = MatchResult::SIZE + u128::SIZE * 2;
}

/// A bettor's exposure in one match.
///
/// `odds_team_*` is the stake-weighted average of the odds in force right after each stake on
/// that side entered the book. Early cash-outs are priced against it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bet {
    pub amount_team_a: Amount,
    pub amount_team_b: Amount,
    pub odds_team_a: u128,
    pub odds_team_b: u128,
}

impl Bet {
    pub fn amount(&self, side: Side) -> Amount {
        match side {
            Side::TeamA => self.amount_team_a,
            Side::TeamB => self.amount_team_b,
        }
    }

    pub fn placement_odds(&self, side: Side) -> u128 {
        match side {
            Side::TeamA => self.odds_team_a,
            Side::TeamB => self.odds_team_b,
        }
    }

    pub fn position_mut(&mut self, side: Side) -> (&mut Amount, &mut u128) {
        match side {
            Side::TeamA => (&mut self.amount_team_a, &mut self.odds_team_a),
            Side::TeamB => (&mut self.amount_team_b, &mut self.odds_team_b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amount_team_a == 0 && self.amount_team_b == 0
    }
}

impl Write for Bet {
    fn write(&self, writer: &mut impl BufMut) {
        self.amount_team_a.write(writer);
        self.amount_team_b.write(writer);
        self.odds_team_a.write(writer);
        self.odds_team_b.write(writer);
    }
}

impl Read for Bet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            amount_team_a: u128::read(reader)?,
            amount_team_b: u128::read(reader)?,
            odds_team_a: u128::read(reader)?,
            odds_team_b: u128::read(reader)?,
        })
    }
}

impl FixedSize for Bet {
    const SIZE: usize = u128::SIZE * 4;
}
