use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};

use super::{bps_of, mul_div, Amount, HouseError, ONE};

/// Process-wide staking, reward and credit state.
///
/// Rewards follow a continuous accrual model: `reward_per_token_stored` is a cumulative
/// reward-per-unit-of-principal accumulator scaled by [`ONE`], checkpointed lazily before every
/// mutation so claims stay O(1) regardless of how many stakers exist.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StakePool {
    pub total_staked: Amount,
    pub total_borrowed: Amount,

    /// Reward tokens (base units) released per second.
    pub reward_rate: Amount,
    pub reward_per_token_stored: u128,
    pub last_update_time: u64,
    pub period_finish: u64,
    pub rewards_duration: u64,

    pub borrow_percentage_bps: u16,
}

impl StakePool {
    pub fn new(rewards_duration: u64, borrow_percentage_bps: u16) -> Self {
        Self {
            rewards_duration,
            borrow_percentage_bps,
            ..Default::default()
        }
    }

    pub fn last_time_reward_applicable(&self, now: u64) -> u64 {
        now.min(self.period_finish)
    }

    pub fn reward_per_token(&self, now: u64) -> Result<u128, HouseError> {
        if self.total_staked == 0 {
            return Ok(self.reward_per_token_stored);
        }
        let elapsed = self
            .last_time_reward_applicable(now)
            .saturating_sub(self.last_update_time);
        let released = self
            .reward_rate
            .checked_mul(elapsed as u128)
            .ok_or(HouseError::Overflow)?;
        let accrued = mul_div(released, ONE, self.total_staked)?;
        self.reward_per_token_stored
            .checked_add(accrued)
            .ok_or(HouseError::Overflow)
    }

    /// Folds accrual up to `now` into the stored accumulator.
    pub fn checkpoint(&mut self, now: u64) -> Result<(), HouseError> {
        self.reward_per_token_stored = self.reward_per_token(now)?;
        self.last_update_time = self.last_time_reward_applicable(now);
        Ok(())
    }

    /// Starts (or extends) a reward period distributing `amount` over `rewards_duration`.
    ///
    /// Must be called after [`Self::checkpoint`]. Any undistributed remainder of the running
    /// period is folded into the new rate.
    pub fn notify_reward_amount(&mut self, amount: Amount, now: u64) -> Result<(), HouseError> {
        let duration = self.rewards_duration as u128;
        if duration == 0 {
            return Err(HouseError::Overflow);
        }
        let budget = if now >= self.period_finish {
            amount
        } else {
            let remaining = (self.period_finish - now) as u128;
            let leftover = remaining
                .checked_mul(self.reward_rate)
                .ok_or(HouseError::Overflow)?;
            amount.checked_add(leftover).ok_or(HouseError::Overflow)?
        };
        self.reward_rate = budget / duration;
        self.last_update_time = now;
        self.period_finish = now
            .checked_add(self.rewards_duration)
            .ok_or(HouseError::Overflow)?;
        Ok(())
    }

    /// Credit ceiling applied to each borrower independently.
    pub fn borrow_limit(&self) -> Result<Amount, HouseError> {
        bps_of(self.total_staked, self.borrow_percentage_bps as u128)
    }
}

impl Write for StakePool {
    fn write(&self, writer: &mut impl BufMut) {
        self.total_staked.write(writer);
        self.total_borrowed.write(writer);
        self.reward_rate.write(writer);
        self.reward_per_token_stored.write(writer);
        self.last_update_time.write(writer);
        self.period_finish.write(writer);
        self.rewards_duration.write(writer);
        self.borrow_percentage_bps.write(writer);
    }
}

impl Read for StakePool {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            total_staked: u128::read(reader)?,
            total_borrowed: u128::read(reader)?,
            reward_rate: u128::read(reader)?,
            reward_per_token_stored: u128::read(reader)?,
            last_update_time: u64::read(reader)?,
            period_finish: u64::read(reader)?,
            rewards_duration: u64::read(reader)?,
            borrow_percentage_bps: u16::read(reader)?,
        })
    }
}

impl FixedSize for StakePool {
    const SIZE: usize = u128::SIZE * 4 + u64::SIZE * 3 + u16::SIZE;
}

/// Per-account staking position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Staker {
    pub principal: Amount,
    pub reward_per_token_paid: u128,
    pub accrued_rewards: Amount,
}

impl Staker {
    /// Rewards owed given the pool's current reward-per-token.
    pub fn earned(&self, reward_per_token: u128) -> Result<Amount, HouseError> {
        let delta = reward_per_token.saturating_sub(self.reward_per_token_paid);
        mul_div(self.principal, delta, ONE)?
            .checked_add(self.accrued_rewards)
            .ok_or(HouseError::Overflow)
    }

    /// Settles accrual into `accrued_rewards`; the pool must already be checkpointed.
    pub fn checkpoint(&mut self, reward_per_token_stored: u128) -> Result<(), HouseError> {
        self.accrued_rewards = self.earned(reward_per_token_stored)?;
        self.reward_per_token_paid = reward_per_token_stored;
        Ok(())
    }
}

impl Write for Staker {
    fn write(&self, writer: &mut impl BufMut) {
        self.principal.write(writer);
        self.reward_per_token_paid.write(writer);
        self.accrued_rewards.write(writer);
    }
}

impl Read for Staker {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            principal: u128::read(reader)?,
            reward_per_token_paid: u128::read(reader)?,
            accrued_rewards: u128::read(reader)?,
        })
    }
}

impl FixedSize for Staker {
    const SIZE: usize = u128::SIZE * 3;
}

/// Credit line of an approved borrower.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Borrower {
    pub allowed: bool,
    pub borrowed_amount: Amount,
}

impl Write for Borrower {
    fn write(&self, writer: &mut impl BufMut) {
        self.allowed.write(writer);
        self.borrowed_amount.write(writer);
    }
}

impl Read for Borrower {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            allowed: bool::read(reader)?,
            borrowed_amount: u128::read(reader)?,
        })
    }
}

impl FixedSize for Borrower {
    const SIZE: usize = bool::SIZE + u128::SIZE;
}
