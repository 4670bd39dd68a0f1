use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::{
    ed25519::{self, PublicKey},
    Signer, Verifier,
};
use commonware_utils::union;
use std::fmt::Debug;

use crate::house::{
    Amount, Bet, Borrower, Holder, HouseError, Market, MatchResult, Settlement, Side, StakePool,
    Staker, TokenAccount,
};

pub const NAMESPACE: &[u8] = b"_WAGERPOOL";
pub const TRANSACTION_SUFFIX: &[u8] = b"_TX";
pub const MAX_BLOCK_TRANSACTIONS: usize = 500;

#[inline]
pub fn transaction_namespace(namespace: &[u8]) -> Vec<u8> {
    union(namespace, TRANSACTION_SUFFIX)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub nonce: u64,
    pub instruction: Instruction,

    pub public: ed25519::PublicKey,
    pub signature: ed25519::Signature,
}

impl Transaction {
    fn payload(nonce: &u64, instruction: &Instruction) -> Vec<u8> {
        let mut payload = Vec::new();
        nonce.write(&mut payload);
        instruction.write(&mut payload);

        payload
    }

    pub fn sign(private: &ed25519::PrivateKey, nonce: u64, instruction: Instruction) -> Self {
        let signature = private.sign(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&nonce, &instruction),
        );

        Self {
            nonce,
            instruction,
            public: private.public_key(),
            signature,
        }
    }

    pub fn verify(&self) -> bool {
        self.public.verify(
            &transaction_namespace(NAMESPACE),
            &Self::payload(&self.nonce, &self.instruction),
            &self.signature,
        )
    }
}

impl Write for Transaction {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
        self.instruction.write(writer);
        self.public.write(writer);
        self.signature.write(writer);
    }
}

impl Read for Transaction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let nonce = u64::read(reader)?;
        let instruction = Instruction::read(reader)?;
        let public = ed25519::PublicKey::read(reader)?;
        let signature = ed25519::Signature::read(reader)?;

        Ok(Self {
            nonce,
            instruction,
            public,
            signature,
        })
    }
}

impl EncodeSize for Transaction {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
            + self.instruction.encode_size()
            + self.public.encode_size()
            + self.signature.encode_size()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    // Ledger instructions (tags 0-1)
    /// Push tokens from the signer to any holder, including the pool or market custody.
    /// Binary: [0] [to:Holder] [amount:u128 BE]
    Transfer { to: Holder, amount: Amount },

    /// Set the allowance `spender` may pull from the signer.
    /// Binary: [1] [spender:Holder] [amount:u128 BE]
    Approve { spender: Holder, amount: Amount },

    // Pool instructions (tags 10-18)
    /// Binary: [10] [amount:u128 BE]
    Stake { amount: Amount },
    /// Binary: [11] [amount:u128 BE]
    Withdraw { amount: Amount },
    /// Binary: [12]
    GetReward,
    /// Withdraw the full principal and claim rewards.
    /// Binary: [13]
    Exit,
    /// Fund and start (or extend) a reward period. Pool admin only.
    /// Binary: [14] [amount:u128 BE]
    NotifyRewardAmount { amount: Amount },
    /// Binary: [15] [borrower:Holder] [allowed:bool]
    SetBorrowingStatus { borrower: Holder, allowed: bool },
    /// Binary: [16] [bps:u16 BE]
    SetBorrowPercentage { bps: u16 },
    /// Binary: [17] [amount:u128 BE]
    Borrow { amount: Amount },
    /// Binary: [18] [amount:u128 BE]
    Repay { amount: Amount },

    // Market instructions (tags 20-31)
    /// Open a new match seeded with pool liquidity. Market operator only.
    /// Binary: [20]
    StartMatch,
    /// Binary: [21] [side:u8] [amount:u128 BE]
    PlaceBet { side: Side, amount: Amount },
    /// Cash out part of an open position at the current early-exit value.
    /// Binary: [22] [side:u8] [amount:u128 BE]
    WithdrawBet { side: Side, amount: Amount },
    /// Binary: [23] [result:u8]
    EndMatch { result: MatchResult },
    /// Claim winnings of an ended match.
    /// Binary: [24] [match_id:u64 BE]
    WithdrawAfterMatch { match_id: u64 },
    /// Binary: [25] [amount:u128 BE]
    SetMaxBetAmount { amount: Amount },
    /// Binary: [26] [bps:u16 BE]
    SetMaxBetAmountPercentage { bps: u16 },
    /// Binary: [27] [value:u16 BE]
    SetImpliedProbability { value: u16 },
    /// Binary: [28] [percent:u8]
    SetEarlyPercentage { percent: u8 },
    /// Binary: [29]
    PauseWithdrawals,
    /// Binary: [30]
    UnpauseWithdrawals,
    /// Repay outstanding market debt from market custody.
    /// Binary: [31]
    RepayPool,
}

impl Write for Instruction {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            // Ledger
            Self::Transfer { to, amount } => {
                0u8.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::Approve { spender, amount } => {
                1u8.write(writer);
                spender.write(writer);
                amount.write(writer);
            }

            // Pool
            Self::Stake { amount } => {
                10u8.write(writer);
                amount.write(writer);
            }
            Self::Withdraw { amount } => {
                11u8.write(writer);
                amount.write(writer);
            }
            Self::GetReward => 12u8.write(writer),
            Self::Exit => 13u8.write(writer),
            Self::NotifyRewardAmount { amount } => {
                14u8.write(writer);
                amount.write(writer);
            }
            Self::SetBorrowingStatus { borrower, allowed } => {
                15u8.write(writer);
                borrower.write(writer);
                allowed.write(writer);
            }
            Self::SetBorrowPercentage { bps } => {
                16u8.write(writer);
                bps.write(writer);
            }
            Self::Borrow { amount } => {
                17u8.write(writer);
                amount.write(writer);
            }
            Self::Repay { amount } => {
                18u8.write(writer);
                amount.write(writer);
            }

            // Market
            Self::StartMatch => 20u8.write(writer),
            Self::PlaceBet { side, amount } => {
                21u8.write(writer);
                side.write(writer);
                amount.write(writer);
            }
            Self::WithdrawBet { side, amount } => {
                22u8.write(writer);
                side.write(writer);
                amount.write(writer);
            }
            Self::EndMatch { result } => {
                23u8.write(writer);
                result.write(writer);
            }
            Self::WithdrawAfterMatch { match_id } => {
                24u8.write(writer);
                match_id.write(writer);
            }
            Self::SetMaxBetAmount { amount } => {
                25u8.write(writer);
                amount.write(writer);
            }
            Self::SetMaxBetAmountPercentage { bps } => {
                26u8.write(writer);
                bps.write(writer);
            }
            Self::SetImpliedProbability { value } => {
                27u8.write(writer);
                value.write(writer);
            }
            Self::SetEarlyPercentage { percent } => {
                28u8.write(writer);
                percent.write(writer);
            }
            Self::PauseWithdrawals => 29u8.write(writer),
            Self::UnpauseWithdrawals => 30u8.write(writer),
            Self::RepayPool => 31u8.write(writer),
        }
    }
}

impl Read for Instruction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let instruction = match u8::read(reader)? {
            // Ledger
            0 => Self::Transfer {
                to: Holder::read(reader)?,
                amount: u128::read(reader)?,
            },
            1 => Self::Approve {
                spender: Holder::read(reader)?,
                amount: u128::read(reader)?,
            },

            // Pool
            10 => Self::Stake {
                amount: u128::read(reader)?,
            },
            11 => Self::Withdraw {
                amount: u128::read(reader)?,
            },
            12 => Self::GetReward,
            13 => Self::Exit,
            14 => Self::NotifyRewardAmount {
                amount: u128::read(reader)?,
            },
            15 => Self::SetBorrowingStatus {
                borrower: Holder::read(reader)?,
                allowed: bool::read(reader)?,
            },
            16 => Self::SetBorrowPercentage {
                bps: u16::read(reader)?,
            },
            17 => Self::Borrow {
                amount: u128::read(reader)?,
            },
            18 => Self::Repay {
                amount: u128::read(reader)?,
            },

            // Market
            20 => Self::StartMatch,
            21 => Self::PlaceBet {
                side: Side::read(reader)?,
                amount: u128::read(reader)?,
            },
            22 => Self::WithdrawBet {
                side: Side::read(reader)?,
                amount: u128::read(reader)?,
            },
            23 => Self::EndMatch {
                result: MatchResult::read(reader)?,
            },
            24 => Self::WithdrawAfterMatch {
                match_id: u64::read(reader)?,
            },
            25 => Self::SetMaxBetAmount {
                amount: u128::read(reader)?,
            },
            26 => Self::SetMaxBetAmountPercentage {
                bps: u16::read(reader)?,
            },
            27 => Self::SetImpliedProbability {
                value: u16::read(reader)?,
            },
            28 => Self::SetEarlyPercentage {
                percent: u8::read(reader)?,
            },
            29 => Self::PauseWithdrawals,
            30 => Self::UnpauseWithdrawals,
            31 => Self::RepayPool,

            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(instruction)
    }
}

impl EncodeSize for Instruction {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                // Ledger
                Self::Transfer { to: holder, .. } | Self::Approve { spender: holder, .. } => {
                    holder.encode_size() + u128::SIZE
                }

                // Pool
                Self::Stake { .. }
                | Self::Withdraw { .. }
                | Self::NotifyRewardAmount { .. }
                | Self::Borrow { .. }
                | Self::Repay { .. } => u128::SIZE,
                Self::GetReward | Self::Exit => 0,
                Self::SetBorrowingStatus { borrower, .. } => borrower.encode_size() + bool::SIZE,
                Self::SetBorrowPercentage { .. } => u16::SIZE,

                // Market
                Self::StartMatch
                | Self::PauseWithdrawals
                | Self::UnpauseWithdrawals
                | Self::RepayPool => 0,
                Self::PlaceBet { .. } | Self::WithdrawBet { .. } => Side::SIZE + u128::SIZE,
                Self::EndMatch { .. } => MatchResult::SIZE,
                Self::WithdrawAfterMatch { .. } => u64::SIZE,
                Self::SetMaxBetAmount { .. } => u128::SIZE,
                Self::SetMaxBetAmountPercentage { .. } | Self::SetImpliedProbability { .. } => {
                    u16::SIZE
                }
                Self::SetEarlyPercentage { .. } => u8::SIZE,
            }
    }
}

/// Used for replay protection across all transaction types.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Account {
    pub nonce: u64,
}

impl Write for Account {
    fn write(&self, writer: &mut impl BufMut) {
        self.nonce.write(writer);
    }
}

impl Read for Account {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for Account {
    fn encode_size(&self) -> usize {
        self.nonce.encode_size()
    }
}

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
pub enum Key {
    /// Account for nonce tracking (tag 0)
    Account(PublicKey),
    /// Last committed height and timestamp (tag 1)
    Commit,

    // Ledger keys (tag 10)
    Token(Holder),

    // Pool keys (tags 20-22)
    Pool,
    Staker(PublicKey),
    Borrower(Holder),

    // Market keys (tags 30-32)
    Market,
    Bet(u64, PublicKey),
    Settlement(u64),
}

impl Write for Key {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(pk) => {
                0u8.write(writer);
                pk.write(writer);
            }
            Self::Commit => 1u8.write(writer),

            // Ledger
            Self::Token(holder) => {
                10u8.write(writer);
                holder.write(writer);
            }

            // Pool
            Self::Pool => 20u8.write(writer),
            Self::Staker(pk) => {
                21u8.write(writer);
                pk.write(writer);
            }
            Self::Borrower(holder) => {
                22u8.write(writer);
                holder.write(writer);
            }

            // Market
            Self::Market => 30u8.write(writer),
            Self::Bet(match_id, pk) => {
                31u8.write(writer);
                match_id.write(writer);
                pk.write(writer);
            }
            Self::Settlement(match_id) => {
                32u8.write(writer);
                match_id.write(writer);
            }
        }
    }
}

impl Read for Key {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = match u8::read(reader)? {
            0 => Self::Account(PublicKey::read(reader)?),
            1 => Self::Commit,

            // Ledger
            10 => Self::Token(Holder::read(reader)?),

            // Pool
            20 => Self::Pool,
            21 => Self::Staker(PublicKey::read(reader)?),
            22 => Self::Borrower(Holder::read(reader)?),

            // Market
            30 => Self::Market,
            31 => Self::Bet(u64::read(reader)?, PublicKey::read(reader)?),
            32 => Self::Settlement(u64::read(reader)?),

            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(key)
    }
}

impl EncodeSize for Key {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(_) | Self::Staker(_) => PublicKey::SIZE,
                Self::Commit | Self::Pool | Self::Market => 0,
                Self::Token(holder) | Self::Borrower(holder) => holder.encode_size(),
                Self::Bet(_, _) => u64::SIZE + PublicKey::SIZE,
                Self::Settlement(_) => u64::SIZE,
            }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    /// Account for nonce tracking (tag 0)
    Account(Account),
    /// Last committed block (tag 1)
    Commit { height: u64, timestamp: u64 },

    // Ledger (tag 10)
    Token(TokenAccount),

    // Pool (tags 20-22)
    Pool(StakePool),
    Staker(Staker),
    Borrower(Borrower),

    // Market (tags 30-32)
    Market(Market),
    Bet(Bet),
    Settlement(Settlement),
}

impl Write for Value {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Account(account) => {
                0u8.write(writer);
                account.write(writer);
            }
            Self::Commit { height, timestamp } => {
                1u8.write(writer);
                height.write(writer);
                timestamp.write(writer);
            }
            Self::Token(token) => {
                10u8.write(writer);
                token.write(writer);
            }
            Self::Pool(pool) => {
                20u8.write(writer);
                pool.write(writer);
            }
            Self::Staker(staker) => {
                21u8.write(writer);
                staker.write(writer);
            }
            Self::Borrower(borrower) => {
                22u8.write(writer);
                borrower.write(writer);
            }
            Self::Market(market) => {
                30u8.write(writer);
                market.write(writer);
            }
            Self::Bet(bet) => {
                31u8.write(writer);
                bet.write(writer);
            }
            Self::Settlement(settlement) => {
                32u8.write(writer);
                settlement.write(writer);
            }
        }
    }
}

impl Read for Value {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = match u8::read(reader)? {
            0 => Self::Account(Account::read(reader)?),
            1 => Self::Commit {
                height: u64::read(reader)?,
                timestamp: u64::read(reader)?,
            },
            10 => Self::Token(TokenAccount::read(reader)?),
            20 => Self::Pool(StakePool::read(reader)?),
            21 => Self::Staker(Staker::read(reader)?),
            22 => Self::Borrower(Borrower::read(reader)?),
            30 => Self::Market(Market::read(reader)?),
            31 => Self::Bet(Bet::read(reader)?),
            32 => Self::Settlement(Settlement::read(reader)?),
            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(value)
    }
}

impl EncodeSize for Value {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Account(account) => account.encode_size(),
                Self::Commit { .. } => u64::SIZE + u64::SIZE,
                Self::Token(token) => token.encode_size(),
                Self::Pool(_) => StakePool::SIZE,
                Self::Staker(_) => Staker::SIZE,
                Self::Borrower(_) => Borrower::SIZE,
                Self::Market(_) => Market::SIZE,
                Self::Bet(_) => Bet::SIZE,
                Self::Settlement(_) => Settlement::SIZE,
            }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Ledger events (tags 0-1)
    Transferred {
        from: Holder,
        to: Holder,
        amount: Amount,
    },
    Approved {
        owner: PublicKey,
        spender: Holder,
        amount: Amount,
    },

    // Pool events (tags 10-17)
    Staked {
        staker: PublicKey,
        amount: Amount,
    },
    Withdrawn {
        staker: PublicKey,
        amount: Amount,
    },
    RewardPaid {
        staker: PublicKey,
        amount: Amount,
    },
    RewardAdded {
        amount: Amount,
        reward_rate: Amount,
        period_finish: u64,
    },
    BorrowingStatusSet {
        borrower: Holder,
        allowed: bool,
    },
    BorrowPercentageSet {
        bps: u16,
    },
    Borrowed {
        borrower: Holder,
        amount: Amount,
    },
    Repaid {
        borrower: Holder,
        amount: Amount,
    },

    // Market events (tags 20-27)
    MatchStarted {
        match_id: u64,
        seed: Amount,
    },
    BetPlaced {
        bettor: PublicKey,
        amount: Amount,
        side: Side,
    },
    BetWithdrawn {
        bettor: PublicKey,
        amount: Amount,
        side: Side,
    },
    MatchEnded {
        match_id: u64,
        result: MatchResult,
    },
    Payout {
        bettor: PublicKey,
        amount: Amount,
    },
    MarketParametersUpdated {
        max_bet_amount: Amount,
        implied_probability: u16,
        early_withdrawal_bps: u16,
    },
    WithdrawalsPaused,
    WithdrawalsUnpaused,

    // Executor events (tag 30)
    TransactionRejected {
        account: PublicKey,
        code: u8,
    },
}

impl Event {
    /// Domain error carried by a rejection, if any.
    pub fn rejection(&self) -> Option<HouseError> {
        match self {
            Self::TransactionRejected { code, .. } => HouseError::from_code(*code),
            _ => None,
        }
    }
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Transferred { from, to, amount } => {
                0u8.write(writer);
                from.write(writer);
                to.write(writer);
                amount.write(writer);
            }
            Self::Approved {
                owner,
                spender,
                amount,
            } => {
                1u8.write(writer);
                owner.write(writer);
                spender.write(writer);
                amount.write(writer);
            }

            Self::Staked { staker, amount } => {
                10u8.write(writer);
                staker.write(writer);
                amount.write(writer);
            }
            Self::Withdrawn { staker, amount } => {
                11u8.write(writer);
                staker.write(writer);
                amount.write(writer);
            }
            Self::RewardPaid { staker, amount } => {
                12u8.write(writer);
                staker.write(writer);
                amount.write(writer);
            }
            Self::RewardAdded {
                amount,
                reward_rate,
                period_finish,
            } => {
                13u8.write(writer);
                amount.write(writer);
                reward_rate.write(writer);
                period_finish.write(writer);
            }
            Self::BorrowingStatusSet { borrower, allowed } => {
                14u8.write(writer);
                borrower.write(writer);
                allowed.write(writer);
            }
            Self::BorrowPercentageSet { bps } => {
                15u8.write(writer);
                bps.write(writer);
            }
            Self::Borrowed { borrower, amount } => {
                16u8.write(writer);
                borrower.write(writer);
                amount.write(writer);
            }
            Self::Repaid { borrower, amount } => {
                17u8.write(writer);
                borrower.write(writer);
                amount.write(writer);
            }

            Self::MatchStarted { match_id, seed } => {
                20u8.write(writer);
                match_id.write(writer);
                seed.write(writer);
            }
            Self::BetPlaced {
                bettor,
                amount,
                side,
            } => {
                21u8.write(writer);
                bettor.write(writer);
                amount.write(writer);
                side.write(writer);
            }
            Self::BetWithdrawn {
                bettor,
                amount,
                side,
            } => {
                22u8.write(writer);
                bettor.write(writer);
                amount.write(writer);
                side.write(writer);
            }
            Self::MatchEnded { match_id, result } => {
                23u8.write(writer);
                match_id.write(writer);
                result.write(writer);
            }
            Self::Payout { bettor, amount } => {
                24u8.write(writer);
                bettor.write(writer);
                amount.write(writer);
            }
            Self::MarketParametersUpdated {
                max_bet_amount,
                implied_probability,
                early_withdrawal_bps,
            } => {
                25u8.write(writer);
                max_bet_amount.write(writer);
                implied_probability.write(writer);
                early_withdrawal_bps.write(writer);
            }
            Self::WithdrawalsPaused => 26u8.write(writer),
            Self::WithdrawalsUnpaused => 27u8.write(writer),

            Self::TransactionRejected { account, code } => {
                30u8.write(writer);
                account.write(writer);
                code.write(writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let event = match u8::read(reader)? {
            0 => Self::Transferred {
                from: Holder::read(reader)?,
                to: Holder::read(reader)?,
                amount: u128::read(reader)?,
            },
            1 => Self::Approved {
                owner: PublicKey::read(reader)?,
                spender: Holder::read(reader)?,
                amount: u128::read(reader)?,
            },

            10 => Self::Staked {
                staker: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            11 => Self::Withdrawn {
                staker: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            12 => Self::RewardPaid {
                staker: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            13 => Self::RewardAdded {
                amount: u128::read(reader)?,
                reward_rate: u128::read(reader)?,
                period_finish: u64::read(reader)?,
            },
            14 => Self::BorrowingStatusSet {
                borrower: Holder::read(reader)?,
                allowed: bool::read(reader)?,
            },
            15 => Self::BorrowPercentageSet {
                bps: u16::read(reader)?,
            },
            16 => Self::Borrowed {
                borrower: Holder::read(reader)?,
                amount: u128::read(reader)?,
            },
            17 => Self::Repaid {
                borrower: Holder::read(reader)?,
                amount: u128::read(reader)?,
            },

            20 => Self::MatchStarted {
                match_id: u64::read(reader)?,
                seed: u128::read(reader)?,
            },
            21 => Self::BetPlaced {
                bettor: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
                side: Side::read(reader)?,
            },
            22 => Self::BetWithdrawn {
                bettor: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
                side: Side::read(reader)?,
            },
            23 => Self::MatchEnded {
                match_id: u64::read(reader)?,
                result: MatchResult::read(reader)?,
            },
            24 => Self::Payout {
                bettor: PublicKey::read(reader)?,
                amount: u128::read(reader)?,
            },
            25 => Self::MarketParametersUpdated {
                max_bet_amount: u128::read(reader)?,
                implied_probability: u16::read(reader)?,
                early_withdrawal_bps: u16::read(reader)?,
            },
            26 => Self::WithdrawalsPaused,
            27 => Self::WithdrawalsUnpaused,

            30 => Self::TransactionRejected {
                account: PublicKey::read(reader)?,
                code: u8::read(reader)?,
            },

            i => return Err(Error::InvalidEnum(i)),
        };

        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::Transferred { from, to, .. } => {
                    from.encode_size() + to.encode_size() + u128::SIZE
                }
                Self::Approved { spender, .. } => {
                    PublicKey::SIZE + spender.encode_size() + u128::SIZE
                }

                Self::Staked { .. } | Self::Withdrawn { .. } | Self::RewardPaid { .. } => {
                    PublicKey::SIZE + u128::SIZE
                }
                Self::RewardAdded { .. } => u128::SIZE + u128::SIZE + u64::SIZE,
                Self::BorrowingStatusSet { borrower, .. } => borrower.encode_size() + bool::SIZE,
                Self::BorrowPercentageSet { .. } => u16::SIZE,
                Self::Borrowed { borrower, .. } | Self::Repaid { borrower, .. } => {
                    borrower.encode_size() + u128::SIZE
                }

                Self::MatchStarted { .. } => u64::SIZE + u128::SIZE,
                Self::BetPlaced { .. } | Self::BetWithdrawn { .. } => {
                    PublicKey::SIZE + u128::SIZE + Side::SIZE
                }
                Self::MatchEnded { .. } => u64::SIZE + MatchResult::SIZE,
                Self::Payout { .. } => PublicKey::SIZE + u128::SIZE,
                Self::MarketParametersUpdated { .. } => u128::SIZE + u16::SIZE + u16::SIZE,
                Self::WithdrawalsPaused | Self::WithdrawalsUnpaused => 0,

                Self::TransactionRejected { .. } => PublicKey::SIZE + u8::SIZE,
            }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Event(Event),
    Transaction(Transaction),
    Commit { height: u64, timestamp: u64 },
}

impl Write for Output {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::Event(event) => {
                0u8.write(writer);
                event.write(writer);
            }
            Self::Transaction(transaction) => {
                1u8.write(writer);
                transaction.write(writer);
            }
            Self::Commit { height, timestamp } => {
                2u8.write(writer);
                height.write(writer);
                timestamp.write(writer);
            }
        }
    }
}

impl Read for Output {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        match kind {
            0 => Ok(Self::Event(Event::read(reader)?)),
            1 => Ok(Self::Transaction(Transaction::read(reader)?)),
            2 => Ok(Self::Commit {
                height: u64::read(reader)?,
                timestamp: u64::read(reader)?,
            }),
            _ => Err(Error::InvalidEnum(kind)),
        }
    }
}

impl EncodeSize for Output {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Event(event) => event.encode_size(),
            Self::Transaction(transaction) => transaction.encode_size(),
            Self::Commit { height, timestamp } => height.encode_size() + timestamp.encode_size(),
        }
    }
}
