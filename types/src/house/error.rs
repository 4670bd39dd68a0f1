use thiserror::Error;

use super::constants::*;

/// Broad class of a [`HouseError`], used by observers to group rejections.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    InvalidArgument,
    StateConflict,
    InsufficientBalance,
    LimitExceeded,
    NotEligible,
    Ledger,
}

/// Domain failure raised by a pool, market or ledger operation.
///
/// A failure aborts the triggering transaction atomically: none of its state changes persist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HouseError {
    #[error("caller lacks the required privilege")]
    Unauthorized,

    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("invalid bet amount")]
    InvalidBetAmount,
    #[error("invalid percentage")]
    InvalidPercentage,
    #[error("implied probability must be within [1001, 1100]")]
    InvalidImpliedProbability,
    #[error("match result must be decided")]
    InvalidResult,

    #[error("match ongoing currently")]
    MatchOngoing,
    #[error("match ended")]
    MatchEnded,
    #[error("match not started")]
    MatchNotStarted,
    #[error("match has not ended")]
    MatchNotEnded,
    #[error("withdrawals are paused")]
    Paused,

    #[error("insufficient bet amount")]
    InsufficientBetAmount,
    #[error("insufficient stake")]
    InsufficientStake,
    #[error("repayment amount exceeds borrowed amount")]
    RepaymentExceedsBorrowed,

    #[error("exceeds borrowing limit")]
    ExceedsBorrowLimit,
    #[error("arithmetic overflow")]
    Overflow,

    #[error("no winning bet to withdraw")]
    NoWinningBet,
    #[error("no payout available")]
    NoPayoutAvailable,
    #[error("not allowed to borrow")]
    NotAllowedToBorrow,

    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("insufficient allowance")]
    InsufficientAllowance,
}

impl HouseError {
    pub fn code(&self) -> u8 {
        match self {
            Self::Unauthorized => ERROR_UNAUTHORIZED,
            Self::InvalidAmount => ERROR_INVALID_AMOUNT,
            Self::InvalidBetAmount => ERROR_INVALID_BET_AMOUNT,
            Self::InvalidPercentage => ERROR_INVALID_PERCENTAGE,
            Self::InvalidImpliedProbability => ERROR_INVALID_IMPLIED_PROBABILITY,
            Self::InvalidResult => ERROR_INVALID_RESULT,
            Self::MatchOngoing => ERROR_MATCH_ONGOING,
            Self::MatchEnded => ERROR_MATCH_ENDED,
            Self::MatchNotStarted => ERROR_MATCH_NOT_STARTED,
            Self::MatchNotEnded => ERROR_MATCH_NOT_ENDED,
            Self::Paused => ERROR_PAUSED,
            Self::InsufficientBetAmount => ERROR_INSUFFICIENT_BET_AMOUNT,
            Self::InsufficientStake => ERROR_INSUFFICIENT_STAKE,
            Self::RepaymentExceedsBorrowed => ERROR_REPAYMENT_EXCEEDS_BORROWED,
            Self::ExceedsBorrowLimit => ERROR_EXCEEDS_BORROW_LIMIT,
            Self::Overflow => ERROR_ARITHMETIC_OVERFLOW,
            Self::NoWinningBet => ERROR_NO_WINNING_BET,
            Self::NoPayoutAvailable => ERROR_NO_PAYOUT_AVAILABLE,
            Self::NotAllowedToBorrow => ERROR_NOT_ALLOWED_TO_BORROW,
            Self::InsufficientFunds => ERROR_INSUFFICIENT_FUNDS,
            Self::InsufficientAllowance => ERROR_INSUFFICIENT_ALLOWANCE,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            ERROR_UNAUTHORIZED => Self::Unauthorized,
            ERROR_INVALID_AMOUNT => Self::InvalidAmount,
            ERROR_INVALID_BET_AMOUNT => Self::InvalidBetAmount,
            ERROR_INVALID_PERCENTAGE => Self::InvalidPercentage,
            ERROR_INVALID_IMPLIED_PROBABILITY => Self::InvalidImpliedProbability,
            ERROR_INVALID_RESULT => Self::InvalidResult,
            ERROR_MATCH_ONGOING => Self::MatchOngoing,
            ERROR_MATCH_ENDED => Self::MatchEnded,
            ERROR_MATCH_NOT_STARTED => Self::MatchNotStarted,
            ERROR_MATCH_NOT_ENDED => Self::MatchNotEnded,
            ERROR_PAUSED => Self::Paused,
            ERROR_INSUFFICIENT_BET_AMOUNT => Self::InsufficientBetAmount,
            ERROR_INSUFFICIENT_STAKE => Self::InsufficientStake,
            ERROR_REPAYMENT_EXCEEDS_BORROWED => Self::RepaymentExceedsBorrowed,
            ERROR_EXCEEDS_BORROW_LIMIT => Self::ExceedsBorrowLimit,
            ERROR_ARITHMETIC_OVERFLOW => Self::Overflow,
            ERROR_NO_WINNING_BET => Self::NoWinningBet,
            ERROR_NO_PAYOUT_AVAILABLE => Self::NoPayoutAvailable,
            ERROR_NOT_ALLOWED_TO_BORROW => Self::NotAllowedToBorrow,
            ERROR_INSUFFICIENT_FUNDS => Self::InsufficientFunds,
            ERROR_INSUFFICIENT_ALLOWANCE => Self::InsufficientAllowance,
            _ => return None,
        })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::InvalidAmount
            | Self::InvalidBetAmount
            | Self::InvalidPercentage
            | Self::InvalidImpliedProbability
            | Self::InvalidResult => ErrorKind::InvalidArgument,
            Self::MatchOngoing
            | Self::MatchEnded
            | Self::MatchNotStarted
            | Self::MatchNotEnded
            | Self::Paused => ErrorKind::StateConflict,
            Self::InsufficientBetAmount
            | Self::InsufficientStake
            | Self::RepaymentExceedsBorrowed => ErrorKind::InsufficientBalance,
            Self::ExceedsBorrowLimit | Self::Overflow => ErrorKind::LimitExceeded,
            Self::NoWinningBet | Self::NoPayoutAvailable | Self::NotAllowedToBorrow => {
                ErrorKind::NotEligible
            }
            Self::InsufficientFunds | Self::InsufficientAllowance => ErrorKind::Ledger,
        }
    }
}
