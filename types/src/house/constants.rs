/// Token amounts carry 18 fractional digits.
pub type Amount = u128;

/// Fixed-point scale for amounts, odds and reward-per-token (1e18).
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Denominator for basis-point parameters.
pub const BASIS_POINTS: u128 = 10_000;

/// Denominator for the implied probability overlay (1025 = 102.5%).
pub const IMPLIED_PROBABILITY_SCALE: u128 = 1_000;

/// Pool defaults.
pub const DEFAULT_BORROW_PERCENTAGE_BPS: u16 = 100; // 1.00%
pub const DEFAULT_REWARDS_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Market defaults.
pub const DEFAULT_MAX_BET_TOKENS: u64 = 100;
pub const DEFAULT_IMPLIED_PROBABILITY: u16 = 1_025;
pub const DEFAULT_EARLY_WITHDRAWAL_PERCENT: u8 = 40;

/// Valid implied probability range (inclusive).
pub const MIN_IMPLIED_PROBABILITY: u16 = 1_001;
pub const MAX_IMPLIED_PROBABILITY: u16 = 1_100;

/// Upper bound for `SetMaxBetAmountPercentage` (10% of total staked).
pub const MAX_BET_AMOUNT_PERCENTAGE_BPS: u16 = 1_000;

/// Share of `max_bet_amount` borrowed from the pool to seed a new match.
pub const SEED_LIQUIDITY_BPS: u128 = 8_000;

/// How strongly an odds move since placement scales an early cash-out (3.72x).
pub const CASH_OUT_SENSITIVITY_BPS: u128 = 37_200;

/// Error codes carried by `TransactionRejected`.
pub const ERROR_UNAUTHORIZED: u8 = 1;
pub const ERROR_INVALID_AMOUNT: u8 = 10;
pub const ERROR_INVALID_BET_AMOUNT: u8 = 11;
pub const ERROR_INVALID_PERCENTAGE: u8 = 12;
pub const ERROR_INVALID_IMPLIED_PROBABILITY: u8 = 13;
pub const ERROR_INVALID_RESULT: u8 = 14;
pub const ERROR_MATCH_ONGOING: u8 = 20;
pub const ERROR_MATCH_ENDED: u8 = 21;
pub const ERROR_MATCH_NOT_STARTED: u8 = 22;
pub const ERROR_MATCH_NOT_ENDED: u8 = 23;
pub const ERROR_PAUSED: u8 = 24;
pub const ERROR_INSUFFICIENT_BET_AMOUNT: u8 = 30;
pub const ERROR_INSUFFICIENT_STAKE: u8 = 31;
pub const ERROR_REPAYMENT_EXCEEDS_BORROWED: u8 = 32;
pub const ERROR_EXCEEDS_BORROW_LIMIT: u8 = 40;
pub const ERROR_NO_WINNING_BET: u8 = 50;
pub const ERROR_NO_PAYOUT_AVAILABLE: u8 = 51;
pub const ERROR_NOT_ALLOWED_TO_BORROW: u8 = 52;
pub const ERROR_INSUFFICIENT_FUNDS: u8 = 60;
pub const ERROR_INSUFFICIENT_ALLOWANCE: u8 = 61;
pub const ERROR_ARITHMETIC_OVERFLOW: u8 = 70;
