//! Lottery domain types.
//!
//! Defines lottery types, rounds, draw results, bets, users, wallets and deposit/withdraw
//! transactions shared by the execution layer and the HTTP backend.

mod bet;
mod catalog;
mod round;
mod wallet;

pub use bet::*;
pub use catalog::*;
pub use round::*;
pub use wallet::*;

use uuid::Uuid;

pub type LotteryTypeId = Uuid;
pub type RoundId = Uuid;
pub type BetId = Uuid;
pub type UserId = Uuid;
pub type WalletId = Uuid;
pub type TransactionId = Uuid;

/// Longest accepted first prize (Thai government lottery draws six digits).
pub const FIRST_PRIZE_MAX_DIGITS: usize = 6;

/// `high_low` bets split at this two-digit value (`>=` is high).
pub const HIGH_LOW_THRESHOLD: u8 = 50;

/// Sentinel entries for "any number" wagers.
pub const TODD_SENTINEL: &str = "todd";
pub const ROOD_SENTINEL: &str = "rood";
