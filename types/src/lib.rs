//! Common types for the lotto admin backend.
//!
//! [`lottery`] holds the persisted domain model; [`api`] holds HTTP request/response bodies.
//! Money is always [`rust_decimal::Decimal`] and serializes as a JSON string so that
//! amounts survive the wire exactly.

pub mod api;
pub mod lottery;

pub use lottery::{
    Bet, BetId, BetStatus, BetType, DrawResult, LotteryRound, LotteryType, LotteryTypeId,
    LotteryTypeStatus, PayoutRates, ResultError, ResultField, RoundId, RoundStatus, Transaction,
    TransactionId, TransactionKind, TransactionStatus, User, UserId, UserStatus, Wallet,
};
