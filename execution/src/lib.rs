//! Lotto execution layer.
//!
//! This crate contains result matching and bet settlement for the lotto admin backend,
//! plus the console operations that share its store.
//!
//! - [`registry`]: bet type catalog (default multipliers, result fields, predicates)
//! - [`payout`]: per-lottery-type rate resolution with registry fallback
//! - [`matcher`]: pure bet/result evaluation
//! - [`settlement`]: the settlement engine
//! - [`round_lifecycle`]: round status transitions and auto-close
//! - [`admin`] and [`report`]: console operations
//! - [`state`]: the [`Store`] trait and the in-memory [`Memory`] store
//!
//! ## Atomicity
//! Every write stages a batch of [`state::Mutation`]s and lands it with a single
//! [`Store::commit`]. A store must apply a batch entirely or not at all; settlement relies
//! on this to leave the round, its bets and every wallet untouched when anything fails.
//!
//! ## Example
//! ```rust,ignore
//! use lotto_execution::{Memory, SettlementEngine};
//! use lotto_types::DrawResult;
//!
//! # async fn example(store: &mut Memory, round_id: lotto_types::RoundId) -> Result<(), lotto_execution::SettlementError> {
//! let engine = SettlementEngine::default();
//! let result = DrawResult {
//!     first_prize: Some("123456".into()),
//!     last_two_digits: Some("25".into()),
//!     last_three_digits: Some("456".into()),
//! };
//! let summary = engine.settle_round(store, round_id, result).await?;
//! println!("won={} lost={} payout={}", summary.won, summary.lost, summary.total_payout);
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod matcher;
pub mod payout;
pub mod registry;
pub mod report;
pub mod round_lifecycle;
pub mod settlement;
pub mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use admin::AdminError;
pub use matcher::{evaluate, Evaluation};
pub use payout::resolve_rate;
pub use settlement::{SettlementConfig, SettlementEngine, SettlementError};
pub use state::{Memory, Mutation, Store, StoreError};
