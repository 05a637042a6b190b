//! Round lifecycle state machine.
//!
//! A round moves `open -> closed -> completed`. `drawing` is a display-only state between
//! close and result entry and settles exactly like `closed`. Result entry may complete a
//! round straight from `open`, and a completed round may be settled again when
//! re-settlement is enabled.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lotto_execution::round_lifecycle::{RoundLifecycle, TransitionResult};
//!
//! match RoundLifecycle::check_transition(&round, now) {
//!     TransitionResult::CloseBetting => { /* stage a PutRound with status closed */ }
//!     TransitionResult::NoTransition => {}
//! }
//! ```

use chrono::{DateTime, Utc};
use lotto_types::lottery::{LotteryRound, RoundId, RoundStatus};

use crate::state::{Mutation, Store, StoreError};

/// Result of a time-based transition check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionResult {
    NoTransition,
    /// Betting window has elapsed; the round should close.
    CloseBetting,
}

/// How a settlement request relates to the round's current status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementEntry {
    /// First result for this round.
    Fresh,
    /// The round is already completed and is being corrected.
    Resubmission,
}

/// Pure transition rules for rounds. No I/O.
pub struct RoundLifecycle;

impl RoundLifecycle {
    pub fn can_transition(from: RoundStatus, to: RoundStatus) -> bool {
        use RoundStatus::*;
        matches!(
            (from, to),
            (Open | Drawing, Closed)
                | (Open | Closed, Drawing)
                | (Open | Closed | Drawing, Completed)
                | (Completed, Completed)
        )
    }

    /// Close an open round once its betting window has elapsed.
    pub fn check_transition(round: &LotteryRound, now: DateTime<Utc>) -> TransitionResult {
        if round.status == RoundStatus::Open && now >= round.close_time {
            TransitionResult::CloseBetting
        } else {
            TransitionResult::NoTransition
        }
    }

    /// Whether a manual close is allowed from `status`.
    pub fn can_close(status: RoundStatus) -> bool {
        Self::can_transition(status, RoundStatus::Closed)
    }

    /// Classify a result submission against the round's status.
    pub fn settlement_entry(status: RoundStatus) -> SettlementEntry {
        match status {
            RoundStatus::Completed => SettlementEntry::Resubmission,
            _ => SettlementEntry::Fresh,
        }
    }

    /// Validate a betting window.
    pub fn validate_schedule(
        open_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
    ) -> Result<(), &'static str> {
        if open_time >= close_time {
            return Err("openTime must be before closeTime");
        }
        Ok(())
    }
}

/// Close every open round whose betting window has elapsed. Returns the closed ids.
pub async fn close_due_rounds<S: Store>(
    store: &mut S,
    now: DateTime<Utc>,
) -> Result<Vec<RoundId>, StoreError> {
    let mut closed = Vec::new();
    let mut changes = Vec::new();
    for mut round in store.rounds().await? {
        if RoundLifecycle::check_transition(&round, now) == TransitionResult::CloseBetting {
            round.status = RoundStatus::Closed;
            closed.push(round.id);
            changes.push(Mutation::PutRound(round));
        }
    }
    if !changes.is_empty() {
        store.commit(changes).await?;
        tracing::info!(count = closed.len(), "closed rounds past their betting window");
    }
    Ok(closed)
}
