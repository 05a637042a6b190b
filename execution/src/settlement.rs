//! Settlement engine.
//!
//! Accepts a draw result for a round, classifies every bet of the round, and commits bet
//! outcomes, wallet credits and the round's completion as one batch.
//!
//! Settlement always recomputes from scratch. Each bet's previously credited payout is
//! reversed and its new payout applied, netted into one wallet delta per user. A first
//! settlement has nothing to reverse, so the same path serves result correction.
//!
//! Only one settlement per round may be in flight; a concurrent submission for the same
//! round fails with [`SettlementError::Conflict`] instead of waiting.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lotto_types::api::SettlementSummary;
use lotto_types::lottery::{
    Bet, BetId, BetStatus, DrawResult, ResultError, RoundId, RoundStatus, UserId,
};
use rust_decimal::Decimal;
use thiserror::Error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::matcher::{self, Evaluation};
use crate::payout::{self, RateTable};
use crate::round_lifecycle::{RoundLifecycle, SettlementEntry};
use crate::state::{Mutation, Store, StoreError};

/// Default bound on one settlement.
pub const DEFAULT_SETTLEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bets re-read on every settlement.
const SETTLEABLE: [BetStatus; 3] = [BetStatus::Pending, BetStatus::Won, BetStatus::Lost];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementConfig {
    pub timeout: Duration,
    /// Whether a completed round may be settled again with a corrected result.
    pub allow_resettlement: bool,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SETTLEMENT_TIMEOUT,
            allow_resettlement: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error(transparent)]
    Validation(#[from] ResultError),
    #[error("round {0} not found")]
    NotFound(RoundId),
    #[error("round {round_id}: {reason}")]
    Conflict {
        round_id: RoundId,
        reason: &'static str,
    },
    #[error("integrity error: {0}")]
    Integrity(String),
    #[error("transaction failed: {0}")]
    Transaction(String),
}

impl SettlementError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::Validation(_) => "validation_error",
            SettlementError::NotFound(_) => "not_found",
            SettlementError::Conflict { .. } => "conflict",
            SettlementError::Integrity(_) => "integrity_error",
            SettlementError::Transaction(_) => "transaction_error",
        }
    }
}

impl From<StoreError> for SettlementError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingWallet(_) | StoreError::NegativeBalance { .. } => {
                SettlementError::Integrity(err.to_string())
            }
            other => SettlementError::Transaction(other.to_string()),
        }
    }
}

/// Registry of rounds currently being settled.
#[derive(Debug, Default)]
pub struct RoundLocks {
    inflight: Mutex<HashSet<RoundId>>,
}

impl RoundLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim `round_id`, or `None` if another settlement holds it.
    pub fn try_acquire(self: &Arc<Self>, round_id: RoundId) -> Option<RoundGuard> {
        let mut inflight = match self.inflight.lock() {
            Ok(inflight) => inflight,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !inflight.insert(round_id) {
            return None;
        }
        Some(RoundGuard {
            locks: Arc::clone(self),
            round_id,
        })
    }

    pub fn is_locked(&self, round_id: &RoundId) -> bool {
        match self.inflight.lock() {
            Ok(inflight) => inflight.contains(round_id),
            Err(poisoned) => poisoned.into_inner().contains(round_id),
        }
    }
}

/// Releases the round on drop.
#[derive(Debug)]
pub struct RoundGuard {
    locks: Arc<RoundLocks>,
    round_id: RoundId,
}

impl RoundGuard {
    pub fn round_id(&self) -> RoundId {
        self.round_id
    }
}

impl Drop for RoundGuard {
    fn drop(&mut self) {
        let mut inflight = match self.locks.inflight.lock() {
            Ok(inflight) => inflight,
            Err(poisoned) => poisoned.into_inner(),
        };
        inflight.remove(&self.round_id);
    }
}

/// New outcome for one bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Outcome {
    bet_id: BetId,
    user_id: UserId,
    status: BetStatus,
    payout: Option<Decimal>,
    /// Wallet change relative to what this bet had already credited.
    delta: Decimal,
    changed: bool,
}

fn outcome(bet: &Bet, evaluation: Evaluation) -> Result<Outcome, SettlementError> {
    let (status, payout) = match evaluation {
        Evaluation::Skipped => (BetStatus::Pending, None),
        Evaluation::Lost => (BetStatus::Lost, None),
        Evaluation::Won { multiplier } => {
            let payout = payout::payout(bet.amount, multiplier).ok_or_else(|| {
                SettlementError::Transaction(format!("payout overflow for bet {}", bet.id))
            })?;
            (BetStatus::Won, Some(payout))
        }
    };
    let credited = payout.unwrap_or(Decimal::ZERO);
    let delta = credited.checked_sub(bet.credited()).ok_or_else(|| {
        SettlementError::Transaction(format!("payout reversal overflow for bet {}", bet.id))
    })?;
    Ok(Outcome {
        bet_id: bet.id,
        user_id: bet.user_id,
        status,
        payout,
        delta,
        changed: status != bet.status || payout != bet.payout,
    })
}

fn evaluate_all(bets: &[Bet], result: &DrawResult, rates: &RateTable) -> Vec<Evaluation> {
    #[cfg(feature = "parallel")]
    let iter = bets.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = bets.iter();
    iter.map(|bet| matcher::evaluate(bet, result, rates.get(bet.bet_type)))
        .collect()
}

/// Classify `bets` and build the batch that completes the round.
fn plan(
    round_id: RoundId,
    result: DrawResult,
    bets: &[Bet],
    rates: &RateTable,
) -> Result<(SettlementSummary, Vec<Mutation>), SettlementError> {
    let evaluations = evaluate_all(bets, &result, rates);

    let mut summary = SettlementSummary::default();
    let mut deltas: BTreeMap<UserId, Decimal> = BTreeMap::new();
    let mut changes = vec![Mutation::SetResultAndComplete { round_id, result }];
    for (bet, evaluation) in bets.iter().zip(evaluations) {
        let outcome = outcome(bet, evaluation)?;
        match outcome.status {
            BetStatus::Won => {
                summary.won += 1;
                summary.total_payout = summary
                    .total_payout
                    .checked_add(outcome.payout.unwrap_or(Decimal::ZERO))
                    .ok_or_else(|| {
                        SettlementError::Transaction("total payout overflow".to_string())
                    })?;
            }
            BetStatus::Lost => summary.lost += 1,
            _ => {}
        }
        if !outcome.delta.is_zero() {
            let slot = deltas.entry(outcome.user_id).or_insert(Decimal::ZERO);
            *slot = slot.checked_add(outcome.delta).ok_or_else(|| {
                SettlementError::Transaction(format!(
                    "wallet delta overflow for user {}",
                    outcome.user_id
                ))
            })?;
        }
        if outcome.changed {
            changes.push(Mutation::UpdateBetOutcome {
                bet_id: outcome.bet_id,
                status: outcome.status,
                payout: outcome.payout,
            });
        }
    }
    changes.extend(
        deltas
            .into_iter()
            .filter(|(_, delta)| !delta.is_zero())
            .map(|(user_id, delta)| Mutation::AdjustWallet { user_id, delta }),
    );
    Ok((summary, changes))
}

#[derive(Clone, Debug)]
pub struct SettlementEngine {
    config: SettlementConfig,
    locks: Arc<RoundLocks>,
}

impl Default for SettlementEngine {
    fn default() -> Self {
        Self::new(SettlementConfig::default())
    }
}

impl SettlementEngine {
    pub fn new(config: SettlementConfig) -> Self {
        Self {
            config,
            locks: RoundLocks::new(),
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn locks(&self) -> &Arc<RoundLocks> {
        &self.locks
    }

    /// Claim exclusive settlement of `round_id`.
    ///
    /// Callers that serialize store access themselves should take this before waiting on
    /// the store so that a duplicate submission is rejected rather than queued.
    pub fn lock_round(&self, round_id: RoundId) -> Result<RoundGuard, SettlementError> {
        self.locks
            .try_acquire(round_id)
            .ok_or(SettlementError::Conflict {
                round_id,
                reason: "settlement already in progress",
            })
    }

    /// Validate `result`, lock the round and settle it.
    pub async fn settle_round<S: Store>(
        &self,
        store: &mut S,
        round_id: RoundId,
        result: DrawResult,
    ) -> Result<SettlementSummary, SettlementError> {
        let result = result.normalize()?;
        let guard = self.lock_round(round_id)?;
        self.settle(&guard, store, result).await
    }

    /// Settle the round held by `guard` under the configured timeout.
    pub async fn settle<S: Store>(
        &self,
        guard: &RoundGuard,
        store: &mut S,
        result: DrawResult,
    ) -> Result<SettlementSummary, SettlementError> {
        let result = result.normalize()?;
        let round_id = guard.round_id();
        let deadline = Instant::now().checked_add(self.config.timeout);
        let run = self.run(store, round_id, result, deadline);
        match tokio::time::timeout(self.config.timeout, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.timed_out(round_id)),
        }
    }

    fn timed_out(&self, round_id: RoundId) -> SettlementError {
        tracing::warn!(%round_id, timeout = ?self.config.timeout, "settlement timed out");
        SettlementError::Transaction(format!(
            "settlement timed out after {:?}",
            self.config.timeout
        ))
    }

    async fn run<S: Store>(
        &self,
        store: &mut S,
        round_id: RoundId,
        result: DrawResult,
        deadline: Option<Instant>,
    ) -> Result<SettlementSummary, SettlementError> {
        let round = store
            .round(&round_id)
            .await?
            .ok_or(SettlementError::NotFound(round_id))?;
        let entry = RoundLifecycle::settlement_entry(round.status);
        if entry == SettlementEntry::Resubmission && !self.config.allow_resettlement {
            return Err(SettlementError::Conflict {
                round_id,
                reason: "round already completed",
            });
        }
        if !RoundLifecycle::can_transition(round.status, RoundStatus::Completed) {
            return Err(SettlementError::Conflict {
                round_id,
                reason: "round cannot be completed from its current status",
            });
        }
        let lottery_type = store
            .lottery_type(&round.lottery_type_id)
            .await?
            .ok_or_else(|| {
                SettlementError::Integrity(format!(
                    "round {round_id} references missing lottery type {}",
                    round.lottery_type_id
                ))
            })?;
        let rates = RateTable::for_lottery_type(&lottery_type);

        let bets = store.bets_for_round(&round_id, &SETTLEABLE).await?;
        tracing::info!(%round_id, bets = bets.len(), status = round.status.as_str(), "settling round");
        let started = Instant::now();
        // Evaluation is CPU bound; keep it off the runtime so the timeout can still fire.
        let (summary, changes) =
            tokio::task::spawn_blocking(move || plan(round_id, result, &bets, &rates))
                .await
                .map_err(|err| {
                    SettlementError::Transaction(format!("settlement worker failed: {err}"))
                })??;
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(self.timed_out(round_id));
        }

        if let Err(err) = store.commit(changes).await {
            tracing::error!(%round_id, %err, "settlement commit failed");
            return Err(err.into());
        }
        tracing::info!(
            %round_id,
            resubmission = entry == SettlementEntry::Resubmission,
            elapsed_ms = started.elapsed().as_millis() as u64,
            won = summary.won,
            lost = summary.lost,
            total_payout = %summary.total_payout,
            "round settled"
        );
        Ok(summary)
    }
}
