//! Dashboard and per-round reporting.
//!
//! Read-only aggregates over the store:
//!
//! - [`report`]: totals across all bets, users, rounds and approved transactions
//! - [`round_summary`]: bet counts by status plus stake and payout for one round

use lotto_types::api::{ReportData, RoundSummary};
use lotto_types::lottery::{BetStatus, RoundId, RoundStatus, TransactionKind, TransactionStatus};
use rust_decimal::Decimal;

use crate::admin::AdminError;
use crate::state::Store;

fn add(total: Decimal, amount: Decimal) -> Result<Decimal, AdminError> {
    total
        .checked_add(amount)
        .ok_or_else(|| AdminError::Validation("report total overflowed".to_string()))
}

/// Console dashboard figures. Cancelled bets are excluded from stake and profit.
pub async fn report<S: Store>(store: &S) -> Result<ReportData, AdminError> {
    let mut data = ReportData::default();

    for bet in store.bets().await? {
        if bet.status == BetStatus::Cancelled {
            continue;
        }
        data.total_bets += 1;
        data.total_bet_amount = add(data.total_bet_amount, bet.amount)?;
        if bet.status == BetStatus::Won {
            data.total_wins += 1;
            data.total_payout = add(data.total_payout, bet.credited())?;
        }
    }
    data.profit = data
        .total_bet_amount
        .checked_sub(data.total_payout)
        .ok_or_else(|| AdminError::Validation("report profit overflowed".to_string()))?;

    data.total_users = store.users().await?.len() as u64;
    data.active_rounds = store
        .rounds()
        .await?
        .iter()
        .filter(|round| round.status == RoundStatus::Open)
        .count() as u64;

    for transaction in store.transactions().await? {
        if transaction.status != TransactionStatus::Approved {
            continue;
        }
        match transaction.kind {
            TransactionKind::Deposit => {
                data.total_deposits = add(data.total_deposits, transaction.amount)?
            }
            TransactionKind::Withdraw => {
                data.total_withdraws = add(data.total_withdraws, transaction.amount)?
            }
        }
    }
    Ok(data)
}

/// Bet tallies for one round.
pub async fn round_summary<S: Store>(
    store: &S,
    round_id: RoundId,
) -> Result<RoundSummary, AdminError> {
    store.round(&round_id).await?.ok_or(AdminError::NotFound {
        kind: "round",
        id: round_id,
    })?;
    let bets = store
        .bets_for_round(
            &round_id,
            &[
                BetStatus::Pending,
                BetStatus::Won,
                BetStatus::Lost,
                BetStatus::Cancelled,
            ],
        )
        .await?;

    let mut summary = RoundSummary {
        round_id,
        ..RoundSummary::default()
    };
    for bet in bets {
        summary.total_bets += 1;
        match bet.status {
            BetStatus::Pending => summary.pending += 1,
            BetStatus::Won => summary.won += 1,
            BetStatus::Lost => summary.lost += 1,
            BetStatus::Cancelled => {
                summary.cancelled += 1;
                continue;
            }
        }
        summary.total_stake = add(summary.total_stake, bet.amount)?;
        summary.total_payout = add(summary.total_payout, bet.credited())?;
    }
    Ok(summary)
}
