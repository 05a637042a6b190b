use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use lotto_types::lottery::{
    Bet, BetId, BetStatus, DrawResult, LotteryRound, LotteryType, LotteryTypeId, RoundId,
    RoundStatus, Transaction, TransactionId, User, UserId, Wallet,
};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("round {0} not found")]
    MissingRound(RoundId),
    #[error("bet {0} not found")]
    MissingBet(BetId),
    #[error("no wallet for user {0}")]
    MissingWallet(UserId),
    #[error("wallet of user {user_id} would go negative")]
    NegativeBalance { user_id: UserId },
    #[error("wallet of user {0} overflowed")]
    Overflow(UserId),
    #[error("store backend: {0}")]
    Backend(String),
}

/// A single staged change. A batch passed to [`Store::commit`] lands entirely or not at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    PutLotteryType(LotteryType),
    PutRound(LotteryRound),
    /// Record the draw and mark the round completed.
    SetResultAndComplete { round_id: RoundId, result: DrawResult },
    PutBet(Bet),
    UpdateBetOutcome {
        bet_id: BetId,
        status: BetStatus,
        payout: Option<Decimal>,
    },
    PutUser(User),
    PutWallet(Wallet),
    /// Signed balance change; rejected if the wallet is missing or would go negative.
    AdjustWallet { user_id: UserId, delta: Decimal },
    PutTransaction(Transaction),
}

pub trait Store: Send + Sync {
    fn lottery_type(
        &self,
        id: &LotteryTypeId,
    ) -> impl Future<Output = Result<Option<LotteryType>, StoreError>> + Send;
    fn lottery_types(&self) -> impl Future<Output = Result<Vec<LotteryType>, StoreError>> + Send;

    fn round(&self, id: &RoundId)
        -> impl Future<Output = Result<Option<LotteryRound>, StoreError>> + Send;
    fn rounds(&self) -> impl Future<Output = Result<Vec<LotteryRound>, StoreError>> + Send;

    fn bet(&self, id: &BetId) -> impl Future<Output = Result<Option<Bet>, StoreError>> + Send;
    fn bets(&self) -> impl Future<Output = Result<Vec<Bet>, StoreError>> + Send;
    /// Bets of one round whose status is in `statuses`, in placement order.
    fn bets_for_round(
        &self,
        round_id: &RoundId,
        statuses: &[BetStatus],
    ) -> impl Future<Output = Result<Vec<Bet>, StoreError>> + Send;

    fn user(&self, id: &UserId) -> impl Future<Output = Result<Option<User>, StoreError>> + Send;
    fn users(&self) -> impl Future<Output = Result<Vec<User>, StoreError>> + Send;
    fn wallet(&self, user_id: &UserId)
        -> impl Future<Output = Result<Option<Wallet>, StoreError>> + Send;

    fn transaction(
        &self,
        id: &TransactionId,
    ) -> impl Future<Output = Result<Option<Transaction>, StoreError>> + Send;
    fn transactions(&self) -> impl Future<Output = Result<Vec<Transaction>, StoreError>> + Send;

    /// Apply a batch atomically.
    fn commit(
        &mut self,
        changes: Vec<Mutation>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// In-process store. Every collection is ordered so listings are deterministic.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    lottery_types: BTreeMap<LotteryTypeId, LotteryType>,
    rounds: BTreeMap<RoundId, LotteryRound>,
    bets: BTreeMap<BetId, Bet>,
    round_bets: BTreeMap<RoundId, Vec<BetId>>,
    users: BTreeMap<UserId, User>,
    wallets: BTreeMap<UserId, Wallet>,
    transactions: BTreeMap<TransactionId, Transaction>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a batch against current state without touching it.
    fn prepare(&self, changes: &[Mutation]) -> Result<(), StoreError> {
        let mut rounds = BTreeSet::new();
        let mut bets = BTreeSet::new();
        let mut balances: BTreeMap<UserId, Decimal> = BTreeMap::new();

        for change in changes {
            match change {
                Mutation::PutLotteryType(_)
                | Mutation::PutUser(_)
                | Mutation::PutTransaction(_) => {}
                Mutation::PutRound(round) => {
                    rounds.insert(round.id);
                }
                Mutation::SetResultAndComplete { round_id, .. } => {
                    if !rounds.contains(round_id) && !self.rounds.contains_key(round_id) {
                        return Err(StoreError::MissingRound(*round_id));
                    }
                }
                Mutation::PutBet(bet) => {
                    bets.insert(bet.id);
                }
                Mutation::UpdateBetOutcome { bet_id, .. } => {
                    if !bets.contains(bet_id) && !self.bets.contains_key(bet_id) {
                        return Err(StoreError::MissingBet(*bet_id));
                    }
                }
                Mutation::PutWallet(wallet) => {
                    balances.insert(wallet.user_id, wallet.balance);
                }
                Mutation::AdjustWallet { user_id, delta } => {
                    let current = match balances.get(user_id) {
                        Some(balance) => *balance,
                        None => self
                            .wallets
                            .get(user_id)
                            .map(|wallet| wallet.balance)
                            .ok_or(StoreError::MissingWallet(*user_id))?,
                    };
                    let next = current
                        .checked_add(*delta)
                        .ok_or(StoreError::Overflow(*user_id))?;
                    if next < Decimal::ZERO {
                        return Err(StoreError::NegativeBalance { user_id: *user_id });
                    }
                    balances.insert(*user_id, next);
                }
            }
        }
        Ok(())
    }

    fn apply(&mut self, change: Mutation) {
        match change {
            Mutation::PutLotteryType(lottery_type) => {
                self.lottery_types.insert(lottery_type.id, lottery_type);
            }
            Mutation::PutRound(round) => {
                self.rounds.insert(round.id, round);
            }
            Mutation::SetResultAndComplete { round_id, result } => {
                if let Some(round) = self.rounds.get_mut(&round_id) {
                    round.result = Some(result);
                    round.status = RoundStatus::Completed;
                }
            }
            Mutation::PutBet(bet) => {
                if !self.bets.contains_key(&bet.id) {
                    self.round_bets
                        .entry(bet.lottery_round_id)
                        .or_default()
                        .push(bet.id);
                }
                self.bets.insert(bet.id, bet);
            }
            Mutation::UpdateBetOutcome {
                bet_id,
                status,
                payout,
            } => {
                if let Some(bet) = self.bets.get_mut(&bet_id) {
                    bet.status = status;
                    bet.payout = payout;
                }
            }
            Mutation::PutUser(user) => {
                self.users.insert(user.id, user);
            }
            Mutation::PutWallet(wallet) => {
                self.wallets.insert(wallet.user_id, wallet);
            }
            Mutation::AdjustWallet { user_id, delta } => {
                if let Some(wallet) = self.wallets.get_mut(&user_id) {
                    wallet.balance += delta;
                }
            }
            Mutation::PutTransaction(transaction) => {
                self.transactions.insert(transaction.id, transaction);
            }
        }
    }
}

impl Store for Memory {
    async fn lottery_type(&self, id: &LotteryTypeId) -> Result<Option<LotteryType>, StoreError> {
        Ok(self.lottery_types.get(id).cloned())
    }

    async fn lottery_types(&self) -> Result<Vec<LotteryType>, StoreError> {
        Ok(self.lottery_types.values().cloned().collect())
    }

    async fn round(&self, id: &RoundId) -> Result<Option<LotteryRound>, StoreError> {
        Ok(self.rounds.get(id).cloned())
    }

    async fn rounds(&self) -> Result<Vec<LotteryRound>, StoreError> {
        Ok(self.rounds.values().cloned().collect())
    }

    async fn bet(&self, id: &BetId) -> Result<Option<Bet>, StoreError> {
        Ok(self.bets.get(id).cloned())
    }

    async fn bets(&self) -> Result<Vec<Bet>, StoreError> {
        Ok(self.bets.values().cloned().collect())
    }

    async fn bets_for_round(
        &self,
        round_id: &RoundId,
        statuses: &[BetStatus],
    ) -> Result<Vec<Bet>, StoreError> {
        let Some(ids) = self.round_bets.get(round_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.bets.get(id))
            .filter(|bet| statuses.contains(&bet.status))
            .cloned()
            .collect())
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).cloned())
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.values().cloned().collect())
    }

    async fn wallet(&self, user_id: &UserId) -> Result<Option<Wallet>, StoreError> {
        Ok(self.wallets.get(user_id).cloned())
    }

    async fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.transactions.get(id).cloned())
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.transactions.values().cloned().collect())
    }

    async fn commit(&mut self, changes: Vec<Mutation>) -> Result<(), StoreError> {
        self.prepare(&changes)?;
        for change in changes {
            self.apply(change);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lotto_types::lottery::BetType;
    use rust_decimal_macros::dec;

    fn user_with_wallet(balance: Decimal) -> (User, Wallet) {
        let user = User::new("somchai".to_string(), None, Utc::now());
        let wallet = Wallet::new(user.id, balance);
        (user, wallet)
    }

    #[tokio::test]
    async fn test_commit_applies_batch() {
        let mut store = Memory::new();
        let (user, wallet) = user_with_wallet(dec!(100));
        store
            .commit(vec![
                Mutation::PutUser(user.clone()),
                Mutation::PutWallet(wallet),
                Mutation::AdjustWallet {
                    user_id: user.id,
                    delta: dec!(-40),
                },
            ])
            .await
            .unwrap();
        assert_eq!(store.wallet(&user.id).await.unwrap().unwrap().balance, dec!(60));
        assert_eq!(store.users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let mut store = Memory::new();
        let (user, wallet) = user_with_wallet(dec!(10));
        store
            .commit(vec![Mutation::PutUser(user.clone()), Mutation::PutWallet(wallet)])
            .await
            .unwrap();

        let err = store
            .commit(vec![
                Mutation::AdjustWallet {
                    user_id: user.id,
                    delta: dec!(5),
                },
                Mutation::AdjustWallet {
                    user_id: user.id,
                    delta: dec!(-20),
                },
            ])
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::NegativeBalance { user_id: user.id });
        assert_eq!(store.wallet(&user.id).await.unwrap().unwrap().balance, dec!(10));
    }

    #[tokio::test]
    async fn test_missing_targets_rejected() {
        let mut store = Memory::new();
        let stranger = uuid::Uuid::new_v4();
        assert_eq!(
            store
                .commit(vec![Mutation::AdjustWallet {
                    user_id: stranger,
                    delta: dec!(1),
                }])
                .await,
            Err(StoreError::MissingWallet(stranger))
        );
        assert!(matches!(
            store
                .commit(vec![Mutation::UpdateBetOutcome {
                    bet_id: stranger,
                    status: BetStatus::Won,
                    payout: Some(dec!(1)),
                }])
                .await,
            Err(StoreError::MissingBet(_))
        ));
    }

    #[tokio::test]
    async fn test_bets_for_round_filters_and_keeps_order() {
        let mut store = Memory::new();
        let round_id = uuid::Uuid::new_v4();
        let user_id = uuid::Uuid::new_v4();
        let first = Bet::new(user_id, round_id, BetType::TwoDigit, vec!["25".into()], dec!(1), Utc::now());
        let mut second = Bet::new(user_id, round_id, BetType::Running, vec!["5".into()], dec!(1), Utc::now());
        second.status = BetStatus::Cancelled;
        let third = Bet::new(user_id, round_id, BetType::Set, vec!["52".into()], dec!(1), Utc::now());
        store
            .commit(vec![
                Mutation::PutBet(first.clone()),
                Mutation::PutBet(second),
                Mutation::PutBet(third.clone()),
            ])
            .await
            .unwrap();

        let pending = store
            .bets_for_round(&round_id, &[BetStatus::Pending])
            .await
            .unwrap();
        assert_eq!(
            pending.iter().map(|bet| bet.id).collect::<Vec<_>>(),
            vec![first.id, third.id]
        );
        assert!(store
            .bets_for_round(&uuid::Uuid::new_v4(), &[BetStatus::Pending])
            .await
            .unwrap()
            .is_empty());
    }
}
