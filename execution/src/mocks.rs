//! Test fixtures: a seeded lottery type, open round and funded user, plus a store wrapper
//! that injects commit failures and read latency.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use lotto_types::lottery::{
    Bet, BetId, BetStatus, BetType, DrawResult, LotteryRound, LotteryType, LotteryTypeId,
    PayoutRates, RoundId, Transaction, TransactionId, User, UserId, Wallet,
};
use rust_decimal::Decimal;

use crate::state::{Memory, Mutation, Store, StoreError};

/// Opening balance of the fixture user.
pub const FIXTURE_BALANCE: i64 = 1_000;

/// Build a draw result from optional fields.
pub fn draw(first: Option<&str>, two: Option<&str>, three: Option<&str>) -> DrawResult {
    DrawResult {
        first_prize: first.map(str::to_string),
        last_two_digits: two.map(str::to_string),
        last_three_digits: three.map(str::to_string),
    }
}

/// Creates a user with a wallet holding `balance`.
pub fn create_user(username: &str, balance: Decimal) -> (User, Wallet) {
    let user = User::new(username.to_string(), None, Utc::now());
    let wallet = Wallet::new(user.id, balance);
    (user, wallet)
}

/// One lottery type, one open round and one funded user.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub lottery_type: LotteryType,
    pub round: LotteryRound,
    pub user: User,
    pub wallet: Wallet,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Fixture whose lottery type uses registry defaults.
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_rates(rates: PayoutRates) -> Self {
        Self::build(Some(rates))
    }

    fn build(rates: Option<PayoutRates>) -> Self {
        let now = Utc::now();
        let mut lottery_type =
            LotteryType::new("หวยรัฐบาลไทย".to_string(), "TH_GOV".to_string(), now);
        lottery_type.payout_rates = rates;
        let round = LotteryRound::new(
            lottery_type.id,
            "2026-11-01".to_string(),
            now - ChronoDuration::hours(1),
            now + ChronoDuration::hours(1),
        );
        let (user, wallet) = create_user("somchai", Decimal::from(FIXTURE_BALANCE));
        Self {
            lottery_type,
            round,
            user,
            wallet,
        }
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        vec![
            Mutation::PutLotteryType(self.lottery_type.clone()),
            Mutation::PutRound(self.round.clone()),
            Mutation::PutUser(self.user.clone()),
            Mutation::PutWallet(self.wallet.clone()),
        ]
    }

    /// A memory store seeded with the fixture.
    pub async fn store(&self) -> Memory {
        let mut store = Memory::new();
        // Seeding an empty store cannot fail validation.
        let _ = store.commit(self.mutations()).await;
        store
    }

    /// Pending bet by the fixture user on the fixture round.
    pub fn bet(&self, bet_type: BetType, number: &str, amount: Decimal) -> Bet {
        self.bet_for(self.user.id, bet_type, number, amount)
    }

    pub fn bet_for(&self, user_id: UserId, bet_type: BetType, number: &str, amount: Decimal) -> Bet {
        Bet::new(
            user_id,
            self.round.id,
            bet_type,
            vec![number.to_string()],
            amount,
            Utc::now(),
        )
    }

    /// Bet already settled: won with `payout`, or lost when `payout` is `None`.
    pub fn settled_bet(
        &self,
        bet_type: BetType,
        number: &str,
        amount: Decimal,
        payout: Option<Decimal>,
    ) -> Bet {
        let mut bet = self.bet(bet_type, number, amount);
        bet.status = if payout.is_some() {
            BetStatus::Won
        } else {
            BetStatus::Lost
        };
        bet.payout = payout;
        bet
    }
}

/// Wraps a store, optionally failing every commit and delaying bet reads.
#[derive(Clone, Debug, Default)]
pub struct FaultyStore<S> {
    pub inner: S,
    pub fail_commit: bool,
    pub read_delay: Option<Duration>,
}

impl<S> FaultyStore<S> {
    pub fn failing(inner: S) -> Self {
        Self {
            inner,
            fail_commit: true,
            read_delay: None,
        }
    }

    pub fn slow(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            fail_commit: false,
            read_delay: Some(delay),
        }
    }
}

impl<S: Store> Store for FaultyStore<S> {
    async fn lottery_type(&self, id: &LotteryTypeId) -> Result<Option<LotteryType>, StoreError> {
        self.inner.lottery_type(id).await
    }

    async fn lottery_types(&self) -> Result<Vec<LotteryType>, StoreError> {
        self.inner.lottery_types().await
    }

    async fn round(&self, id: &RoundId) -> Result<Option<LotteryRound>, StoreError> {
        self.inner.round(id).await
    }

    async fn rounds(&self) -> Result<Vec<LotteryRound>, StoreError> {
        self.inner.rounds().await
    }

    async fn bet(&self, id: &BetId) -> Result<Option<Bet>, StoreError> {
        self.inner.bet(id).await
    }

    async fn bets(&self) -> Result<Vec<Bet>, StoreError> {
        self.inner.bets().await
    }

    async fn bets_for_round(
        &self,
        round_id: &RoundId,
        statuses: &[BetStatus],
    ) -> Result<Vec<Bet>, StoreError> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.bets_for_round(round_id, statuses).await
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.user(id).await
    }

    async fn users(&self) -> Result<Vec<User>, StoreError> {
        self.inner.users().await
    }

    async fn wallet(&self, user_id: &UserId) -> Result<Option<Wallet>, StoreError> {
        self.inner.wallet(user_id).await
    }

    async fn transaction(&self, id: &TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.inner.transaction(id).await
    }

    async fn transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        self.inner.transactions().await
    }

    async fn commit(&mut self, changes: Vec<Mutation>) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Backend(format!(
                "injected failure ({} changes dropped)",
                changes.len()
            )));
        }
        self.inner.commit(changes).await
    }
}
