//! Console operations: lottery types, rounds, users, bet placement and deposit/withdraw
//! review. Each write stages its mutations and lands them with one store commit.

use chrono::{DateTime, Utc};
use lotto_types::api::{
    CreateLotteryTypeRequest, CreateRoundRequest, CreateTransactionRequest, CreateUserRequest,
    Page, PageQuery, PlaceBetRequest, UpdateLotteryTypeRequest, UserDetail,
};
use lotto_types::lottery::{
    Bet, BetStatus, LotteryRound, LotteryType, LotteryTypeId, LotteryTypeStatus, PayoutRates,
    RoundId, RoundStatus, Transaction, TransactionId, TransactionStatus, User, UserId, Wallet,
};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::matcher;
use crate::round_lifecycle::RoundLifecycle;
use crate::state::{Mutation, Store, StoreError};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Validation(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },
    #[error("{0}")]
    Conflict(String),
    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance {
        available: Decimal,
        required: Decimal,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::Validation(_) => "validation_error",
            AdminError::NotFound { .. } => "not_found",
            AdminError::Conflict(_) => "conflict",
            AdminError::InsufficientBalance { .. } => "insufficient_balance",
            AdminError::Store(_) => "transaction_error",
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        AdminError::Validation(message.into())
    }
}

fn require_text(field: &str, value: &str) -> Result<String, AdminError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AdminError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn require_positive(field: &str, amount: Decimal) -> Result<(), AdminError> {
    if amount <= Decimal::ZERO {
        return Err(AdminError::validation(format!("{field} must be greater than zero")));
    }
    Ok(())
}

fn validate_rates(rates: &PayoutRates) -> Result<(), AdminError> {
    for (bet_type, rate) in rates.iter() {
        if rate < Decimal::ONE {
            return Err(AdminError::validation(format!(
                "payout rate for {bet_type} must be at least 1"
            )));
        }
    }
    Ok(())
}

// Lottery types.

pub async fn create_lottery_type<S: Store>(
    store: &mut S,
    request: CreateLotteryTypeRequest,
    now: DateTime<Utc>,
) -> Result<LotteryType, AdminError> {
    let name = require_text("name", &request.name)?;
    let code = require_text("code", &request.code)?;
    if let Some(rates) = &request.payout_rates {
        validate_rates(rates)?;
    }
    let existing = store.lottery_types().await?;
    if existing
        .iter()
        .any(|lottery_type| lottery_type.code.eq_ignore_ascii_case(&code))
    {
        return Err(AdminError::Conflict(format!("lottery type code {code} already exists")));
    }

    let mut lottery_type = LotteryType::new(name, code, now);
    lottery_type.status = request.status.unwrap_or_default();
    lottery_type.payout_rates = request.payout_rates.filter(|rates| !rates.is_empty());
    store
        .commit(vec![Mutation::PutLotteryType(lottery_type.clone())])
        .await?;
    tracing::info!(id = %lottery_type.id, code = %lottery_type.code, "lottery type created");
    Ok(lottery_type)
}

pub async fn update_lottery_type<S: Store>(
    store: &mut S,
    id: LotteryTypeId,
    request: UpdateLotteryTypeRequest,
    now: DateTime<Utc>,
) -> Result<LotteryType, AdminError> {
    let mut lottery_type = get_lottery_type(store, id).await?;
    if let Some(name) = request.name {
        lottery_type.name = require_text("name", &name)?;
    }
    if let Some(status) = request.status {
        lottery_type.status = status;
    }
    if let Some(rates) = request.payout_rates {
        validate_rates(&rates)?;
        lottery_type.payout_rates = (!rates.is_empty()).then_some(rates);
    }
    lottery_type.updated_at = now;
    store
        .commit(vec![Mutation::PutLotteryType(lottery_type.clone())])
        .await?;
    Ok(lottery_type)
}

pub async fn get_lottery_type<S: Store>(
    store: &S,
    id: LotteryTypeId,
) -> Result<LotteryType, AdminError> {
    store.lottery_type(&id).await?.ok_or(AdminError::NotFound {
        kind: "lottery type",
        id,
    })
}

/// Lottery types, oldest first, optionally filtered by status.
pub async fn list_lottery_types<S: Store>(
    store: &S,
    status: Option<LotteryTypeStatus>,
) -> Result<Vec<LotteryType>, AdminError> {
    let mut lottery_types = store
        .lottery_types()
        .await?
        .into_iter()
        .filter(|lottery_type| status.map_or(true, |status| lottery_type.status == status))
        .collect::<Vec<_>>();
    lottery_types.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.code.cmp(&b.code)));
    Ok(lottery_types)
}

// Rounds.

pub async fn create_round<S: Store>(
    store: &mut S,
    request: CreateRoundRequest,
) -> Result<LotteryRound, AdminError> {
    let round_number = require_text("roundNumber", &request.round_number)?;
    RoundLifecycle::validate_schedule(request.open_time, request.close_time)
        .map_err(AdminError::validation)?;
    let lottery_type = get_lottery_type(store, request.lottery_type_id).await?;
    if !lottery_type.is_active() {
        return Err(AdminError::validation(format!(
            "lottery type {} is inactive",
            lottery_type.code
        )));
    }
    let duplicate = store.rounds().await?.into_iter().any(|round| {
        round.lottery_type_id == lottery_type.id && round.round_number == round_number
    });
    if duplicate {
        return Err(AdminError::Conflict(format!(
            "round {round_number} already exists for {}",
            lottery_type.code
        )));
    }

    let round = LotteryRound::new(
        lottery_type.id,
        round_number,
        request.open_time,
        request.close_time,
    );
    store.commit(vec![Mutation::PutRound(round.clone())]).await?;
    tracing::info!(id = %round.id, round_number = %round.round_number, "round created");
    Ok(round)
}

pub async fn get_round<S: Store>(store: &S, id: RoundId) -> Result<LotteryRound, AdminError> {
    store
        .round(&id)
        .await?
        .ok_or(AdminError::NotFound { kind: "round", id })
}

pub async fn close_round<S: Store>(store: &mut S, id: RoundId) -> Result<LotteryRound, AdminError> {
    let mut round = get_round(store, id).await?;
    if !RoundLifecycle::can_close(round.status) {
        return Err(AdminError::Conflict(format!(
            "round {id} cannot be closed from {}",
            round.status.as_str()
        )));
    }
    round.status = RoundStatus::Closed;
    store.commit(vec![Mutation::PutRound(round.clone())]).await?;
    Ok(round)
}

/// Rounds with a status in `statuses` (all when empty), newest `openTime` first.
pub async fn list_rounds<S: Store>(
    store: &S,
    statuses: &[RoundStatus],
    query: PageQuery,
) -> Result<Page<LotteryRound>, AdminError> {
    let mut rounds = store
        .rounds()
        .await?
        .into_iter()
        .filter(|round| statuses.is_empty() || statuses.contains(&round.status))
        .collect::<Vec<_>>();
    rounds.sort_by(|a, b| b.open_time.cmp(&a.open_time).then(a.id.cmp(&b.id)));
    Ok(Page::paginate(rounds, query))
}

/// Rounds currently taking bets.
pub async fn open_rounds<S: Store>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Vec<LotteryRound>, AdminError> {
    let mut rounds = store
        .rounds()
        .await?
        .into_iter()
        .filter(|round| round.accepts_bets(now))
        .collect::<Vec<_>>();
    rounds.sort_by(|a, b| a.close_time.cmp(&b.close_time));
    Ok(rounds)
}

// Users and wallets.

pub async fn create_user<S: Store>(
    store: &mut S,
    request: CreateUserRequest,
    now: DateTime<Utc>,
) -> Result<UserDetail, AdminError> {
    let username = require_text("username", &request.username)?;
    let balance = request.initial_balance.unwrap_or(Decimal::ZERO);
    if balance < Decimal::ZERO {
        return Err(AdminError::validation("initialBalance must not be negative"));
    }
    if store
        .users()
        .await?
        .iter()
        .any(|user| user.username.eq_ignore_ascii_case(&username))
    {
        return Err(AdminError::Conflict(format!("username {username} is taken")));
    }
    let email = request
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    let user = User::new(username, email, now);
    let wallet = Wallet::new(user.id, balance);
    store
        .commit(vec![
            Mutation::PutUser(user.clone()),
            Mutation::PutWallet(wallet.clone()),
        ])
        .await?;
    Ok(UserDetail { user, wallet })
}

pub async fn get_user<S: Store>(store: &S, id: UserId) -> Result<UserDetail, AdminError> {
    let user = store
        .user(&id)
        .await?
        .ok_or(AdminError::NotFound { kind: "user", id })?;
    let wallet = store
        .wallet(&id)
        .await?
        .ok_or(AdminError::NotFound { kind: "wallet", id })?;
    Ok(UserDetail { user, wallet })
}

/// Users with their wallets, newest first.
pub async fn list_users<S: Store>(
    store: &S,
    query: PageQuery,
) -> Result<Page<UserDetail>, AdminError> {
    let mut users = store.users().await?;
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    let page = Page::paginate(users, query);
    let mut data = Vec::with_capacity(page.data.len());
    for user in page.data {
        let wallet = store.wallet(&user.id).await?.ok_or(AdminError::NotFound {
            kind: "wallet",
            id: user.id,
        })?;
        data.push(UserDetail { user, wallet });
    }
    Ok(Page {
        data,
        meta: page.meta,
    })
}

// Bets.

pub async fn place_bet<S: Store>(
    store: &mut S,
    request: PlaceBetRequest,
    now: DateTime<Utc>,
) -> Result<Bet, AdminError> {
    require_positive("amount", request.amount)?;
    let entry = request
        .numbers
        .first()
        .ok_or_else(|| AdminError::validation("numbers must not be empty"))?;
    matcher::parse_selection(request.bet_type, entry)
        .map_err(|err| AdminError::validation(err.to_string()))?;

    let round = get_round(store, request.lottery_round_id).await?;
    if !round.accepts_bets(now) {
        return Err(AdminError::Conflict(format!(
            "round {} is not accepting bets",
            round.id
        )));
    }
    let wallet = store
        .wallet(&request.user_id)
        .await?
        .ok_or(AdminError::NotFound {
            kind: "user",
            id: request.user_id,
        })?;
    if wallet.balance_after(-request.amount).is_none() {
        return Err(AdminError::InsufficientBalance {
            available: wallet.balance,
            required: request.amount,
        });
    }

    let numbers = request
        .numbers
        .iter()
        .map(|number| number.trim().to_string())
        .collect();
    let bet = Bet::new(
        request.user_id,
        round.id,
        request.bet_type,
        numbers,
        request.amount,
        now,
    );
    store
        .commit(vec![
            Mutation::PutBet(bet.clone()),
            Mutation::AdjustWallet {
                user_id: bet.user_id,
                delta: -bet.amount,
            },
        ])
        .await?;
    tracing::debug!(bet_id = %bet.id, round_id = %round.id, bet_type = %bet.bet_type, "bet placed");
    Ok(bet)
}

/// Filters for [`list_bets`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BetFilter {
    pub status: Option<BetStatus>,
    pub user_id: Option<UserId>,
    pub round_id: Option<RoundId>,
}

/// Bets matching `filter`, newest first.
pub async fn list_bets<S: Store>(
    store: &S,
    filter: BetFilter,
    query: PageQuery,
) -> Result<Page<Bet>, AdminError> {
    let mut bets = store
        .bets()
        .await?
        .into_iter()
        .filter(|bet| filter.status.map_or(true, |status| bet.status == status))
        .filter(|bet| filter.user_id.map_or(true, |user_id| bet.user_id == user_id))
        .filter(|bet| {
            filter
                .round_id
                .map_or(true, |round_id| bet.lottery_round_id == round_id)
        })
        .collect::<Vec<_>>();
    bets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(Page::paginate(bets, query))
}

/// Bets of one round; unknown rounds are NotFound.
pub async fn list_round_bets<S: Store>(
    store: &S,
    round_id: RoundId,
    query: PageQuery,
) -> Result<Page<Bet>, AdminError> {
    get_round(store, round_id).await?;
    let filter = BetFilter {
        round_id: Some(round_id),
        ..BetFilter::default()
    };
    list_bets(store, filter, query).await
}

// Deposit/withdraw transactions.

pub async fn request_transaction<S: Store>(
    store: &mut S,
    request: CreateTransactionRequest,
    now: DateTime<Utc>,
) -> Result<Transaction, AdminError> {
    require_positive("amount", request.amount)?;
    store.user(&request.user_id).await?.ok_or(AdminError::NotFound {
        kind: "user",
        id: request.user_id,
    })?;
    let transaction = Transaction::new(
        request.user_id,
        request.kind,
        request.amount,
        request.description.unwrap_or_default().trim().to_string(),
        now,
    );
    store
        .commit(vec![Mutation::PutTransaction(transaction.clone())])
        .await?;
    Ok(transaction)
}

async fn pending_transaction<S: Store>(
    store: &S,
    id: TransactionId,
) -> Result<Transaction, AdminError> {
    let transaction = store
        .transaction(&id)
        .await?
        .ok_or(AdminError::NotFound {
            kind: "transaction",
            id,
        })?;
    if transaction.status != TransactionStatus::Pending {
        return Err(AdminError::Conflict(format!(
            "transaction {id} is already {}",
            transaction.status.as_str()
        )));
    }
    Ok(transaction)
}

pub async fn approve_transaction<S: Store>(
    store: &mut S,
    id: TransactionId,
) -> Result<Transaction, AdminError> {
    let mut transaction = pending_transaction(store, id).await?;
    let wallet = store
        .wallet(&transaction.user_id)
        .await?
        .ok_or(AdminError::NotFound {
            kind: "wallet",
            id: transaction.user_id,
        })?;
    let delta = transaction.wallet_delta();
    if wallet.balance_after(delta).is_none() {
        return Err(AdminError::InsufficientBalance {
            available: wallet.balance,
            required: transaction.amount,
        });
    }
    transaction.status = TransactionStatus::Approved;
    store
        .commit(vec![
            Mutation::PutTransaction(transaction.clone()),
            Mutation::AdjustWallet {
                user_id: transaction.user_id,
                delta,
            },
        ])
        .await?;
    tracing::info!(id = %transaction.id, %delta, "transaction approved");
    Ok(transaction)
}

pub async fn reject_transaction<S: Store>(
    store: &mut S,
    id: TransactionId,
) -> Result<Transaction, AdminError> {
    let mut transaction = pending_transaction(store, id).await?;
    transaction.status = TransactionStatus::Rejected;
    store
        .commit(vec![Mutation::PutTransaction(transaction.clone())])
        .await?;
    Ok(transaction)
}

/// Transactions with `status` (pending when omitted), newest first.
pub async fn list_transactions<S: Store>(
    store: &S,
    status: Option<TransactionStatus>,
    query: PageQuery,
) -> Result<Page<Transaction>, AdminError> {
    let status = status.unwrap_or(TransactionStatus::Pending);
    let mut transactions = store
        .transactions()
        .await?
        .into_iter()
        .filter(|transaction| transaction.status == status)
        .collect::<Vec<_>>();
    transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(Page::paginate(transactions, query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Memory;
    use chrono::Duration;
    use lotto_types::lottery::{BetType, TransactionKind};
    use rust_decimal_macros::dec;

    async fn lottery_type(store: &mut Memory) -> LotteryType {
        create_lottery_type(
            store,
            CreateLotteryTypeRequest {
                name: "หวยรัฐบาล".to_string(),
                code: "TH_GOV".to_string(),
                status: None,
                payout_rates: None,
            },
            Utc::now(),
        )
        .await
        .unwrap()
    }

    async fn open_round(store: &mut Memory, lottery_type_id: LotteryTypeId) -> LotteryRound {
        let now = Utc::now();
        create_round(
            store,
            CreateRoundRequest {
                lottery_type_id,
                round_number: "2026-11-01".to_string(),
                open_time: now - Duration::hours(1),
                close_time: now + Duration::hours(1),
            },
        )
        .await
        .unwrap()
    }

    async fn user(store: &mut Memory, balance: Decimal) -> UserDetail {
        create_user(
            store,
            CreateUserRequest {
                username: "somchai".to_string(),
                email: Some("somchai@example.com".to_string()),
                initial_balance: Some(balance),
            },
            Utc::now(),
        )
        .await
        .unwrap()
    }

    fn bet_request(user_id: UserId, round_id: RoundId, amount: Decimal) -> PlaceBetRequest {
        PlaceBetRequest {
            user_id,
            lottery_round_id: round_id,
            bet_type: BetType::TwoDigit,
            numbers: vec!["25".to_string()],
            amount,
        }
    }

    #[tokio::test]
    async fn test_lottery_type_code_unique_and_rates_at_least_one() {
        let mut store = Memory::new();
        lottery_type(&mut store).await;
        let duplicate = create_lottery_type(
            &mut store,
            CreateLotteryTypeRequest {
                name: "again".to_string(),
                code: "th_gov".to_string(),
                status: None,
                payout_rates: None,
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(duplicate, Err(AdminError::Conflict(_))));

        let bad_rate = create_lottery_type(
            &mut store,
            CreateLotteryTypeRequest {
                name: "Lao".to_string(),
                code: "LAO".to_string(),
                status: None,
                payout_rates: Some(PayoutRates::new().with(BetType::TwoDigit, dec!(0))),
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(bad_rate, Err(AdminError::Validation(_))));

        let fractional = create_lottery_type(
            &mut store,
            CreateLotteryTypeRequest {
                name: "Lao".to_string(),
                code: "LAO".to_string(),
                status: None,
                payout_rates: Some(PayoutRates::new().with(BetType::Running, dec!(0.5))),
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(fractional, Err(AdminError::Validation(_))));

        let even = create_lottery_type(
            &mut store,
            CreateLotteryTypeRequest {
                name: "Lao".to_string(),
                code: "LAO".to_string(),
                status: None,
                payout_rates: Some(PayoutRates::new().with(BetType::Running, dec!(1))),
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(even.payout_rates.unwrap().get(BetType::Running), Some(dec!(1)));
    }

    #[tokio::test]
    async fn test_update_lottery_type() {
        let mut store = Memory::new();
        let created = lottery_type(&mut store).await;
        let updated = update_lottery_type(
            &mut store,
            created.id,
            UpdateLotteryTypeRequest {
                name: None,
                status: Some(LotteryTypeStatus::Inactive),
                payout_rates: Some(PayoutRates::new().with(BetType::TwoDigit, dec!(95))),
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert!(!updated.is_active());
        assert_eq!(
            updated.payout_rates.unwrap().get(BetType::TwoDigit),
            Some(dec!(95))
        );
        assert_eq!(
            list_lottery_types(&store, Some(LotteryTypeStatus::Active))
                .await
                .unwrap()
                .len(),
            0
        );

        let below_one = update_lottery_type(
            &mut store,
            created.id,
            UpdateLotteryTypeRequest {
                name: None,
                status: None,
                payout_rates: Some(PayoutRates::new().with(BetType::TwoDigit, dec!(0.9))),
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(below_one, Err(AdminError::Validation(_))));
        assert_eq!(
            get_lottery_type(&store, created.id)
                .await
                .unwrap()
                .payout_rates
                .unwrap()
                .get(BetType::TwoDigit),
            Some(dec!(95))
        );
    }

    #[tokio::test]
    async fn test_create_round_rules() {
        let mut store = Memory::new();
        let lt = lottery_type(&mut store).await;
        let round = open_round(&mut store, lt.id).await;
        assert_eq!(round.status, RoundStatus::Open);

        let duplicate = create_round(
            &mut store,
            CreateRoundRequest {
                lottery_type_id: lt.id,
                round_number: round.round_number.clone(),
                open_time: round.open_time,
                close_time: round.close_time,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(AdminError::Conflict(_))));

        let now = Utc::now();
        let inverted = create_round(
            &mut store,
            CreateRoundRequest {
                lottery_type_id: lt.id,
                round_number: "other".to_string(),
                open_time: now,
                close_time: now - Duration::minutes(1),
            },
        )
        .await;
        assert!(matches!(inverted, Err(AdminError::Validation(_))));

        let missing = create_round(
            &mut store,
            CreateRoundRequest {
                lottery_type_id: Uuid::new_v4(),
                round_number: "x".to_string(),
                open_time: now,
                close_time: now + Duration::hours(1),
            },
        )
        .await;
        assert!(matches!(missing, Err(AdminError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_close_round_once() {
        let mut store = Memory::new();
        let lt = lottery_type(&mut store).await;
        let round = open_round(&mut store, lt.id).await;
        let closed = close_round(&mut store, round.id).await.unwrap();
        assert_eq!(closed.status, RoundStatus::Closed);
        assert!(matches!(
            close_round(&mut store, round.id).await,
            Err(AdminError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_rounds_newest_first_with_filter() {
        let mut store = Memory::new();
        let lt = lottery_type(&mut store).await;
        let now = Utc::now();
        for day in 0..3 {
            create_round(
                &mut store,
                CreateRoundRequest {
                    lottery_type_id: lt.id,
                    round_number: format!("R{day}"),
                    open_time: now + Duration::days(day),
                    close_time: now + Duration::days(day) + Duration::hours(1),
                },
            )
            .await
            .unwrap();
        }
        let page = list_rounds(&store, &[], PageQuery::new(1, 2)).await.unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.meta.total_pages, 2);
        assert_eq!(page.data[0].round_number, "R2");

        let completed = list_rounds(&store, &[RoundStatus::Completed], PageQuery::default())
            .await
            .unwrap();
        assert!(completed.data.is_empty());
    }

    #[tokio::test]
    async fn test_place_bet_debits_wallet() {
        let mut store = Memory::new();
        let lt = lottery_type(&mut store).await;
        let round = open_round(&mut store, lt.id).await;
        let detail = user(&mut store, dec!(500)).await;

        let bet = place_bet(
            &mut store,
            bet_request(detail.user.id, round.id, dec!(100)),
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(bet.status, BetStatus::Pending);
        assert_eq!(
            get_user(&store, detail.user.id).await.unwrap().wallet.balance,
            dec!(400)
        );

        let broke = place_bet(
            &mut store,
            bet_request(detail.user.id, round.id, dec!(401)),
            Utc::now(),
        )
        .await;
        assert!(matches!(broke, Err(AdminError::InsufficientBalance { .. })));

        let page = list_round_bets(&store, round.id, PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.data, vec![bet]);
    }

    #[tokio::test]
    async fn test_place_bet_rejects_bad_input() {
        let mut store = Memory::new();
        let lt = lottery_type(&mut store).await;
        let round = open_round(&mut store, lt.id).await;
        let detail = user(&mut store, dec!(500)).await;

        let mut malformed = bet_request(detail.user.id, round.id, dec!(10));
        malformed.numbers = vec!["2x".to_string()];
        assert!(matches!(
            place_bet(&mut store, malformed, Utc::now()).await,
            Err(AdminError::Validation(_))
        ));
        assert!(matches!(
            place_bet(&mut store, bet_request(detail.user.id, round.id, dec!(0)), Utc::now()).await,
            Err(AdminError::Validation(_))
        ));

        close_round(&mut store, round.id).await.unwrap();
        assert!(matches!(
            place_bet(&mut store, bet_request(detail.user.id, round.id, dec!(10)), Utc::now()).await,
            Err(AdminError::Conflict(_))
        ));
        assert!(matches!(
            list_round_bets(&store, Uuid::new_v4(), PageQuery::default()).await,
            Err(AdminError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_transaction_review() {
        let mut store = Memory::new();
        let detail = user(&mut store, dec!(100)).await;
        let user_id = detail.user.id;

        let deposit = request_transaction(
            &mut store,
            CreateTransactionRequest {
                user_id,
                kind: TransactionKind::Deposit,
                amount: dec!(50),
                description: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();
        let withdraw = request_transaction(
            &mut store,
            CreateTransactionRequest {
                user_id,
                kind: TransactionKind::Withdraw,
                amount: dec!(500),
                description: Some("cash out".to_string()),
            },
            Utc::now(),
        )
        .await
        .unwrap();
        assert_eq!(
            list_transactions(&store, None, PageQuery::default())
                .await
                .unwrap()
                .meta
                .total,
            2
        );

        approve_transaction(&mut store, deposit.id).await.unwrap();
        assert_eq!(get_user(&store, user_id).await.unwrap().wallet.balance, dec!(150));
        assert!(matches!(
            approve_transaction(&mut store, deposit.id).await,
            Err(AdminError::Conflict(_))
        ));

        assert!(matches!(
            approve_transaction(&mut store, withdraw.id).await,
            Err(AdminError::InsufficientBalance { .. })
        ));
        let rejected = reject_transaction(&mut store, withdraw.id).await.unwrap();
        assert_eq!(rejected.status, TransactionStatus::Rejected);
        assert_eq!(get_user(&store, user_id).await.unwrap().wallet.balance, dec!(150));
    }

    #[tokio::test]
    async fn test_users_unique_and_listed() {
        let mut store = Memory::new();
        user(&mut store, dec!(0)).await;
        let duplicate = create_user(
            &mut store,
            CreateUserRequest {
                username: "SOMCHAI".to_string(),
                email: None,
                initial_balance: None,
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(duplicate, Err(AdminError::Conflict(_))));
        let negative = create_user(
            &mut store,
            CreateUserRequest {
                username: "malee".to_string(),
                email: None,
                initial_balance: Some(dec!(-1)),
            },
            Utc::now(),
        )
        .await;
        assert!(matches!(negative, Err(AdminError::Validation(_))));
        let page = list_users(&store, PageQuery::default()).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].wallet.balance, dec!(0));
    }
}
