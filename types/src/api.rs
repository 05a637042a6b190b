//! Request and response bodies for the admin HTTP API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lottery::{
    BetType, DrawResult, LotteryTypeId, LotteryTypeStatus, PayoutRates, ResultField, RoundId,
    TransactionKind, User, UserId, Wallet,
};

/// Default page size when the caller omits `limit`.
pub const DEFAULT_PAGE_LIMIT: usize = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// `(page, limit)` with page >= 1 and limit in 1..=MAX_PAGE_LIMIT.
    pub fn resolve(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        (page, limit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Page<T> {
    /// Slice an already-ordered collection into the requested page.
    pub fn paginate(items: Vec<T>, query: PageQuery) -> Self {
        let (page, limit) = query.resolve();
        let total = items.len();
        let total_pages = total.div_ceil(limit);
        let data = items
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();
        Self {
            data,
            meta: PaginationMeta {
                page,
                limit,
                total,
                total_pages,
            },
        }
    }
}

/// Outcome of one settlement, shown to the admin after result entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub won: u64,
    pub lost: u64,
    pub total_payout: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SubmitResultRequest {
    pub result: DrawResult,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResultResponse {
    pub calculation_result: SettlementSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotteryTypeRequest {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub status: Option<LotteryTypeStatus>,
    #[serde(default)]
    pub payout_rates: Option<PayoutRates>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLotteryTypeRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<LotteryTypeStatus>,
    #[serde(default)]
    pub payout_rates: Option<PayoutRates>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoundRequest {
    pub lottery_type_id: LotteryTypeId,
    pub round_number: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub user_id: UserId,
    pub lottery_round_id: RoundId,
    pub bet_type: BetType,
    pub numbers: Vec<String>,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub initial_balance: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub wallet: Wallet,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

/// Console dashboard figures.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    pub total_bets: u64,
    pub total_wins: u64,
    pub total_bet_amount: Decimal,
    pub total_payout: Decimal,
    pub profit: Decimal,
    pub total_users: u64,
    pub active_rounds: u64,
    pub total_deposits: Decimal,
    pub total_withdraws: Decimal,
}

/// Per-round bet tallies.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    pub round_id: RoundId,
    pub total_bets: u64,
    pub pending: u64,
    pub won: u64,
    pub lost: u64,
    pub cancelled: u64,
    pub total_stake: Decimal,
    pub total_payout: Decimal,
}

/// Registry entry exposed to the console.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetTypeDescriptor {
    pub id: BetType,
    pub label: String,
    pub default_multiplier: Decimal,
    pub result_fields: Vec<ResultField>,
}
