use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{BetType, LotteryTypeId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryTypeStatus {
    #[default]
    Active,
    Inactive,
}

impl std::str::FromStr for LotteryTypeStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(LotteryTypeStatus::Active),
            "inactive" => Ok(LotteryTypeStatus::Inactive),
            other => Err(format!("unknown lottery type status: {other}")),
        }
    }
}

/// Sparse per-lottery-type multiplier overrides keyed by bet type.
///
/// Entries are stored as given; resolution (and the fallback for absent or non-positive
/// entries) happens in one place in the execution layer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayoutRates(BTreeMap<BetType, Decimal>);

impl PayoutRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, bet_type: BetType, rate: Decimal) -> Self {
        self.0.insert(bet_type, rate);
        self
    }

    pub fn get(&self, bet_type: BetType) -> Option<Decimal> {
        self.0.get(&bet_type).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BetType, Decimal)> + '_ {
        self.0.iter().map(|(bet_type, rate)| (*bet_type, *rate))
    }
}

impl FromIterator<(BetType, Decimal)> for PayoutRates {
    fn from_iter<I: IntoIterator<Item = (BetType, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryType {
    pub id: LotteryTypeId,
    pub name: String,
    pub code: String,
    pub status: LotteryTypeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_rates: Option<PayoutRates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LotteryType {
    pub fn new(name: String, code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            code,
            status: LotteryTypeStatus::Active,
            payout_rates: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == LotteryTypeStatus::Active
    }
}
