use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BetId, RoundId, UserId};

/// Closed set of wager categories.
///
/// Serialized as the snake_case identifiers the console sends (`two_digit`, `high_low`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetType {
    TwoDigit,
    ThreeDigit,
    Running,
    Set,
    HighLow,
    Todd,
    OddEven,
    Rood,
}

impl BetType {
    /// Every bet type, in registry order.
    pub const ALL: [BetType; 8] = [
        BetType::TwoDigit,
        BetType::ThreeDigit,
        BetType::Running,
        BetType::Set,
        BetType::HighLow,
        BetType::Todd,
        BetType::OddEven,
        BetType::Rood,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::TwoDigit => "two_digit",
            BetType::ThreeDigit => "three_digit",
            BetType::Running => "running",
            BetType::Set => "set",
            BetType::HighLow => "high_low",
            BetType::Todd => "todd",
            BetType::OddEven => "odd_even",
            BetType::Rood => "rood",
        }
    }
}

impl std::fmt::Display for BetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BetType {
    type Err = UnknownBetType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        BetType::ALL
            .into_iter()
            .find(|bet_type| bet_type.as_str() == normalized)
            .ok_or_else(|| UnknownBetType(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bet type: {0}")]
pub struct UnknownBetType(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    Won,
    Lost,
    Cancelled,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Won => "won",
            BetStatus::Lost => "lost",
            BetStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BetStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(BetStatus::Pending),
            "won" => Ok(BetStatus::Won),
            "lost" => Ok(BetStatus::Lost),
            "cancelled" => Ok(BetStatus::Cancelled),
            other => Err(format!("unknown bet status: {other}")),
        }
    }
}

/// A wager placed by a user against one round.
///
/// Invariant: `payout.is_some()` iff `status == Won`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub user_id: UserId,
    pub lottery_round_id: RoundId,
    pub bet_type: BetType,
    pub numbers: Vec<String>,
    pub amount: Decimal,
    pub status: BetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Bet {
    /// Create a pending bet.
    pub fn new(
        user_id: UserId,
        lottery_round_id: RoundId,
        bet_type: BetType,
        numbers: Vec<String>,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            lottery_round_id,
            bet_type,
            numbers,
            amount,
            status: BetStatus::Pending,
            payout: None,
            created_at,
        }
    }

    /// The authoritative entry (`numbers[0]`), trimmed and lower-cased.
    pub fn primary_number(&self) -> Option<String> {
        self.numbers
            .first()
            .map(|number| number.trim().to_ascii_lowercase())
            .filter(|number| !number.is_empty())
    }

    /// Payout currently credited for this bet (zero unless won).
    pub fn credited(&self) -> Decimal {
        match (self.status, self.payout) {
            (BetStatus::Won, Some(payout)) => payout,
            _ => Decimal::ZERO,
        }
    }
}
