use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use uuid::Uuid;

use super::{LotteryTypeId, RoundId, FIRST_PRIZE_MAX_DIGITS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Open,
    Closed,
    /// Display-only state between close and result entry; settles like `Closed`.
    Drawing,
    Completed,
}

impl RoundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundStatus::Open => "open",
            RoundStatus::Closed => "closed",
            RoundStatus::Drawing => "drawing",
            RoundStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for RoundStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(RoundStatus::Open),
            "closed" => Ok(RoundStatus::Closed),
            "drawing" => Ok(RoundStatus::Drawing),
            "completed" => Ok(RoundStatus::Completed),
            other => Err(format!("unknown round status: {other}")),
        }
    }
}

/// Which official number a bet type reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultField {
    FirstPrize,
    LastTwoDigits,
    LastThreeDigits,
}

impl ResultField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultField::FirstPrize => "firstPrize",
            ResultField::LastTwoDigits => "lastTwoDigits",
            ResultField::LastThreeDigits => "lastThreeDigits",
        }
    }
}

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ResultError {
    #[error("{field} must contain only digits (got {value:?})")]
    NotNumeric { field: &'static str, value: String },
    #[error("{field} must be {expected} digits (got {got})")]
    WrongLength {
        field: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("result must contain at least one of firstPrize, lastTwoDigits, lastThreeDigits")]
    Empty,
}

/// Official numbers drawn for a round. Every field is optional; a missing field means
/// bets depending on it cannot be decided yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_two_digits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_three_digits: Option<String>,
}

impl DrawResult {
    pub fn get(&self, field: ResultField) -> Option<&str> {
        match field {
            ResultField::FirstPrize => self.first_prize.as_deref(),
            ResultField::LastTwoDigits => self.last_two_digits.as_deref(),
            ResultField::LastThreeDigits => self.last_three_digits.as_deref(),
        }
    }

    pub fn has(&self, field: ResultField) -> bool {
        self.get(field).is_some()
    }

    /// Trim every field, drop empty ones, then check digit formats.
    pub fn normalize(self) -> Result<Self, ResultError> {
        let normalized = Self {
            first_prize: clean(self.first_prize),
            last_two_digits: clean(self.last_two_digits),
            last_three_digits: clean(self.last_three_digits),
        };
        normalized.validate()?;
        Ok(normalized)
    }

    pub fn validate(&self) -> Result<(), ResultError> {
        if self.first_prize.is_none()
            && self.last_two_digits.is_none()
            && self.last_three_digits.is_none()
        {
            return Err(ResultError::Empty);
        }
        if let Some(value) = &self.first_prize {
            check_digits(ResultField::FirstPrize, value)?;
            if value.len() > FIRST_PRIZE_MAX_DIGITS {
                return Err(ResultError::WrongLength {
                    field: ResultField::FirstPrize.as_str(),
                    expected: "1-6",
                    got: value.len(),
                });
            }
        }
        if let Some(value) = &self.last_two_digits {
            check_digits(ResultField::LastTwoDigits, value)?;
            check_len(ResultField::LastTwoDigits, value, 2, "2")?;
        }
        if let Some(value) = &self.last_three_digits {
            check_digits(ResultField::LastThreeDigits, value)?;
            check_len(ResultField::LastThreeDigits, value, 3, "3")?;
        }
        Ok(())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn check_digits(field: ResultField, value: &str) -> Result<(), ResultError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResultError::NotNumeric {
            field: field.as_str(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_len(
    field: ResultField,
    value: &str,
    len: usize,
    expected: &'static str,
) -> Result<(), ResultError> {
    if value.len() != len {
        return Err(ResultError::WrongLength {
            field: field.as_str(),
            expected,
            got: value.len(),
        });
    }
    Ok(())
}

/// One draw of a lottery type.
///
/// Invariant: `result.is_some()` iff `status == Completed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryRound {
    pub id: RoundId,
    pub lottery_type_id: LotteryTypeId,
    pub round_number: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub status: RoundStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<DrawResult>,
}

impl LotteryRound {
    pub fn new(
        lottery_type_id: LotteryTypeId,
        round_number: String,
        open_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            lottery_type_id,
            round_number,
            open_time,
            close_time,
            status: RoundStatus::Open,
            result: None,
        }
    }

    /// Bets are accepted only while open and inside the betting window.
    pub fn accepts_bets(&self, now: DateTime<Utc>) -> bool {
        self.status == RoundStatus::Open && now >= self.open_time && now < self.close_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(first: Option<&str>, two: Option<&str>, three: Option<&str>) -> DrawResult {
        DrawResult {
            first_prize: first.map(str::to_string),
            last_two_digits: two.map(str::to_string),
            last_three_digits: three.map(str::to_string),
        }
    }

    #[test]
    fn test_normalize_drops_blank_fields() {
        let normalized = result(Some("  "), Some(" 25 "), None).normalize().unwrap();
        assert_eq!(normalized, result(None, Some("25"), None));
    }

    #[test]
    fn test_empty_result_rejected() {
        assert_eq!(result(Some(""), None, Some(" ")).normalize(), Err(ResultError::Empty));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let err = result(None, Some("2a"), None).normalize().unwrap_err();
        assert!(matches!(err, ResultError::NotNumeric { field: "lastTwoDigits", .. }));
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        let err = result(None, Some("123"), None).normalize().unwrap_err();
        assert!(matches!(err, ResultError::WrongLength { field: "lastTwoDigits", got: 3, .. }));

        let err = result(None, None, Some("12")).normalize().unwrap_err();
        assert!(matches!(err, ResultError::WrongLength { field: "lastThreeDigits", got: 2, .. }));

        let err = result(Some("1234567"), None, None).normalize().unwrap_err();
        assert!(matches!(err, ResultError::WrongLength { field: "firstPrize", got: 7, .. }));
    }

    #[test]
    fn test_full_thai_result_accepted() {
        let normalized = result(Some("123456"), Some("25"), Some("456")).normalize().unwrap();
        assert_eq!(normalized.get(ResultField::FirstPrize), Some("123456"));
        assert!(normalized.has(ResultField::LastThreeDigits));
    }

    #[test]
    fn test_result_json_field_names() {
        let parsed: DrawResult =
            serde_json::from_str(r#"{"lastTwoDigits":"25","firstPrize":"123456"}"#).unwrap();
        assert_eq!(parsed, result(Some("123456"), Some("25"), None));
        let json = serde_json::to_value(&parsed).unwrap();
        assert!(json.get("lastThreeDigits").is_none());
    }

    #[test]
    fn test_accepts_bets_respects_window() {
        let open = Utc::now();
        let close = open + chrono::Duration::hours(1);
        let mut round = LotteryRound::new(Uuid::new_v4(), "R1".to_string(), open, close);
        assert!(round.accepts_bets(open));
        assert!(!round.accepts_bets(close));
        round.status = RoundStatus::Closed;
        assert!(!round.accepts_bets(open));
    }
}
