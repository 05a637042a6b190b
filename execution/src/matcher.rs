//! Result matching.
//!
//! Decides, for one bet and one draw result, whether the bet is skipped (the result lacks
//! every field the bet reads), lost, or won at a given multiplier. Matching is pure: it
//! never touches storage and never fails.

use lotto_types::lottery::{
    Bet, BetType, DrawResult, ResultField, HIGH_LOW_THRESHOLD, ROOD_SENTINEL, TODD_SENTINEL,
};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::registry::{self, Predicate};

use ResultField::{LastThreeDigits, LastTwoDigits};

/// A parsed `numbers[0]` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    Digits(String),
    High,
    Low,
    Odd,
    Even,
    AnyTodd,
    AnyRood,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("bet has no numbers")]
    Missing,
    #[error("{bet_type} does not accept {entry:?}")]
    Invalid { bet_type: BetType, entry: String },
}

/// Outcome of matching one bet against one result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// The result carries none of the fields this bet reads; the bet stays pending.
    Skipped,
    Lost,
    Won { multiplier: Decimal },
}

impl Evaluation {
    pub fn is_winner(&self) -> bool {
        matches!(self, Evaluation::Won { .. })
    }

    /// Multiplier applied to the stake (zero unless won).
    pub fn multiplier(&self) -> Decimal {
        match self {
            Evaluation::Won { multiplier } => *multiplier,
            _ => Decimal::ZERO,
        }
    }
}

fn all_digits(entry: &str) -> bool {
    entry.bytes().all(|b| b.is_ascii_digit())
}

fn digits_of_len(entry: &str, lengths: std::ops::RangeInclusive<usize>) -> bool {
    lengths.contains(&entry.len()) && all_digits(entry)
}

/// Parse a bet entry for `bet_type`. Tokens are compared case-insensitively.
pub fn parse_selection(bet_type: BetType, raw: &str) -> Result<Selection, SelectionError> {
    let entry = raw.trim().to_ascii_lowercase();
    if entry.is_empty() {
        return Err(SelectionError::Missing);
    }
    let selection = match bet_type {
        BetType::TwoDigit if digits_of_len(&entry, 2..=2) => Some(Selection::Digits(entry.clone())),
        BetType::ThreeDigit if digits_of_len(&entry, 3..=3) => {
            Some(Selection::Digits(entry.clone()))
        }
        BetType::Running if digits_of_len(&entry, 1..=1) => Some(Selection::Digits(entry.clone())),
        BetType::Set if digits_of_len(&entry, 2..=3) => Some(Selection::Digits(entry.clone())),
        BetType::HighLow => match entry.as_str() {
            "high" => Some(Selection::High),
            "low" => Some(Selection::Low),
            _ => None,
        },
        BetType::OddEven => match entry.as_str() {
            "odd" => Some(Selection::Odd),
            "even" => Some(Selection::Even),
            _ => None,
        },
        BetType::Todd if entry == TODD_SENTINEL => Some(Selection::AnyTodd),
        BetType::Todd if digits_of_len(&entry, 3..=3) => Some(Selection::Digits(entry.clone())),
        BetType::Rood if entry == ROOD_SENTINEL => Some(Selection::AnyRood),
        BetType::Rood if digits_of_len(&entry, 1..=2) => Some(Selection::Digits(entry.clone())),
        _ => None,
    };
    selection.ok_or(SelectionError::Invalid { bet_type, entry })
}

/// Parse the authoritative entry of a bet.
pub fn bet_selection(bet: &Bet) -> Result<Selection, SelectionError> {
    let entry = bet.primary_number().ok_or(SelectionError::Missing)?;
    parse_selection(bet.bet_type, &entry)
}

/// Fields a bet reads; it is settled when at least one is present.
pub fn required_fields(bet_type: BetType, selection: Option<&Selection>) -> &'static [ResultField] {
    match (bet_type, selection) {
        (BetType::Set, Some(Selection::Digits(d))) if d.len() == 2 => &[LastTwoDigits],
        (BetType::Set, Some(Selection::Digits(_))) => &[LastThreeDigits],
        (BetType::Rood, Some(Selection::Digits(_))) => &[LastTwoDigits],
        _ => registry::info(bet_type).fields,
    }
}

fn sorted_digits(value: &str) -> Vec<u8> {
    let mut digits = value.bytes().collect::<Vec<_>>();
    digits.sort_unstable();
    digits
}

fn two_digit_value(result: &DrawResult) -> Option<u8> {
    result.get(LastTwoDigits).and_then(|value| value.parse().ok())
}

fn wins(bet_type: BetType, selection: &Selection, result: &DrawResult) -> bool {
    let predicate = registry::info(bet_type).predicate;
    match (predicate, selection) {
        (Predicate::Exact, Selection::Digits(entry)) => required_fields(bet_type, Some(selection))
            .iter()
            .any(|field| result.get(*field) == Some(entry.as_str())),
        (Predicate::TrailingDigit, Selection::Digits(entry)) => [LastTwoDigits, LastThreeDigits]
            .into_iter()
            .filter_map(|field| result.get(field))
            .any(|value| value.ends_with(entry.as_str())),
        (Predicate::Permutation, Selection::AnyTodd) => result.has(LastThreeDigits),
        (Predicate::Permutation, Selection::Digits(entry)) => {
            let field = required_fields(bet_type, Some(selection))[0];
            result
                .get(field)
                .is_some_and(|value| sorted_digits(value) == sorted_digits(entry))
        }
        (Predicate::Threshold, Selection::High) => {
            two_digit_value(result).is_some_and(|value| value >= HIGH_LOW_THRESHOLD)
        }
        (Predicate::Threshold, Selection::Low) => {
            two_digit_value(result).is_some_and(|value| value < HIGH_LOW_THRESHOLD)
        }
        (Predicate::Parity, Selection::Odd) => {
            two_digit_value(result).is_some_and(|value| value % 2 == 1)
        }
        (Predicate::Parity, Selection::Even) => {
            two_digit_value(result).is_some_and(|value| value % 2 == 0)
        }
        (Predicate::DigitSubset, Selection::AnyRood) => {
            result.has(LastTwoDigits) || result.has(LastThreeDigits)
        }
        (Predicate::DigitSubset, Selection::Digits(entry)) => result
            .get(LastTwoDigits)
            .is_some_and(|value| entry.chars().all(|digit| value.contains(digit))),
        _ => false,
    }
}

/// Evaluate `bet` against `result`, paying `rate` on a win.
pub fn evaluate(bet: &Bet, result: &DrawResult, rate: Decimal) -> Evaluation {
    let selection = bet_selection(bet);
    let required = required_fields(bet.bet_type, selection.as_ref().ok());
    if !required.iter().any(|field| result.has(*field)) {
        return Evaluation::Skipped;
    }
    match selection {
        Ok(selection) if wins(bet.bet_type, &selection, result) => {
            Evaluation::Won { multiplier: rate }
        }
        Ok(_) => Evaluation::Lost,
        Err(err) => {
            tracing::warn!(bet_id = %bet.id, %err, "malformed bet settled as lost");
            Evaluation::Lost
        }
    }
}
