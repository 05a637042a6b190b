//! Bet type registry.
//!
//! Static catalog of every supported bet type: its default payout multiplier, which
//! result fields it reads, and the shape of its winning predicate. The table below is the
//! fallback whenever a lottery type carries no usable override.
//!
//! | bet type    | default | reads                                 |
//! |-------------|---------|---------------------------------------|
//! | two_digit   | 90      | lastTwoDigits                         |
//! | three_digit | 900     | firstPrize or lastThreeDigits         |
//! | running     | 3       | lastTwoDigits and/or lastThreeDigits  |
//! | set         | 3       | lastTwoDigits / lastThreeDigits       |
//! | high_low    | 2       | lastTwoDigits                         |
//! | todd        | 3       | lastThreeDigits                       |
//! | odd_even    | 2       | lastTwoDigits                         |
//! | rood        | 3       | lastTwoDigits / lastThreeDigits       |

use lotto_types::api::BetTypeDescriptor;
use lotto_types::lottery::{BetType, ResultField};
use rust_decimal::Decimal;

use ResultField::{FirstPrize, LastThreeDigits, LastTwoDigits};

/// How a bet type decides a win.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Entry equals the drawn number.
    Exact,
    /// Entry digit equals the drawn number's last digit.
    TrailingDigit,
    /// Entry digits are a rearrangement of the drawn digits.
    Permutation,
    /// Drawn two-digit value compared against a threshold.
    Threshold,
    /// Drawn two-digit value parity.
    Parity,
    /// Every entry digit occurs in the drawn number.
    DigitSubset,
}

/// Registry entry for one bet type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BetTypeInfo {
    pub bet_type: BetType,
    /// Console label.
    pub label: &'static str,
    pub default_multiplier: u32,
    /// Result fields the bet type may read; the matcher narrows this per entry.
    pub fields: &'static [ResultField],
    pub predicate: Predicate,
}

impl BetTypeInfo {
    pub fn default_rate(&self) -> Decimal {
        Decimal::from(self.default_multiplier)
    }

    pub fn descriptor(&self) -> BetTypeDescriptor {
        BetTypeDescriptor {
            id: self.bet_type,
            label: self.label.to_string(),
            default_multiplier: self.default_rate(),
            result_fields: self.fields.to_vec(),
        }
    }
}

const REGISTRY: [BetTypeInfo; 8] = [
    BetTypeInfo {
        bet_type: BetType::TwoDigit,
        label: "2 ตัว",
        default_multiplier: 90,
        fields: &[LastTwoDigits],
        predicate: Predicate::Exact,
    },
    BetTypeInfo {
        bet_type: BetType::ThreeDigit,
        label: "3 ตัว",
        default_multiplier: 900,
        fields: &[FirstPrize, LastThreeDigits],
        predicate: Predicate::Exact,
    },
    BetTypeInfo {
        bet_type: BetType::Running,
        label: "วิ่ง",
        default_multiplier: 3,
        fields: &[LastTwoDigits, LastThreeDigits],
        predicate: Predicate::TrailingDigit,
    },
    BetTypeInfo {
        bet_type: BetType::Set,
        label: "ชุด",
        default_multiplier: 3,
        fields: &[LastTwoDigits, LastThreeDigits],
        predicate: Predicate::Permutation,
    },
    BetTypeInfo {
        bet_type: BetType::HighLow,
        label: "บนล่าง",
        default_multiplier: 2,
        fields: &[LastTwoDigits],
        predicate: Predicate::Threshold,
    },
    BetTypeInfo {
        bet_type: BetType::Todd,
        label: "โต๊ด",
        default_multiplier: 3,
        fields: &[LastThreeDigits],
        predicate: Predicate::Permutation,
    },
    BetTypeInfo {
        bet_type: BetType::OddEven,
        label: "คู่/คี่",
        default_multiplier: 2,
        fields: &[LastTwoDigits],
        predicate: Predicate::Parity,
    },
    BetTypeInfo {
        bet_type: BetType::Rood,
        label: "รูด",
        default_multiplier: 3,
        fields: &[LastTwoDigits, LastThreeDigits],
        predicate: Predicate::DigitSubset,
    },
];

/// Look up the registry entry for a bet type.
pub fn info(bet_type: BetType) -> &'static BetTypeInfo {
    match bet_type {
        BetType::TwoDigit => &REGISTRY[0],
        BetType::ThreeDigit => &REGISTRY[1],
        BetType::Running => &REGISTRY[2],
        BetType::Set => &REGISTRY[3],
        BetType::HighLow => &REGISTRY[4],
        BetType::Todd => &REGISTRY[5],
        BetType::OddEven => &REGISTRY[6],
        BetType::Rood => &REGISTRY[7],
    }
}

/// System default multiplier for a bet type.
pub fn default_multiplier(bet_type: BetType) -> Decimal {
    info(bet_type).default_rate()
}

/// Every registry entry, in declaration order.
pub fn all() -> &'static [BetTypeInfo] {
    &REGISTRY
}

/// Console-facing listing of the registry.
pub fn descriptors() -> Vec<BetTypeDescriptor> {
    REGISTRY.iter().map(BetTypeInfo::descriptor).collect()
}
