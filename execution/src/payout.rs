//! Payout rate resolution.

use std::collections::BTreeMap;

use lotto_types::lottery::{BetType, LotteryType};
use rust_decimal::Decimal;

use crate::registry;

/// Effective multiplier for `bet_type` under `lottery_type`.
///
/// An override is honoured only when present and strictly positive; anything else falls
/// back to the registry default.
pub fn resolve_rate(lottery_type: &LotteryType, bet_type: BetType) -> Decimal {
    lottery_type
        .payout_rates
        .as_ref()
        .and_then(|rates| rates.get(bet_type))
        .filter(|rate| *rate > Decimal::ZERO)
        .unwrap_or_else(|| registry::default_multiplier(bet_type))
}

/// Payout for a winning stake, or `None` on overflow.
pub fn payout(amount: Decimal, multiplier: Decimal) -> Option<Decimal> {
    amount.checked_mul(multiplier)
}

/// Rates for every bet type resolved once per settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateTable {
    rates: BTreeMap<BetType, Decimal>,
}

impl RateTable {
    pub fn for_lottery_type(lottery_type: &LotteryType) -> Self {
        let rates = BetType::ALL
            .into_iter()
            .map(|bet_type| (bet_type, resolve_rate(lottery_type, bet_type)))
            .collect();
        Self { rates }
    }

    pub fn get(&self, bet_type: BetType) -> Decimal {
        self.rates
            .get(&bet_type)
            .copied()
            .unwrap_or_else(|| registry::default_multiplier(bet_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lotto_types::lottery::PayoutRates;
    use rust_decimal_macros::dec;

    fn lottery_type(rates: Option<PayoutRates>) -> LotteryType {
        let mut lottery_type = LotteryType::new("Thai Gov".to_string(), "TH".to_string(), Utc::now());
        lottery_type.payout_rates = rates;
        lottery_type
    }

    #[test]
    fn test_override_wins_over_default() {
        let lt = lottery_type(Some(PayoutRates::new().with(BetType::TwoDigit, dec!(95))));
        assert_eq!(resolve_rate(&lt, BetType::TwoDigit), dec!(95));
        assert_eq!(resolve_rate(&lt, BetType::ThreeDigit), dec!(900));
    }

    #[test]
    fn test_missing_rates_use_defaults() {
        let lt = lottery_type(None);
        for info in registry::all() {
            assert_eq!(resolve_rate(&lt, info.bet_type), info.default_rate());
        }
    }

    #[test]
    fn test_non_positive_override_falls_back() {
        let lt = lottery_type(Some(
            PayoutRates::new()
                .with(BetType::TwoDigit, dec!(0))
                .with(BetType::Running, dec!(-4)),
        ));
        assert_eq!(resolve_rate(&lt, BetType::TwoDigit), dec!(90));
        assert_eq!(resolve_rate(&lt, BetType::Running), dec!(3));
    }

    #[test]
    fn test_rate_table_matches_resolver() {
        let lt = lottery_type(Some(PayoutRates::new().with(BetType::Set, dec!(4.5))));
        let table = RateTable::for_lottery_type(&lt);
        for bet_type in BetType::ALL {
            assert_eq!(table.get(bet_type), resolve_rate(&lt, bet_type));
        }
        assert_eq!(table.get(BetType::Set), dec!(4.5));
    }

    #[test]
    fn test_payout_is_exact() {
        assert_eq!(payout(dec!(100), dec!(90)), Some(dec!(9000)));
        assert_eq!(payout(dec!(10.5), dec!(2)), Some(dec!(21.0)));
        assert_eq!(payout(Decimal::MAX, dec!(2)), None);
    }
}
