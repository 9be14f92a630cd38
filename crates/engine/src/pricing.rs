//! Advance pricing.
//!
//! Advance prices are cumulative: the price of round `n` is what the grower
//! should have received in total after `n` rounds, and each round pays only
//! the increment over what was already paid. The cumulative price never goes
//! down, even if a later round's table entry is lower than an earlier one.
//!
//! ```text
//! R(n)     = max(price(1), ..., price(n))
//! round 1  = R(1)
//! round 2  = R(2) - paid(1)
//! round 3  = R(3) - max(R(2), paid(1))
//! ```
//!
//! Every per-round price is floored at zero.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{AdvanceRound, MoneyCents, ResultEngine};

/// Lookup of the admissible advance price for a round.
///
/// Implementations are already narrowed to one product, process, date,
/// currency, price level and grade.
pub trait AdvancePriceSource {
    fn advance_price(&self, round: AdvanceRound) -> Option<Decimal>;
}

/// Advance prices for rounds 1..=3, as resolved from a price table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundPrices([Option<Decimal>; 3]);

impl RoundPrices {
    #[must_use]
    pub fn new(first: Option<Decimal>, second: Option<Decimal>, third: Option<Decimal>) -> Self {
        Self([first, second, third])
    }

    pub fn set(&mut self, round: AdvanceRound, price: Decimal) {
        self.0[usize::from(round.number() - 1)] = Some(price);
    }
}

impl AdvancePriceSource for RoundPrices {
    fn advance_price(&self, round: AdvanceRound) -> Option<Decimal> {
        self.0[usize::from(round.number() - 1)]
    }
}

/// Highest admissible price seen in rounds `1..=upto`.
///
/// Missing rounds contribute nothing; the result is never below zero.
pub fn running_advance_price<S>(source: &S, upto: AdvanceRound) -> Decimal
where
    S: AdvancePriceSource + ?Sized,
{
    upto.up_to()
        .filter_map(|round| source.advance_price(round))
        .fold(Decimal::ZERO, Decimal::max)
}

/// Per-unit price to pay in `round`.
///
/// `paid_first` is the unit price already paid by the first advance; it is
/// ignored for round 1.
pub fn round_advance_price<S>(source: &S, round: AdvanceRound, paid_first: Decimal) -> Decimal
where
    S: AdvancePriceSource + ?Sized,
{
    let price = match round {
        AdvanceRound::First => running_advance_price(source, AdvanceRound::First),
        AdvanceRound::Second => {
            running_advance_price(source, AdvanceRound::Second) - paid_first
        }
        AdvanceRound::Third => {
            let baseline = running_advance_price(source, AdvanceRound::Second).max(paid_first);
            running_advance_price(source, AdvanceRound::Third) - baseline
        }
    };
    price.max(Decimal::ZERO)
}

/// First-round extras from the price table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundOneTerms {
    pub time_premium: Decimal,
    pub premium_cutoff: Option<NaiveTime>,
    pub marketing_deduction_rate: Decimal,
}

impl RoundOneTerms {
    /// The premium applies to receipts weighed at or before the cut-off.
    #[must_use]
    pub fn premium_for(&self, receipt_time: Option<NaiveTime>) -> Decimal {
        match (self.premium_cutoff, receipt_time) {
            (Some(cutoff), Some(time)) if time <= cutoff => self.time_premium,
            (None, _) => self.time_premium,
            _ => Decimal::ZERO,
        }
    }
}

/// Monetary result for one receipt in one round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReceiptAmounts {
    pub price_per_unit: Decimal,
    pub advance: MoneyCents,
    pub premium: MoneyCents,
    pub marketing_deduction: MoneyCents,
}

impl ReceiptAmounts {
    /// Computes the amounts for `net_weight` units.
    ///
    /// Premium and marketing deduction are only charged in round 1.
    pub fn compute(
        net_weight: Decimal,
        round: AdvanceRound,
        price_per_unit: Decimal,
        terms: &RoundOneTerms,
        receipt_time: Option<NaiveTime>,
    ) -> ResultEngine<Self> {
        let advance = MoneyCents::from_decimal(net_weight * price_per_unit)?;
        let (premium, marketing_deduction) = if round == AdvanceRound::First {
            (
                MoneyCents::from_decimal(net_weight * terms.premium_for(receipt_time))?,
                MoneyCents::from_decimal(net_weight * terms.marketing_deduction_rate)?,
            )
        } else {
            (MoneyCents::ZERO, MoneyCents::ZERO)
        };
        Ok(Self {
            price_per_unit,
            advance,
            premium,
            marketing_deduction,
        })
    }

    /// Amount credited to the grower for the receipt.
    #[must_use]
    pub fn net(&self) -> MoneyCents {
        self.advance + self.premium - self.marketing_deduction
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn prices(a: i64, b: i64, c: i64) -> RoundPrices {
        RoundPrices::new(Some(dec(a)), Some(dec(b)), Some(dec(c)))
    }

    #[test]
    fn running_price_keeps_the_maximum() {
        let table = prices(100, 80, 150);
        assert_eq!(running_advance_price(&table, AdvanceRound::First), dec(100));
        assert_eq!(running_advance_price(&table, AdvanceRound::Second), dec(100));
        assert_eq!(running_advance_price(&table, AdvanceRound::Third), dec(150));
    }

    #[test]
    fn missing_rounds_do_not_reset_the_running_price() {
        let table = RoundPrices::new(Some(dec(90)), None, Some(dec(60)));
        assert_eq!(running_advance_price(&table, AdvanceRound::Third), dec(90));
        assert_eq!(running_advance_price(&RoundPrices::default(), AdvanceRound::Third), dec(0));
    }

    #[test]
    fn later_rounds_pay_only_the_increment() {
        let table = prices(100, 130, 175);
        assert_eq!(round_advance_price(&table, AdvanceRound::First, dec(0)), dec(100));
        assert_eq!(round_advance_price(&table, AdvanceRound::Second, dec(100)), dec(30));
        assert_eq!(round_advance_price(&table, AdvanceRound::Third, dec(100)), dec(45));
    }

    #[test]
    fn lower_later_entry_is_floored_at_zero() {
        let table = prices(100, 70, 90);
        assert_eq!(round_advance_price(&table, AdvanceRound::Second, dec(100)), dec(0));
        assert_eq!(round_advance_price(&table, AdvanceRound::Third, dec(100)), dec(0));
    }

    #[test]
    fn third_round_uses_first_payment_when_it_was_higher() {
        // round 1 was paid at an older, higher price
        let table = prices(100, 110, 160);
        assert_eq!(round_advance_price(&table, AdvanceRound::Third, dec(125)), dec(35));
    }

    #[test]
    fn premium_and_deduction_only_in_first_round() {
        let terms = RoundOneTerms {
            time_premium: dec(5),
            premium_cutoff: NaiveTime::from_hms_opt(10, 0, 0),
            marketing_deduction_rate: dec(2),
        };
        let early = NaiveTime::from_hms_opt(9, 30, 0);
        let late = NaiveTime::from_hms_opt(11, 0, 0);
        let weight = Decimal::new(1000, 0);

        let first =
            ReceiptAmounts::compute(weight, AdvanceRound::First, dec(100), &terms, early).unwrap();
        assert_eq!(first.advance.cents(), 100_000);
        assert_eq!(first.premium.cents(), 5_000);
        assert_eq!(first.marketing_deduction.cents(), 2_000);
        assert_eq!(first.net().cents(), 103_000);

        let late_first =
            ReceiptAmounts::compute(weight, AdvanceRound::First, dec(100), &terms, late).unwrap();
        assert!(late_first.premium.is_zero());

        let second =
            ReceiptAmounts::compute(weight, AdvanceRound::Second, dec(30), &terms, early).unwrap();
        assert!(second.premium.is_zero());
        assert!(second.marketing_deduction.is_zero());
    }

    #[test]
    fn amounts_round_half_away_from_zero() {
        let amounts = ReceiptAmounts::compute(
            Decimal::new(1, 0),
            AdvanceRound::Second,
            Decimal::new(2005, 3),
            &RoundOneTerms::default(),
            None,
        )
        .unwrap();
        assert_eq!(amounts.advance.cents(), 201);
    }

    fn price_strategy() -> impl Strategy<Value = Option<Decimal>> {
        prop::option::of((-50_000i64..500_000).prop_map(|v| Decimal::new(v, 4)))
    }

    proptest! {
        #[test]
        fn round_price_is_never_negative(
            a in price_strategy(),
            b in price_strategy(),
            c in price_strategy(),
            paid in (0i64..500_000).prop_map(|v| Decimal::new(v, 4)),
        ) {
            let table = RoundPrices::new(a, b, c);
            for round in AdvanceRound::ALL {
                prop_assert!(round_advance_price(&table, round, paid) >= Decimal::ZERO);
            }
        }

        #[test]
        fn running_price_is_monotonic(
            a in price_strategy(),
            b in price_strategy(),
            c in price_strategy(),
        ) {
            let table = RoundPrices::new(a, b, c);
            let r1 = running_advance_price(&table, AdvanceRound::First);
            let r2 = running_advance_price(&table, AdvanceRound::Second);
            let r3 = running_advance_price(&table, AdvanceRound::Third);
            prop_assert!(r1 <= r2);
            prop_assert!(r2 <= r3);
        }

        #[test]
        fn three_rounds_sum_to_the_cumulative_price(
            a in price_strategy(),
            b in price_strategy(),
            c in price_strategy(),
            weight in (1i64..5_000_000).prop_map(|v| Decimal::new(v, 2)),
        ) {
            let table = RoundPrices::new(a, b, c);
            let terms = RoundOneTerms::default();
            let p1 = round_advance_price(&table, AdvanceRound::First, Decimal::ZERO);
            let p2 = round_advance_price(&table, AdvanceRound::Second, p1);
            let p3 = round_advance_price(&table, AdvanceRound::Third, p1);

            let paid: MoneyCents = [
                (AdvanceRound::First, p1),
                (AdvanceRound::Second, p2),
                (AdvanceRound::Third, p3),
            ]
            .into_iter()
            .map(|(round, price)| {
                ReceiptAmounts::compute(weight, round, price, &terms, None)
                    .unwrap()
                    .advance
            })
            .sum();

            let expected = MoneyCents::from_decimal(
                weight * running_advance_price(&table, AdvanceRound::Third),
            )
            .unwrap();
            // one cent of rounding per round
            prop_assert!((paid - expected).cents().abs() <= 2);
        }
    }
}
