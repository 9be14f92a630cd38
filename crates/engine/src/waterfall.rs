//! Advance deduction waterfall.
//!
//! A payment to a grower first repays the grower's outstanding cash advances,
//! oldest advance first. What is left after every advance is cleared stays
//! with the grower as net pay.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{AdvanceDeduction, MoneyCents};

/// An advance with an undeducted balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutstandingAdvance {
    pub advance_id: i64,
    pub advance_date: NaiveDate,
    pub current_amount: MoneyCents,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedDeduction {
    pub advance_id: i64,
    pub amount: MoneyCents,
    /// Balance left on the advance after this deduction.
    pub remaining_balance: MoneyCents,
}

impl PlannedDeduction {
    #[must_use]
    pub fn clears_advance(&self) -> bool {
        self.remaining_balance.is_zero()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeductionPlan {
    pub deductions: Vec<PlannedDeduction>,
    pub total_deducted: MoneyCents,
    pub remaining_payment: MoneyCents,
}

/// Allocates `payment` against `outstanding`, oldest advance first.
///
/// Advances without a positive balance are skipped. Stops as soon as the
/// payment is used up.
#[must_use]
pub fn plan_deductions(outstanding: &[OutstandingAdvance], payment: MoneyCents) -> DeductionPlan {
    let mut ordered: Vec<&OutstandingAdvance> = outstanding
        .iter()
        .filter(|advance| advance.current_amount.is_positive())
        .collect();
    ordered.sort_by_key(|advance| (advance.advance_date, advance.advance_id));

    let mut plan = DeductionPlan {
        remaining_payment: payment.max(MoneyCents::ZERO),
        ..DeductionPlan::default()
    };
    for advance in ordered {
        if !plan.remaining_payment.is_positive() {
            break;
        }
        let amount = plan.remaining_payment.min(advance.current_amount);
        plan.deductions.push(PlannedDeduction {
            advance_id: advance.advance_id,
            amount,
            remaining_balance: advance.current_amount - amount,
        });
        plan.total_deducted += amount;
        plan.remaining_payment -= amount;
    }
    plan
}

/// Outcome of applying the waterfall for one grower and batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeductionResult {
    pub grower_id: i64,
    pub payment_batch_id: i64,
    pub total_deducted: MoneyCents,
    pub deduction_count: usize,
    /// Part of the payment not used to repay advances. Paid to the grower.
    pub remaining_payment: MoneyCents,
    pub deductions: Vec<AdvanceDeduction>,
}

impl DeductionResult {
    /// `true` when the payment exceeded the grower's outstanding advances.
    #[must_use]
    pub fn has_undeducted_remainder(&self) -> bool {
        self.remaining_payment.is_positive()
    }
}
