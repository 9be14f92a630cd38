//! Sequence integrity of advance rounds.
//!
//! A later advance is computed on the assumption that the earlier ones were
//! paid. A batch therefore cannot be voided while any of its receipts holds an
//! active allocation of a higher payment sequence in another batch; those
//! later batches have to be voided first, newest first.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{PaymentBatch, PaymentType};

/// An active later-sequence allocation on a receipt of the batch to void.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependentAllocation {
    pub receipt_id: i64,
    pub batch_id: i64,
    pub batch_number: String,
    pub payment_type: PaymentType,
}

/// Receipts of the batch that a later batch also paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoidConflict {
    pub later_batch_id: i64,
    pub later_batch_number: String,
    pub payment_type: PaymentType,
    pub receipt_ids: Vec<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RemediationStep {
    pub batch_id: i64,
    pub batch_number: String,
}

/// Answer to "can this batch be voided?".
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VoidValidation {
    pub batch_id: i64,
    pub batch_number: String,
    pub allowed: bool,
    pub reasons: Vec<String>,
    /// One entry per later batch, highest batch id first.
    pub conflicts: Vec<VoidConflict>,
    /// Batches to void, in order, before this one can be voided. Empty when
    /// voiding is allowed.
    pub remediation: Vec<RemediationStep>,
}

impl VoidValidation {
    pub(crate) fn from_dependents(batch: &PaymentBatch, dependents: Vec<DependentAllocation>) -> Self {
        let mut grouped: BTreeMap<i64, VoidConflict> = BTreeMap::new();
        for dependent in dependents {
            grouped
                .entry(dependent.batch_id)
                .or_insert_with(|| VoidConflict {
                    later_batch_id: dependent.batch_id,
                    later_batch_number: dependent.batch_number.clone(),
                    payment_type: dependent.payment_type,
                    receipt_ids: Vec::new(),
                })
                .receipt_ids
                .push(dependent.receipt_id);
        }

        let conflicts: Vec<VoidConflict> = grouped
            .into_values()
            .rev()
            .map(|mut conflict| {
                conflict.receipt_ids.sort_unstable();
                conflict.receipt_ids.dedup();
                conflict
            })
            .collect();

        if conflicts.is_empty() {
            return Self {
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
                allowed: true,
                reasons: Vec::new(),
                conflicts,
                remediation: Vec::new(),
            };
        }

        let reasons = conflicts
            .iter()
            .map(|conflict| {
                format!(
                    "batch {} ({}) holds later payments for {} receipt(s) of batch {}",
                    conflict.later_batch_number,
                    conflict.payment_type,
                    conflict.receipt_ids.len(),
                    batch.batch_number
                )
            })
            .collect();
        let remediation = conflicts
            .iter()
            .map(|conflict| RemediationStep {
                batch_id: conflict.later_batch_id,
                batch_number: conflict.later_batch_number.clone(),
            })
            .chain(std::iter::once(RemediationStep {
                batch_id: batch.id,
                batch_number: batch.batch_number.clone(),
            }))
            .collect();

        Self {
            batch_id: batch.id,
            batch_number: batch.batch_number.clone(),
            allowed: false,
            reasons,
            conflicts,
            remediation,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::{BatchStatus, MoneyCents};

    fn batch(id: i64, number: &str) -> PaymentBatch {
        PaymentBatch {
            id,
            batch_number: number.to_string(),
            payment_type: PaymentType::Advance1,
            crop_year: 2025,
            batch_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            cutoff_date: None,
            status: BatchStatus::Posted,
            total_amount: MoneyCents::ZERO,
            grower_count: 0,
            receipt_count: 0,
            run_id: None,
            notes: None,
            created_by: "clerk".to_string(),
            created_at: Utc::now(),
            approved_by: None,
            approved_at: None,
            posted_by: None,
            posted_at: None,
            finalized_by: None,
            finalized_at: None,
            voided_by: None,
            voided_at: None,
            deleted_at: None,
        }
    }

    fn dependent(receipt_id: i64, batch_id: i64, number: &str, ty: PaymentType) -> DependentAllocation {
        DependentAllocation {
            receipt_id,
            batch_id,
            batch_number: number.to_string(),
            payment_type: ty,
        }
    }

    #[test]
    fn no_dependents_allows_void() {
        let validation = VoidValidation::from_dependents(&batch(1, "ADV1-2025-001"), vec![]);
        assert!(validation.allowed);
        assert!(validation.reasons.is_empty());
        assert!(validation.remediation.is_empty());
    }

    #[test]
    fn dependents_are_grouped_by_later_batch_newest_first() {
        let validation = VoidValidation::from_dependents(
            &batch(1, "ADV1-2025-001"),
            vec![
                dependent(12, 2, "ADV2-2025-001", PaymentType::Advance2),
                dependent(11, 2, "ADV2-2025-001", PaymentType::Advance2),
                dependent(11, 3, "ADV3-2025-001", PaymentType::Advance3),
                dependent(11, 2, "ADV2-2025-001", PaymentType::Advance2),
            ],
        );

        assert!(!validation.allowed);
        assert_eq!(validation.conflicts.len(), 2);
        assert_eq!(validation.conflicts[0].later_batch_id, 3);
        assert_eq!(validation.conflicts[0].receipt_ids, vec![11]);
        assert_eq!(validation.conflicts[1].later_batch_id, 2);
        assert_eq!(validation.conflicts[1].receipt_ids, vec![11, 12]);
        assert_eq!(validation.reasons.len(), 2);

        let order: Vec<i64> = validation.remediation.iter().map(|s| s.batch_id).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }
}
