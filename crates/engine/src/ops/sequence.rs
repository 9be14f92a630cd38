use std::collections::{BTreeSet, HashMap};

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    AllocationStatus, DependentAllocation, PaymentBatch, PaymentType, ResultEngine,
    VoidValidation, allocations, payment_batches,
};

use super::{
    Engine,
    batches::{allocated_receipts, load_batch},
};

/// Check whether `batch` can be voided without orphaning later advances.
pub(super) async fn validate_can_void_in<C: ConnectionTrait>(
    db: &C,
    batch: &PaymentBatch,
) -> ResultEngine<VoidValidation> {
    let sequence = batch.payment_type.sequence();
    let mut later = Vec::new();
    for model in allocations::Entity::find()
        .filter(allocations::Column::ReceiptId.in_subquery(allocated_receipts(batch.id)))
        .filter(allocations::Column::Status.eq(AllocationStatus::Active.as_str()))
        .filter(allocations::Column::PaymentBatchId.ne(batch.id))
        .all(db)
        .await?
    {
        let payment_type = PaymentType::try_from(model.payment_type.as_str())?;
        if payment_type.sequence() > sequence {
            later.push((model.receipt_id, model.payment_batch_id, payment_type));
        }
    }
    if later.is_empty() {
        return Ok(VoidValidation::from_dependents(batch, Vec::new()));
    }

    let batch_ids: BTreeSet<i64> = later.iter().map(|(_, batch_id, _)| *batch_id).collect();
    let numbers: HashMap<i64, String> = payment_batches::Entity::find()
        .filter(payment_batches::Column::Id.is_in(batch_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|model| (model.id, model.batch_number))
        .collect();

    let dependents = later
        .into_iter()
        .map(|(receipt_id, batch_id, payment_type)| DependentAllocation {
            receipt_id,
            batch_id,
            batch_number: numbers
                .get(&batch_id)
                .cloned()
                .unwrap_or_else(|| format!("#{batch_id}")),
            payment_type,
        })
        .collect();
    Ok(VoidValidation::from_dependents(batch, dependents))
}

impl Engine {
    /// Report whether a batch can be voided, and what to void first if not.
    ///
    /// Read-only; the same check guards [`Engine::void_batch`].
    pub async fn validate_can_void(&self, batch_id: i64) -> ResultEngine<VoidValidation> {
        let batch = load_batch(&self.database, batch_id).await?;
        validate_can_void_in(&self.database, &batch).await
    }
}
