use chrono::NaiveDate;
use sea_orm::{QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, warn};

use crate::{
    Actor, AllocationStatus, AnyBatch, ChequeStatus, DeductionStatus, EngineError, PaymentBatch,
    ResultEngine, advance_deductions, allocations, cheques, grower_accounts, payment_lines,
    price_locks,
    receipts::{self, advance_columns},
    util::normalize_required_text,
};

use super::{
    Engine,
    advances::reverse_deduction_in,
    batches::{load_batch, save_batch},
    sequence::validate_can_void_in,
    with_tx,
};

impl Engine {
    /// Void a batch and everything it wrote.
    ///
    /// Refused with [`EngineError::IntegrityViolation`] while a later advance
    /// depends on one of its receipts; nothing is written in that case.
    /// Otherwise, in one transaction:
    /// - active allocations are voided and the receipts' tracking fields for
    ///   this round are cleared, so the round can be paid again
    /// - payment lines and cheques are voided
    /// - advance deductions taken at post time are reversed
    /// - ledger entries and price locks are soft-deleted
    /// - the batch is soft-deleted with an audit note
    pub async fn void_batch(
        &self,
        batch_id: i64,
        reason: &str,
        actor: &Actor,
    ) -> ResultEngine<PaymentBatch> {
        let reason = normalize_required_text(reason, "void reason")?;
        with_tx!(self, |db_tx| {
            let voided = match AnyBatch::from(load_batch(&db_tx, batch_id).await?) {
                AnyBatch::Draft(batch) => batch.void(actor, &reason),
                AnyBatch::Approved(batch) => batch.void(actor, &reason),
                AnyBatch::Posted(batch) => batch.void(actor, &reason),
                AnyBatch::Finalized(batch) => batch.void(actor, &reason),
                AnyBatch::Voided(batch) => {
                    return Err(EngineError::InvalidState(format!(
                        "batch {} is already voided",
                        batch.batch_number
                    )));
                }
            };

            let validation = validate_can_void_in(&db_tx, &voided).await?;
            if !validation.allowed {
                warn!(
                    batch_id,
                    conflicts = validation.conflicts.len(),
                    "void refused by sequence integrity check"
                );
                return Err(EngineError::IntegrityViolation(Box::new(validation)));
            }

            let allocations_voided = allocations::Entity::update_many()
                .col_expr(
                    allocations::Column::Status,
                    Expr::value(AllocationStatus::Voided.as_str()),
                )
                .col_expr(allocations::Column::VoidedBy, Expr::value(actor.name.clone()))
                .col_expr(allocations::Column::VoidedAt, Expr::value(actor.at))
                .filter(allocations::Column::PaymentBatchId.eq(batch_id))
                .filter(allocations::Column::Status.eq(AllocationStatus::Active.as_str()))
                .exec(&db_tx)
                .await?
                .rows_affected;

            if let Some(round) = voided.payment_type.advance_round() {
                let columns = advance_columns(round);
                receipts::Entity::update_many()
                    .col_expr(columns.batch_id, Expr::value(Option::<i64>::None))
                    .col_expr(columns.price, Expr::value(Option::<String>::None))
                    .col_expr(columns.paid_on, Expr::value(Option::<NaiveDate>::None))
                    .filter(columns.batch_id.eq(batch_id))
                    .exec(&db_tx)
                    .await?;
            }

            payment_lines::Entity::update_many()
                .col_expr(payment_lines::Column::VoidedAt, Expr::value(actor.at))
                .filter(payment_lines::Column::PaymentBatchId.eq(batch_id))
                .filter(payment_lines::Column::VoidedAt.is_null())
                .exec(&db_tx)
                .await?;

            let deductions = advance_deductions::Entity::find()
                .filter(advance_deductions::Column::PaymentBatchId.eq(batch_id))
                .filter(advance_deductions::Column::Status.eq(DeductionStatus::Active.as_str()))
                .all(&db_tx)
                .await?;
            for deduction in &deductions {
                reverse_deduction_in(&db_tx, deduction.id, actor).await?;
            }

            cheques::Entity::update_many()
                .col_expr(cheques::Column::Status, Expr::value(ChequeStatus::Voided.as_str()))
                .col_expr(cheques::Column::VoidedBy, Expr::value(actor.name.clone()))
                .col_expr(cheques::Column::VoidedAt, Expr::value(actor.at))
                .filter(cheques::Column::PaymentBatchId.eq(batch_id))
                .filter(cheques::Column::Status.ne(ChequeStatus::Voided.as_str()))
                .exec(&db_tx)
                .await?;

            grower_accounts::Entity::update_many()
                .col_expr(grower_accounts::Column::DeletedBy, Expr::value(actor.name.clone()))
                .col_expr(grower_accounts::Column::DeletedAt, Expr::value(actor.at))
                .filter(grower_accounts::Column::PaymentBatchId.eq(batch_id))
                .filter(grower_accounts::Column::DeletedAt.is_null())
                .exec(&db_tx)
                .await?;

            price_locks::Entity::update_many()
                .col_expr(price_locks::Column::DeletedBy, Expr::value(actor.name.clone()))
                .col_expr(price_locks::Column::DeletedAt, Expr::value(actor.at))
                .filter(price_locks::Column::PaymentBatchId.eq(batch_id))
                .filter(price_locks::Column::DeletedAt.is_null())
                .exec(&db_tx)
                .await?;

            save_batch(&db_tx, &voided).await?;
            info!(
                batch_id,
                batch_number = %voided.batch_number,
                allocations_voided,
                deductions_reversed = deductions.len(),
                voided_by = %actor.name,
                "payment batch voided"
            );
            Ok(voided)
        })
    }
}
