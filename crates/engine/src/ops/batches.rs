use std::collections::BTreeSet;

use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Query, SelectStatement},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, AllocationStatus, AnyBatch, BatchStatus, Cheque, ChequeStatus, CreateBatchCmd,
    EngineError, GrowerAccountEntry, MoneyCents, PaymentBatch, PaymentType, PriceScheduleLock,
    ReceiptPaymentAllocation, ResultEngine, Transition, allocations, cheques, grower_accounts,
    payment_batches,
    payment_lines::{self, PaymentLineKind},
    price_locks, receipts,
    util::normalize_optional_text,
};

use super::{Engine, numbers::next_batch_number, with_tx};

/// Ids of the receipts with an active allocation in `batch_id`, as a
/// subquery. Keeps large batches clear of the bound-parameter limit.
pub(super) fn allocated_receipts(batch_id: i64) -> SelectStatement {
    Query::select()
        .column(allocations::Column::ReceiptId)
        .from(allocations::Entity)
        .and_where(allocations::Column::PaymentBatchId.eq(batch_id))
        .and_where(allocations::Column::Status.eq(AllocationStatus::Active.as_str()))
        .to_owned()
}

/// Filters for listing batches.
#[derive(Clone, Debug, Default)]
pub struct BatchFilter {
    pub crop_year: Option<i32>,
    pub payment_type: Option<PaymentType>,
    pub status: Option<BatchStatus>,
    /// If true, includes voided batches (default: false).
    pub include_voided: bool,
}

pub(super) async fn load_batch<C: ConnectionTrait>(db: &C, batch_id: i64) -> ResultEngine<PaymentBatch> {
    let model = payment_batches::Entity::find_by_id(batch_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("payment batch not exists".to_string()))?;
    PaymentBatch::try_from(model)
}

/// Persist the lifecycle columns of `batch`.
pub(super) async fn save_batch<C: ConnectionTrait>(db: &C, batch: &PaymentBatch) -> ResultEngine<()> {
    payment_batches::ActiveModel::from(batch).update(db).await?;
    Ok(())
}

async fn create_batch_in(
    db_tx: &DatabaseTransaction,
    cmd: &CreateBatchCmd,
    run_id: Option<Uuid>,
) -> ResultEngine<PaymentBatch> {
    let batch_number = next_batch_number(db_tx, cmd.payment_type, cmd.crop_year).await?;
    let model = payment_batches::ActiveModel {
        id: ActiveValue::NotSet,
        batch_number: ActiveValue::Set(batch_number),
        payment_type: ActiveValue::Set(cmd.payment_type.code().to_string()),
        crop_year: ActiveValue::Set(cmd.crop_year),
        batch_date: ActiveValue::Set(cmd.batch_date),
        cutoff_date: ActiveValue::Set(cmd.cutoff_date),
        status: ActiveValue::Set(BatchStatus::Draft.as_str().to_string()),
        total_amount: ActiveValue::Set(0),
        grower_count: ActiveValue::Set(0),
        receipt_count: ActiveValue::Set(0),
        run_id: ActiveValue::Set(run_id.map(|id| id.to_string())),
        notes: ActiveValue::Set(normalize_optional_text(cmd.notes.as_deref())),
        created_by: ActiveValue::Set(cmd.actor.name.clone()),
        created_at: ActiveValue::Set(cmd.actor.at),
        approved_by: ActiveValue::Set(None),
        approved_at: ActiveValue::Set(None),
        posted_by: ActiveValue::Set(None),
        posted_at: ActiveValue::Set(None),
        finalized_by: ActiveValue::Set(None),
        finalized_at: ActiveValue::Set(None),
        voided_by: ActiveValue::Set(None),
        voided_at: ActiveValue::Set(None),
        deleted_at: ActiveValue::Set(None),
    }
    .insert(db_tx)
    .await?;

    let batch = PaymentBatch::try_from(model)?;
    info!(
        batch_id = batch.id,
        batch_number = %batch.batch_number,
        created_by = %cmd.actor.name,
        "payment batch created"
    );
    Ok(batch)
}

impl Engine {
    /// Create an empty Draft batch with the next free batch number.
    pub async fn create_batch(&self, cmd: CreateBatchCmd) -> ResultEngine<PaymentBatch> {
        if cmd.actor.name.trim().is_empty() {
            return Err(EngineError::Validation("actor must not be empty".to_string()));
        }
        with_tx!(self, |db_tx| create_batch_in(&db_tx, &cmd, None).await)
    }

    /// Draft batch for a payment run, committed before any grower is paid.
    pub(super) async fn create_run_batch(
        &self,
        cmd: &CreateBatchCmd,
        run_id: Uuid,
    ) -> ResultEngine<PaymentBatch> {
        with_tx!(self, |db_tx| create_batch_in(&db_tx, cmd, Some(run_id)).await)
    }

    /// Return a batch, voided ones included.
    pub async fn batch(&self, batch_id: i64) -> ResultEngine<PaymentBatch> {
        load_batch(&self.database, batch_id).await
    }

    pub async fn batch_by_number(&self, batch_number: &str) -> ResultEngine<PaymentBatch> {
        let model = payment_batches::Entity::find()
            .filter(payment_batches::Column::BatchNumber.eq(batch_number.trim()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(batch_number.to_string()))?;
        PaymentBatch::try_from(model)
    }

    /// List batches, newest first.
    pub async fn batches(&self, filter: &BatchFilter) -> ResultEngine<Vec<PaymentBatch>> {
        let mut query = payment_batches::Entity::find();
        if let Some(crop_year) = filter.crop_year {
            query = query.filter(payment_batches::Column::CropYear.eq(crop_year));
        }
        if let Some(payment_type) = filter.payment_type {
            query = query.filter(payment_batches::Column::PaymentType.eq(payment_type.code()));
        }
        if let Some(status) = filter.status {
            query = query.filter(payment_batches::Column::Status.eq(status.as_str()));
        }
        if !filter.include_voided {
            query = query.filter(payment_batches::Column::DeletedAt.is_null());
        }
        query
            .order_by_desc(payment_batches::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(PaymentBatch::try_from)
            .collect()
    }

    /// Every allocation a batch ever made, voided ones included.
    pub async fn batch_allocations(&self, batch_id: i64) -> ResultEngine<Vec<ReceiptPaymentAllocation>> {
        allocations::Entity::find()
            .filter(allocations::Column::PaymentBatchId.eq(batch_id))
            .order_by_asc(allocations::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ReceiptPaymentAllocation::try_from)
            .collect()
    }

    pub async fn batch_cheques(&self, batch_id: i64) -> ResultEngine<Vec<Cheque>> {
        cheques::Entity::find()
            .filter(cheques::Column::PaymentBatchId.eq(batch_id))
            .order_by_asc(cheques::Column::ChequeNumber)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Cheque::try_from)
            .collect()
    }

    /// Ledger entries written when the batch was posted.
    pub async fn batch_ledger(&self, batch_id: i64) -> ResultEngine<Vec<GrowerAccountEntry>> {
        grower_accounts::Entity::find()
            .filter(grower_accounts::Column::PaymentBatchId.eq(batch_id))
            .order_by_asc(grower_accounts::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(GrowerAccountEntry::try_from)
            .collect()
    }

    pub async fn batch_price_locks(&self, batch_id: i64) -> ResultEngine<Vec<PriceScheduleLock>> {
        price_locks::Entity::find()
            .filter(price_locks::Column::PaymentBatchId.eq(batch_id))
            .order_by_asc(price_locks::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(PriceScheduleLock::try_from)
            .collect()
    }

    /// Draft → Approved.
    pub async fn approve_batch(&self, batch_id: i64, actor: &Actor) -> ResultEngine<Transition> {
        with_tx!(self, |db_tx| {
            match AnyBatch::from(load_batch(&db_tx, batch_id).await?) {
                AnyBatch::Draft(draft) => {
                    let approved = draft.approve(actor);
                    save_batch(&db_tx, approved.record()).await?;
                    info!(batch_id, approved_by = %actor.name, "payment batch approved");
                    Ok(Transition::Applied(approved.into_record()))
                }
                other => Ok(Transition::refused(
                    other.record(),
                    BatchStatus::Draft,
                    "approve",
                )),
            }
        })
    }

    /// Posted → Finalized. The batch's generated cheques are issued.
    pub async fn process_payments(&self, batch_id: i64, actor: &Actor) -> ResultEngine<Transition> {
        with_tx!(self, |db_tx| {
            match AnyBatch::from(load_batch(&db_tx, batch_id).await?) {
                AnyBatch::Posted(posted) => {
                    let finalized = posted.finalize(actor);
                    let issued = cheques::Entity::update_many()
                        .col_expr(
                            cheques::Column::Status,
                            Expr::value(ChequeStatus::Issued.as_str()),
                        )
                        .col_expr(cheques::Column::IssuedAt, Expr::value(actor.at))
                        .filter(cheques::Column::PaymentBatchId.eq(batch_id))
                        .filter(cheques::Column::Status.eq(ChequeStatus::Generated.as_str()))
                        .exec(&db_tx)
                        .await?;
                    save_batch(&db_tx, finalized.record()).await?;
                    info!(
                        batch_id,
                        cheques_issued = issued.rows_affected,
                        finalized_by = %actor.name,
                        "payment batch finalized"
                    );
                    Ok(Transition::Applied(finalized.into_record()))
                }
                other => Ok(Transition::refused(
                    other.record(),
                    BatchStatus::Posted,
                    "process payments for",
                )),
            }
        })
    }

    /// Store the totals of a batch written by a payment run.
    pub(super) async fn update_batch_totals(&self, batch_id: i64) -> ResultEngine<PaymentBatch> {
        with_tx!(self, |db_tx| {
            let active = allocations::Entity::find()
                .filter(allocations::Column::PaymentBatchId.eq(batch_id))
                .filter(allocations::Column::Status.eq(AllocationStatus::Active.as_str()))
                .all(&db_tx)
                .await?;
            let growers = receipts::Entity::find()
                .filter(receipts::Column::Id.in_subquery(allocated_receipts(batch_id)))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|receipt| receipt.grower_id)
                .collect::<BTreeSet<_>>();
            let lines = payment_lines::Entity::find()
                .filter(payment_lines::Column::PaymentBatchId.eq(batch_id))
                .filter(payment_lines::Column::VoidedAt.is_null())
                .all(&db_tx)
                .await?;
            let total: MoneyCents = lines
                .iter()
                .map(|line| {
                    PaymentLineKind::try_from(line.kind.as_str())
                        .map(|kind| MoneyCents::new(line.amount * kind.sign()))
                })
                .sum::<ResultEngine<MoneyCents>>()?;

            payment_batches::ActiveModel {
                id: ActiveValue::Unchanged(batch_id),
                total_amount: ActiveValue::Set(total.cents()),
                grower_count: ActiveValue::Set(i32::try_from(growers.len()).unwrap_or(i32::MAX)),
                receipt_count: ActiveValue::Set(i32::try_from(active.len()).unwrap_or(i32::MAX)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            load_batch(&db_tx, batch_id).await
        })
    }
}
