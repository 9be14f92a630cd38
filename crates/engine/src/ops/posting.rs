use std::collections::{BTreeMap, BTreeSet, HashMap};

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::{debug, info};

use crate::{
    AccountTransactionType, Actor, AllocationStatus, AnyBatch, BatchStatus, ChequeStatus,
    MoneyCents, PaymentBatch, ReceiptPaymentAllocation, ResultEngine, Transition, allocations,
    cheques,
    grower_accounts::NewEntry,
    payment_lines::{self, PaymentLineKind},
    price_locks, receipts,
};

use super::{
    Engine,
    advances::apply_deductions_in,
    batches::{allocated_receipts, load_batch, save_batch},
    insert_chunked,
    numbers::next_cheque_number,
    with_tx,
};

/// Ledger entries and gross pay of one grower, built before the waterfall.
#[derive(Default)]
struct GrowerPosting {
    entries: Vec<NewEntry>,
    gross: MoneyCents,
}

impl GrowerPosting {
    fn credit(&mut self, entry: NewEntry) {
        self.gross += entry.credit;
        self.entries.push(entry);
    }

    fn debit(&mut self, entry: NewEntry) {
        self.gross -= entry.debit;
        self.entries.push(entry);
    }
}

/// Ledger side of the batch: allocation credits plus premium and
/// marketing-deduction lines, grouped by grower.
async fn grower_postings(
    db_tx: &DatabaseTransaction,
    batch: &PaymentBatch,
    allocations: &[ReceiptPaymentAllocation],
) -> ResultEngine<BTreeMap<i64, GrowerPosting>> {
    let receipts: HashMap<i64, receipts::Model> = receipts::Entity::find()
        .filter(receipts::Column::Id.in_subquery(allocated_receipts(batch.id)))
        .all(db_tx)
        .await?
        .into_iter()
        .map(|receipt| (receipt.id, receipt))
        .collect();

    let mut postings: BTreeMap<i64, GrowerPosting> = BTreeMap::new();
    for allocation in allocations {
        let Some(receipt) = receipts.get(&allocation.receipt_id) else {
            continue;
        };
        postings.entry(receipt.grower_id).or_default().credit(NewEntry {
            grower_id: receipt.grower_id,
            payment_batch_id: batch.id,
            receipt_id: Some(receipt.id),
            allocation_id: Some(allocation.id),
            transaction_type: AccountTransactionType::AdvancePayment,
            description: format!(
                "{} receipt {} ({} @ {})",
                batch.payment_type, receipt.receipt_number, allocation.quantity, allocation.price_per_unit
            ),
            debit: MoneyCents::ZERO,
            credit: allocation.amount,
            entry_date: batch.batch_date,
        });
    }

    let lines = payment_lines::Entity::find()
        .filter(payment_lines::Column::PaymentBatchId.eq(batch.id))
        .filter(payment_lines::Column::VoidedAt.is_null())
        .order_by_asc(payment_lines::Column::Id)
        .all(db_tx)
        .await?;
    for line in lines {
        let kind = PaymentLineKind::try_from(line.kind.as_str())?;
        let amount = MoneyCents::new(line.amount);
        let receipt_number = receipts
            .get(&line.receipt_id)
            .map_or("?", |receipt| receipt.receipt_number.as_str());
        let posting = postings.entry(line.grower_id).or_default();
        let entry = |transaction_type, description: String, debit, credit| NewEntry {
            grower_id: line.grower_id,
            payment_batch_id: batch.id,
            receipt_id: Some(line.receipt_id),
            allocation_id: Some(line.allocation_id),
            transaction_type,
            description,
            debit,
            credit,
            entry_date: batch.batch_date,
        };
        match kind {
            PaymentLineKind::Advance => {}
            PaymentLineKind::TimePremium => posting.credit(entry(
                AccountTransactionType::TimePremium,
                format!("Time premium receipt {receipt_number}"),
                MoneyCents::ZERO,
                amount,
            )),
            PaymentLineKind::MarketingDeduction => posting.debit(entry(
                AccountTransactionType::MarketingDeduction,
                format!("Marketing deduction receipt {receipt_number}"),
                amount,
                MoneyCents::ZERO,
            )),
        }
    }
    Ok(postings)
}

impl Engine {
    /// Approved → Posted.
    ///
    /// In one transaction: writes the grower ledger, repays outstanding
    /// advances from each grower's gross, generates one cheque per grower
    /// with a positive net and locks every price table the batch used.
    pub async fn post_batch(&self, batch_id: i64, actor: &Actor) -> ResultEngine<Transition> {
        with_tx!(self, |db_tx| {
            let approved = match AnyBatch::from(load_batch(&db_tx, batch_id).await?) {
                AnyBatch::Approved(approved) => approved,
                other => {
                    return Ok(Transition::refused(
                        other.record(),
                        BatchStatus::Approved,
                        "post",
                    ));
                }
            };
            let posted = approved.post(actor);
            let batch = posted.record();

            let allocations = allocations::Entity::find()
                .filter(allocations::Column::PaymentBatchId.eq(batch_id))
                .filter(allocations::Column::Status.eq(AllocationStatus::Active.as_str()))
                .order_by_asc(allocations::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(ReceiptPaymentAllocation::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            let postings = grower_postings(&db_tx, batch, &allocations).await?;
            let mut entries = Vec::new();
            let mut cheque_count = 0usize;
            let mut total_deducted = MoneyCents::ZERO;
            for (grower_id, posting) in postings {
                entries.extend(posting.entries);
                if !posting.gross.is_positive() {
                    debug!(grower_id, gross = %posting.gross, "no pay to post");
                    continue;
                }

                let deducted =
                    apply_deductions_in(&db_tx, grower_id, batch_id, posting.gross, actor).await?;
                for deduction in &deducted.deductions {
                    entries.push(NewEntry {
                        grower_id,
                        payment_batch_id: batch_id,
                        receipt_id: None,
                        allocation_id: None,
                        transaction_type: AccountTransactionType::AdvanceRepayment,
                        description: format!("Advance {} repayment", deduction.advance_cheque_id),
                        debit: deduction.amount,
                        credit: MoneyCents::ZERO,
                        entry_date: batch.batch_date,
                    });
                }
                total_deducted += deducted.total_deducted;

                let net = posting.gross - deducted.total_deducted;
                if !net.is_positive() {
                    continue;
                }
                cheques::ActiveModel {
                    id: ActiveValue::NotSet,
                    cheque_number: ActiveValue::Set(next_cheque_number(&db_tx).await?),
                    payment_batch_id: ActiveValue::Set(batch_id),
                    grower_id: ActiveValue::Set(grower_id),
                    gross_amount: ActiveValue::Set(posting.gross.cents()),
                    deducted_amount: ActiveValue::Set(deducted.total_deducted.cents()),
                    net_amount: ActiveValue::Set(net.cents()),
                    status: ActiveValue::Set(ChequeStatus::Generated.as_str().to_string()),
                    created_by: ActiveValue::Set(actor.name.clone()),
                    created_at: ActiveValue::Set(actor.at),
                    issued_at: ActiveValue::Set(None),
                    voided_by: ActiveValue::Set(None),
                    voided_at: ActiveValue::Set(None),
                }
                .insert(&db_tx)
                .await?;
                cheque_count += 1;
            }

            let entry_count = entries.len();
            insert_chunked(
                &db_tx,
                entries
                    .into_iter()
                    .map(|entry| entry.into_active(actor))
                    .collect(),
            )
            .await?;

            let price_tables: BTreeSet<i64> = allocations
                .iter()
                .filter_map(|allocation| allocation.price_table_id)
                .collect();
            let lock_count = price_tables.len();
            insert_chunked(
                &db_tx,
                price_tables
                    .into_iter()
                    .map(|price_table_id| price_locks::ActiveModel {
                        id: ActiveValue::NotSet,
                        price_table_id: ActiveValue::Set(price_table_id),
                        payment_batch_id: ActiveValue::Set(batch_id),
                        payment_type: ActiveValue::Set(batch.payment_type.code().to_string()),
                        locked_by: ActiveValue::Set(actor.name.clone()),
                        locked_at: ActiveValue::Set(actor.at),
                        deleted_by: ActiveValue::Set(None),
                        deleted_at: ActiveValue::Set(None),
                    })
                    .collect(),
            )
            .await?;

            save_batch(&db_tx, batch).await?;
            info!(
                batch_id,
                batch_number = %batch.batch_number,
                ledger_entries = entry_count,
                cheques = cheque_count,
                price_locks = lock_count,
                advances_recovered = %total_deducted,
                posted_by = %actor.name,
                "payment batch posted"
            );
            Ok(Transition::Applied(posted.into_record()))
        })
    }
}
