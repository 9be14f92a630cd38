use sea_orm::{ActiveValue, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::debug;

use crate::{
    Actor, AdvanceRound, AllocationStatus, EngineError, MoneyCents, PaymentBatch, ReceiptLine,
    ResultEngine, allocations,
    payment_lines::{self, PaymentLineKind},
    receipts::{self, advance_columns},
};

use super::super::{Engine, insert_chunked, with_tx};

fn payment_line(
    batch_id: i64,
    allocation_id: i64,
    grower_id: i64,
    line: &ReceiptLine,
    kind: PaymentLineKind,
    amount: MoneyCents,
) -> Option<payment_lines::ActiveModel> {
    if amount.is_zero() {
        return None;
    }
    Some(payment_lines::ActiveModel {
        id: ActiveValue::NotSet,
        payment_batch_id: ActiveValue::Set(batch_id),
        allocation_id: ActiveValue::Set(allocation_id),
        receipt_id: ActiveValue::Set(line.receipt_id),
        grower_id: ActiveValue::Set(grower_id),
        kind: ActiveValue::Set(kind.as_str().to_string()),
        amount: ActiveValue::Set(amount.cents()),
        voided_at: ActiveValue::Set(None),
    })
}

impl Engine {
    /// Store one grower's priced receipts in `batch`, all or nothing.
    ///
    /// Fails without writing anything if another batch recorded `round` on
    /// one of the receipts in the meantime.
    pub(super) async fn pay_grower(
        &self,
        batch: &PaymentBatch,
        grower_id: i64,
        round: AdvanceRound,
        lines: &[ReceiptLine],
        actor: &Actor,
    ) -> ResultEngine<()> {
        let columns = advance_columns(round);
        let payment_type = round.payment_type();
        with_tx!(self, |db_tx| {
            let mut components = Vec::new();
            for line in lines {
                let allocation = allocations::ActiveModel {
                    id: ActiveValue::NotSet,
                    receipt_id: ActiveValue::Set(line.receipt_id),
                    payment_batch_id: ActiveValue::Set(batch.id),
                    payment_type: ActiveValue::Set(payment_type.code().to_string()),
                    price_table_id: ActiveValue::Set(Some(line.price_table_id)),
                    price_per_unit: ActiveValue::Set(line.amounts.price_per_unit.to_string()),
                    quantity: ActiveValue::Set(line.net_weight.to_string()),
                    amount: ActiveValue::Set(line.amounts.advance.cents()),
                    status: ActiveValue::Set(AllocationStatus::Active.as_str().to_string()),
                    created_by: ActiveValue::Set(actor.name.clone()),
                    created_at: ActiveValue::Set(actor.at),
                    voided_by: ActiveValue::Set(None),
                    voided_at: ActiveValue::Set(None),
                }
                .insert(&db_tx)
                .await?;

                let tracked = receipts::Entity::update_many()
                    .col_expr(columns.batch_id, Expr::value(batch.id))
                    .col_expr(
                        columns.price,
                        Expr::value(line.amounts.price_per_unit.to_string()),
                    )
                    .col_expr(columns.paid_on, Expr::value(batch.batch_date))
                    .filter(receipts::Column::Id.eq(line.receipt_id))
                    .filter(columns.batch_id.is_null())
                    .exec(&db_tx)
                    .await?;
                if tracked.rows_affected != 1 {
                    return Err(EngineError::Persistence(format!(
                        "receipt {} already holds advance {round}",
                        line.receipt_number
                    )));
                }

                components.extend(
                    [
                        (PaymentLineKind::Advance, line.amounts.advance),
                        (PaymentLineKind::TimePremium, line.amounts.premium),
                        (
                            PaymentLineKind::MarketingDeduction,
                            line.amounts.marketing_deduction,
                        ),
                    ]
                    .into_iter()
                    .filter_map(|(kind, amount)| {
                        payment_line(batch.id, allocation.id, grower_id, line, kind, amount)
                    }),
                );
                debug!(
                    receipt_id = line.receipt_id,
                    allocation_id = allocation.id,
                    amount = %line.amounts.advance,
                    "receipt allocated"
                );
            }

            insert_chunked(&db_tx, components).await?;
            Ok(())
        })
    }
}
