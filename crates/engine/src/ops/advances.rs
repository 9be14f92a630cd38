use std::collections::HashMap;

use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use tracing::{debug, info, warn};

use crate::{
    Actor, AdvanceCheque, AdvanceChequeStatus, AdvanceDeduction, DeductionResult,
    DeductionStatus, EngineError, MoneyCents, NewAdvanceCmd, ResultEngine, advance_cheques,
    advance_deductions, growers, payment_batches, plan_deductions,
    util::{normalize_optional_text, normalize_required_text},
};

use super::{Engine, with_tx};

async fn load_advance<C: ConnectionTrait>(db: &C, advance_id: i64) -> ResultEngine<advance_cheques::Model> {
    advance_cheques::Entity::find_by_id(advance_id)
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("advance cheque not exists".to_string()))
}

fn overflow(advance_id: i64) -> EngineError {
    EngineError::Critical(format!("advance {advance_id} balance overflow"))
}

/// Status the advance had before its first deduction.
async fn status_before_deductions<C: ConnectionTrait>(
    db: &C,
    advance_id: i64,
) -> ResultEngine<Option<AdvanceChequeStatus>> {
    advance_deductions::Entity::find()
        .filter(advance_deductions::Column::AdvanceChequeId.eq(advance_id))
        .order_by_asc(advance_deductions::Column::Id)
        .one(db)
        .await?
        .map(|model| AdvanceDeduction::try_from(model).map(|deduction| deduction.status_before))
        .transpose()
}

/// Advances the waterfall may draw from, oldest first.
async fn outstanding_in<C: ConnectionTrait>(db: &C, grower_id: i64) -> ResultEngine<Vec<AdvanceCheque>> {
    let deductible: Vec<&str> = AdvanceChequeStatus::DEDUCTIBLE
        .iter()
        .map(|status| status.as_str())
        .collect();
    advance_cheques::Entity::find()
        .filter(advance_cheques::Column::GrowerId.eq(grower_id))
        .filter(advance_cheques::Column::CurrentAmount.gt(0))
        .filter(advance_cheques::Column::Status.is_in(deductible))
        .order_by_asc(advance_cheques::Column::AdvanceDate)
        .order_by_asc(advance_cheques::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(AdvanceCheque::try_from)
        .collect()
}

pub(super) async fn apply_deductions_in(
    db_tx: &DatabaseTransaction,
    grower_id: i64,
    payment_batch_id: i64,
    payment: MoneyCents,
    actor: &Actor,
) -> ResultEngine<DeductionResult> {
    let batch = payment_batches::Entity::find_by_id(payment_batch_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("payment batch not exists".to_string()))?;

    let outstanding = outstanding_in(db_tx, grower_id).await?;
    let plan = plan_deductions(
        &outstanding
            .iter()
            .map(AdvanceCheque::outstanding)
            .collect::<Vec<_>>(),
        payment,
    );
    let by_id: HashMap<i64, &AdvanceCheque> =
        outstanding.iter().map(|advance| (advance.id, advance)).collect();

    let mut deductions = Vec::with_capacity(plan.deductions.len());
    for planned in &plan.deductions {
        let advance = by_id.get(&planned.advance_id).ok_or_else(|| {
            EngineError::Critical(format!("advance {} vanished", planned.advance_id))
        })?;
        let status = if planned.clears_advance() {
            AdvanceChequeStatus::FullyDeducted
        } else {
            AdvanceChequeStatus::PartiallyDeducted
        };
        let total_deducted = advance
            .total_deducted
            .checked_add(planned.amount)
            .ok_or_else(|| overflow(advance.id))?;

        advance_cheques::ActiveModel {
            id: ActiveValue::Unchanged(advance.id),
            current_amount: ActiveValue::Set(planned.remaining_balance.cents()),
            total_deducted: ActiveValue::Set(total_deducted.cents()),
            status: ActiveValue::Set(status.as_str().to_string()),
            ..Default::default()
        }
        .update(db_tx)
        .await?;

        let model = advance_deductions::ActiveModel {
            id: ActiveValue::NotSet,
            advance_cheque_id: ActiveValue::Set(advance.id),
            grower_id: ActiveValue::Set(grower_id),
            payment_batch_id: ActiveValue::Set(payment_batch_id),
            amount: ActiveValue::Set(planned.amount.cents()),
            status_before: ActiveValue::Set(advance.status.as_str().to_string()),
            status: ActiveValue::Set(DeductionStatus::Active.as_str().to_string()),
            deduction_date: ActiveValue::Set(batch.batch_date),
            created_by: ActiveValue::Set(actor.name.clone()),
            created_at: ActiveValue::Set(actor.at),
            reversed_by: ActiveValue::Set(None),
            reversed_at: ActiveValue::Set(None),
        }
        .insert(db_tx)
        .await?;
        deductions.push(AdvanceDeduction::try_from(model)?);
    }

    let result = DeductionResult {
        grower_id,
        payment_batch_id,
        total_deducted: plan.total_deducted,
        deduction_count: deductions.len(),
        remaining_payment: plan.remaining_payment,
        deductions,
    };
    if result.deduction_count > 0 {
        info!(
            grower_id,
            payment_batch_id,
            total_deducted = %result.total_deducted,
            deductions = result.deduction_count,
            "advance deductions applied"
        );
    }
    if result.has_undeducted_remainder() && !outstanding.is_empty() {
        warn!(
            grower_id,
            payment_batch_id,
            remaining = %result.remaining_payment,
            "payment exceeds outstanding advances"
        );
    }
    Ok(result)
}

pub(super) async fn reverse_deduction_in(
    db_tx: &DatabaseTransaction,
    deduction_id: i64,
    actor: &Actor,
) -> ResultEngine<AdvanceCheque> {
    let deduction = advance_deductions::Entity::find_by_id(deduction_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("advance deduction not exists".to_string()))
        .and_then(AdvanceDeduction::try_from)?;
    if deduction.status == DeductionStatus::Reversed {
        return Err(EngineError::InvalidState(format!(
            "deduction {deduction_id} already reversed"
        )));
    }

    let advance = AdvanceCheque::try_from(load_advance(db_tx, deduction.advance_cheque_id).await?)?;
    if advance.status == AdvanceChequeStatus::Voided {
        return Err(EngineError::InvalidState(format!(
            "advance {} is voided",
            advance.id
        )));
    }
    let current_amount = advance
        .current_amount
        .checked_add(deduction.amount)
        .ok_or_else(|| overflow(advance.id))?;
    let total_deducted = advance
        .total_deducted
        .checked_sub(deduction.amount)
        .ok_or_else(|| overflow(advance.id))?;
    let status = match advance.status {
        AdvanceChequeStatus::FullyDeducted | AdvanceChequeStatus::PartiallyDeducted
            if current_amount == advance.original_amount =>
        {
            status_before_deductions(db_tx, advance.id)
                .await?
                .unwrap_or(deduction.status_before)
        }
        AdvanceChequeStatus::FullyDeducted | AdvanceChequeStatus::PartiallyDeducted => {
            AdvanceChequeStatus::PartiallyDeducted
        }
        other => other,
    };

    let model = advance_cheques::ActiveModel {
        id: ActiveValue::Unchanged(advance.id),
        current_amount: ActiveValue::Set(current_amount.cents()),
        total_deducted: ActiveValue::Set(total_deducted.cents()),
        status: ActiveValue::Set(status.as_str().to_string()),
        ..Default::default()
    }
    .update(db_tx)
    .await?;

    advance_deductions::ActiveModel {
        id: ActiveValue::Unchanged(deduction.id),
        status: ActiveValue::Set(DeductionStatus::Reversed.as_str().to_string()),
        reversed_by: ActiveValue::Set(Some(actor.name.clone())),
        reversed_at: ActiveValue::Set(Some(actor.at)),
        ..Default::default()
    }
    .update(db_tx)
    .await?;

    debug!(
        deduction_id,
        advance_id = advance.id,
        amount = %deduction.amount,
        "advance deduction reversed"
    );
    AdvanceCheque::try_from(model)
}

impl Engine {
    /// Issue a cash advance to a grower.
    pub async fn issue_advance(&self, cmd: NewAdvanceCmd) -> ResultEngine<AdvanceCheque> {
        if !cmd.amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "advance amount must be > 0".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let grower = growers::Entity::find_by_id(cmd.grower_id)
                .filter(growers::Column::DeletedAt.is_null())
                .one(&db_tx)
                .await?;
            if grower.is_none() {
                return Err(EngineError::KeyNotFound("grower not exists".to_string()));
            }

            let model = advance_cheques::ActiveModel {
                id: ActiveValue::NotSet,
                grower_id: ActiveValue::Set(cmd.grower_id),
                advance_date: ActiveValue::Set(cmd.advance_date),
                original_amount: ActiveValue::Set(cmd.amount.cents()),
                current_amount: ActiveValue::Set(cmd.amount.cents()),
                total_deducted: ActiveValue::Set(0),
                status: ActiveValue::Set(AdvanceChequeStatus::Active.as_str().to_string()),
                notes: ActiveValue::Set(normalize_optional_text(cmd.notes.as_deref())),
                created_by: ActiveValue::Set(cmd.actor.name.clone()),
                created_at: ActiveValue::Set(cmd.actor.at),
                voided_by: ActiveValue::Set(None),
                voided_at: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;
            info!(
                advance_id = model.id,
                grower_id = cmd.grower_id,
                amount = %cmd.amount,
                "advance cheque issued"
            );
            AdvanceCheque::try_from(model)
        })
    }

    pub async fn advance(&self, advance_id: i64) -> ResultEngine<AdvanceCheque> {
        AdvanceCheque::try_from(load_advance(&self.database, advance_id).await?)
    }

    /// Advances with a balance the next payment would repay, oldest first.
    pub async fn outstanding_advances(&self, grower_id: i64) -> ResultEngine<Vec<AdvanceCheque>> {
        outstanding_in(&self.database, grower_id).await
    }

    /// Deductions taken from an advance, reversed ones included.
    pub async fn advance_deductions(&self, advance_id: i64) -> ResultEngine<Vec<AdvanceDeduction>> {
        advance_deductions::Entity::find()
            .filter(advance_deductions::Column::AdvanceChequeId.eq(advance_id))
            .order_by_asc(advance_deductions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(AdvanceDeduction::try_from)
            .collect()
    }

    /// Repay the grower's outstanding advances from `payment`, oldest first.
    ///
    /// Whatever the advances do not absorb is reported as
    /// `remaining_payment` and stays with the grower.
    pub async fn apply_advance_deductions(
        &self,
        grower_id: i64,
        payment_batch_id: i64,
        payment: MoneyCents,
        actor: &Actor,
    ) -> ResultEngine<DeductionResult> {
        with_tx!(self, |db_tx| {
            apply_deductions_in(&db_tx, grower_id, payment_batch_id, payment, actor).await
        })
    }

    /// Same as [`Engine::apply_advance_deductions`], inside the caller's
    /// transaction. Nothing is visible until the caller commits.
    pub async fn apply_advance_deductions_in(
        &self,
        db_tx: &DatabaseTransaction,
        grower_id: i64,
        payment_batch_id: i64,
        payment: MoneyCents,
        actor: &Actor,
    ) -> ResultEngine<DeductionResult> {
        apply_deductions_in(db_tx, grower_id, payment_batch_id, payment, actor).await
    }

    /// Undo a deduction: the advance gets its balance back. Once nothing is
    /// deducted any more it returns to the status it had before the first
    /// deduction; otherwise it stays partially deducted.
    pub async fn reverse_advance_deduction(
        &self,
        deduction_id: i64,
        actor: &Actor,
    ) -> ResultEngine<AdvanceCheque> {
        with_tx!(self, |db_tx| reverse_deduction_in(&db_tx, deduction_id, actor).await)
    }

    pub async fn reverse_advance_deduction_in(
        &self,
        db_tx: &DatabaseTransaction,
        deduction_id: i64,
        actor: &Actor,
    ) -> ResultEngine<AdvanceCheque> {
        reverse_deduction_in(db_tx, deduction_id, actor).await
    }

    /// Void an advance that nothing has been deducted from.
    pub async fn void_advance(
        &self,
        advance_id: i64,
        reason: &str,
        actor: &Actor,
    ) -> ResultEngine<AdvanceCheque> {
        let reason = normalize_required_text(reason, "void reason")?;
        with_tx!(self, |db_tx| {
            let advance = AdvanceCheque::try_from(load_advance(&db_tx, advance_id).await?)?;
            if advance.status == AdvanceChequeStatus::Voided {
                return Err(EngineError::InvalidState(format!(
                    "advance {advance_id} already voided"
                )));
            }
            let active = advance_deductions::Entity::find()
                .filter(advance_deductions::Column::AdvanceChequeId.eq(advance_id))
                .filter(advance_deductions::Column::Status.eq(DeductionStatus::Active.as_str()))
                .count(&db_tx)
                .await?;
            if active > 0 {
                return Err(EngineError::InvalidState(format!(
                    "advance {advance_id} has {active} active deduction(s)"
                )));
            }

            let note = format!(
                "[{}] Voided by {}: {reason}",
                actor.at.format("%Y-%m-%d %H:%M:%S"),
                actor.name
            );
            let notes = match advance.notes {
                Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
                _ => note,
            };
            let model = advance_cheques::ActiveModel {
                id: ActiveValue::Unchanged(advance_id),
                status: ActiveValue::Set(AdvanceChequeStatus::Voided.as_str().to_string()),
                notes: ActiveValue::Set(Some(notes)),
                voided_by: ActiveValue::Set(Some(actor.name.clone())),
                voided_at: ActiveValue::Set(Some(actor.at)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            info!(advance_id, voided_by = %actor.name, "advance cheque voided");
            AdvanceCheque::try_from(model)
        })
    }
}
