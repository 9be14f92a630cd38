//! Batch and cheque number allocation.
//!
//! Each counter lives in `number_sequences` and is advanced with a
//! compare-and-set update, so two writers can never hand out the same value.
//! The first allocation of a counter seeds it from the highest number already
//! stored, which keeps numbering continuous for data written before the
//! counter existed.

use sea_orm::{
    ConnectionTrait, QueryFilter,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    EngineError, PaymentType, ResultEngine, batch_number_prefix, cheques, format_batch_number,
    format_cheque_number,
    number_sequences::{self, CHEQUE_SEQUENCE, batch_sequence_name},
    parse_batch_sequence, payment_batches,
};

const MAX_ATTEMPTS: usize = 16;

/// Next value of the `name` counter, never below `floor + 1`.
async fn next_value<C: ConnectionTrait>(db: &C, name: &str, floor: i64) -> ResultEngine<i64> {
    for _ in 0..MAX_ATTEMPTS {
        let seed = number_sequences::ActiveModel {
            name: sea_orm::ActiveValue::Set(name.to_string()),
            last_value: sea_orm::ActiveValue::Set(floor),
        };
        number_sequences::Entity::insert(seed)
            .on_conflict(
                OnConflict::column(number_sequences::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        let current = number_sequences::Entity::find_by_id(name.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::Critical(format!("number sequence {name} missing")))?;
        let next = current.last_value.max(floor) + 1;

        let updated = number_sequences::Entity::update_many()
            .col_expr(number_sequences::Column::LastValue, Expr::value(next))
            .filter(number_sequences::Column::Name.eq(name))
            .filter(number_sequences::Column::LastValue.eq(current.last_value))
            .exec(db)
            .await?;
        if updated.rows_affected == 1 {
            return Ok(next);
        }
        tracing::debug!(sequence = name, "number sequence contention, retrying");
    }
    Err(EngineError::Critical(format!(
        "could not allocate a number from sequence {name}"
    )))
}

/// Next `{TypeCode}-{CropYear}-{Sequence:000}` number.
pub(super) async fn next_batch_number<C: ConnectionTrait>(
    db: &C,
    payment_type: PaymentType,
    crop_year: i32,
) -> ResultEngine<String> {
    let prefix = batch_number_prefix(payment_type, crop_year);
    let floor = payment_batches::Entity::find()
        .filter(payment_batches::Column::BatchNumber.starts_with(prefix.as_str()))
        .all(db)
        .await?
        .iter()
        .filter_map(|model| parse_batch_sequence(&model.batch_number, &prefix))
        .max()
        .unwrap_or(0);

    let sequence = next_value(db, &batch_sequence_name(&prefix), floor).await?;
    Ok(format_batch_number(payment_type, crop_year, sequence))
}

pub(super) async fn next_cheque_number<C: ConnectionTrait>(db: &C) -> ResultEngine<String> {
    let floor = cheques::Entity::find()
        .all(db)
        .await?
        .iter()
        .filter_map(|model| model.cheque_number.parse::<i64>().ok())
        .max()
        .unwrap_or(0);

    let value = next_value(db, CHEQUE_SEQUENCE, floor).await?;
    Ok(format_cheque_number(value))
}
