//! Payment batches.
//!
//! A batch groups the payments of one [`PaymentType`] for a crop year. Its
//! human-readable number is `{TypeCode}-{CropYear}-{Sequence:000}`, e.g.
//! `ADV1-2025-001`.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, MoneyCents, PaymentType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BatchStatus {
    Draft,
    Approved,
    Posted,
    Finalized,
    Voided,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Approved => "Approved",
            Self::Posted => "Posted",
            Self::Finalized => "Finalized",
            Self::Voided => "Voided",
        }
    }
}

impl core::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for BatchStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Draft" => Ok(Self::Draft),
            "Approved" => Ok(Self::Approved),
            "Posted" => Ok(Self::Posted),
            "Finalized" => Ok(Self::Finalized),
            "Voided" => Ok(Self::Voided),
            other => Err(EngineError::InvalidState(format!(
                "invalid batch status: {other}"
            ))),
        }
    }
}

/// Prefix shared by every batch of a type and crop year (`ADV1-2025-`).
#[must_use]
pub fn batch_number_prefix(payment_type: PaymentType, crop_year: i32) -> String {
    format!("{}-{}-", payment_type.code(), crop_year)
}

#[must_use]
pub fn format_batch_number(payment_type: PaymentType, crop_year: i32, sequence: i64) -> String {
    format!("{}{sequence:03}", batch_number_prefix(payment_type, crop_year))
}

/// Sequence part of `number` if it starts with `prefix`.
#[must_use]
pub fn parse_batch_sequence(number: &str, prefix: &str) -> Option<i64> {
    number
        .strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentBatch {
    pub id: i64,
    pub batch_number: String,
    pub payment_type: PaymentType,
    pub crop_year: i32,
    pub batch_date: NaiveDate,
    pub cutoff_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub total_amount: MoneyCents,
    pub grower_count: i32,
    pub receipt_count: i32,
    pub run_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub finalized_by: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PaymentBatch {
    /// Appends a timestamped line to the audit notes.
    pub(crate) fn append_note(&mut self, at: DateTime<Utc>, line: &str) {
        let entry = format!("[{}] {line}", at.format("%Y-%m-%d %H:%M:%S"));
        self.notes = Some(match self.notes.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{entry}"),
            _ => entry,
        });
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub batch_number: String,
    pub payment_type: String,
    pub crop_year: i32,
    pub batch_date: Date,
    pub cutoff_date: Option<Date>,
    pub status: String,
    pub total_amount: i64,
    pub grower_count: i32,
    pub receipt_count: i32,
    pub run_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTimeUtc>,
    pub posted_by: Option<String>,
    pub posted_at: Option<DateTimeUtc>,
    pub finalized_by: Option<String>,
    pub finalized_at: Option<DateTimeUtc>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTimeUtc>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::allocations::Entity")]
    Allocations,
}

impl Related<super::allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PaymentBatch {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            batch_number: model.batch_number,
            payment_type: PaymentType::try_from(model.payment_type.as_str())?,
            crop_year: model.crop_year,
            batch_date: model.batch_date,
            cutoff_date: model.cutoff_date,
            status: BatchStatus::try_from(model.status.as_str())?,
            total_amount: MoneyCents::new(model.total_amount),
            grower_count: model.grower_count,
            receipt_count: model.receipt_count,
            run_id: model.run_id.and_then(|s| Uuid::parse_str(&s).ok()),
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
            approved_by: model.approved_by,
            approved_at: model.approved_at,
            posted_by: model.posted_by,
            posted_at: model.posted_at,
            finalized_by: model.finalized_by,
            finalized_at: model.finalized_at,
            voided_by: model.voided_by,
            voided_at: model.voided_at,
            deleted_at: model.deleted_at,
        })
    }
}

/// Columns touched by a lifecycle transition.
impl From<&PaymentBatch> for ActiveModel {
    fn from(batch: &PaymentBatch) -> Self {
        Self {
            id: ActiveValue::Unchanged(batch.id),
            status: ActiveValue::Set(batch.status.as_str().to_string()),
            notes: ActiveValue::Set(batch.notes.clone()),
            approved_by: ActiveValue::Set(batch.approved_by.clone()),
            approved_at: ActiveValue::Set(batch.approved_at),
            posted_by: ActiveValue::Set(batch.posted_by.clone()),
            posted_at: ActiveValue::Set(batch.posted_at),
            finalized_by: ActiveValue::Set(batch.finalized_by.clone()),
            finalized_at: ActiveValue::Set(batch.finalized_at),
            voided_by: ActiveValue::Set(batch.voided_by.clone()),
            voided_at: ActiveValue::Set(batch.voided_at),
            deleted_at: ActiveValue::Set(batch.deleted_at),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_numbers_are_zero_padded() {
        assert_eq!(
            format_batch_number(PaymentType::Advance1, 2025, 1),
            "ADV1-2025-001"
        );
        assert_eq!(
            format_batch_number(PaymentType::Final, 2024, 1234),
            "FINAL-2024-1234"
        );
    }

    #[test]
    fn sequence_parsing_ignores_other_prefixes() {
        let prefix = batch_number_prefix(PaymentType::Advance2, 2025);
        assert_eq!(parse_batch_sequence("ADV2-2025-017", &prefix), Some(17));
        assert_eq!(parse_batch_sequence("ADV2-2024-017", &prefix), None);
        assert_eq!(parse_batch_sequence("ADV2-2025-", &prefix), None);
        assert_eq!(parse_batch_sequence("ADV2-2025-01a", &prefix), None);
    }
}
