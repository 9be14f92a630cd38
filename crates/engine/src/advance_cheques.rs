//! Cash advances.
//!
//! An advance cheque is money handed to a grower outside the batch flow. It is
//! recovered from later batch payments by the deduction waterfall:
//! `current_amount = original_amount - total_deducted` at all times.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{EngineError, MoneyCents, OutstandingAdvance};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AdvanceChequeStatus {
    Generated,
    Printed,
    Delivered,
    Active,
    PartiallyDeducted,
    FullyDeducted,
    Voided,
}

impl AdvanceChequeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "Generated",
            Self::Printed => "Printed",
            Self::Delivered => "Delivered",
            Self::Active => "Active",
            Self::PartiallyDeducted => "PartiallyDeducted",
            Self::FullyDeducted => "FullyDeducted",
            Self::Voided => "Voided",
        }
    }

    /// Statuses the waterfall may deduct from.
    pub const DEDUCTIBLE: [AdvanceChequeStatus; 5] = [
        Self::Generated,
        Self::Printed,
        Self::Delivered,
        Self::Active,
        Self::PartiallyDeducted,
    ];
}

impl core::fmt::Display for AdvanceChequeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for AdvanceChequeStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Generated" => Ok(Self::Generated),
            "Printed" => Ok(Self::Printed),
            "Delivered" => Ok(Self::Delivered),
            "Active" => Ok(Self::Active),
            "PartiallyDeducted" => Ok(Self::PartiallyDeducted),
            "FullyDeducted" => Ok(Self::FullyDeducted),
            "Voided" => Ok(Self::Voided),
            other => Err(EngineError::InvalidState(format!(
                "invalid advance cheque status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdvanceCheque {
    pub id: i64,
    pub grower_id: i64,
    pub advance_date: NaiveDate,
    pub original_amount: MoneyCents,
    pub current_amount: MoneyCents,
    pub total_deducted: MoneyCents,
    pub status: AdvanceChequeStatus,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
}

impl AdvanceCheque {
    #[must_use]
    pub fn outstanding(&self) -> OutstandingAdvance {
        OutstandingAdvance {
            advance_id: self.id,
            advance_date: self.advance_date,
            current_amount: self.current_amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advance_cheques")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub grower_id: i64,
    pub advance_date: Date,
    pub original_amount: i64,
    pub current_amount: i64,
    pub total_deducted: i64,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::advance_deductions::Entity")]
    Deductions,
}

impl Related<super::advance_deductions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deductions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AdvanceCheque {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            grower_id: model.grower_id,
            advance_date: model.advance_date,
            original_amount: MoneyCents::new(model.original_amount),
            current_amount: MoneyCents::new(model.current_amount),
            total_deducted: MoneyCents::new(model.total_deducted),
            status: AdvanceChequeStatus::try_from(model.status.as_str())?,
            notes: model.notes,
            created_by: model.created_by,
            created_at: model.created_at,
            voided_at: model.voided_at,
        })
    }
}
