use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{AdvanceChequeStatus, EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionStatus {
    Active,
    Reversed,
}

impl DeductionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Reversed => "reversed",
        }
    }
}

impl TryFrom<&str> for DeductionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "reversed" => Ok(Self::Reversed),
            other => Err(EngineError::InvalidState(format!(
                "invalid deduction status: {other}"
            ))),
        }
    }
}

/// Ledger record of part of a batch payment repaying an advance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdvanceDeduction {
    pub id: i64,
    pub advance_cheque_id: i64,
    pub grower_id: i64,
    pub payment_batch_id: i64,
    pub amount: MoneyCents,
    /// Advance status before this deduction was applied; restored on reversal.
    pub status_before: AdvanceChequeStatus,
    pub status: DeductionStatus,
    pub deduction_date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub reversed_by: Option<String>,
    pub reversed_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "advance_deductions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub advance_cheque_id: i64,
    pub grower_id: i64,
    pub payment_batch_id: i64,
    pub amount: i64,
    pub status_before: String,
    pub status: String,
    pub deduction_date: Date,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub reversed_by: Option<String>,
    pub reversed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::advance_cheques::Entity",
        from = "Column::AdvanceChequeId",
        to = "super::advance_cheques::Column::Id"
    )]
    AdvanceCheques,
}

impl Related<super::advance_cheques::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdvanceCheques.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for AdvanceDeduction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            advance_cheque_id: model.advance_cheque_id,
            grower_id: model.grower_id,
            payment_batch_id: model.payment_batch_id,
            amount: MoneyCents::new(model.amount),
            status_before: AdvanceChequeStatus::try_from(model.status_before.as_str())?,
            status: DeductionStatus::try_from(model.status.as_str())?,
            deduction_date: model.deduction_date,
            created_by: model.created_by,
            created_at: model.created_at,
            reversed_by: model.reversed_by,
            reversed_at: model.reversed_at,
        })
    }
}
