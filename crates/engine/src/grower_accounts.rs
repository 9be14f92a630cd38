//! Grower ledger.
//!
//! Posting a batch writes the grower's side of the payment: a credit per paid
//! receipt, premium credits, marketing-deduction debits and one debit per
//! advance repaid. Voiding the batch soft-deletes every entry it wrote.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::Serialize;

use crate::{Actor, EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountTransactionType {
    AdvancePayment,
    TimePremium,
    MarketingDeduction,
    AdvanceRepayment,
}

impl AccountTransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdvancePayment => "advance_payment",
            Self::TimePremium => "time_premium",
            Self::MarketingDeduction => "marketing_deduction",
            Self::AdvanceRepayment => "advance_repayment",
        }
    }
}

impl TryFrom<&str> for AccountTransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "advance_payment" => Ok(Self::AdvancePayment),
            "time_premium" => Ok(Self::TimePremium),
            "marketing_deduction" => Ok(Self::MarketingDeduction),
            "advance_repayment" => Ok(Self::AdvanceRepayment),
            other => Err(EngineError::InvalidState(format!(
                "invalid account transaction type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GrowerAccountEntry {
    pub id: i64,
    pub grower_id: i64,
    pub payment_batch_id: i64,
    pub receipt_id: Option<i64>,
    pub allocation_id: Option<i64>,
    pub transaction_type: AccountTransactionType,
    pub description: String,
    pub debit: MoneyCents,
    pub credit: MoneyCents,
    pub entry_date: NaiveDate,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Ledger entry not yet stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NewEntry {
    pub grower_id: i64,
    pub payment_batch_id: i64,
    pub receipt_id: Option<i64>,
    pub allocation_id: Option<i64>,
    pub transaction_type: AccountTransactionType,
    pub description: String,
    pub debit: MoneyCents,
    pub credit: MoneyCents,
    pub entry_date: NaiveDate,
}

impl NewEntry {
    pub(crate) fn into_active(self, actor: &Actor) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::NotSet,
            grower_id: ActiveValue::Set(self.grower_id),
            payment_batch_id: ActiveValue::Set(self.payment_batch_id),
            receipt_id: ActiveValue::Set(self.receipt_id),
            allocation_id: ActiveValue::Set(self.allocation_id),
            transaction_type: ActiveValue::Set(self.transaction_type.as_str().to_string()),
            description: ActiveValue::Set(self.description),
            debit: ActiveValue::Set(self.debit.cents()),
            credit: ActiveValue::Set(self.credit.cents()),
            entry_date: ActiveValue::Set(self.entry_date),
            created_by: ActiveValue::Set(actor.name.clone()),
            created_at: ActiveValue::Set(actor.at),
            deleted_by: ActiveValue::Set(None),
            deleted_at: ActiveValue::Set(None),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "grower_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub grower_id: i64,
    pub payment_batch_id: i64,
    pub receipt_id: Option<i64>,
    pub allocation_id: Option<i64>,
    pub transaction_type: String,
    pub description: String,
    pub debit: i64,
    pub credit: i64,
    pub entry_date: Date,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for GrowerAccountEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            grower_id: model.grower_id,
            payment_batch_id: model.payment_batch_id,
            receipt_id: model.receipt_id,
            allocation_id: model.allocation_id,
            transaction_type: AccountTransactionType::try_from(model.transaction_type.as_str())?,
            description: model.description,
            debit: MoneyCents::new(model.debit),
            credit: MoneyCents::new(model.credit),
            entry_date: model.entry_date,
            created_by: model.created_by,
            created_at: model.created_at,
            deleted_at: model.deleted_at,
        })
    }
}
