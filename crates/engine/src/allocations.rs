//! Receipt payment allocations.
//!
//! One allocation links a receipt to the batch that paid one of its rounds.
//! Allocations carry their own status: voiding a batch voids its allocations,
//! which makes the receipts eligible for that round again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{EngineError, MoneyCents, PaymentType, util::parse_decimal};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Active,
    Voided,
}

impl AllocationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Voided => "voided",
        }
    }
}

impl TryFrom<&str> for AllocationStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "voided" => Ok(Self::Voided),
            other => Err(EngineError::InvalidState(format!(
                "invalid allocation status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptPaymentAllocation {
    pub id: i64,
    pub receipt_id: i64,
    pub payment_batch_id: i64,
    pub payment_type: PaymentType,
    pub price_table_id: Option<i64>,
    pub price_per_unit: Decimal,
    pub quantity: Decimal,
    pub amount: MoneyCents,
    pub status: AllocationStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "receipt_payment_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub receipt_id: i64,
    pub payment_batch_id: i64,
    pub payment_type: String,
    pub price_table_id: Option<i64>,
    pub price_per_unit: String,
    pub quantity: String,
    pub amount: i64,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::receipts::Entity",
        from = "Column::ReceiptId",
        to = "super::receipts::Column::Id"
    )]
    Receipts,
    #[sea_orm(
        belongs_to = "super::payment_batches::Entity",
        from = "Column::PaymentBatchId",
        to = "super::payment_batches::Column::Id"
    )]
    PaymentBatches,
}

impl Related<super::receipts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl Related<super::payment_batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentBatches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for ReceiptPaymentAllocation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            receipt_id: model.receipt_id,
            payment_batch_id: model.payment_batch_id,
            payment_type: PaymentType::try_from(model.payment_type.as_str())?,
            price_table_id: model.price_table_id,
            price_per_unit: parse_decimal(&model.price_per_unit, "price per unit")?,
            quantity: parse_decimal(&model.quantity, "quantity")?,
            amount: MoneyCents::new(model.amount),
            status: AllocationStatus::try_from(model.status.as_str())?,
            created_by: model.created_by,
            created_at: model.created_at,
            voided_by: model.voided_by,
            voided_at: model.voided_at,
        })
    }
}
