use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{EngineError, PaymentType};

/// A price table frozen by a posted batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceScheduleLock {
    pub id: i64,
    pub price_table_id: i64,
    pub payment_batch_id: i64,
    pub payment_type: PaymentType,
    pub locked_by: String,
    pub locked_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "price_schedule_locks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub price_table_id: i64,
    pub payment_batch_id: i64,
    pub payment_type: String,
    pub locked_by: String,
    pub locked_at: DateTimeUtc,
    pub deleted_by: Option<String>,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PriceScheduleLock {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            price_table_id: model.price_table_id,
            payment_batch_id: model.payment_batch_id,
            payment_type: PaymentType::try_from(model.payment_type.as_str())?,
            locked_by: model.locked_by,
            locked_at: model.locked_at,
            deleted_at: model.deleted_at,
        })
    }
}
