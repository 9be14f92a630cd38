//! Receipts.
//!
//! Receipts are owned by intake; the payment engine only reads them and
//! records which advance rounds have paid them (`advanceN_*` columns).

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{AdvanceRound, EngineError, util::parse_decimal};

/// Tracking record for a paid advance round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AdvancePaid {
    pub batch_id: i64,
    pub price: Decimal,
    pub paid_on: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub id: i64,
    pub receipt_number: String,
    pub grower_id: i64,
    pub product_id: i64,
    pub process_id: i64,
    pub receipt_date: NaiveDate,
    pub receipt_time: Option<NaiveTime>,
    pub net_weight: Decimal,
    pub grade: i32,
    pub price_table_id: Option<i64>,
    pub advances: [Option<AdvancePaid>; 3],
}

impl Receipt {
    #[must_use]
    pub fn advance(&self, round: AdvanceRound) -> Option<&AdvancePaid> {
        self.advances[usize::from(round.number() - 1)].as_ref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "receipts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub receipt_number: String,
    pub grower_id: i64,
    pub product_id: i64,
    pub process_id: i64,
    pub receipt_date: Date,
    pub receipt_time: Option<Time>,
    pub net_weight: String,
    pub grade: i32,
    pub price_table_id: Option<i64>,
    pub is_voided: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub advance1_batch_id: Option<i64>,
    pub advance1_price: Option<String>,
    pub advance1_paid_on: Option<Date>,
    pub advance2_batch_id: Option<i64>,
    pub advance2_price: Option<String>,
    pub advance2_paid_on: Option<Date>,
    pub advance3_batch_id: Option<i64>,
    pub advance3_price: Option<String>,
    pub advance3_paid_on: Option<Date>,
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

/// Columns holding the tracking fields of one advance round.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AdvanceColumns {
    pub batch_id: Column,
    pub price: Column,
    pub paid_on: Column,
}

pub(crate) fn advance_columns(round: AdvanceRound) -> AdvanceColumns {
    match round {
        AdvanceRound::First => AdvanceColumns {
            batch_id: Column::Advance1BatchId,
            price: Column::Advance1Price,
            paid_on: Column::Advance1PaidOn,
        },
        AdvanceRound::Second => AdvanceColumns {
            batch_id: Column::Advance2BatchId,
            price: Column::Advance2Price,
            paid_on: Column::Advance2PaidOn,
        },
        AdvanceRound::Third => AdvanceColumns {
            batch_id: Column::Advance3BatchId,
            price: Column::Advance3Price,
            paid_on: Column::Advance3PaidOn,
        },
    }
}

fn advance_paid(
    batch_id: Option<i64>,
    price: Option<&str>,
    paid_on: Option<NaiveDate>,
) -> Result<Option<AdvancePaid>, EngineError> {
    match (batch_id, price, paid_on) {
        (Some(batch_id), Some(price), Some(paid_on)) => Ok(Some(AdvancePaid {
            batch_id,
            price: parse_decimal(price, "advance price")?,
            paid_on,
        })),
        _ => Ok(None),
    }
}

impl TryFrom<Model> for Receipt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let advances = [
            advance_paid(
                model.advance1_batch_id,
                model.advance1_price.as_deref(),
                model.advance1_paid_on,
            )?,
            advance_paid(
                model.advance2_batch_id,
                model.advance2_price.as_deref(),
                model.advance2_paid_on,
            )?,
            advance_paid(
                model.advance3_batch_id,
                model.advance3_price.as_deref(),
                model.advance3_paid_on,
            )?,
        ];
        Ok(Self {
            id: model.id,
            receipt_number: model.receipt_number,
            grower_id: model.grower_id,
            product_id: model.product_id,
            process_id: model.process_id,
            receipt_date: model.receipt_date,
            receipt_time: model.receipt_time,
            net_weight: parse_decimal(&model.net_weight, "net weight")?,
            grade: model.grade,
            price_table_id: model.price_table_id,
            advances,
        })
    }
}
