//! Price schedules.
//!
//! A price table applies to one product/process from its effective date until
//! a newer table for the same pair takes over. Its entries hold the admissible
//! advance price per round, currency, price level and grade.

use chrono::NaiveDate;
use sea_orm::entity::prelude::*;

use crate::{EngineError, RoundOneTerms, util::parse_decimal};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceTable {
    pub id: i64,
    pub product_id: i64,
    pub process_id: i64,
    pub effective_from: NaiveDate,
    pub terms: RoundOneTerms,
}

impl PriceTable {
    #[must_use]
    pub fn applies_to(&self, product_id: i64, process_id: i64, date: NaiveDate) -> bool {
        self.product_id == product_id && self.process_id == process_id && self.effective_from <= date
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "price_tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub product_id: i64,
    pub process_id: i64,
    pub effective_from: Date,
    pub time_premium: String,
    pub premium_cutoff_time: Option<Time>,
    pub marketing_deduction_rate: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::price_table_entries::Entity")]
    Entries,
}

impl Related<super::price_table_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PriceTable {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            product_id: model.product_id,
            process_id: model.process_id,
            effective_from: model.effective_from,
            terms: RoundOneTerms {
                time_premium: parse_decimal(&model.time_premium, "time premium")?,
                premium_cutoff: model.premium_cutoff_time,
                marketing_deduction_rate: parse_decimal(
                    &model.marketing_deduction_rate,
                    "marketing deduction rate",
                )?,
            },
        })
    }
}
