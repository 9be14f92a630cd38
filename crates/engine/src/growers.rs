use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{Currency, EngineError};

/// A grower as seen by the payment engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Grower {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub currency: Currency,
    pub price_level: i32,
    pub on_hold: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "growers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub number: String,
    pub name: String,
    pub currency: String,
    pub price_level: i32,
    pub on_hold: bool,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Grower {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            number: model.number,
            name: model.name,
            currency: Currency::try_from(model.currency.as_str())?,
            price_level: model.price_level,
            on_hold: model.on_hold,
        })
    }
}
