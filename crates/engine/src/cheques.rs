//! Batch cheques.
//!
//! One cheque per grower is generated when a batch posts, for the grower's
//! pay after advance deductions. Printing happens elsewhere; the engine only
//! tracks the lifecycle.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChequeStatus {
    Generated,
    Issued,
    Voided,
}

impl ChequeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Issued => "issued",
            Self::Voided => "voided",
        }
    }
}

impl TryFrom<&str> for ChequeStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "generated" => Ok(Self::Generated),
            "issued" => Ok(Self::Issued),
            "voided" => Ok(Self::Voided),
            other => Err(EngineError::InvalidState(format!(
                "invalid cheque status: {other}"
            ))),
        }
    }
}

#[must_use]
pub fn format_cheque_number(value: i64) -> String {
    format!("{value:06}")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cheque {
    pub id: i64,
    pub cheque_number: String,
    pub payment_batch_id: i64,
    pub grower_id: i64,
    pub gross_amount: MoneyCents,
    pub deducted_amount: MoneyCents,
    pub net_amount: MoneyCents,
    pub status: ChequeStatus,
    pub created_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub voided_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cheques")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub cheque_number: String,
    pub payment_batch_id: i64,
    pub grower_id: i64,
    pub gross_amount: i64,
    pub deducted_amount: i64,
    pub net_amount: i64,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub issued_at: Option<DateTimeUtc>,
    pub voided_by: Option<String>,
    pub voided_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Cheque {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            cheque_number: model.cheque_number,
            payment_batch_id: model.payment_batch_id,
            grower_id: model.grower_id,
            gross_amount: MoneyCents::new(model.gross_amount),
            deducted_amount: MoneyCents::new(model.deducted_amount),
            net_amount: MoneyCents::new(model.net_amount),
            status: ChequeStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
            issued_at: model.issued_at,
            voided_at: model.voided_at,
        })
    }
}
