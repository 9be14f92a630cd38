//! Per-receipt payment components written by an actual run.

use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentLineKind {
    Advance,
    TimePremium,
    MarketingDeduction,
}

impl PaymentLineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Advance => "advance",
            Self::TimePremium => "time_premium",
            Self::MarketingDeduction => "marketing_deduction",
        }
    }

    /// Sign applied to the stored (positive) amount when summing a grower's pay.
    pub fn sign(self) -> i64 {
        match self {
            Self::Advance | Self::TimePremium => 1,
            Self::MarketingDeduction => -1,
        }
    }
}

impl TryFrom<&str> for PaymentLineKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "advance" => Ok(Self::Advance),
            "time_premium" => Ok(Self::TimePremium),
            "marketing_deduction" => Ok(Self::MarketingDeduction),
            other => Err(EngineError::InvalidState(format!(
                "invalid payment line kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub payment_batch_id: i64,
    pub allocation_id: i64,
    pub receipt_id: i64,
    pub grower_id: i64,
    pub kind: String,
    pub amount: i64,
    pub voided_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
