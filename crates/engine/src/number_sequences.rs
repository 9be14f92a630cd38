use sea_orm::entity::prelude::*;

/// Sequence key for batch numbers of one payment type and crop year.
#[must_use]
pub fn batch_sequence_name(prefix: &str) -> String {
    format!("batch:{prefix}")
}

pub const CHEQUE_SEQUENCE: &str = "cheque";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "number_sequences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub last_value: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
