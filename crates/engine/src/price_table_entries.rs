use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "price_table_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub price_table_id: i64,
    pub round: i32,
    pub currency: String,
    pub price_level: i32,
    pub grade: i32,
    pub price: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::price_tables::Entity",
        from = "Column::PriceTableId",
        to = "super::price_tables::Column::Id"
    )]
    PriceTables,
}

impl Related<super::price_tables::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceTables.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
