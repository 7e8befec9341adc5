use sea_orm::entity::prelude::*;

/// Append-only payment attempt for an order. The row with the highest id is
/// the order's current payment.
///
/// `status` and `method` hold the lowercase names of `PaymentStatus` /
/// `PaymentMethod`. `transaction_id` is the gateway-side payment id, recorded
/// when a notification is reconciled.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub method: String,
    pub amount: i64,
    #[sea_orm(unique)]
    pub external_reference: String,
    pub transaction_id: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id"
    )]
    Order,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
