use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tickets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tickets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tickets::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Tickets::OrderId).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::EventId).big_integer().not_null())
                    .col(ColumnDef::new(Tickets::UsedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tickets::UsedBy).big_integer())
                    .col(
                        ColumnDef::new(Tickets::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Tickets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tickets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Tickets::Table, Tickets::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Tickets::Table, Tickets::EventId)
                            .to(Events::Table, Events::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(Tickets::Table)
                    .col(Tickets::OrderId)
                    .name("idx_tickets_order_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Tickets::Table)
                    .col(Tickets::EventId)
                    .name("idx_tickets_event_id")
                    .to_owned(),
            )
            .await?;
        // Cashier summaries scan redemptions by operator and time.
        manager
            .create_index(
                Index::create()
                    .table(Tickets::Table)
                    .col(Tickets::UsedBy)
                    .col(Tickets::UsedAt)
                    .name("idx_tickets_used_by_used_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tickets::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tickets {
    Table,
    Id,
    Uuid,
    OrderId,
    EventId,
    UsedAt,
    UsedBy,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
}
