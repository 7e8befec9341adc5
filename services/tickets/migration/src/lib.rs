use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_events;
mod m20261001_000003_create_orders;
mod m20261001_000004_create_tickets;
mod m20261001_000005_create_payments;
mod m20261001_000006_create_outbox_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_events::Migration),
            Box::new(m20261001_000003_create_orders::Migration),
            Box::new(m20261001_000004_create_tickets::Migration),
            Box::new(m20261001_000005_create_payments::Migration),
            Box::new(m20261001_000006_create_outbox_events::Migration),
        ]
    }
}
