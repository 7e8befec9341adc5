use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use oasis_domain::payment::{PaymentMethod, PaymentStatus};
use oasis_tickets_schema::{payments, tickets};

use crate::domain::repository::SummaryRepository;
use crate::domain::types::{CashierActivity, SaleRecord};
use crate::error::TicketsServiceError;

#[derive(Clone)]
pub struct DbSummaryRepository {
    pub db: DatabaseConnection,
}

impl SummaryRepository for DbSummaryRepository {
    /// A payment settles when it reaches Approved, which is its last update
    /// while it stays approved.
    async fn approved_sales_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>, TicketsServiceError> {
        let rows: Vec<(DateTime<Utc>, i64)> = payments::Entity::find()
            .select_only()
            .column(payments::Column::UpdatedAt)
            .column(payments::Column::Amount)
            .filter(payments::Column::Status.eq(PaymentStatus::Approved.as_str()))
            .filter(payments::Column::UpdatedAt.gte(since))
            .order_by_asc(payments::Column::UpdatedAt)
            .into_tuple()
            .all(&self.db)
            .await
            .context("load approved sales")?;
        Ok(rows
            .into_iter()
            .map(|(settled_at, amount)| SaleRecord { settled_at, amount })
            .collect())
    }

    async fn cashier_activity(
        &self,
        cashier_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CashierActivity, TicketsServiceError> {
        let mut sales_query = payments::Entity::find()
            .select_only()
            .column(payments::Column::CreatedAt)
            .column(payments::Column::Amount)
            .filter(payments::Column::Status.eq(PaymentStatus::Approved.as_str()))
            .filter(payments::Column::Method.eq(PaymentMethod::Cashier.as_str()))
            .filter(payments::Column::CreatedAt.gte(from))
            .filter(payments::Column::CreatedAt.lt(to));
        if let Some(id) = cashier_id {
            sales_query = sales_query.filter(payments::Column::UserId.eq(id));
        }
        let sales: Vec<(DateTime<Utc>, i64)> = sales_query
            .order_by_asc(payments::Column::CreatedAt)
            .into_tuple()
            .all(&self.db)
            .await
            .context("load cashier sales")?;

        let mut uses_query = tickets::Entity::find()
            .select_only()
            .column(tickets::Column::UsedAt)
            .filter(tickets::Column::UsedAt.gte(from))
            .filter(tickets::Column::UsedAt.lt(to));
        uses_query = match cashier_id {
            Some(id) => uses_query.filter(tickets::Column::UsedBy.eq(id)),
            None => uses_query.filter(tickets::Column::UsedBy.is_not_null()),
        };
        let uses: Vec<Option<DateTime<Utc>>> = uses_query
            .order_by_asc(tickets::Column::UsedAt)
            .into_tuple()
            .all(&self.db)
            .await
            .context("load cashier ticket uses")?;

        Ok(CashierActivity {
            sales: sales
                .into_iter()
                .map(|(settled_at, amount)| SaleRecord { settled_at, amount })
                .collect(),
            uses: uses.into_iter().flatten().collect(),
        })
    }
}
