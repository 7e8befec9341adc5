use std::collections::{BTreeSet, HashMap};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, Query},
};
use uuid::Uuid;

use oasis_domain::pagination::PageRequest;
use oasis_tickets_schema::{events, orders, payments, tickets, users};

use crate::domain::repository::{
    EventRepository, OrderRepository, TicketRepository, UserDirectory,
};
use crate::domain::types::{
    Contact, Event, EventFilter, NewEvent, NewOrder, Order, OrderFilter, Ticket, TicketFilter,
};
use crate::error::TicketsServiceError;
use crate::infra::payments::latest_payments;

/// Order ids whose highest-id payment is approved.
const PAID_ORDER_IDS: &str = "SELECT p.order_id FROM payments p \
     WHERE p.status = 'approved' \
     AND p.id = (SELECT MAX(p2.id) FROM payments p2 WHERE p2.order_id = p.order_id)";

// ── Event repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbEventRepository {
    pub db: DatabaseConnection,
}

impl EventRepository for DbEventRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, TicketsServiceError> {
        let model = events::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find event by id")?;
        Ok(model.map(event_from_model))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, TicketsServiceError> {
        let unique: BTreeSet<i64> = ids.iter().copied().collect();
        let models = events::Entity::find()
            .filter(events::Column::Id.is_in(unique))
            .all(&self.db)
            .await
            .context("find events by ids")?;
        Ok(models.into_iter().map(event_from_model).collect())
    }

    async fn create_many(&self, new_events: &[NewEvent]) -> Result<Vec<Event>, TicketsServiceError> {
        let models = self
            .db
            .transaction::<_, Vec<events::Model>, DbErr>(|txn| {
                let new_events = new_events.to_vec();
                Box::pin(async move {
                    let now = Utc::now();
                    let mut created = Vec::with_capacity(new_events.len());
                    for event in new_events {
                        let model = events::ActiveModel {
                            id: NotSet,
                            start_at: Set(event.start_at),
                            end_at: Set(event.end_at),
                            price: Set(event.price),
                            event_type: Set(event.event_type),
                            active: Set(true),
                            created_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                        created.push(model);
                    }
                    Ok(created)
                })
            })
            .await
            .context("create events")?;
        Ok(models.into_iter().map(event_from_model).collect())
    }

    async fn list(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<Vec<Event>, TicketsServiceError> {
        let mut query = events::Entity::find();
        if let Some(from) = filter.starts_from {
            query = query.filter(events::Column::StartAt.gte(from));
        }
        if let Some(to) = filter.starts_to {
            query = query.filter(events::Column::StartAt.lte(to));
        }
        if let Some(active) = filter.active {
            query = query.filter(events::Column::Active.eq(active));
        }
        let models = query
            .order_by_asc(events::Column::StartAt)
            .order_by_asc(events::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list events")?;
        Ok(models.into_iter().map(event_from_model).collect())
    }
}

fn event_from_model(model: events::Model) -> Event {
    Event {
        id: model.id,
        start_at: model.start_at,
        end_at: model.end_at,
        price: model.price,
        event_type: model.event_type,
        active: model.active,
        created_at: model.created_at,
    }
}

// ── Order repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOrderRepository {
    pub db: DatabaseConnection,
}

impl DbOrderRepository {
    async fn find_by_payment(
        &self,
        column: payments::Column,
        value: &str,
    ) -> Result<Option<Order>, TicketsServiceError> {
        let payment = payments::Entity::find()
            .filter(column.eq(value))
            .order_by_desc(payments::Column::Id)
            .one(&self.db)
            .await
            .context("find payment for order lookup")?;
        match payment {
            Some(p) => self.find_by_id(p.order_id).await,
            None => Ok(None),
        }
    }
}

impl OrderRepository for DbOrderRepository {
    async fn create(&self, order: &NewOrder) -> Result<Order, TicketsServiceError> {
        let model = self
            .db
            .transaction::<_, orders::Model, DbErr>(|txn| {
                let order = order.clone();
                Box::pin(async move {
                    let now = Utc::now();
                    let created = orders::ActiveModel {
                        id: NotSet,
                        user_id: Set(order.user_id),
                        client_id: Set(order.client_id),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    for ticket in &order.tickets {
                        tickets::ActiveModel {
                            id: NotSet,
                            uuid: Set(ticket.uuid),
                            order_id: Set(created.id),
                            event_id: Set(ticket.event_id),
                            used_at: Set(None),
                            used_by: Set(None),
                            active: Set(true),
                            created_at: Set(now),
                            updated_at: Set(now),
                        }
                        .insert(txn)
                        .await?;
                    }
                    Ok(created)
                })
            })
            .await
            .context("create order with tickets")?;

        let mut assembled = assemble_orders(&self.db, vec![model]).await?;
        Ok(assembled.pop().context("created order vanished")?)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, TicketsServiceError> {
        let Some(model) = orders::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find order by id")?
        else {
            return Ok(None);
        };
        Ok(assemble_orders(&self.db, vec![model]).await?.pop())
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, TicketsServiceError> {
        self.find_by_payment(payments::Column::ExternalReference, reference)
            .await
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Order>, TicketsServiceError> {
        self.find_by_payment(payments::Column::TransactionId, transaction_id)
            .await
    }

    async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Vec<Order>, TicketsServiceError> {
        let mut query = orders::Entity::find();
        if let Some(from) = filter.created_from {
            query = query.filter(orders::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(orders::Column::CreatedAt.lte(to));
        }
        if !filter.user_ids.is_empty() {
            query = query.filter(orders::Column::UserId.is_in(filter.user_ids.iter().copied()));
        }
        if !filter.client_ids.is_empty() {
            query =
                query.filter(orders::Column::ClientId.is_in(filter.client_ids.iter().copied()));
        }
        if filter.event_from.is_some() || filter.event_to.is_some() {
            query = query.filter(orders::Column::Id.in_subquery(
                orders_with_event_between(filter.event_from, filter.event_to),
            ));
        }

        let models = query
            .order_by_desc(orders::Column::CreatedAt)
            .order_by_desc(orders::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list orders")?;
        Ok(assemble_orders(&self.db, models).await?)
    }

    async fn reassign_event(
        &self,
        order_id: i64,
        event_id: i64,
    ) -> Result<bool, TicketsServiceError> {
        let applied = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                Box::pin(async move {
                    // Lock the order's tickets so a concurrent redemption either
                    // lands before the check or waits for the move.
                    let rows = tickets::Entity::find()
                        .filter(tickets::Column::OrderId.eq(order_id))
                        .filter(tickets::Column::Active.eq(true))
                        .lock_exclusive()
                        .all(txn)
                        .await?;
                    if rows.iter().any(|t| t.used_at.is_some()) {
                        return Ok(false);
                    }
                    tickets::Entity::update_many()
                        .col_expr(tickets::Column::EventId, Expr::value(event_id))
                        .col_expr(tickets::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(tickets::Column::OrderId.eq(order_id))
                        .filter(tickets::Column::Active.eq(true))
                        .exec(txn)
                        .await?;
                    orders::Entity::update_many()
                        .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(orders::Column::Id.eq(order_id))
                        .exec(txn)
                        .await?;
                    Ok(true)
                })
            })
            .await
            .context("reassign order event")?;
        Ok(applied)
    }
}

fn orders_with_event_between(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> sea_orm::sea_query::SelectStatement {
    let mut sub = Query::select();
    sub.column((tickets::Entity, tickets::Column::OrderId))
        .from(tickets::Entity)
        .inner_join(
            events::Entity,
            Expr::col((events::Entity, events::Column::Id))
                .equals((tickets::Entity, tickets::Column::EventId)),
        )
        .and_where(Expr::col((tickets::Entity, tickets::Column::Active)).eq(true));
    if let Some(from) = from {
        sub.and_where(Expr::col((events::Entity, events::Column::StartAt)).gte(from));
    }
    if let Some(to) = to {
        sub.and_where(Expr::col((events::Entity, events::Column::StartAt)).lte(to));
    }
    sub.to_owned()
}

/// Attach active tickets (with events) and the current payment to each order.
async fn assemble_orders(
    db: &DatabaseConnection,
    models: Vec<orders::Model>,
) -> anyhow::Result<Vec<Order>> {
    let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
    let mut tickets_by_order: HashMap<i64, Vec<Ticket>> = HashMap::new();
    if !ids.is_empty() {
        let rows = tickets::Entity::find()
            .filter(tickets::Column::OrderId.is_in(ids.iter().copied()))
            .filter(tickets::Column::Active.eq(true))
            .find_also_related(events::Entity)
            .order_by_asc(tickets::Column::Id)
            .all(db)
            .await
            .context("load order tickets")?;
        for (ticket, event) in rows {
            let ticket = ticket_from_models(ticket, event)?;
            tickets_by_order
                .entry(ticket.order_id)
                .or_default()
                .push(ticket);
        }
    }
    let mut payments = latest_payments(db, &ids).await?;

    Ok(models
        .into_iter()
        .map(|m| Order {
            tickets: tickets_by_order.remove(&m.id).unwrap_or_default(),
            payment: payments.remove(&m.id),
            id: m.id,
            user_id: m.user_id,
            client_id: m.client_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
        .collect())
}

// ── Ticket repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbTicketRepository {
    pub db: DatabaseConnection,
}

impl DbTicketRepository {
    /// Conditional update on an active, unused ticket. `true` when it applied.
    async fn update_unused(
        &self,
        id: i64,
        changes: Vec<(tickets::Column, sea_orm::sea_query::SimpleExpr)>,
        what: &'static str,
    ) -> Result<bool, TicketsServiceError> {
        let mut update = tickets::Entity::update_many()
            .col_expr(tickets::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(tickets::Column::Id.eq(id))
            .filter(tickets::Column::UsedAt.is_null())
            .filter(tickets::Column::Active.eq(true));
        for (column, value) in changes {
            update = update.col_expr(column, value);
        }
        let result = update.exec(&self.db).await.context(what)?;
        Ok(result.rows_affected == 1)
    }
}

impl TicketRepository for DbTicketRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Ticket>, TicketsServiceError> {
        let row = tickets::Entity::find_by_id(id)
            .filter(tickets::Column::Active.eq(true))
            .find_also_related(events::Entity)
            .one(&self.db)
            .await
            .context("find ticket by id")?;
        Ok(row.map(|(t, e)| ticket_from_models(t, e)).transpose()?)
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Ticket>, TicketsServiceError> {
        let row = tickets::Entity::find()
            .filter(tickets::Column::Uuid.eq(uuid))
            .filter(tickets::Column::Active.eq(true))
            .find_also_related(events::Entity)
            .one(&self.db)
            .await
            .context("find ticket by uuid")?;
        Ok(row.map(|(t, e)| ticket_from_models(t, e)).transpose()?)
    }

    async fn list(
        &self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Vec<Ticket>, TicketsServiceError> {
        let mut query = tickets::Entity::find()
            .filter(tickets::Column::Active.eq(true))
            .find_also_related(events::Entity);
        if let Some(from) = filter.event_from {
            query = query.filter(events::Column::StartAt.gte(from));
        }
        if let Some(to) = filter.event_to {
            query = query.filter(events::Column::StartAt.lte(to));
        }
        if let Some(uuid) = filter.uuid {
            query = query.filter(tickets::Column::Uuid.eq(uuid));
        }
        if let Some(order_id) = filter.order_id {
            query = query.filter(tickets::Column::OrderId.eq(order_id));
        }
        match filter.paid {
            Some(true) => {
                query = query.filter(Expr::cust(format!("tickets.order_id IN ({PAID_ORDER_IDS})")));
            }
            Some(false) => {
                query =
                    query.filter(Expr::cust(format!("tickets.order_id NOT IN ({PAID_ORDER_IDS})")));
            }
            None => {}
        }

        let rows = query
            .order_by_asc(tickets::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list tickets")?;
        let tickets = rows
            .into_iter()
            .map(|(t, e)| ticket_from_models(t, e))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(tickets)
    }

    async fn mark_used(
        &self,
        id: i64,
        used_by: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, TicketsServiceError> {
        self.update_unused(
            id,
            vec![
                (tickets::Column::UsedAt, Expr::value(at)),
                (tickets::Column::UsedBy, Expr::value(used_by)),
            ],
            "mark ticket used",
        )
        .await
    }

    async fn deactivate(&self, id: i64) -> Result<bool, TicketsServiceError> {
        self.update_unused(
            id,
            vec![(tickets::Column::Active, Expr::value(false))],
            "deactivate ticket",
        )
        .await
    }

    async fn update_event(&self, id: i64, event_id: i64) -> Result<bool, TicketsServiceError> {
        self.update_unused(
            id,
            vec![(tickets::Column::EventId, Expr::value(event_id))],
            "update ticket event",
        )
        .await
    }
}

fn ticket_from_models(
    model: tickets::Model,
    event: Option<events::Model>,
) -> anyhow::Result<Ticket> {
    let event = event.with_context(|| {
        format!("ticket {} references missing event {}", model.id, model.event_id)
    })?;
    Ok(Ticket {
        id: model.id,
        uuid: model.uuid,
        order_id: model.order_id,
        event: event_from_model(event),
        used_at: model.used_at,
        used_by: model.used_by,
        created_at: model.created_at,
    })
}

// ── User directory ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserDirectory {
    pub db: DatabaseConnection,
}

impl UserDirectory for DbUserDirectory {
    async fn find_contact(&self, user_id: i64) -> Result<Option<Contact>, TicketsServiceError> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("find user contact")?;
        Ok(model.map(|m| Contact {
            user_id: m.id,
            email: m.email,
            first_name: m.first_name,
            last_name: m.last_name,
        }))
    }
}
