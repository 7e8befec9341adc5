use std::collections::HashMap;

use uuid::Uuid;

use oasis_domain::pagination::PageRequest;
use oasis_identity::Identity;

use crate::domain::repository::{Clock, EventRepository, OrderRepository, UserDirectory};
use crate::domain::types::{Event, NewOrder, NewTicket, Order, OrderFilter};
use crate::error::TicketsServiceError;

/// Upper bound on tickets bought in one order.
pub const MAX_TICKETS_PER_ORDER: usize = 100;

/// Resolve an order the caller may read: privileged callers see every order,
/// everyone else only the orders they are the client of.
pub(crate) fn ensure_can_access(identity: &Identity, order: &Order) -> Result<(), TicketsServiceError> {
    if identity.is_privileged() || order.client_id == identity.user_id {
        Ok(())
    } else {
        Err(TicketsServiceError::Forbidden)
    }
}

// ── CreateOrder ──────────────────────────────────────────────────────────────

pub struct CreateOrderInput {
    /// Beneficiary. Only honoured for privileged callers.
    pub client_id: Option<i64>,
    /// One entry per ticket; repeat an id to buy several tickets for it.
    pub event_ids: Vec<i64>,
}

pub struct CreateOrderUseCase<O, E, U, C>
where
    O: OrderRepository,
    E: EventRepository,
    U: UserDirectory,
    C: Clock,
{
    pub orders: O,
    pub events: E,
    pub users: U,
    pub clock: C,
}

impl<O, E, U, C> CreateOrderUseCase<O, E, U, C>
where
    O: OrderRepository,
    E: EventRepository,
    U: UserDirectory,
    C: Clock,
{
    pub async fn execute(
        &self,
        identity: &Identity,
        input: CreateOrderInput,
    ) -> Result<Order, TicketsServiceError> {
        if input.event_ids.is_empty() {
            return Err(TicketsServiceError::validation("event_ids", "must not be empty"));
        }
        if input.event_ids.len() > MAX_TICKETS_PER_ORDER {
            return Err(TicketsServiceError::validation(
                "event_ids",
                format!("at most {MAX_TICKETS_PER_ORDER} tickets per order"),
            ));
        }

        // Non-privileged callers always buy for themselves.
        let client_id = if identity.is_privileged() {
            input.client_id.unwrap_or(identity.user_id)
        } else {
            identity.user_id
        };
        if self.users.find_contact(client_id).await?.is_none() {
            return Err(TicketsServiceError::validation("client_id", "unknown user"));
        }

        // Fail fast on the first requested event that cannot be booked.
        let now = self.clock.now();
        let found: HashMap<i64, Event> = self
            .events
            .find_by_ids(&input.event_ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        for id in &input.event_ids {
            found
                .get(id)
                .ok_or(TicketsServiceError::EventNotFound)?
                .ensure_bookable(now)?;
        }

        let new_order = NewOrder {
            user_id: identity.user_id,
            client_id,
            tickets: input
                .event_ids
                .iter()
                .map(|&event_id| NewTicket {
                    uuid: Uuid::now_v7(),
                    event_id,
                })
                .collect(),
        };
        let order = self.orders.create(&new_order).await?;
        tracing::info!(
            order_id = order.id,
            client_id,
            tickets = order.tickets.len(),
            price = order.price(),
            "order created"
        );
        Ok(order)
    }
}

// ── GetOrder ─────────────────────────────────────────────────────────────────

pub struct GetOrderUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> GetOrderUseCase<O> {
    pub async fn execute(&self, identity: &Identity, id: i64) -> Result<Order, TicketsServiceError> {
        let order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;
        ensure_can_access(identity, &order)?;
        Ok(order)
    }
}

// ── GetOrderBy{ExternalReference,TransactionId} ──────────────────────────────

pub enum OrderLookup {
    ExternalReference(String),
    TransactionId(String),
}

pub struct FindOrderUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> FindOrderUseCase<O> {
    pub async fn execute(
        &self,
        identity: &Identity,
        lookup: OrderLookup,
    ) -> Result<Order, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        let order = match lookup {
            OrderLookup::ExternalReference(reference) => {
                self.orders.find_by_external_reference(&reference).await?
            }
            OrderLookup::TransactionId(transaction_id) => {
                self.orders.find_by_transaction_id(&transaction_id).await?
            }
        };
        order.ok_or(TicketsServiceError::OrderNotFound)
    }
}

// ── ListOrders ───────────────────────────────────────────────────────────────

pub struct ListOrdersUseCase<O: OrderRepository> {
    pub orders: O,
}

impl<O: OrderRepository> ListOrdersUseCase<O> {
    pub async fn execute(
        &self,
        identity: &Identity,
        mut filter: OrderFilter,
        page: PageRequest,
    ) -> Result<Vec<Order>, TicketsServiceError> {
        if !identity.is_privileged() {
            filter.client_ids = vec![identity.user_id];
        }
        check_range("created-from", filter.created_from, filter.created_to)?;
        check_range("event-from", filter.event_from, filter.event_to)?;
        self.orders.list(&filter, page.clamped()).await
    }
}

pub(crate) fn check_range<T: PartialOrd>(
    field: &'static str,
    from: Option<T>,
    to: Option<T>,
) -> Result<(), TicketsServiceError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(TicketsServiceError::validation(
            field,
            "range start must not be after its end",
        )),
        _ => Ok(()),
    }
}

// ── UpdateOrder ──────────────────────────────────────────────────────────────

pub struct UpdateOrderUseCase<O, E, C>
where
    O: OrderRepository,
    E: EventRepository,
    C: Clock,
{
    pub orders: O,
    pub events: E,
    pub clock: C,
}

impl<O, E, C> UpdateOrderUseCase<O, E, C>
where
    O: OrderRepository,
    E: EventRepository,
    C: Clock,
{
    /// Move every ticket of a not-yet-redeemed order to `event_id`.
    pub async fn execute(
        &self,
        identity: &Identity,
        order_id: i64,
        event_id: i64,
    ) -> Result<Order, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;
        if order.is_used() {
            return Err(TicketsServiceError::OrderUsed);
        }
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(TicketsServiceError::EventNotFound)?
            .ensure_bookable(self.clock.now())?;

        // A ticket redeemed since the read above makes the repository refuse.
        if !self.orders.reassign_event(order_id, event_id).await? {
            return Err(TicketsServiceError::OrderUsed);
        }
        tracing::info!(order_id, event_id, by = identity.user_id, "order event reassigned");

        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)
    }
}
