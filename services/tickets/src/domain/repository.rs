#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use oasis_domain::pagination::PageRequest;

use crate::domain::types::{
    CashierActivity, Contact, Event, EventFilter, GatewayPayment, NewEvent, NewOrder, NewPayment,
    Order, OrderFilter, OutboxEvent, Payment, PendingOutboxEvent, Preference, PreferenceRequest,
    ReceiptEmail, SaleRecord, StatusChange, Ticket, TicketFilter,
};
use crate::error::TicketsServiceError;

/// Repository for the event catalog.
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, TicketsServiceError>;

    /// Fetch every event among `ids` (duplicates ignored). Missing ids are simply absent.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, TicketsServiceError>;

    /// Insert all events in one transaction.
    async fn create_many(&self, events: &[NewEvent]) -> Result<Vec<Event>, TicketsServiceError>;

    async fn list(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<Vec<Event>, TicketsServiceError>;
}

/// Repository for orders and their tickets.
pub trait OrderRepository: Send + Sync {
    /// Insert the order and one row per ticket atomically (same transaction).
    async fn create(&self, order: &NewOrder) -> Result<Order, TicketsServiceError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, TicketsServiceError>;

    /// Order whose payment carries this gateway correlation reference.
    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, TicketsServiceError>;

    /// Order whose payment carries this gateway-side payment id.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Order>, TicketsServiceError>;

    /// Newest first.
    async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Vec<Order>, TicketsServiceError>;

    /// Move every active ticket of the order to `event_id`.
    ///
    /// Returns `false` and changes nothing if any ticket of the order is used.
    async fn reassign_event(&self, order_id: i64, event_id: i64)
    -> Result<bool, TicketsServiceError>;
}

/// Repository for individual tickets. Cancelled tickets are invisible to every read.
pub trait TicketRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Ticket>, TicketsServiceError>;

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Ticket>, TicketsServiceError>;

    async fn list(
        &self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Vec<Ticket>, TicketsServiceError>;

    /// Conditional update: succeeds only while the ticket is active and unused.
    /// Returns `false` when another caller redeemed or cancelled it first.
    async fn mark_used(
        &self,
        id: i64,
        used_by: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, TicketsServiceError>;

    /// Soft-delete an active, unused ticket. Returns `false` if it no longer qualifies.
    async fn deactivate(&self, id: i64) -> Result<bool, TicketsServiceError>;

    /// Move an active, unused ticket to another event. Returns `false` if it no longer qualifies.
    async fn update_event(&self, id: i64, event_id: i64) -> Result<bool, TicketsServiceError>;
}

/// Repository for the append-only payment history.
pub trait PaymentRepository: Send + Sync {
    /// Current payment of the order: the one with the highest id.
    async fn latest_for_order(&self, order_id: i64)
    -> Result<Option<Payment>, TicketsServiceError>;

    /// Current payment per order, for orders that have one.
    async fn latest_for_orders(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Payment>, TicketsServiceError>;

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, TicketsServiceError>;

    /// Insert a new attempt while holding the order's row lock.
    ///
    /// Fails with `AlreadyPaid` / `PaymentProcessing` when the current payment
    /// blocks new attempts. `outbox` is written in the same transaction.
    async fn insert(
        &self,
        payment: &NewPayment,
        outbox: Option<&OutboxEvent>,
    ) -> Result<Payment, TicketsServiceError>;

    /// Apply `change` only if the payment is still in `change.from`.
    ///
    /// Returns `false` when nothing matched (already applied or raced).
    /// `outbox` is written only when the update applied.
    async fn update_status(
        &self,
        change: &StatusChange,
        outbox: Option<&OutboxEvent>,
    ) -> Result<bool, TicketsServiceError>;
}

/// Repository for aggregated reporting reads.
pub trait SummaryRepository: Send + Sync {
    /// Approved payments that settled at or after `since`.
    async fn approved_sales_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>, TicketsServiceError>;

    /// Approved cashier sales and ticket redemptions in `[from, to)`,
    /// restricted to one operator when `cashier_id` is set.
    async fn cashier_activity(
        &self,
        cashier_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CashierActivity, TicketsServiceError>;
}

/// Repository for outbox delivery bookkeeping.
pub trait OutboxRepository: Send + Sync {
    async fn fetch_due(
        &self,
        kind: &str,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<PendingOutboxEvent>, TicketsServiceError>;

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>)
    -> Result<(), TicketsServiceError>;

    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), TicketsServiceError>;

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TicketsServiceError>;
}

/// Port for user contact details owned by the auth service.
pub trait UserDirectory: Send + Sync {
    async fn find_contact(&self, user_id: i64) -> Result<Option<Contact>, TicketsServiceError>;
}

/// Port for the online payment processor.
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, TicketsServiceError>;

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, TicketsServiceError>;
}

/// Renders an order's tickets into a PDF bundle.
pub trait TicketRenderer: Send + Sync {
    fn render(&self, order: &Order, client: &Contact) -> Result<Vec<u8>, TicketsServiceError>;
}

/// Object storage for generated documents.
pub trait FileStorage: Send + Sync {
    /// Store `bytes` under `key` and return a URL for it.
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, TicketsServiceError>;
}

pub trait Mailer: Send + Sync {
    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), TicketsServiceError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
