use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use oasis_domain::payment::{PaymentMethod, PaymentStatus};

use crate::error::TicketsServiceError;

// ── Events ───────────────────────────────────────────────────────────────────

/// Bookable time slot. Invariant: `end_at > start_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub price: i64,
    pub event_type: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_at
    }

    pub fn has_finished(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_at
    }

    /// An event takes new tickets only while active and not yet over.
    pub fn ensure_bookable(&self, now: DateTime<Utc>) -> Result<(), TicketsServiceError> {
        if !self.active {
            return Err(TicketsServiceError::EventNotFound);
        }
        if self.has_finished(now) {
            return Err(TicketsServiceError::EventExpired);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub price: i64,
    pub event_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub starts_from: Option<DateTime<Utc>>,
    pub starts_to: Option<DateTime<Utc>>,
    pub active: Option<bool>,
}

// ── Tickets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: i64,
    pub uuid: Uuid,
    pub order_id: i64,
    pub event: Event,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }
}

/// One ticket to create; `event_id` has already been validated.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub uuid: Uuid,
    pub event_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub event_from: Option<DateTime<Utc>>,
    pub event_to: Option<DateTime<Utc>>,
    pub uuid: Option<Uuid>,
    pub order_id: Option<i64>,
    /// Filter on the order's current payment being approved.
    pub paid: Option<bool>,
}

// ── Payments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: i64,
    pub external_reference: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: i64,
    pub user_id: i64,
    pub method: PaymentMethod,
    pub amount: i64,
    pub external_reference: String,
    pub status: PaymentStatus,
}

/// Compare-and-set on the payment identified by `external_reference`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub external_reference: String,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
    pub transaction_id: Option<String>,
}

// ── Orders ───────────────────────────────────────────────────────────────────

/// Order aggregate: its active tickets and its current (highest-id) payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub client_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tickets: Vec<Ticket>,
    pub payment: Option<Payment>,
}

impl Order {
    /// Sum of each ticket's event price.
    pub fn price(&self) -> i64 {
        self.tickets.iter().map(|t| t.event.price).sum()
    }

    pub fn is_used(&self) -> bool {
        self.tickets.iter().any(Ticket::is_used)
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status() == Some(PaymentStatus::Approved)
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment.as_ref().map(|p| p.status)
    }

    pub fn external_reference(&self) -> Option<&str> {
        self.payment.as_ref().map(|p| p.external_reference.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub client_id: i64,
    pub tickets: Vec<NewTicket>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub event_from: Option<DateTime<Utc>>,
    pub event_to: Option<DateTime<Utc>>,
    pub user_ids: Vec<i64>,
    pub client_ids: Vec<i64>,
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

// ── Payment gateway ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: i64,
}

/// Checkout intent sent to the gateway. The gateway echoes
/// `external_reference` back in every payment notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceRequest {
    pub order_id: i64,
    pub external_reference: String,
    pub items: Vec<PreferenceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
    pub redirect_url: String,
    pub external_reference: String,
}

/// Gateway's authoritative view of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub status: String,
    pub external_reference: String,
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReceiptEmail {
    pub to_email: String,
    pub to_name: String,
    pub order_id: i64,
    pub payment_method: PaymentMethod,
    pub total: i64,
    pub pdf: Vec<u8>,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

/// Outbox event for async delivery (receipt email).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

pub const RECEIPT_EVENT_KIND: &str = "send_receipt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptPayload {
    pub order_id: i64,
    pub external_reference: String,
}

impl OutboxEvent {
    /// One receipt per payment attempt, keyed by its external reference.
    pub fn receipt(order_id: i64, external_reference: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: RECEIPT_EVENT_KIND.to_owned(),
            payload: serde_json::json!({
                "order_id": order_id,
                "external_reference": external_reference,
            }),
            idempotency_key: format!("receipt:{external_reference}"),
        }
    }
}

/// Outbox row that is due for delivery.
#[derive(Debug, Clone)]
pub struct PendingOutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
}

/// Delivery attempts before an outbox row is parked as failed.
pub const MAX_OUTBOX_ATTEMPTS: i32 = 8;

/// First retry delay; doubles per attempt.
pub const OUTBOX_BASE_BACKOFF_SECS: i64 = 30;

pub const OUTBOX_MAX_BACKOFF_SECS: i64 = 3600;

// ── Summaries ────────────────────────────────────────────────────────────────

/// Approved payment amount and the time it settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRecord {
    pub settled_at: DateTime<Utc>,
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CashierActivity {
    pub sales: Vec<SaleRecord>,
    pub uses: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub current_day: i64,
    pub current_month: i64,
    pub current_year: i64,
    /// Index 0 = January.
    pub monthly_current_year: [i64; 12],
    pub monthly_last_year: [i64; 12],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierSummary {
    pub total_sales: i64,
    pub total_uses: u64,
    pub monthly_sales: Vec<MonthlyTotal>,
    pub monthly_uses: Vec<MonthlyCount>,
}
