use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use oasis_domain::pagination::PageRequest;
use oasis_domain::payment::{PaymentMethod, PaymentStatus};
use oasis_domain::role::Role;
use oasis_identity::Identity;
use oasis_tickets::domain::repository::{
    Clock, EventRepository, FileStorage, Mailer, OrderRepository, OutboxRepository,
    PaymentGateway, PaymentRepository, SummaryRepository, TicketRenderer, TicketRepository,
    UserDirectory,
};
use oasis_tickets::domain::types::{
    CashierActivity, Contact, Event, EventFilter, GatewayPayment, NewEvent, NewOrder, NewPayment,
    Order, OrderFilter, OutboxEvent, Payment, PendingOutboxEvent, Preference, PreferenceRequest,
    ReceiptEmail, SaleRecord, StatusChange, Ticket, TicketFilter,
};
use oasis_tickets::error::TicketsServiceError;

// ── Rows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: i64,
    pub user_id: i64,
    pub client_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TicketRow {
    pub id: i64,
    pub uuid: Uuid,
    pub order_id: i64,
    pub event_id: i64,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OutboxRow {
    pub event: OutboxEvent,
    pub attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct Data {
    pub users: Vec<Contact>,
    pub events: Vec<Event>,
    pub orders: Vec<OrderRow>,
    pub tickets: Vec<TicketRow>,
    pub payments: Vec<Payment>,
    pub outbox: Vec<OutboxRow>,
}

impl Data {
    fn next_id<T>(rows: &[T], id: impl Fn(&T) -> i64) -> i64 {
        rows.iter().map(id).max().unwrap_or(0) + 1
    }

    fn event(&self, id: i64) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    fn ticket(&self, row: &TicketRow) -> Ticket {
        Ticket {
            id: row.id,
            uuid: row.uuid,
            order_id: row.order_id,
            event: self.event(row.event_id).cloned().expect("ticket event exists"),
            used_at: row.used_at,
            used_by: row.used_by,
            created_at: row.created_at,
        }
    }

    fn latest_payment(&self, order_id: i64) -> Option<&Payment> {
        self.payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .max_by_key(|p| p.id)
    }

    fn order(&self, row: &OrderRow) -> Order {
        Order {
            id: row.id,
            user_id: row.user_id,
            client_id: row.client_id,
            created_at: row.created_at,
            updated_at: row.created_at,
            tickets: self
                .tickets
                .iter()
                .filter(|t| t.order_id == row.id && t.active)
                .map(|t| self.ticket(t))
                .collect(),
            payment: self.latest_payment(row.id).cloned(),
        }
    }

    fn push_outbox(&mut self, event: &OutboxEvent, now: DateTime<Utc>) {
        // ON CONFLICT (idempotency_key) DO NOTHING
        if self
            .outbox
            .iter()
            .any(|r| r.event.idempotency_key == event.idempotency_key)
        {
            return;
        }
        self.outbox.push(OutboxRow {
            event: event.clone(),
            attempts: 0,
            next_attempt_at: now,
            processed_at: None,
            failed_at: None,
            last_error: None,
        });
    }
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

fn in_range(at: DateTime<Utc>, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> bool {
    from.is_none_or(|f| at >= f) && to.is_none_or(|t| at <= t)
}

// ── MockStore ────────────────────────────────────────────────────────────────

/// In-memory stand-in for every table. Clones share the same data, so one
/// store can back several repository ports of a usecase.
#[derive(Clone)]
pub struct MockStore {
    pub data: Arc<Mutex<Data>>,
    pub now: DateTime<Utc>,
}

impl MockStore {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            data: Arc::new(Mutex::new(Data::default())),
            now,
        }
    }

    pub fn add_user(&self, id: i64, email: &str, first_name: &str, last_name: &str) {
        self.data.lock().unwrap().users.push(Contact {
            user_id: id,
            email: email.to_owned(),
            first_name: first_name.to_owned(),
            last_name: last_name.to_owned(),
        });
    }

    pub fn add_event(&self, id: i64, start_at: DateTime<Utc>, hours: i64, price: i64) -> Event {
        let event = Event {
            id,
            start_at,
            end_at: start_at + Duration::hours(hours),
            price,
            event_type: "day-pass".to_owned(),
            active: true,
            created_at: start_at - Duration::days(30),
        };
        self.data.lock().unwrap().events.push(event.clone());
        event
    }

    /// Insert a payment row directly, bypassing the single-active guard.
    pub fn add_payment(
        &self,
        order_id: i64,
        method: PaymentMethod,
        status: PaymentStatus,
        reference: &str,
    ) -> Payment {
        let mut data = self.data.lock().unwrap();
        let amount = data
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .map(|o| data.order(o).price())
            .unwrap_or_default();
        let payment = Payment {
            id: Data::next_id(&data.payments, |p| p.id),
            order_id,
            user_id: 1,
            method,
            amount,
            external_reference: reference.to_owned(),
            transaction_id: None,
            status,
            created_at: self.now,
            updated_at: self.now,
        };
        data.payments.push(payment.clone());
        payment
    }

    pub fn payments_of(&self, order_id: i64) -> Vec<Payment> {
        let data = self.data.lock().unwrap();
        data.payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn outbox(&self) -> Vec<OutboxRow> {
        self.data.lock().unwrap().outbox.clone()
    }

    pub fn ticket_row(&self, id: i64) -> TicketRow {
        let data = self.data.lock().unwrap();
        data.tickets
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .expect("ticket row exists")
    }

    pub fn order_count(&self) -> usize {
        self.data.lock().unwrap().orders.len()
    }

    pub fn ticket_count(&self) -> usize {
        self.data.lock().unwrap().tickets.len()
    }
}

impl EventRepository for MockStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, TicketsServiceError> {
        Ok(self.data.lock().unwrap().event(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Event>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .events
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn create_many(&self, events: &[NewEvent]) -> Result<Vec<Event>, TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        let mut created = Vec::with_capacity(events.len());
        for new in events {
            let event = Event {
                id: Data::next_id(&data.events, |e| e.id),
                start_at: new.start_at,
                end_at: new.end_at,
                price: new.price,
                event_type: new.event_type.clone(),
                active: true,
                created_at: self.now,
            };
            data.events.push(event.clone());
            created.push(event);
        }
        Ok(created)
    }

    async fn list(
        &self,
        filter: &EventFilter,
        page: PageRequest,
    ) -> Result<Vec<Event>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        let mut events: Vec<Event> = data
            .events
            .iter()
            .filter(|e| in_range(e.start_at, filter.starts_from, filter.starts_to))
            .filter(|e| filter.active.is_none_or(|a| e.active == a))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.start_at, e.id));
        Ok(paginate(events, page))
    }
}

impl OrderRepository for MockStore {
    async fn create(&self, order: &NewOrder) -> Result<Order, TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        let row = OrderRow {
            id: Data::next_id(&data.orders, |o| o.id),
            user_id: order.user_id,
            client_id: order.client_id,
            created_at: self.now,
        };
        data.orders.push(row.clone());
        for ticket in &order.tickets {
            let id = Data::next_id(&data.tickets, |t| t.id);
            data.tickets.push(TicketRow {
                id,
                uuid: ticket.uuid,
                order_id: row.id,
                event_id: ticket.event_id,
                used_at: None,
                used_by: None,
                active: true,
                created_at: self.now,
            });
        }
        Ok(data.order(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Order>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data.orders.iter().find(|o| o.id == id).map(|o| data.order(o)))
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        let Some(payment) = data
            .payments
            .iter()
            .find(|p| p.external_reference == reference)
        else {
            return Ok(None);
        };
        Ok(data
            .orders
            .iter()
            .find(|o| o.id == payment.order_id)
            .map(|o| data.order(o)))
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Order>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        let Some(payment) = data
            .payments
            .iter()
            .filter(|p| p.transaction_id.as_deref() == Some(transaction_id))
            .max_by_key(|p| p.id)
        else {
            return Ok(None);
        };
        Ok(data
            .orders
            .iter()
            .find(|o| o.id == payment.order_id)
            .map(|o| data.order(o)))
    }

    async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Vec<Order>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        let mut orders: Vec<Order> = data
            .orders
            .iter()
            .filter(|o| in_range(o.created_at, filter.created_from, filter.created_to))
            .filter(|o| filter.user_ids.is_empty() || filter.user_ids.contains(&o.user_id))
            .filter(|o| filter.client_ids.is_empty() || filter.client_ids.contains(&o.client_id))
            .map(|o| data.order(o))
            .filter(|o| {
                (filter.event_from.is_none() && filter.event_to.is_none())
                    || o.tickets
                        .iter()
                        .any(|t| in_range(t.event.start_at, filter.event_from, filter.event_to))
            })
            .collect();
        orders.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(paginate(orders, page))
    }

    async fn reassign_event(
        &self,
        order_id: i64,
        event_id: i64,
    ) -> Result<bool, TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        let mut rows = data
            .tickets
            .iter_mut()
            .filter(|t| t.order_id == order_id && t.active)
            .peekable();
        if rows.peek().is_none() {
            return Ok(true);
        }
        let rows: Vec<&mut TicketRow> = rows.collect();
        if rows.iter().any(|t| t.used_at.is_some()) {
            return Ok(false);
        }
        for row in rows {
            row.event_id = event_id;
        }
        Ok(true)
    }
}

impl MockStore {
    /// Conditional update on an active, unused ticket.
    fn update_unused(&self, id: i64, apply: impl FnOnce(&mut TicketRow)) -> bool {
        let mut data = self.data.lock().unwrap();
        match data
            .tickets
            .iter_mut()
            .find(|t| t.id == id && t.active && t.used_at.is_none())
        {
            Some(row) => {
                apply(row);
                true
            }
            None => false,
        }
    }
}

impl TicketRepository for MockStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Ticket>, TicketsServiceError> {
        // Let a concurrent caller interleave between read and write.
        tokio::task::yield_now().await;
        let data = self.data.lock().unwrap();
        Ok(data
            .tickets
            .iter()
            .find(|t| t.id == id && t.active)
            .map(|t| data.ticket(t)))
    }

    async fn find_by_uuid(&self, uuid: Uuid) -> Result<Option<Ticket>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .tickets
            .iter()
            .find(|t| t.uuid == uuid && t.active)
            .map(|t| data.ticket(t)))
    }

    async fn list(
        &self,
        filter: &TicketFilter,
        page: PageRequest,
    ) -> Result<Vec<Ticket>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        let tickets: Vec<Ticket> = data
            .tickets
            .iter()
            .filter(|t| t.active)
            .filter(|t| filter.uuid.is_none_or(|u| t.uuid == u))
            .filter(|t| filter.order_id.is_none_or(|o| t.order_id == o))
            .filter(|t| {
                filter.paid.is_none_or(|paid| {
                    let approved = data
                        .latest_payment(t.order_id)
                        .is_some_and(|p| p.status == PaymentStatus::Approved);
                    approved == paid
                })
            })
            .map(|t| data.ticket(t))
            .filter(|t| in_range(t.event.start_at, filter.event_from, filter.event_to))
            .collect();
        Ok(paginate(tickets, page))
    }

    async fn mark_used(
        &self,
        id: i64,
        used_by: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, TicketsServiceError> {
        Ok(self.update_unused(id, |t| {
            t.used_at = Some(at);
            t.used_by = Some(used_by);
        }))
    }

    async fn deactivate(&self, id: i64) -> Result<bool, TicketsServiceError> {
        Ok(self.update_unused(id, |t| t.active = false))
    }

    async fn update_event(&self, id: i64, event_id: i64) -> Result<bool, TicketsServiceError> {
        Ok(self.update_unused(id, |t| t.event_id = event_id))
    }
}

impl PaymentRepository for MockStore {
    async fn latest_for_order(
        &self,
        order_id: i64,
    ) -> Result<Option<Payment>, TicketsServiceError> {
        Ok(self.data.lock().unwrap().latest_payment(order_id).cloned())
    }

    async fn latest_for_orders(
        &self,
        order_ids: &[i64],
    ) -> Result<HashMap<i64, Payment>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(order_ids
            .iter()
            .filter_map(|id| data.latest_payment(*id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn find_by_external_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .payments
            .iter()
            .find(|p| p.external_reference == reference)
            .cloned())
    }

    async fn insert(
        &self,
        payment: &NewPayment,
        outbox: Option<&OutboxEvent>,
    ) -> Result<Payment, TicketsServiceError> {
        // Holding the mutex plays the part of the order row lock.
        let mut data = self.data.lock().unwrap();
        if !data.orders.iter().any(|o| o.id == payment.order_id) {
            return Err(TicketsServiceError::OrderNotFound);
        }
        if let Some(current) = data.latest_payment(payment.order_id) {
            if current.status.blocks_new_attempt() {
                return Err(TicketsServiceError::payment_blocked(current.status));
            }
        }
        let row = Payment {
            id: Data::next_id(&data.payments, |p| p.id),
            order_id: payment.order_id,
            user_id: payment.user_id,
            method: payment.method,
            amount: payment.amount,
            external_reference: payment.external_reference.clone(),
            transaction_id: None,
            status: payment.status,
            created_at: self.now,
            updated_at: self.now,
        };
        data.payments.push(row.clone());
        if let Some(event) = outbox {
            data.push_outbox(event, self.now);
        }
        Ok(row)
    }

    async fn update_status(
        &self,
        change: &StatusChange,
        outbox: Option<&OutboxEvent>,
    ) -> Result<bool, TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        let Some(index) = data.payments.iter().position(|p| {
            p.external_reference == change.external_reference && p.status == change.from
        }) else {
            return Ok(false);
        };
        let (id, order_id) = (data.payments[index].id, data.payments[index].order_id);
        if data.payments.iter().any(|p| p.order_id == order_id && p.id > id) {
            return Ok(false);
        }
        // Partial unique index: one approved-or-processing payment per order.
        if change.to.blocks_new_attempt()
            && data
                .payments
                .iter()
                .enumerate()
                .any(|(i, p)| i != index && p.order_id == order_id && p.status.blocks_new_attempt())
        {
            return Err(TicketsServiceError::AlreadyPaid);
        }
        let now = self.now;
        let payment = &mut data.payments[index];
        payment.status = change.to;
        payment.updated_at = now;
        if change.transaction_id.is_some() {
            payment.transaction_id = change.transaction_id.clone();
        }
        if let Some(event) = outbox {
            data.push_outbox(event, now);
        }
        Ok(true)
    }
}

impl OutboxRepository for MockStore {
    async fn fetch_due(
        &self,
        kind: &str,
        now: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<PendingOutboxEvent>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .outbox
            .iter()
            .filter(|r| r.event.kind == kind)
            .filter(|r| r.processed_at.is_none() && r.failed_at.is_none())
            .filter(|r| r.next_attempt_at <= now)
            .take(limit as usize)
            .map(|r| PendingOutboxEvent {
                id: r.event.id,
                kind: r.event.kind.clone(),
                payload: r.event.payload.clone(),
                attempts: r.attempts,
            })
            .collect())
    }

    async fn mark_processed(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        if let Some(row) = data.outbox.iter_mut().find(|r| r.event.id == id) {
            row.processed_at = Some(at);
        }
        Ok(())
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        next_attempt_at: DateTime<Utc>,
    ) -> Result<(), TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        if let Some(row) = data.outbox.iter_mut().find(|r| r.event.id == id) {
            row.attempts = attempts;
            row.last_error = Some(error.to_owned());
            row.next_attempt_at = next_attempt_at;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: Uuid,
        attempts: i32,
        error: &str,
        at: DateTime<Utc>,
    ) -> Result<(), TicketsServiceError> {
        let mut data = self.data.lock().unwrap();
        if let Some(row) = data.outbox.iter_mut().find(|r| r.event.id == id) {
            row.attempts = attempts;
            row.last_error = Some(error.to_owned());
            row.failed_at = Some(at);
        }
        Ok(())
    }
}

impl SummaryRepository for MockStore {
    async fn approved_sales_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SaleRecord>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Approved && p.updated_at >= since)
            .map(|p| SaleRecord {
                settled_at: p.updated_at,
                amount: p.amount,
            })
            .collect())
    }

    async fn cashier_activity(
        &self,
        cashier_id: Option<i64>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<CashierActivity, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        let sales = data
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Approved && p.method == PaymentMethod::Cashier)
            .filter(|p| p.created_at >= from && p.created_at < to)
            .filter(|p| cashier_id.is_none_or(|id| p.user_id == id))
            .map(|p| SaleRecord {
                settled_at: p.created_at,
                amount: p.amount,
            })
            .collect();
        let uses = data
            .tickets
            .iter()
            .filter(|t| match cashier_id {
                Some(id) => t.used_by == Some(id),
                None => t.used_by.is_some(),
            })
            .filter_map(|t| t.used_at)
            .filter(|at| *at >= from && *at < to)
            .collect();
        Ok(CashierActivity { sales, uses })
    }
}

impl UserDirectory for MockStore {
    async fn find_contact(&self, user_id: i64) -> Result<Option<Contact>, TicketsServiceError> {
        let data = self.data.lock().unwrap();
        Ok(data.users.iter().find(|u| u.user_id == user_id).cloned())
    }
}

// ── Clock ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ── MockGateway ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockGateway {
    pub preferences: Arc<Mutex<Vec<PreferenceRequest>>>,
    /// Gateway payment id → what the gateway reports for it.
    pub payments: Arc<Mutex<HashMap<String, GatewayPayment>>>,
    pub fail_preferences: bool,
}

impl MockGateway {
    pub fn set_payment(&self, id: &str, status: &str, external_reference: &str) {
        self.payments.lock().unwrap().insert(
            id.to_owned(),
            GatewayPayment {
                status: status.to_owned(),
                external_reference: external_reference.to_owned(),
            },
        );
    }

    pub fn preference_count(&self) -> usize {
        self.preferences.lock().unwrap().len()
    }
}

impl PaymentGateway for MockGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, TicketsServiceError> {
        if self.fail_preferences {
            return Err(TicketsServiceError::upstream(anyhow::anyhow!("gateway down")));
        }
        self.preferences.lock().unwrap().push(request.clone());
        Ok(Preference {
            redirect_url: format!("https://gateway.test/checkout/{}", request.external_reference),
            external_reference: request.external_reference.clone(),
        })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment, TicketsServiceError> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| {
                TicketsServiceError::upstream(anyhow::anyhow!("unknown payment {payment_id}"))
            })
    }
}

// ── MockStorage ──────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockStorage {
    /// `(key, content type, size)` of every stored object.
    pub objects: Arc<Mutex<Vec<(String, String, usize)>>>,
    pub fail: bool,
}

impl MockStorage {
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _, _)| k.clone())
            .collect()
    }
}

impl FileStorage for MockStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, TicketsServiceError> {
        if self.fail {
            return Err(TicketsServiceError::upstream(anyhow::anyhow!("s3 timeout")));
        }
        self.objects
            .lock()
            .unwrap()
            .push((key.to_owned(), content_type.to_owned(), bytes.len()));
        Ok(format!("https://files.test/{key}"))
    }
}

// ── MockMailer ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<ReceiptEmail>>>,
    pub fail: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<ReceiptEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for MockMailer {
    async fn send_receipt(&self, email: &ReceiptEmail) -> Result<(), TicketsServiceError> {
        if self.fail {
            return Err(TicketsServiceError::upstream(anyhow::anyhow!("smtp 421")));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ── MockRenderer ─────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Default)]
pub struct MockRenderer;

impl TicketRenderer for MockRenderer {
    fn render(&self, order: &Order, _client: &Contact) -> Result<Vec<u8>, TicketsServiceError> {
        Ok(format!("%PDF order {} tickets {}", order.id, order.tickets.len()).into_bytes())
    }
}

// ── Test fixture helpers ─────────────────────────────────────────────────────

pub const ADMIN_ID: i64 = 1;
pub const CASHIER_ID: i64 = 2;
pub const CLIENT_ID: i64 = 42;
pub const OTHER_CLIENT_ID: i64 = 43;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
}

pub fn admin() -> Identity {
    Identity::new(ADMIN_ID, [Role::Admin])
}

pub fn cashier() -> Identity {
    Identity::new(CASHIER_ID, [Role::Cashier])
}

pub fn client() -> Identity {
    Identity::new(CLIENT_ID, [Role::Client])
}

pub fn other_client() -> Identity {
    Identity::new(OTHER_CLIENT_ID, [Role::Client])
}

/// Store with the standard users and event 7: started an hour ago, open for
/// eight hours, priced 1000.
pub fn seeded_store() -> MockStore {
    let store = MockStore::new(now());
    store.add_user(ADMIN_ID, "admin@oasis.test", "Ada", "Admin");
    store.add_user(CASHIER_ID, "cashier@oasis.test", "Cai", "Cashier");
    store.add_user(CLIENT_ID, "client@oasis.test", "Ana", "Rojas");
    store.add_user(OTHER_CLIENT_ID, "other@oasis.test", "Olga", "Otra");
    store.add_event(7, now() - Duration::hours(1), 8, 1000);
    store
}

/// Create an order through the repository, bypassing the usecase checks.
pub async fn place_order(store: &MockStore, client_id: i64, event_ids: &[i64]) -> Order {
    OrderRepository::create(
        store,
        &NewOrder {
            user_id: client_id,
            client_id,
            tickets: event_ids
                .iter()
                .map(|&event_id| oasis_tickets::domain::types::NewTicket {
                    uuid: Uuid::now_v7(),
                    event_id,
                })
                .collect(),
        },
    )
    .await
    .unwrap()
}
