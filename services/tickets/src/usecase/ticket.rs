use uuid::Uuid;

use oasis_domain::pagination::PageRequest;
use oasis_domain::payment::PaymentStatus;
use oasis_identity::Identity;

use crate::domain::redemption::{TicketState, ticket_state};
use crate::domain::repository::{Clock, EventRepository, PaymentRepository, TicketRepository};
use crate::domain::types::{Payment, Ticket, TicketFilter};
use crate::error::TicketsServiceError;
use crate::usecase::order::check_range;

/// Ticket with its payment status resolved at read time.
#[derive(Debug, Clone)]
pub struct TicketView {
    pub ticket: Ticket,
    pub paid: bool,
    pub state: TicketState,
}

impl TicketView {
    fn new(ticket: Ticket, payment: Option<&Payment>) -> Self {
        let state = ticket_state(&ticket, payment);
        Self {
            paid: payment.is_some_and(|p| p.status == PaymentStatus::Approved),
            state,
            ticket,
        }
    }
}

fn ensure_privileged(identity: &Identity) -> Result<(), TicketsServiceError> {
    if identity.is_privileged() {
        Ok(())
    } else {
        Err(TicketsServiceError::Forbidden)
    }
}

// ── GetTicket ────────────────────────────────────────────────────────────────

pub enum TicketLookup {
    Id(i64),
    Uuid(Uuid),
}

pub struct GetTicketUseCase<T: TicketRepository, P: PaymentRepository> {
    pub tickets: T,
    pub payments: P,
}

impl<T: TicketRepository, P: PaymentRepository> GetTicketUseCase<T, P> {
    pub async fn execute(
        &self,
        identity: &Identity,
        lookup: TicketLookup,
    ) -> Result<TicketView, TicketsServiceError> {
        ensure_privileged(identity)?;
        let ticket = match lookup {
            TicketLookup::Id(id) => self.tickets.find_by_id(id).await?,
            TicketLookup::Uuid(uuid) => self.tickets.find_by_uuid(uuid).await?,
        }
        .ok_or(TicketsServiceError::TicketNotFound)?;
        let payment = self.payments.latest_for_order(ticket.order_id).await?;
        Ok(TicketView::new(ticket, payment.as_ref()))
    }
}

// ── ListTickets ──────────────────────────────────────────────────────────────

pub struct ListTicketsUseCase<T: TicketRepository, P: PaymentRepository> {
    pub tickets: T,
    pub payments: P,
}

impl<T: TicketRepository, P: PaymentRepository> ListTicketsUseCase<T, P> {
    pub async fn execute(
        &self,
        identity: &Identity,
        filter: TicketFilter,
        page: PageRequest,
    ) -> Result<Vec<TicketView>, TicketsServiceError> {
        ensure_privileged(identity)?;
        check_range("event-from", filter.event_from, filter.event_to)?;

        let tickets = self.tickets.list(&filter, page.clamped()).await?;
        let mut order_ids: Vec<i64> = tickets.iter().map(|t| t.order_id).collect();
        order_ids.sort_unstable();
        order_ids.dedup();
        let payments = self.payments.latest_for_orders(&order_ids).await?;

        Ok(tickets
            .into_iter()
            .map(|t| {
                let payment = payments.get(&t.order_id);
                TicketView::new(t, payment)
            })
            .collect())
    }
}

// ── UpdateTicketEvent ────────────────────────────────────────────────────────

pub struct UpdateTicketEventUseCase<T, E, C>
where
    T: TicketRepository,
    E: EventRepository,
    C: Clock,
{
    pub tickets: T,
    pub events: E,
    pub clock: C,
}

impl<T, E, C> UpdateTicketEventUseCase<T, E, C>
where
    T: TicketRepository,
    E: EventRepository,
    C: Clock,
{
    pub async fn execute(
        &self,
        identity: &Identity,
        ticket_id: i64,
        event_id: i64,
    ) -> Result<Ticket, TicketsServiceError> {
        ensure_privileged(identity)?;
        let ticket = self
            .tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or(TicketsServiceError::TicketNotFound)?;
        if ticket.is_used() {
            return Err(TicketsServiceError::AlreadyUsed);
        }
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(TicketsServiceError::EventNotFound)?
            .ensure_bookable(self.clock.now())?;

        if !self.tickets.update_event(ticket_id, event_id).await? {
            return Err(TicketsServiceError::AlreadyUsed);
        }
        tracing::info!(ticket_id, event_id, by = identity.user_id, "ticket event changed");

        self.tickets
            .find_by_id(ticket_id)
            .await?
            .ok_or(TicketsServiceError::TicketNotFound)
    }
}
