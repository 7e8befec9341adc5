use oasis_identity::Identity;

use crate::domain::redemption::ensure_redeemable;
use crate::domain::repository::{Clock, OrderRepository, PaymentRepository, TicketRepository};
use crate::domain::types::Ticket;
use crate::error::TicketsServiceError;

/// Load a ticket and run the gate against the order's live payment.
async fn load_redeemable<T, P, C>(
    tickets: &T,
    payments: &P,
    clock: &C,
    identity: &Identity,
    ticket_id: i64,
) -> Result<Ticket, TicketsServiceError>
where
    T: TicketRepository,
    P: PaymentRepository,
    C: Clock,
{
    if !identity.is_privileged() {
        return Err(TicketsServiceError::Forbidden);
    }
    let ticket = tickets
        .find_by_id(ticket_id)
        .await?
        .ok_or(TicketsServiceError::TicketNotFound)?;
    let payment = payments.latest_for_order(ticket.order_id).await?;
    ensure_redeemable(&ticket, payment.as_ref(), clock.now())?;
    Ok(ticket)
}

// ── UseTicket ────────────────────────────────────────────────────────────────

pub struct UseTicketUseCase<T, P, C>
where
    T: TicketRepository,
    P: PaymentRepository,
    C: Clock,
{
    pub tickets: T,
    pub payments: P,
    pub clock: C,
}

impl<T, P, C> UseTicketUseCase<T, P, C>
where
    T: TicketRepository,
    P: PaymentRepository,
    C: Clock,
{
    pub async fn execute(&self, identity: &Identity, ticket_id: i64) -> Result<(), TicketsServiceError> {
        load_redeemable(&self.tickets, &self.payments, &self.clock, identity, ticket_id).await?;

        // The conditional update is the serialization point: of two concurrent
        // callers that both passed the gate, only one flips the row.
        let now = self.clock.now();
        if !self.tickets.mark_used(ticket_id, identity.user_id, now).await? {
            return Err(TicketsServiceError::AlreadyUsed);
        }
        tracing::info!(ticket_id, used_by = identity.user_id, "ticket redeemed");
        Ok(())
    }
}

// ── DeleteTicket ─────────────────────────────────────────────────────────────

pub struct DeleteTicketUseCase<T, P, C>
where
    T: TicketRepository,
    P: PaymentRepository,
    C: Clock,
{
    pub tickets: T,
    pub payments: P,
    pub clock: C,
}

impl<T, P, C> DeleteTicketUseCase<T, P, C>
where
    T: TicketRepository,
    P: PaymentRepository,
    C: Clock,
{
    /// Cancel a paid, unused ticket while its event window is open.
    pub async fn execute(&self, identity: &Identity, ticket_id: i64) -> Result<(), TicketsServiceError> {
        load_redeemable(&self.tickets, &self.payments, &self.clock, identity, ticket_id).await?;
        if !self.tickets.deactivate(ticket_id).await? {
            return Err(TicketsServiceError::AlreadyUsed);
        }
        tracing::info!(ticket_id, by = identity.user_id, "ticket cancelled");
        Ok(())
    }
}

// ── UseOrder ─────────────────────────────────────────────────────────────────

pub struct UseOrderUseCase<O, T, C>
where
    O: OrderRepository,
    T: TicketRepository,
    C: Clock,
{
    pub orders: O,
    pub tickets: T,
    pub clock: C,
}

impl<O, T, C> UseOrderUseCase<O, T, C>
where
    O: OrderRepository,
    T: TicketRepository,
    C: Clock,
{
    /// Redeem every unused ticket of the order. Each ticket passes the same
    /// gate as `UseTicket` before any of them is marked; returns the ids
    /// that this call redeemed.
    pub async fn execute(
        &self,
        identity: &Identity,
        order_id: i64,
    ) -> Result<Vec<i64>, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or(TicketsServiceError::OrderNotFound)?;

        // Cancelled tickets are not loaded; nothing left means nothing to redeem.
        if order.tickets.is_empty() {
            return Err(TicketsServiceError::TicketNotFound);
        }
        let now = self.clock.now();
        let pending: Vec<&Ticket> = order.tickets.iter().filter(|t| !t.is_used()).collect();
        if pending.is_empty() {
            return Err(TicketsServiceError::AlreadyUsed);
        }
        for ticket in &pending {
            ensure_redeemable(ticket, order.payment.as_ref(), now)?;
        }

        let mut redeemed = Vec::with_capacity(pending.len());
        for ticket in pending {
            if self.tickets.mark_used(ticket.id, identity.user_id, now).await? {
                redeemed.push(ticket.id);
            }
        }
        if redeemed.is_empty() {
            return Err(TicketsServiceError::AlreadyUsed);
        }
        tracing::info!(order_id, tickets = redeemed.len(), used_by = identity.user_id, "order redeemed");
        Ok(redeemed)
    }
}
