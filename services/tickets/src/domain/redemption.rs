//! Ticket redemption gate.
//!
//! ```text
//! Unpaid → Paid → Used
//!            └──→ Cancelled
//! ```
//!
//! `Paid` is never stored: it is derived from the order's current payment at
//! the moment of the check, so a reversed payment makes the ticket unredeemable.

use chrono::{DateTime, Utc};
use serde::Serialize;

use oasis_domain::payment::PaymentStatus;

use crate::domain::types::{Payment, Ticket};
use crate::error::TicketsServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    Unpaid,
    Paid,
    Used,
}

/// State of an active ticket given its order's current payment.
pub fn ticket_state(ticket: &Ticket, payment: Option<&Payment>) -> TicketState {
    if ticket.is_used() {
        TicketState::Used
    } else if is_approved(payment) {
        TicketState::Paid
    } else {
        TicketState::Unpaid
    }
}

/// Preconditions shared by redemption and cancellation, first failure wins:
/// not used, paid, event window open (`start <= now < end`).
///
/// Existence is checked by the caller before loading the ticket.
pub fn ensure_redeemable(
    ticket: &Ticket,
    payment: Option<&Payment>,
    now: DateTime<Utc>,
) -> Result<(), TicketsServiceError> {
    if ticket.is_used() {
        return Err(TicketsServiceError::AlreadyUsed);
    }
    if !is_approved(payment) {
        return Err(TicketsServiceError::NotPaid);
    }
    if !ticket.event.has_started(now) {
        return Err(TicketsServiceError::EventNotStarted);
    }
    if ticket.event.has_finished(now) {
        return Err(TicketsServiceError::EventFinished);
    }
    Ok(())
}

fn is_approved(payment: Option<&Payment>) -> bool {
    payment.is_some_and(|p| p.status == PaymentStatus::Approved)
}
