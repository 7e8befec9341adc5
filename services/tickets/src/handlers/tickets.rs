use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use oasis_domain::payment::PaymentStatus;
use oasis_identity::Identity;

use crate::domain::redemption::{TicketState, ticket_state};
use crate::domain::types::{Payment, Ticket, TicketFilter};
use crate::error::TicketsServiceError;
use crate::handlers::events::EventResponse;
use crate::handlers::{day_end, day_start, page, parse_query};
use crate::state::AppState;
use crate::usecase::redemption::{DeleteTicketUseCase, UseTicketUseCase};
use crate::usecase::ticket::{
    GetTicketUseCase, ListTicketsUseCase, TicketLookup, TicketView, UpdateTicketEventUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub id: i64,
    pub uuid: Uuid,
    pub order_id: i64,
    pub event: EventResponse,
    pub paid: bool,
    pub state: TicketState,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms_opt")]
    pub used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub used_by: Option<i64>,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl TicketResponse {
    /// `payment` is the current payment of the ticket's order.
    pub fn new(ticket: Ticket, payment: Option<&Payment>) -> Self {
        let state = ticket_state(&ticket, payment);
        Self {
            id: ticket.id,
            uuid: ticket.uuid,
            order_id: ticket.order_id,
            paid: payment.is_some_and(|p| p.status == PaymentStatus::Approved),
            state,
            used_at: ticket.used_at,
            used_by: ticket.used_by,
            created_at: ticket.created_at,
            event: ticket.event.into(),
        }
    }
}

impl From<TicketView> for TicketResponse {
    fn from(view: TicketView) -> Self {
        let ticket = view.ticket;
        Self {
            id: ticket.id,
            uuid: ticket.uuid,
            order_id: ticket.order_id,
            paid: view.paid,
            state: view.state,
            used_at: ticket.used_at,
            used_by: ticket.used_by,
            created_at: ticket.created_at,
            event: ticket.event.into(),
        }
    }
}

#[derive(Deserialize)]
pub struct ChangeEventRequest {
    pub event_id: i64,
}

// ── GET /tickets ─────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TicketListQuery {
    pub event_from: Option<NaiveDate>,
    pub event_to: Option<NaiveDate>,
    pub uuid: Option<Uuid>,
    pub order_id: Option<i64>,
    pub paid: Option<bool>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

pub async fn list_tickets(
    identity: Identity,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<TicketResponse>>, TicketsServiceError> {
    let query: TicketListQuery = parse_query(raw_query.as_deref())?;
    let filter = TicketFilter {
        event_from: query.event_from.map(day_start),
        event_to: query.event_to.map(day_end),
        uuid: query.uuid,
        order_id: query.order_id,
        paid: query.paid,
    };
    let usecase = ListTicketsUseCase {
        tickets: state.ticket_repo(),
        payments: state.payment_repo(),
    };
    let tickets = usecase
        .execute(&identity, filter, page(query.per_page, query.page))
        .await?;
    Ok(Json(tickets.into_iter().map(TicketResponse::from).collect()))
}

// ── GET /tickets/{id}, GET /tickets/uuid/{uuid} ──────────────────────────────

pub async fn get_ticket(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TicketResponse>, TicketsServiceError> {
    let usecase = GetTicketUseCase {
        tickets: state.ticket_repo(),
        payments: state.payment_repo(),
    };
    let view = usecase.execute(&identity, TicketLookup::Id(id)).await?;
    Ok(Json(view.into()))
}

pub async fn get_ticket_by_uuid(
    identity: Identity,
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> Result<Json<TicketResponse>, TicketsServiceError> {
    let usecase = GetTicketUseCase {
        tickets: state.ticket_repo(),
        payments: state.payment_repo(),
    };
    let view = usecase.execute(&identity, TicketLookup::Uuid(uuid)).await?;
    Ok(Json(view.into()))
}

// ── PATCH /tickets/{id} ──────────────────────────────────────────────────────

pub async fn update_ticket_event(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ChangeEventRequest>,
) -> Result<Json<TicketResponse>, TicketsServiceError> {
    let usecase = UpdateTicketEventUseCase {
        tickets: state.ticket_repo(),
        events: state.event_repo(),
        clock: state.clock(),
    };
    let ticket = usecase.execute(&identity, id, body.event_id).await?;
    let view = GetTicketUseCase {
        tickets: state.ticket_repo(),
        payments: state.payment_repo(),
    }
    .execute(&identity, TicketLookup::Id(ticket.id))
    .await?;
    Ok(Json(view.into()))
}

// ── POST /tickets/{id}/use ───────────────────────────────────────────────────

pub async fn use_ticket(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, TicketsServiceError> {
    let usecase = UseTicketUseCase {
        tickets: state.ticket_repo(),
        payments: state.payment_repo(),
        clock: state.clock(),
    };
    usecase.execute(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── DELETE /tickets/{id} ─────────────────────────────────────────────────────

pub async fn delete_ticket(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, TicketsServiceError> {
    let usecase = DeleteTicketUseCase {
        tickets: state.ticket_repo(),
        payments: state.payment_repo(),
        clock: state.clock(),
    };
    usecase.execute(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
