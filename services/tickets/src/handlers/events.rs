use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use oasis_identity::Identity;

use crate::domain::types::{Event, EventFilter};
use crate::error::TicketsServiceError;
use crate::handlers::{day_end, day_start, page, parse_query};
use crate::state::AppState;
use crate::usecase::event::{
    CreateEventsInput, CreateEventsUseCase, GetEventUseCase, ListEventsUseCase, TimeSlot,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: i64,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub start_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub end_at: chrono::DateTime<chrono::Utc>,
    pub price: i64,
    pub event_type: String,
    pub active: bool,
    #[serde(serialize_with = "oasis_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            start_at: event.start_at,
            end_at: event.end_at,
            price: event.price,
            event_type: event.event_type,
            active: event.active,
            created_at: event.created_at,
        }
    }
}

// ── POST /events ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TimeSlotRequest {
    /// `HH:MM` or `HH:MM:SS`, UTC.
    pub start_time: String,
    pub end_time: String,
    pub price: i64,
    pub event_type: String,
}

#[derive(Deserialize)]
pub struct CreateEventsRequest {
    pub dates: Vec<NaiveDate>,
    pub times: Vec<TimeSlotRequest>,
}

fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, TicketsServiceError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| TicketsServiceError::validation(field, format!("not a time: {value:?}")))
}

pub async fn create_events(
    identity: Identity,
    State(state): State<AppState>,
    Json(body): Json<CreateEventsRequest>,
) -> Result<(StatusCode, Json<Vec<EventResponse>>), TicketsServiceError> {
    let slots = body
        .times
        .into_iter()
        .map(|t| {
            Ok(TimeSlot {
                start_time: parse_time("start_time", &t.start_time)?,
                end_time: parse_time("end_time", &t.end_time)?,
                price: t.price,
                event_type: t.event_type,
            })
        })
        .collect::<Result<Vec<_>, TicketsServiceError>>()?;

    let usecase = CreateEventsUseCase {
        repo: state.event_repo(),
    };
    let events = usecase
        .execute(
            &identity,
            CreateEventsInput {
                dates: body.dates,
                slots,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(events.into_iter().map(EventResponse::from).collect()),
    ))
}

// ── GET /events ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct EventListQuery {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub active: Option<bool>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

pub async fn list_events(
    identity: Option<Identity>,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<EventResponse>>, TicketsServiceError> {
    let query: EventListQuery = parse_query(raw_query.as_deref())?;
    let filter = EventFilter {
        starts_from: query.date_from.map(day_start),
        starts_to: query.date_to.map(day_end),
        active: query.active,
    };
    let usecase = ListEventsUseCase {
        repo: state.event_repo(),
    };
    let events = usecase
        .execute(identity.as_ref(), filter, page(query.per_page, query.page))
        .await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}

// ── GET /events/{id} ─────────────────────────────────────────────────────────

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<EventResponse>, TicketsServiceError> {
    let usecase = GetEventUseCase {
        repo: state.event_repo(),
    };
    let event = usecase.execute(id).await?;
    Ok(Json(event.into()))
}
