use chrono::{NaiveDate, NaiveTime};

use oasis_domain::pagination::PageRequest;
use oasis_identity::Identity;

use crate::domain::repository::EventRepository;
use crate::domain::types::{Event, EventFilter, NewEvent};
use crate::error::TicketsServiceError;

/// Upper bound on `dates × slots` in one request.
pub const MAX_EVENTS_PER_REQUEST: usize = 500;

// ── CreateEvents ─────────────────────────────────────────────────────────────

/// Daily slot template; times are UTC.
#[derive(Debug, Clone)]
pub struct TimeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub price: i64,
    pub event_type: String,
}

pub struct CreateEventsInput {
    pub dates: Vec<NaiveDate>,
    pub slots: Vec<TimeSlot>,
}

pub struct CreateEventsUseCase<R: EventRepository> {
    pub repo: R,
}

impl<R: EventRepository> CreateEventsUseCase<R> {
    /// One event per `(date, slot)` pair, all inserted together.
    pub async fn execute(
        &self,
        identity: &Identity,
        input: CreateEventsInput,
    ) -> Result<Vec<Event>, TicketsServiceError> {
        if !identity.is_privileged() {
            return Err(TicketsServiceError::Forbidden);
        }
        if input.dates.is_empty() {
            return Err(TicketsServiceError::validation("dates", "must not be empty"));
        }
        if input.slots.is_empty() {
            return Err(TicketsServiceError::validation("times", "must not be empty"));
        }
        if input.dates.len() * input.slots.len() > MAX_EVENTS_PER_REQUEST {
            return Err(TicketsServiceError::validation(
                "dates",
                format!("at most {MAX_EVENTS_PER_REQUEST} events per request"),
            ));
        }
        for slot in &input.slots {
            if slot.end_time <= slot.start_time {
                return Err(TicketsServiceError::validation(
                    "times",
                    "end_time must be after start_time",
                ));
            }
            if slot.price <= 0 {
                return Err(TicketsServiceError::validation("price", "must be positive"));
            }
            if slot.event_type.trim().is_empty() {
                return Err(TicketsServiceError::validation(
                    "event_type",
                    "must not be empty",
                ));
            }
        }

        let events: Vec<NewEvent> = input
            .dates
            .iter()
            .flat_map(|date| {
                input.slots.iter().map(move |slot| NewEvent {
                    start_at: date.and_time(slot.start_time).and_utc(),
                    end_at: date.and_time(slot.end_time).and_utc(),
                    price: slot.price,
                    event_type: slot.event_type.trim().to_owned(),
                })
            })
            .collect();

        let created = self.repo.create_many(&events).await?;
        tracing::info!(count = created.len(), by = identity.user_id, "events created");
        Ok(created)
    }
}

// ── ListEvents ───────────────────────────────────────────────────────────────

pub struct ListEventsUseCase<R: EventRepository> {
    pub repo: R,
}

impl<R: EventRepository> ListEventsUseCase<R> {
    /// Anonymous and non-privileged callers only ever see active events.
    pub async fn execute(
        &self,
        identity: Option<&Identity>,
        mut filter: EventFilter,
        page: PageRequest,
    ) -> Result<Vec<Event>, TicketsServiceError> {
        if !identity.is_some_and(Identity::is_privileged) {
            filter.active = Some(true);
        }
        if let (Some(from), Some(to)) = (filter.starts_from, filter.starts_to) {
            if from > to {
                return Err(TicketsServiceError::validation(
                    "date-from",
                    "must not be after date-to",
                ));
            }
        }
        self.repo.list(&filter, page.clamped()).await
    }
}

// ── GetEvent ─────────────────────────────────────────────────────────────────

pub struct GetEventUseCase<R: EventRepository> {
    pub repo: R,
}

impl<R: EventRepository> GetEventUseCase<R> {
    pub async fn execute(&self, id: i64) -> Result<Event, TicketsServiceError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(TicketsServiceError::EventNotFound)
    }
}
