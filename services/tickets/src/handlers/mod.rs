pub mod events;
pub mod health;
pub mod orders;
pub mod payments;
pub mod summaries;
pub mod tickets;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;

use oasis_domain::pagination::PageRequest;

use crate::error::TicketsServiceError;

/// Parse a raw query string with `serde_qs`, so repeated `ids[]=..` keys
/// collect into vectors. An absent query parses like an empty one.
pub(crate) fn parse_query<T: DeserializeOwned>(
    raw_query: Option<&str>,
) -> Result<T, TicketsServiceError> {
    serde_qs::from_str(raw_query.unwrap_or_default())
        .map_err(|e| TicketsServiceError::validation("query", e.to_string()))
}

pub(crate) fn page(per_page: Option<u32>, page: Option<u32>) -> PageRequest {
    let default = PageRequest::default();
    PageRequest {
        per_page: per_page.unwrap_or(default.per_page),
        page: page.unwrap_or(default.page),
    }
}

/// First instant of `date` (UTC).
pub(crate) fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of `date` (UTC), for inclusive range filters.
pub(crate) fn day_end(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last).and_utc()
}
