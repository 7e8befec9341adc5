//! sea-orm entities for the tickets service database.

pub mod events;
pub mod orders;
pub mod outbox_events;
pub mod payments;
pub mod tickets;
pub mod users;
