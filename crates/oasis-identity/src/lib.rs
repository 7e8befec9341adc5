//! Caller identity shared across Oasis services.
//!
//! Authentication happens upstream; services only read the typed `Identity`
//! the gateway injects into each request.

pub mod identity;

pub use identity::{Identity, ROLES_HEADER, USER_ID_HEADER};
