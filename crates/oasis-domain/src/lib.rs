//! Domain types shared across Oasis crates.
//!
//! Pure types only: no framework or database dependencies, so the identity
//! extractor, the service and its test helpers can all agree on them.

pub mod pagination;
pub mod payment;
pub mod role;
