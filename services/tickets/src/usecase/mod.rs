pub mod document;
pub mod event;
pub mod order;
pub mod payment;
pub mod receipt;
pub mod reconcile;
pub mod redemption;
pub mod summary;
pub mod ticket;
