pub mod clock;
pub mod db;
pub mod gateway;
pub mod mailer;
pub mod payments;
pub mod pdf;
pub mod storage;
pub mod summary;
