pub mod redemption;
pub mod repository;
pub mod status_map;
pub mod types;
