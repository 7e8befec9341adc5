//! Cross-cutting service plumbing: health probes, request ids, tracing setup
//! and shared serializers.

pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
