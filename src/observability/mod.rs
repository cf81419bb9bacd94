//! # Observability
//!
//! Prometheus metrics. Structured logs go through `tracing` directly.

pub mod metrics;
