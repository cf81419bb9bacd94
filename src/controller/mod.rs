//! # Controller
//!
//! Core controller modules for the DevOps controllers.
//!
//! - `backoff`: per-key exponential rate limiter for failed reconciliations
//! - `reconciler`: generic finalizer state machine and its per-kind adapters
//! - `server`: HTTP server for metrics, health checks and the kapis web service

pub mod backoff;
pub mod reconciler;
pub mod server;
