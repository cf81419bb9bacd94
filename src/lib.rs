//! DevOps Controller Library
//!
//! Controllers that mirror DevOps projects, pipelines and credentials into a
//! Jenkins CI engine, plus the gateway that turns Jenkins build notifications
//! into pipeline events.
//!
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod devops;
pub mod events;
pub mod kapis;
pub mod observability;
pub mod runtime;
