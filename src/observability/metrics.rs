//! # Metrics
//!
//! Prometheus metrics for monitoring the controllers and the event webhook.
//!
//! ## Metrics Exposed
//!
//! - `devops_reconciliations_total{kind}` - Total number of reconciliations
//! - `devops_reconciliation_errors_total{kind}` - Total number of failed reconciliations
//! - `devops_reconciliation_duration_seconds{kind}` - Duration of reconciliations
//! - `devops_remote_operations_total{kind,operation}` - Calls made to the CI engine
//! - `devops_remote_operation_errors_total{kind,operation}` - Failed calls to the CI engine
//! - `devops_remote_operation_duration_seconds{kind,operation}` - Duration of CI engine calls
//! - `devops_requeues_total{kind,reason}` - Rate-limited requeues by error reason
//! - `devops_precondition_failures_total{kind}` - Objects outside a DevOps project namespace
//! - `devops_pipeline_events_total{type}` - Pipeline events delivered on the bus
//! - `devops_webhook_requests_total{outcome}` - Jenkins webhook requests

use anyhow::Result;
use prometheus::{HistogramVec, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_reconciliations_total",
            "Total number of reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_reconciliation_errors_total",
            "Total number of failed reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "devops_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds by resource kind",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REMOTE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_remote_operations_total",
            "Total number of CI engine operations by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATIONS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_remote_operation_errors_total",
            "Total number of failed CI engine operations by resource kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static REMOTE_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "devops_remote_operation_duration_seconds",
            "Duration of CI engine operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["kind", "operation"],
    )
    .expect("Failed to create REMOTE_OPERATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_requeues_total",
            "Total number of rate-limited requeues by resource kind and error reason",
        ),
        &["kind", "reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static PRECONDITION_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_precondition_failures_total",
            "Objects found outside a DevOps project admin namespace",
        ),
        &["kind"],
    )
    .expect("Failed to create PRECONDITION_FAILURES_TOTAL metric - this should never happen")
});

static PIPELINE_EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_pipeline_events_total",
            "Pipeline events delivered on the event bus by type",
        ),
        &["type"],
    )
    .expect("Failed to create PIPELINE_EVENTS_TOTAL metric - this should never happen")
});

static WEBHOOK_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "devops_webhook_requests_total",
            "Jenkins event webhook requests by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create WEBHOOK_REQUESTS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REMOTE_OPERATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PRECONDITION_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PIPELINE_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WEBHOOK_REQUESTS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations(kind: &str) {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).inc();
}

/// Reconciliations counted so far for `kind`
pub fn reconciliations(kind: &str) -> u64 {
    RECONCILIATIONS_TOTAL.with_label_values(&[kind]).get()
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(kind: &str, duration: f64) {
    RECONCILIATION_DURATION
        .with_label_values(&[kind])
        .observe(duration);
}

/// Record one CI engine call and its outcome
pub fn record_remote_operation(kind: &str, operation: &str, duration: f64, success: bool) {
    REMOTE_OPERATIONS_TOTAL
        .with_label_values(&[kind, operation])
        .inc();
    REMOTE_OPERATION_DURATION
        .with_label_values(&[kind, operation])
        .observe(duration);
    if !success {
        REMOTE_OPERATION_ERRORS_TOTAL
            .with_label_values(&[kind, operation])
            .inc();
    }
}

pub fn increment_requeues(kind: &str, reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[kind, reason]).inc();
}

pub fn increment_precondition_failures(kind: &str) {
    PRECONDITION_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_pipeline_events(event_type: &str) {
    PIPELINE_EVENTS_TOTAL.with_label_values(&[event_type]).inc();
}

pub fn increment_webhook_requests(outcome: &str) {
    WEBHOOK_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}
