//! # Error Policy
//!
//! Error handling and requeue logic for the controller watch loops.
//!
//! Failed reconciliations go back to the work queue after the delay the
//! per-key [`RateLimiter`](crate::controller::backoff::RateLimiter) hands out.
//! Objects outside a DevOps namespace wait at the limiter's ceiling right
//! away; invalid objects are dropped until they change. Each failure also
//! prunes the history of keys whose object is gone from the cache.

use crate::controller::reconciler::{object_key, DevOpsResource, Reconciler, ReconcilerError};
use crate::observability::metrics;
use kube::ResourceExt;
use kube_runtime::controller::{self, Action};
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Decide when a failed key is retried
pub fn handle_reconciliation_error<K: DevOpsResource>(
    obj: Arc<K>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler<K>>,
) -> Action {
    let key = object_key(obj.as_ref());
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.reconciliation_error",
        resource.kind = K::KIND,
        resource.name = %name,
        resource.namespace = %namespace,
        error.reason = error.reason(),
    );
    let _error_guard = error_span.enter();

    if error.is_invariant() {
        error!("dropping {}: {}", key, error);
        ctx.rate_limiter.forget(&key);
        return Action::await_change();
    }

    let pruned = ctx.prune_backoff();
    if pruned > 0 {
        debug!(pruned, "dropped backoff history of deleted objects");
    }

    let delay = ctx.rate_limiter.when(&key);
    let delay = if error.is_terminal() {
        warn!(
            "{} cannot be reconciled until its namespace changes: {}",
            key, error
        );
        ctx.rate_limiter.max_delay()
    } else {
        error!("Reconciliation error for {}: {}", key, error);
        delay
    };

    debug!(
        requeues = ctx.rate_limiter.num_requeues(&key),
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "requeue scheduled"
    );
    metrics::increment_requeues(K::KIND, error.reason());
    Action::requeue(delay)
}

/// Log one item of the controller output stream
///
/// Reconciler failures were already handled by [`handle_reconciliation_error`];
/// watch failures are retried by the watcher's own backoff.
pub fn handle_watch_stream_error<K: DevOpsResource>(
    error: &controller::Error<ReconcilerError, watcher::Error>,
) {
    match error {
        controller::Error::ReconcilerFailed(..) => debug!(kind = K::KIND, "reconciler failed"),
        controller::Error::QueueError(e) => {
            warn!(kind = K::KIND, error = %e, "watch stream error, retrying with backoff");
        }
        other => warn!(kind = K::KIND, error = %other, "controller stream error"),
    }
}
