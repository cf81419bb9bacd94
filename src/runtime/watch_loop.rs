//! # Watch Loop
//!
//! Runs one kube-runtime controller per resource kind.
//!
//! The controller's scheduler is the work queue: it de-duplicates keys, never
//! reconciles one key twice at the same time, and runs a key that changed
//! while in flight once more after the current pass completes.

use crate::controller::backoff::RateLimiter;
use crate::controller::reconciler::{
    reconcile, DevOpsResource, KubeNamespaceStore, KubeObjectStore, Reconciler,
};
use crate::devops::DevOpsClient;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use crate::runtime::shutdown_requested;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;
use kube::Client;
use kube_runtime::reflector::Store;
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, Instrument};

/// Everything the controllers share
#[derive(Clone)]
pub struct ControllerContext {
    pub client: Client,
    /// Namespace cache fed by a single reflector
    pub namespace_cache: Store<Namespace>,
    pub devops: Arc<dyn DevOpsClient>,
    pub shutdown: watch::Receiver<bool>,
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("shutdown", &*self.shutdown.borrow())
            .finish_non_exhaustive()
    }
}

/// Per-kind tuning
#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub workers: u16,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

/// Run the controller for `K` until shutdown
///
/// Waits for the namespace cache first; the precondition check reads it.
///
/// # Errors
/// Returns an error if the namespace reflector stopped before it synced
pub async fn run_controller<K: DevOpsResource>(
    ctx: ControllerContext,
    settings: ControllerSettings,
) -> Result<(), anyhow::Error> {
    let span = tracing::info_span!("controller.watch", resource.kind = K::KIND);
    async move {
        tokio::select! {
            ready = ctx.namespace_cache.wait_until_ready() => {
                ready.map_err(|e| anyhow::anyhow!("namespace cache never synced: {e}"))?;
            }
            () = shutdown_requested(ctx.shutdown.clone()) => {
                info!("Shutdown requested before caches synced");
                return Ok(());
            }
        }

        let api = Api::<K>::all(ctx.client.clone());
        let controller = Controller::new(api, watcher::Config::default())
            .with_config(controller::Config::default().concurrency(settings.workers))
            .graceful_shutdown_on(shutdown_requested(ctx.shutdown.clone()));

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(KubeObjectStore::new(controller.store(), ctx.client.clone())),
            Arc::new(KubeNamespaceStore::new(ctx.namespace_cache.clone(), ctx.client.clone())),
            ctx.devops.clone(),
            RateLimiter::new(settings.backoff_base, settings.backoff_max),
        ));

        info!(workers = settings.workers, "Starting controller");
        controller
            .run(reconcile::<K>, handle_reconciliation_error::<K>, reconciler)
            .for_each(|result| {
                match result {
                    Ok((obj, _action)) => debug!(object = %obj, "reconciled"),
                    Err(e) => handle_watch_stream_error::<K>(&e),
                }
                futures::future::ready(())
            })
            .await;

        info!("Controller stopped gracefully");
        Ok::<(), anyhow::Error>(())
    }
    .instrument(span)
    .await
}
