//! # Initialization
//!
//! Process setup shared by every controller:
//!
//! - rustls crypto provider
//! - tracing subscriber
//! - Prometheus metrics
//! - HTTP server (probes, metrics, Jenkins event webhook)
//! - Kubernetes and Jenkins clients
//! - the namespace cache all controllers read

use crate::config::{ControllerConfig, LogFormat};
use crate::controller::server::{start_server, ServerState};
use crate::devops::{DevOpsClient, JenkinsClient};
use crate::events::{register_default_subscribers, EventNotifier};
use crate::kapis;
use crate::observability::metrics;
use crate::runtime::shutdown_requested;
use crate::runtime::watch_loop::ControllerContext;
use anyhow::Context;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use kube_runtime::{reflector, watcher, WatchStreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Everything `main` needs once setup finished
pub struct InitializationResult {
    pub context: ControllerContext,
    pub server_state: Arc<ServerState>,
    pub notifier: Arc<EventNotifier>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("context", &self.context)
            .field("server_state", &self.server_state)
            .field("notifier", &self.notifier)
            .finish()
    }
}

/// Install the process-wide rustls crypto provider
///
/// Must run before any TLS connection (Kubernetes API or Jenkins) is made.
///
/// # Errors
/// Returns an error if another provider was installed first
pub fn install_crypto_provider() -> Result<(), anyhow::Error> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow::anyhow!("Failed to install rustls crypto provider"))
}

/// Set up the global tracing subscriber
///
/// `RUST_LOG` overrides the default `devops_controller=info` filter.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "devops_controller=info".into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Bring up shared services and return the controllers' context
///
/// The HTTP server starts right away and reports not-ready until `main`
/// flips [`ServerState::is_ready`].
///
/// # Errors
/// Returns an error if metrics cannot be registered or a client cannot be built
pub async fn initialize(
    config: &ControllerConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<InitializationResult, anyhow::Error> {
    metrics::register_metrics().context("Failed to register metrics")?;

    let notifier = Arc::new(EventNotifier::new());
    register_default_subscribers(&notifier);

    let server_state = Arc::new(ServerState::default());
    let kapis = kapis::router(notifier.clone(), config.webhook_body_limit);
    let server_port = config.metrics_port;
    let server_state_clone = server_state.clone();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) =
            start_server(server_port, server_state_clone, kapis, server_shutdown).await
        {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let jenkins = JenkinsClient::new(&config.jenkins).context("Failed to create Jenkins client")?;
    info!(url = %jenkins.base_url(), "Jenkins client configured");
    let devops: Arc<dyn DevOpsClient> = Arc::new(jenkins);

    let namespace_cache = spawn_namespace_reflector(client.clone(), shutdown.clone());

    Ok(InitializationResult {
        context: ControllerContext {
            client,
            namespace_cache,
            devops,
            shutdown,
        },
        server_state,
        notifier,
    })
}

/// Start the single namespace reflector shared by all controllers
fn spawn_namespace_reflector(
    client: Client,
    shutdown: watch::Receiver<bool>,
) -> reflector::Store<Namespace> {
    let (reader, writer) = reflector::store();
    let stream = reflector(
        writer,
        watcher(Api::<Namespace>::all(client), watcher::Config::default()).default_backoff(),
    )
    .applied_objects();

    tokio::spawn(async move {
        let drain = stream.for_each(|event| {
            if let Err(e) = event {
                warn!("namespace watch error, retrying with backoff: {}", e);
            }
            futures::future::ready(())
        });
        tokio::select! {
            () = drain => warn!("namespace watch stream ended"),
            () = shutdown_requested(shutdown) => info!("namespace reflector stopped"),
        }
    });

    reader
}
