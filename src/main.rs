//! # DevOps Controller
//!
//! Kubernetes controllers that keep a Jenkins CI engine in step with the
//! cluster's DevOps resources.
//!
//! ## Overview
//!
//! 1. **DevOpsProject** - provisions the project's admin namespace and a Jenkins folder for it
//! 2. **Pipeline** - mirrors the pipeline definition as a Jenkins job in that folder
//! 3. **Credential Secret** - mirrors `credential.devops.kubesphere.io/*` secrets into the folder's credential store
//!
//! Each resource holds a finalizer until its Jenkins counterpart is gone.
//!
//! The same process serves `/metrics`, `/healthz`, `/readyz` and the Jenkins
//! event webhook (`POST /kapis/devops.kubesphere.io/v1alpha3/jenkinsEvent/{eventType}`).

use anyhow::Result;
use clap::Parser;
use devops_controller::config::{ControllerConfig, LogFormat};
use devops_controller::crd::{DevOpsProject, Pipeline};
use devops_controller::runtime::initialization::{init_tracing, initialize, install_crypto_provider};
use devops_controller::runtime::watch_loop::{run_controller, ControllerSettings};
use devops_controller::runtime::{shutdown_on, shutdown_requested, termination_signal};
use k8s_openapi::api::core::v1::Secret;
use std::sync::atomic::Ordering;
use tokio::sync::watch;
use tracing::{error, info};

/// Command-line overrides; environment variables provide the defaults
#[derive(Parser, Debug)]
#[command(name = "devops-controller", version, about = "KubeSphere DevOps controller")]
struct Cli {
    /// Port for metrics, probes and the Jenkins event webhook
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Concurrent reconciliations for DevOpsProject objects
    #[arg(long, env = "PROJECT_WORKERS")]
    project_workers: Option<u16>,

    /// Concurrent reconciliations for Pipeline objects
    #[arg(long, env = "PIPELINE_WORKERS")]
    pipeline_workers: Option<u16>,

    /// Concurrent reconciliations for credential secrets
    #[arg(long, env = "CREDENTIAL_WORKERS")]
    credential_workers: Option<u16>,

    /// Log output format
    #[arg(long, value_parser = ["json", "text"])]
    log_format: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ControllerConfig) {
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
        if let Some(workers) = self.project_workers {
            config.project_workers = workers;
        }
        if let Some(workers) = self.pipeline_workers {
            config.pipeline_workers = workers;
        }
        if let Some(workers) = self.credential_workers {
            config.credential_workers = workers;
        }
        match self.log_format.as_deref() {
            Some("text") => config.log_format = LogFormat::Text,
            Some("json") => config.log_format = LogFormat::Json,
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    install_crypto_provider()?;

    let mut config = ControllerConfig::from_env();
    Cli::parse().apply(&mut config);

    init_tracing(config.log_format);

    info!(
        build_datetime = env!("BUILD_DATETIME"),
        build_git_hash = env!("BUILD_GIT_HASH"),
        "Starting DevOps Controller"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let init = initialize(&config, shutdown_rx.clone()).await?;

    tokio::spawn(shutdown_on(
        termination_signal(),
        init.server_state.clone(),
        shutdown_tx,
    ));

    let ready_state = init.server_state.clone();
    let cache = init.context.namespace_cache.clone();
    let ready_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        tokio::select! {
            ready = cache.wait_until_ready() => {
                if ready.is_ok() {
                    ready_state.is_ready.store(true, Ordering::Relaxed);
                    info!("Caches synced, controller ready");
                }
            }
            () = shutdown_requested(ready_shutdown) => {}
        }
    });

    let settings = |workers| ControllerSettings {
        workers,
        backoff_base: config.backoff_base_duration(),
        backoff_max: config.backoff_max_duration(),
    };

    let result = tokio::try_join!(
        run_controller::<DevOpsProject>(init.context.clone(), settings(config.project_workers)),
        run_controller::<Pipeline>(init.context.clone(), settings(config.pipeline_workers)),
        run_controller::<Secret>(init.context.clone(), settings(config.credential_workers)),
    );

    if let Err(e) = result {
        error!("Controller failed: {:#}", e);
        return Err(e);
    }

    info!("DevOps Controller stopped");
    Ok(())
}
