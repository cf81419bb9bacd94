//! # Runtime
//!
//! Process wiring: initialization, the per-kind watch loops and their error policy.
//!
//! - `initialization`: crypto provider, tracing, metrics, HTTP server, clients, caches
//! - `watch_loop`: one kube-runtime controller per resource kind
//! - `error_policy`: rate-limited requeue of failed reconciliations
//!
//! Shutdown starts on Ctrl-C or SIGTERM and fans out through a `watch` flag.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::controller::server::ServerState;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Resolves once the shutdown flag is set (or its sender is gone)
pub async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it
///
/// The kubelet stops pods with SIGTERM, so that is the signal that matters
/// in-cluster.
pub async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => log_ctrl_c(result),
                    _ = sigterm.recv() => info!("SIGTERM received"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                log_ctrl_c(tokio::signal::ctrl_c().await);
            }
        }
    }

    #[cfg(not(unix))]
    log_ctrl_c(tokio::signal::ctrl_c().await);
}

fn log_ctrl_c(result: std::io::Result<()>) {
    match result {
        Ok(()) => info!("Ctrl-C received"),
        Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
    }
}

/// Wait for `signal`, then mark the process unready and raise the shutdown flag
pub async fn shutdown_on(
    signal: impl Future<Output = ()>,
    state: Arc<ServerState>,
    shutdown: watch::Sender<bool>,
) {
    signal.await;
    info!("Shutting down");
    state.is_ready.store(false, Ordering::Relaxed);
    shutdown.send_replace(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_on_signal_clears_readiness_and_raises_flag() {
        let state = Arc::new(ServerState::default());
        state.is_ready.store(true, Ordering::Relaxed);
        let (tx, rx) = watch::channel(false);

        shutdown_on(std::future::ready(()), state.clone(), tx).await;

        assert!(!state.is_ready.load(Ordering::Relaxed));
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_shutdown_on_waits_for_signal() {
        let state = Arc::new(ServerState::default());
        state.is_ready.store(true, Ordering::Relaxed);
        let (tx, rx) = watch::channel(false);
        let (fire, fired) = tokio::sync::oneshot::channel::<()>();

        let task = tokio::spawn(shutdown_on(
            async move {
                let _ = fired.await;
            },
            state.clone(),
            tx,
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(state.is_ready.load(Ordering::Relaxed));
        assert!(!*rx.borrow());

        fire.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(!state.is_ready.load(Ordering::Relaxed));
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_shutdown_requested_resolves_on_flag() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(shutdown_requested(rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        tx.send_replace(true);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_requested_resolves_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), shutdown_requested(rx))
            .await
            .unwrap();
    }
}
