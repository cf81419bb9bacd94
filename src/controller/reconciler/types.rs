//! # Types
//!
//! Core types for the reconciler.

use super::reconcile::split_key;
use super::resource::DevOpsResource;
use super::store::{NamespaceStore, ObjectStore};
use crate::controller::backoff::RateLimiter;
use crate::devops::{DevOpsClient, DevOpsError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error(transparent)]
    DevOps(#[from] DevOpsError),

    /// The object lives in a namespace that no `DevOpsProject` owns
    #[error("namespace {namespace} is not a DevOps project admin namespace")]
    NotDevOpsNamespace { namespace: String },

    /// The work item is not a `name` or `namespace/name` key
    #[error("invalid resource key {0:?}")]
    InvalidKey(String),

    /// A namespaced object came without a namespace
    #[error("{kind} {name} has no namespace")]
    MissingNamespace { kind: &'static str, name: String },
}

impl ReconcilerError {
    /// Label used for the requeue metric
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Kube(_) => "kube",
            ReconcilerError::DevOps(e) if e.status_code().is_some() => "remote-status",
            ReconcilerError::DevOps(DevOpsError::Transport(_)) => "remote-transport",
            ReconcilerError::DevOps(_) => "remote-data",
            ReconcilerError::NotDevOpsNamespace { .. } => "not-devops-namespace",
            ReconcilerError::InvalidKey(_) | ReconcilerError::MissingNamespace { .. } => {
                "invalid-object"
            }
        }
    }

    /// Retrying soon cannot fix these; they wait at the rate limiter ceiling
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReconcilerError::NotDevOpsNamespace { .. })
    }

    /// Programmer errors: logged and dropped, never retried
    #[must_use]
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            ReconcilerError::InvalidKey(_) | ReconcilerError::MissingNamespace { .. }
        )
    }
}

/// Shared context of one controller
///
/// Everything the state machine touches goes through one of these seams,
/// so tests can swap the cluster and the CI engine for in-memory fakes.
pub struct Reconciler<K: DevOpsResource> {
    pub objects: Arc<dyn ObjectStore<K>>,
    pub namespaces: Arc<dyn NamespaceStore>,
    pub devops: Arc<dyn DevOpsClient>,
    // Failure history per key (namespace/name); reset on success
    pub rate_limiter: RateLimiter,
}

impl<K: DevOpsResource> std::fmt::Debug for Reconciler<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &K::KIND)
            .field("finalizer", &K::FINALIZER)
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl<K: DevOpsResource> Reconciler<K> {
    pub fn new(
        objects: Arc<dyn ObjectStore<K>>,
        namespaces: Arc<dyn NamespaceStore>,
        devops: Arc<dyn DevOpsClient>,
        rate_limiter: RateLimiter,
    ) -> Self {
        Self {
            objects,
            namespaces,
            devops,
            rate_limiter,
        }
    }

    /// Forget the failure history of keys whose object left the cache
    ///
    /// A hard-deleted object is never reconciled again, so nothing else
    /// would clear its entry.
    pub fn prune_backoff(&self) -> usize {
        self.rate_limiter.retain(|key| match split_key(key) {
            Ok((namespace, name)) => self.objects.get(namespace, name).is_some(),
            Err(_) => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_namespace_precondition_is_terminal() {
        let err = ReconcilerError::NotDevOpsNamespace {
            namespace: "default".to_string(),
        };
        assert!(err.is_terminal());
        assert!(!err.is_invariant());
        assert_eq!(err.reason(), "not-devops-namespace");

        let err = ReconcilerError::DevOps(DevOpsError::not_found("get pipeline", "build"));
        assert!(!err.is_terminal());
        assert_eq!(err.reason(), "remote-status");
    }

    #[test]
    fn test_invalid_key_is_invariant() {
        let err = ReconcilerError::InvalidKey("a/b/c".to_string());
        assert!(err.is_invariant());
        assert!(!err.is_terminal());
    }
}
