//! # Reconciliation Logic
//!
//! The finalizer state machine shared by every DevOps controller.
//!
//! ## Active (no deletion timestamp)
//!
//! 1. Persist the sentinel finalizer if it is missing, before anything remote exists
//! 2. Resolve the remote project (provisioning the admin namespace for projects)
//! 3. Get the remote counterpart: create it on not-found, update it if it differs
//!
//! ## Terminating
//!
//! 1. If the finalizer is present, delete the remote counterpart
//! 2. Remove the finalizer only once the remote side is confirmed gone
//!
//! Objects missing from the cache, or whose namespace is gone, are benign
//! races and end the pass without error.

use super::resource::DevOpsResource;
use super::types::{Reconciler, ReconcilerError};
use crate::constants::{DEVOPS_GROUP, DEVOPS_PROJECT_LABEL};
use crate::devops::DevOpsError;
use crate::observability::metrics;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Entry point for the kube-runtime controller
///
/// Re-reads the object from the cache by key (level-triggered) and runs one
/// pass of the state machine. Backoff on failure is handled by the error
/// policy; success clears the key's failure history.
///
/// Objects this controller does not manage (foreign secrets sharing the
/// informer) end here, before any lookup or metric.
pub async fn reconcile<K: DevOpsResource>(
    obj: Arc<K>,
    ctx: Arc<Reconciler<K>>,
) -> Result<Action, ReconcilerError> {
    if !obj.is_managed() {
        return Ok(Action::await_change());
    }

    let key = object_key(obj.as_ref());
    let span = info_span!(
        "reconcile",
        resource.kind = K::KIND,
        resource.name = %obj.name_any(),
        resource.namespace = obj.namespace().as_deref().unwrap_or(""),
    );

    let start = Instant::now();
    metrics::increment_reconciliations(K::KIND);
    let result = ctx.sync(&key).instrument(span).await;
    metrics::observe_reconciliation_duration(K::KIND, start.elapsed().as_secs_f64());

    match result {
        Ok(()) => {
            ctx.rate_limiter.forget(&key);
            Ok(Action::await_change())
        }
        Err(e) => {
            metrics::increment_reconciliation_errors(K::KIND);
            Err(e)
        }
    }
}

impl<K: DevOpsResource> Reconciler<K> {
    /// One reconciliation pass for `key` (`name` or `namespace/name`)
    ///
    /// # Errors
    /// Kubernetes and CI engine failures, and objects outside a DevOps
    /// project namespace. Every error is retried through the work queue.
    pub async fn sync(&self, key: &str) -> Result<(), ReconcilerError> {
        let (namespace, name) = split_key(key)?;

        let Some(obj) = self.objects.get(namespace, name) else {
            info!(key, "{} no longer exists, nothing to do", K::KIND);
            return Ok(());
        };
        if !obj.is_managed() {
            debug!(key, "not managed by this controller, skipping");
            return Ok(());
        }

        if K::REQUIRES_DEVOPS_NAMESPACE {
            let ns_name = namespace.ok_or_else(|| ReconcilerError::MissingNamespace {
                kind: K::KIND,
                name: name.to_string(),
            })?;
            match self.namespaces.get(ns_name) {
                None => {
                    info!(key, namespace = ns_name, "namespace no longer exists, nothing to do");
                    return Ok(());
                }
                Some(ns) if !is_devops_namespace(&ns) => {
                    metrics::increment_precondition_failures(K::KIND);
                    return Err(ReconcilerError::NotDevOpsNamespace {
                        namespace: ns_name.to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        let obj = K::clone(&obj);
        if obj.meta().deletion_timestamp.is_some() {
            self.finalize(obj).await
        } else {
            self.apply(obj).await
        }
    }

    async fn apply(&self, mut obj: K) -> Result<(), ReconcilerError> {
        if !has_finalizer(&obj) {
            obj.finalizers_mut().push(K::FINALIZER.to_string());
            obj = self.objects.update(&obj).await?;
            debug!(finalizer = K::FINALIZER, "added finalizer");
        }

        let name = obj.name_any();
        let project_id = match obj.project_id() {
            Some(id) => id,
            None if K::PROVISIONS_ADMIN_NAMESPACE => self.ensure_admin_namespace(&obj).await?,
            None => {
                return Err(ReconcilerError::MissingNamespace {
                    kind: K::KIND,
                    name,
                })
            }
        };

        let desired = obj.desired()?;
        let client = self.devops.as_ref();
        match remote_call::<K, _>("get", K::get_remote(client, &project_id, &name)).await {
            Ok(current) => {
                if obj.differs(&desired, &current) {
                    remote_call::<K, _>("update", K::update_remote(client, &project_id, &desired))
                        .await?;
                    info!(project = %project_id, "updated remote {}", K::KIND);
                } else {
                    debug!(project = %project_id, "remote {} up to date", K::KIND);
                }
            }
            Err(e) if e.is_not_found() => {
                remote_call::<K, _>("create", K::create_remote(client, &project_id, &desired))
                    .await?;
                info!(project = %project_id, "created remote {}", K::KIND);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn finalize(&self, mut obj: K) -> Result<(), ReconcilerError> {
        if !has_finalizer(&obj) {
            return Ok(());
        }

        let name = obj.name_any();
        // No project id means nothing was ever created remotely
        if let Some(project_id) = obj.project_id() {
            let client = self.devops.as_ref();
            match remote_call::<K, _>("get", K::get_remote(client, &project_id, &name)).await {
                Ok(_) => {
                    let deleted = K::delete_remote(client, &project_id, &name);
                    match remote_call::<K, _>("delete", deleted).await {
                        Ok(()) => info!(project = %project_id, "deleted remote {}", K::KIND),
                        Err(e) if e.is_not_found() => {
                            debug!(project = %project_id, "remote {} gone during delete", K::KIND);
                        }
                        Err(e) => {
                            warn!(
                                project = %project_id,
                                error = %e,
                                "remote delete failed, keeping finalizer"
                            );
                            return Err(e.into());
                        }
                    }
                }
                Err(e) if e.is_not_found() => {
                    debug!(project = %project_id, "remote {} already absent", K::KIND);
                }
                Err(e) => return Err(e.into()),
            }
        }

        obj.finalizers_mut().retain(|f| f != K::FINALIZER);
        self.objects.update(&obj).await?;
        debug!(finalizer = K::FINALIZER, "removed finalizer");
        Ok(())
    }

    /// Find or create the admin namespace of a project and record it in status
    async fn ensure_admin_namespace(&self, obj: &K) -> Result<String, ReconcilerError> {
        let project = obj.name_any();
        let project_uid = obj.meta().uid.clone().unwrap_or_default();
        let owned = self
            .namespaces
            .admin_namespace_candidates(&project)
            .into_iter()
            .find(|ns| is_admin_namespace_of(ns, &project_uid));
        let admin_namespace = match owned {
            Some(ns) => ns.name_any(),
            None => {
                let namespace = Namespace {
                    metadata: ObjectMeta {
                        generate_name: Some(project.clone()),
                        labels: Some(BTreeMap::from([(
                            DEVOPS_PROJECT_LABEL.to_string(),
                            project.clone(),
                        )])),
                        owner_references: obj.controller_owner_ref(&()).map(|o| vec![o]),
                        ..ObjectMeta::default()
                    },
                    ..Namespace::default()
                };
                let created = self.namespaces.create(&namespace).await?;
                info!(namespace = %created.name_any(), "created admin namespace");
                created.name_any()
            }
        };

        self.objects
            .update_status(obj, serde_json::json!({ "adminNamespace": admin_namespace }))
            .await?;
        Ok(admin_namespace)
    }
}

/// Time one CI engine call and record it. A not-found answer counts as success.
async fn remote_call<K: DevOpsResource, T>(
    operation: &'static str,
    call: impl Future<Output = Result<T, DevOpsError>>,
) -> Result<T, DevOpsError> {
    let start = Instant::now();
    let result = call.await;
    let success = match &result {
        Ok(_) => true,
        Err(e) => e.is_not_found(),
    };
    metrics::record_remote_operation(K::KIND, operation, start.elapsed().as_secs_f64(), success);
    result
}

fn has_finalizer<K: DevOpsResource>(obj: &K) -> bool {
    obj.finalizers().iter().any(|f| f == K::FINALIZER)
}

/// A namespace counts as a DevOps admin namespace when it carries the project
/// label and is owned by the `DevOpsProject` named in that label.
pub fn is_devops_namespace(namespace: &Namespace) -> bool {
    let Some(project) = namespace.labels().get(DEVOPS_PROJECT_LABEL) else {
        return false;
    };
    !project.is_empty()
        && namespace.owner_references().iter().any(|owner| {
            owner.kind == "DevOpsProject"
                && owner.name == *project
                && owner.api_version.starts_with(DEVOPS_GROUP)
        })
}

/// True when `namespace` is a DevOps admin namespace whose owning project has `project_uid`
///
/// The label alone is not enough: anyone allowed to label namespaces could
/// otherwise hand a project a namespace it does not control.
pub fn is_admin_namespace_of(namespace: &Namespace, project_uid: &str) -> bool {
    !project_uid.is_empty()
        && is_devops_namespace(namespace)
        && namespace
            .owner_references()
            .iter()
            .any(|owner| owner.kind == "DevOpsProject" && owner.uid == project_uid)
}

/// Work queue key of an object: `namespace/name`, or `name` when cluster-scoped
pub fn object_key<K: Resource>(obj: &K) -> String {
    let name = obj.meta().name.as_deref().unwrap_or_default();
    match obj.meta().namespace.as_deref() {
        Some(ns) => format!("{ns}/{name}"),
        None => name.to_string(),
    }
}

/// Inverse of [`object_key`]
///
/// # Errors
/// Keys with an empty part or more than one `/` are invalid.
pub fn split_key(key: &str) -> Result<(Option<&str>, &str), ReconcilerError> {
    let mut parts = key.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) if !name.is_empty() => Ok((None, name)),
        (Some(ns), Some(name), None) if !ns.is_empty() && !name.is_empty() => Ok((Some(ns), name)),
        _ => Err(ReconcilerError::InvalidKey(key.to_string())),
    }
}
