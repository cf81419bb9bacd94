//! # Object Stores
//!
//! Read from the informer cache, write through the API server.
//!
//! The cache is an eventually consistent snapshot; it is never mutated
//! directly. Writes return the object as stored so the caller keeps working
//! on a fresh `resourceVersion`.

use super::resource::DevOpsResource;
use crate::constants::DEVOPS_PROJECT_LABEL;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Patch, PatchParams, PostParams};
use kube::{Api, Client, ResourceExt};
use kube_runtime::reflector::{ObjectRef, Store};
use std::sync::Arc;

/// Cached reads and authoritative writes for one resource kind
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    fn get(&self, namespace: Option<&str>, name: &str) -> Option<Arc<K>>;

    /// Replace the whole object (metadata included)
    async fn update(&self, obj: &K) -> Result<K, kube::Error>;

    /// Merge `status` into the status subresource
    async fn update_status(&self, obj: &K, status: serde_json::Value) -> Result<K, kube::Error>;
}

/// Namespace lookups used by the project and precondition checks
#[async_trait]
pub trait NamespaceStore: Send + Sync {
    fn get(&self, name: &str) -> Option<Arc<Namespace>>;

    /// Live namespaces labelled for `project`; ownership is checked by the caller
    fn admin_namespace_candidates(&self, project: &str) -> Vec<Arc<Namespace>>;

    async fn create(&self, namespace: &Namespace) -> Result<Namespace, kube::Error>;
}

/// [`ObjectStore`] backed by a reflector store and the API server
pub struct KubeObjectStore<K: DevOpsResource> {
    cache: Store<K>,
    client: Client,
}

impl<K: DevOpsResource> std::fmt::Debug for KubeObjectStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeObjectStore")
            .field("kind", &K::KIND)
            .finish_non_exhaustive()
    }
}

impl<K: DevOpsResource> KubeObjectStore<K> {
    pub fn new(cache: Store<K>, client: Client) -> Self {
        Self { cache, client }
    }
}

#[async_trait]
impl<K: DevOpsResource> ObjectStore<K> for KubeObjectStore<K> {
    fn get(&self, namespace: Option<&str>, name: &str) -> Option<Arc<K>> {
        let mut key = ObjectRef::<K>::new(name);
        if let Some(ns) = namespace {
            key = key.within(ns);
        }
        self.cache.get(&key)
    }

    async fn update(&self, obj: &K) -> Result<K, kube::Error> {
        let api = K::api(self.client.clone(), obj.namespace().as_deref());
        api.replace(&obj.name_any(), &PostParams::default(), obj)
            .await
    }

    async fn update_status(&self, obj: &K, status: serde_json::Value) -> Result<K, kube::Error> {
        let api = K::api(self.client.clone(), obj.namespace().as_deref());
        let patch = serde_json::json!({ "status": status });
        api.patch_status(&obj.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
    }
}

/// [`NamespaceStore`] backed by a reflector store and the API server
pub struct KubeNamespaceStore {
    cache: Store<Namespace>,
    api: Api<Namespace>,
}

impl std::fmt::Debug for KubeNamespaceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeNamespaceStore").finish_non_exhaustive()
    }
}

impl KubeNamespaceStore {
    pub fn new(cache: Store<Namespace>, client: Client) -> Self {
        Self {
            cache,
            api: Api::all(client),
        }
    }
}

#[async_trait]
impl NamespaceStore for KubeNamespaceStore {
    fn get(&self, name: &str) -> Option<Arc<Namespace>> {
        self.cache.get(&ObjectRef::new(name))
    }

    fn admin_namespace_candidates(&self, project: &str) -> Vec<Arc<Namespace>> {
        self.cache
            .state()
            .into_iter()
            .filter(|ns| {
                ns.labels().get(DEVOPS_PROJECT_LABEL).map(String::as_str) == Some(project)
                    && ns.metadata.deletion_timestamp.is_none()
            })
            .collect()
    }

    async fn create(&self, namespace: &Namespace) -> Result<Namespace, kube::Error> {
        self.api.create(&PostParams::default(), namespace).await
    }
}
