//! # Resource Adapter
//!
//! What the generic state machine needs to know about one kind of object.

use crate::devops::{DevOpsClient, DevOpsError};
use async_trait::async_trait;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A Kubernetes object mirrored into the CI engine
///
/// `Desired` is the remote definition derived from the object; `Remote` is
/// what the CI engine reports back. `differs` decides whether an existing
/// remote counterpart needs an update.
#[async_trait]
pub trait DevOpsResource:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Kind label used in logs and metrics
    const KIND: &'static str;
    /// Sentinel finalizer held while a remote counterpart may exist
    const FINALIZER: &'static str;
    /// Must live in an admin namespace owned by a `DevOpsProject`
    const REQUIRES_DEVOPS_NAMESPACE: bool;
    /// Creates and records its own admin namespace before touching the CI engine
    const PROVISIONS_ADMIN_NAMESPACE: bool = false;

    type Desired: Send + Sync;
    type Remote: Send + Sync;

    /// Typed API for authoritative writes
    fn api(client: Client, namespace: Option<&str>) -> Api<Self>;

    /// False for objects sharing the informer that this controller ignores
    fn is_managed(&self) -> bool {
        true
    }

    /// Remote project (Jenkins folder) the counterpart lives in, when known
    fn project_id(&self) -> Option<String>;

    fn desired(&self) -> Result<Self::Desired, DevOpsError>;

    fn differs(&self, desired: &Self::Desired, remote: &Self::Remote) -> bool;

    async fn get_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        name: &str,
    ) -> Result<Self::Remote, DevOpsError>;

    async fn create_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        desired: &Self::Desired,
    ) -> Result<(), DevOpsError>;

    async fn update_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        desired: &Self::Desired,
    ) -> Result<(), DevOpsError>;

    async fn delete_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        name: &str,
    ) -> Result<(), DevOpsError>;
}
