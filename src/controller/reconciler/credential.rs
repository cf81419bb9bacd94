//! Credential `Secret` → entry in the project folder's credential store.

use super::resource::DevOpsResource;
use crate::constants::CREDENTIAL_FINALIZER;
use crate::crd::{is_devops_credential, wants_autosync};
use crate::devops::{Credential, DevOpsClient, DevOpsError, RemoteCredential};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client, ResourceExt};

#[async_trait]
impl DevOpsResource for Secret {
    const KIND: &'static str = "Secret";
    const FINALIZER: &'static str = CREDENTIAL_FINALIZER;
    const REQUIRES_DEVOPS_NAMESPACE: bool = true;

    type Desired = Credential;
    type Remote = RemoteCredential;

    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::default_namespaced(client),
        }
    }

    fn is_managed(&self) -> bool {
        is_devops_credential(self)
    }

    fn project_id(&self) -> Option<String> {
        self.namespace()
    }

    fn desired(&self) -> Result<Credential, DevOpsError> {
        Credential::from_secret(self)
    }

    // Jenkins never returns secret material, so only autosync pushes it again
    fn differs(&self, desired: &Credential, remote: &RemoteCredential) -> bool {
        wants_autosync(self) || desired.differs_from(remote)
    }

    async fn get_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        name: &str,
    ) -> Result<RemoteCredential, DevOpsError> {
        client.get_credential_in_project(project_id, name).await
    }

    async fn create_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        desired: &Credential,
    ) -> Result<(), DevOpsError> {
        client
            .create_credential_in_project(project_id, desired)
            .await
            .map(drop)
    }

    async fn update_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        desired: &Credential,
    ) -> Result<(), DevOpsError> {
        client
            .update_credential_in_project(project_id, desired)
            .await
            .map(drop)
    }

    async fn delete_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        name: &str,
    ) -> Result<(), DevOpsError> {
        client.delete_credential_in_project(project_id, name).await
    }
}
