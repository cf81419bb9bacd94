//! `Pipeline` → Jenkins workflow job inside the project folder.

use super::resource::DevOpsResource;
use crate::constants::PIPELINE_FINALIZER;
use crate::crd::{NoScmPipeline, Pipeline};
use crate::devops::jenkins::config_xml::canonical;
use crate::devops::{DevOpsClient, DevOpsError};
use async_trait::async_trait;
use kube::{Api, Client, ResourceExt};

#[async_trait]
impl DevOpsResource for Pipeline {
    const KIND: &'static str = "Pipeline";
    const FINALIZER: &'static str = PIPELINE_FINALIZER;
    const REQUIRES_DEVOPS_NAMESPACE: bool = true;

    type Desired = NoScmPipeline;
    type Remote = NoScmPipeline;

    fn api(client: Client, namespace: Option<&str>) -> Api<Self> {
        match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::default_namespaced(client),
        }
    }

    fn project_id(&self) -> Option<String> {
        self.namespace()
    }

    fn desired(&self) -> Result<NoScmPipeline, DevOpsError> {
        Ok(canonical(&self.desired_job()))
    }

    fn differs(&self, desired: &NoScmPipeline, remote: &NoScmPipeline) -> bool {
        // Both sides are canonical: empty fields read back as unset
        desired != &canonical(remote)
    }

    async fn get_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        name: &str,
    ) -> Result<NoScmPipeline, DevOpsError> {
        client.get_project_pipeline_config(project_id, name).await
    }

    async fn create_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        desired: &NoScmPipeline,
    ) -> Result<(), DevOpsError> {
        client.create_project_pipeline(project_id, desired).await.map(drop)
    }

    async fn update_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        desired: &NoScmPipeline,
    ) -> Result<(), DevOpsError> {
        client.update_project_pipeline(project_id, desired).await.map(drop)
    }

    async fn delete_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        name: &str,
    ) -> Result<(), DevOpsError> {
        client.delete_project_pipeline(project_id, name).await
    }
}
