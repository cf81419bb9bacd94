//! `DevOpsProject` → Jenkins folder named after the admin namespace.

use super::resource::DevOpsResource;
use crate::constants::DEVOPS_PROJECT_FINALIZER;
use crate::crd::DevOpsProject;
use crate::devops::{DevOpsClient, DevOpsError};
use async_trait::async_trait;
use kube::{Api, Client};

#[async_trait]
impl DevOpsResource for DevOpsProject {
    const KIND: &'static str = "DevOpsProject";
    const FINALIZER: &'static str = DEVOPS_PROJECT_FINALIZER;
    const REQUIRES_DEVOPS_NAMESPACE: bool = false;
    const PROVISIONS_ADMIN_NAMESPACE: bool = true;

    // A folder has no definition beyond its name
    type Desired = ();
    type Remote = String;

    fn api(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }

    fn project_id(&self) -> Option<String> {
        self.admin_namespace().map(str::to_string)
    }

    fn desired(&self) -> Result<Self::Desired, DevOpsError> {
        Ok(())
    }

    fn differs(&self, _desired: &(), _remote: &String) -> bool {
        false
    }

    async fn get_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        _name: &str,
    ) -> Result<String, DevOpsError> {
        client.get_devops_project(project_id).await
    }

    async fn create_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        _desired: &(),
    ) -> Result<(), DevOpsError> {
        client.create_devops_project(project_id).await.map(drop)
    }

    async fn update_remote(
        _client: &dyn DevOpsClient,
        _project_id: &str,
        _desired: &(),
    ) -> Result<(), DevOpsError> {
        Ok(())
    }

    async fn delete_remote(
        client: &dyn DevOpsClient,
        project_id: &str,
        _name: &str,
    ) -> Result<(), DevOpsError> {
        client.delete_devops_project(project_id).await
    }
}
