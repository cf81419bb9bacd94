//! # DevOps Backend
//!
//! The contract the reconcilers consume from the CI engine, and its Jenkins
//! implementation.
//!
//! Every operation is keyed by the project id (the admin namespace name) and,
//! for pipelines and credentials, by the resource name. A missing remote
//! object must surface as an error for which [`DevOpsError::is_not_found`]
//! is true; reconcilers rely on that to decide between create and update.

mod credential;
mod error;
pub mod jenkins;

pub use credential::{Credential, CredentialPayload, RemoteCredential};
pub use error::DevOpsError;
pub use jenkins::JenkinsClient;

use crate::crd::NoScmPipeline;
use async_trait::async_trait;

/// Remote CI engine operations used by the reconcilers
#[async_trait]
pub trait DevOpsClient: Send + Sync {
    /// Create the project folder; returns its id
    async fn create_devops_project(&self, project_id: &str) -> Result<String, DevOpsError>;

    /// Look up the project folder; returns its id
    async fn get_devops_project(&self, project_id: &str) -> Result<String, DevOpsError>;

    async fn delete_devops_project(&self, project_id: &str) -> Result<(), DevOpsError>;

    /// Create a pipeline job inside the project; returns the job name
    async fn create_project_pipeline(
        &self,
        project_id: &str,
        job: &NoScmPipeline,
    ) -> Result<String, DevOpsError>;

    /// Current definition of a pipeline job as stored by the CI engine
    async fn get_project_pipeline_config(
        &self,
        project_id: &str,
        pipeline_id: &str,
    ) -> Result<NoScmPipeline, DevOpsError>;

    async fn update_project_pipeline(
        &self,
        project_id: &str,
        job: &NoScmPipeline,
    ) -> Result<String, DevOpsError>;

    async fn delete_project_pipeline(
        &self,
        project_id: &str,
        pipeline_id: &str,
    ) -> Result<(), DevOpsError>;

    /// Create a credential in the project's credential store; returns its id
    async fn create_credential_in_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<String, DevOpsError>;

    /// Public view of a stored credential (secret material is never returned)
    async fn get_credential_in_project(
        &self,
        project_id: &str,
        credential_id: &str,
    ) -> Result<RemoteCredential, DevOpsError>;

    async fn update_credential_in_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<String, DevOpsError>;

    async fn delete_credential_in_project(
        &self,
        project_id: &str,
        credential_id: &str,
    ) -> Result<(), DevOpsError>;
}
