//! # Custom Resource Definitions
//!
//! Types reconciled by the DevOps controllers.
//!
//! ## Module Structure
//!
//! - `project.rs` - cluster-scoped `DevOpsProject`
//! - `pipeline.rs` - namespaced `Pipeline` and its Jenkins job definition
//! - `credential.rs` - helpers for credential `Secret`s (no CRD, core type)

mod credential;
mod pipeline;
mod project;

pub use credential::{
    credential_type, is_devops_credential, wants_autosync, CredentialType,
};
pub use pipeline::{
    DiscarderProperty, NoScmPipeline, Pipeline, PipelineSpec, PipelineType, TimerTrigger,
};
pub use project::{DevOpsProject, DevOpsProjectSpec, DevOpsProjectStatus};
