use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pipeline Custom Resource Definition
///
/// Lives in the admin namespace of a `DevOpsProject` and maps onto a Jenkins
/// pipeline job inside the project's folder.
///
/// # Example
///
/// ```yaml
/// apiVersion: devops.kubesphere.io/v1alpha3
/// kind: Pipeline
/// metadata:
///   name: build
///   namespace: demo7x9kq
/// spec:
///   type: pipeline
///   pipeline:
///     name: build
///     jenkinsfile: |
///       pipeline { agent any; stages { stage('b') { steps { echo 'hi' } } } }
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "devops.kubesphere.io",
    version = "v1alpha3",
    kind = "Pipeline",
    namespaced,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    #[serde(rename = "type", default)]
    pub pipeline_type: PipelineType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<NoScmPipeline>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PipelineType {
    #[default]
    Pipeline,
}

/// Pipeline job without SCM: the Jenkinsfile is stored inline
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoScmPipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jenkinsfile: Option<String>,
    #[serde(default)]
    pub disable_concurrent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discarder: Option<DiscarderProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_trigger: Option<TimerTrigger>,
}

/// Build discarder: how long and how many builds Jenkins keeps
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiscarderProperty {
    #[serde(default)]
    pub days_to_keep: String,
    #[serde(default)]
    pub num_to_keep: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimerTrigger {
    pub cron: String,
}

impl Pipeline {
    /// Job definition to push to Jenkins.
    ///
    /// The job is always named after the resource, whatever `spec.pipeline.name` says.
    pub fn desired_job(&self) -> NoScmPipeline {
        let name = self.metadata.name.clone().unwrap_or_default();
        let mut job = self.spec.pipeline.clone().unwrap_or_default();
        job.name = name;
        job
    }
}
