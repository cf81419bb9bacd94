use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DevOpsProject Custom Resource Definition
///
/// A DevOps project owns an admin namespace (created by the controller) which
/// holds its pipelines and credentials, and a Jenkins folder named after that
/// namespace.
///
/// # Example
///
/// ```yaml
/// apiVersion: devops.kubesphere.io/v1alpha3
/// kind: DevOpsProject
/// metadata:
///   name: demo
/// spec: {}
/// ```
#[allow(
    clippy::empty_structs_with_brackets,
    reason = "the CRD spec must serialize as an object"
)]
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "devops.kubesphere.io",
    version = "v1alpha3",
    kind = "DevOpsProject",
    status = "DevOpsProjectStatus",
    shortname = "dp",
    printcolumn = r#"{"name":"AdminNamespace", "type":"string", "jsonPath":".status.adminNamespace"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DevOpsProjectSpec {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DevOpsProjectStatus {
    /// Namespace created for this project; also the Jenkins folder name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_namespace: Option<String>,
}

impl DevOpsProject {
    /// Admin namespace recorded in status, if any
    pub fn admin_namespace(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.admin_namespace.as_deref())
            .filter(|ns| !ns.is_empty())
    }
}
