//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Defaults can be overridden via environment variables where applicable
//! (see [`crate::config::ControllerConfig`]).

/// API group of the DevOps custom resources
pub const DEVOPS_GROUP: &str = "devops.kubesphere.io";

/// API version of the DevOps custom resources
pub const DEVOPS_VERSION: &str = "v1alpha3";

/// Finalizer guarding the remote Jenkins folder of a `DevOpsProject`
pub const DEVOPS_PROJECT_FINALIZER: &str = "devopsproject.finalizers.kubesphere.io";

/// Finalizer guarding the remote Jenkins job of a `Pipeline`
pub const PIPELINE_FINALIZER: &str = "pipeline.finalizers.kubesphere.io";

/// Finalizer guarding the remote Jenkins credential of a credential `Secret`
pub const CREDENTIAL_FINALIZER: &str = "credential.finalizers.kubesphere.io";

/// Label put on the admin namespace of a DevOps project (value: project name)
pub const DEVOPS_PROJECT_LABEL: &str = "kubesphere.io/devopsproject";

/// Secret type prefix marking a secret as a DevOps credential
pub const CREDENTIAL_TYPE_PREFIX: &str = "credential.devops.kubesphere.io/";

/// Annotation forcing a credential to be pushed to Jenkins on every reconcile
pub const CREDENTIAL_AUTOSYNC_ANNOTATION: &str = "credential.devops.kubesphere.io/autosync";

/// Annotation carrying a human readable credential description
pub const CREDENTIAL_DESCRIPTION_ANNOTATION: &str = "kubesphere.io/description";

/// Path prefix of the kapis web service
pub const KAPIS_PREFIX: &str = "/kapis/devops.kubesphere.io/v1alpha3";

/// Default HTTP server port for metrics, probes and the event webhook
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default number of concurrent reconciliations for DevOps projects
pub const DEFAULT_PROJECT_WORKERS: u16 = 1;

/// Default number of concurrent reconciliations for pipelines
pub const DEFAULT_PIPELINE_WORKERS: u16 = 5;

/// Default number of concurrent reconciliations for credentials
pub const DEFAULT_CREDENTIAL_WORKERS: u16 = 5;

/// Default base delay of the per-key failure rate limiter (milliseconds)
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 5;

/// Default ceiling of the per-key failure rate limiter (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 1000;

/// Default timeout for a single Jenkins request (seconds)
pub const DEFAULT_JENKINS_TIMEOUT_SECS: u64 = 30;

/// Default Jenkins endpoint (in-cluster service)
pub const DEFAULT_JENKINS_URL: &str = "http://ks-jenkins.kubesphere-devops-system.svc";

/// Default upper bound on webhook bodies (bytes)
pub const DEFAULT_WEBHOOK_BODY_LIMIT: usize = 2 * 1024 * 1024;
