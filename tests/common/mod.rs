//! Common test utilities for the controller integration tests
//!
//! Provides rustls crypto provider setup and in-memory stand-ins for the
//! Kubernetes object cache, the namespace cache and the CI engine.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use devops_controller::constants::{DEVOPS_GROUP, DEVOPS_PROJECT_LABEL, DEVOPS_VERSION};
use devops_controller::controller::backoff::RateLimiter;
use devops_controller::controller::reconciler::{
    DevOpsResource, NamespaceStore, ObjectStore, Reconciler,
};
use devops_controller::crd::{
    DevOpsProject, DevOpsProjectSpec, DevOpsProjectStatus, NoScmPipeline, Pipeline, PipelineSpec,
    PipelineType,
};
use devops_controller::devops::{Credential, DevOpsClient, DevOpsError, RemoteCredential};
use k8s_openapi::api::core::v1::{Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference, Time};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Matches the provider the controller binary installs
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// In-memory CI engine that records every call
#[derive(Debug, Default)]
pub struct MemoryDevOpsClient {
    pub projects: Mutex<HashSet<String>>,
    pub pipelines: Mutex<HashMap<(String, String), NoScmPipeline>>,
    pub credentials: Mutex<HashMap<(String, String), RemoteCredential>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryDevOpsClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call to `method` answer HTTP 500
    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    /// Method names in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls().iter().filter(|c| *c == method).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, method: &'static str, target: &str) -> Result<(), DevOpsError> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing.lock().unwrap().contains(method) {
            return Err(DevOpsError::Status {
                operation: method,
                target: target.to_string(),
                code: 500,
                message: "boom".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DevOpsClient for MemoryDevOpsClient {
    async fn create_devops_project(&self, project_id: &str) -> Result<String, DevOpsError> {
        self.record("create_devops_project", project_id)?;
        self.projects.lock().unwrap().insert(project_id.to_string());
        Ok(project_id.to_string())
    }

    async fn get_devops_project(&self, project_id: &str) -> Result<String, DevOpsError> {
        self.record("get_devops_project", project_id)?;
        if self.projects.lock().unwrap().contains(project_id) {
            Ok(project_id.to_string())
        } else {
            Err(DevOpsError::not_found("get folder", project_id))
        }
    }

    async fn delete_devops_project(&self, project_id: &str) -> Result<(), DevOpsError> {
        self.record("delete_devops_project", project_id)?;
        if self.projects.lock().unwrap().remove(project_id) {
            Ok(())
        } else {
            Err(DevOpsError::not_found("delete folder", project_id))
        }
    }

    async fn create_project_pipeline(
        &self,
        project_id: &str,
        job: &NoScmPipeline,
    ) -> Result<String, DevOpsError> {
        self.record("create_project_pipeline", &job.name)?;
        self.pipelines
            .lock()
            .unwrap()
            .insert((project_id.to_string(), job.name.clone()), job.clone());
        Ok(job.name.clone())
    }

    async fn get_project_pipeline_config(
        &self,
        project_id: &str,
        pipeline_id: &str,
    ) -> Result<NoScmPipeline, DevOpsError> {
        self.record("get_project_pipeline_config", pipeline_id)?;
        self.pipelines
            .lock()
            .unwrap()
            .get(&(project_id.to_string(), pipeline_id.to_string()))
            .cloned()
            .ok_or_else(|| DevOpsError::not_found("get pipeline", pipeline_id))
    }

    async fn update_project_pipeline(
        &self,
        project_id: &str,
        job: &NoScmPipeline,
    ) -> Result<String, DevOpsError> {
        self.record("update_project_pipeline", &job.name)?;
        self.pipelines
            .lock()
            .unwrap()
            .insert((project_id.to_string(), job.name.clone()), job.clone());
        Ok(job.name.clone())
    }

    async fn delete_project_pipeline(
        &self,
        project_id: &str,
        pipeline_id: &str,
    ) -> Result<(), DevOpsError> {
        self.record("delete_project_pipeline", pipeline_id)?;
        self.pipelines
            .lock()
            .unwrap()
            .remove(&(project_id.to_string(), pipeline_id.to_string()))
            .map(drop)
            .ok_or_else(|| DevOpsError::not_found("delete pipeline", pipeline_id))
    }

    async fn create_credential_in_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<String, DevOpsError> {
        self.record("create_credential_in_project", &credential.id)?;
        self.credentials.lock().unwrap().insert(
            (project_id.to_string(), credential.id.clone()),
            remote_view(credential),
        );
        Ok(credential.id.clone())
    }

    async fn get_credential_in_project(
        &self,
        project_id: &str,
        credential_id: &str,
    ) -> Result<RemoteCredential, DevOpsError> {
        self.record("get_credential_in_project", credential_id)?;
        self.credentials
            .lock()
            .unwrap()
            .get(&(project_id.to_string(), credential_id.to_string()))
            .cloned()
            .ok_or_else(|| DevOpsError::not_found("get credential", credential_id))
    }

    async fn update_credential_in_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<String, DevOpsError> {
        self.record("update_credential_in_project", &credential.id)?;
        self.credentials.lock().unwrap().insert(
            (project_id.to_string(), credential.id.clone()),
            remote_view(credential),
        );
        Ok(credential.id.clone())
    }

    async fn delete_credential_in_project(
        &self,
        project_id: &str,
        credential_id: &str,
    ) -> Result<(), DevOpsError> {
        self.record("delete_credential_in_project", credential_id)?;
        self.credentials
            .lock()
            .unwrap()
            .remove(&(project_id.to_string(), credential_id.to_string()))
            .map(drop)
            .ok_or_else(|| DevOpsError::not_found("delete credential", credential_id))
    }
}

fn remote_view(credential: &Credential) -> RemoteCredential {
    RemoteCredential {
        id: credential.id.clone(),
        description: credential.description.clone(),
        type_name: Some(credential.payload.type_name().to_string()),
    }
}

type ObjectKey = (Option<String>, String);

/// Object cache and API server in one
///
/// Mimics the API server in one respect the reconciler relies on: an object
/// being deleted disappears once its last finalizer is removed.
#[derive(Debug)]
pub struct MemoryObjects<K> {
    objects: Mutex<HashMap<ObjectKey, K>>,
    updates: Mutex<usize>,
}

impl<K: DevOpsResource> MemoryObjects<K> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            objects: Mutex::new(HashMap::new()),
            updates: Mutex::new(0),
        })
    }

    pub fn insert(&self, obj: K) {
        let key = (obj.namespace(), obj.name_any());
        self.objects.lock().unwrap().insert(key, obj);
    }

    /// Hard delete, as when the last finalizer is stripped by someone else
    pub fn remove(&self, namespace: Option<&str>, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .remove(&(namespace.map(str::to_string), name.to_string()));
    }

    pub fn stored(&self, namespace: Option<&str>, name: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&(namespace.map(str::to_string), name.to_string()))
            .cloned()
    }

    /// Number of writes (update and status update) seen so far
    pub fn updates(&self) -> usize {
        *self.updates.lock().unwrap()
    }
}

#[async_trait]
impl<K: DevOpsResource> ObjectStore<K> for MemoryObjects<K> {
    fn get(&self, namespace: Option<&str>, name: &str) -> Option<Arc<K>> {
        self.stored(namespace, name).map(Arc::new)
    }

    async fn update(&self, obj: &K) -> Result<K, kube::Error> {
        *self.updates.lock().unwrap() += 1;
        let key = (obj.namespace(), obj.name_any());
        let mut objects = self.objects.lock().unwrap();
        if obj.meta().deletion_timestamp.is_some() && obj.finalizers().is_empty() {
            objects.remove(&key);
        } else {
            objects.insert(key, obj.clone());
        }
        Ok(obj.clone())
    }

    async fn update_status(&self, obj: &K, status: serde_json::Value) -> Result<K, kube::Error> {
        *self.updates.lock().unwrap() += 1;
        let mut value = serde_json::to_value(obj).unwrap();
        value["status"] = status;
        let updated: K = serde_json::from_value(value).unwrap();
        self.insert(updated.clone());
        Ok(updated)
    }
}

/// Namespace cache and API in one; `generateName` gets a counter suffix
#[derive(Debug, Default)]
pub struct MemoryNamespaces {
    namespaces: Mutex<HashMap<String, Namespace>>,
    created: Mutex<Vec<Namespace>>,
}

impl MemoryNamespaces {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, namespace: Namespace) {
        self.namespaces
            .lock()
            .unwrap()
            .insert(namespace.name_any(), namespace);
    }

    /// Namespaces created through the store, in order
    pub fn created(&self) -> Vec<Namespace> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl NamespaceStore for MemoryNamespaces {
    fn get(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.lock().unwrap().get(name).cloned().map(Arc::new)
    }

    fn admin_namespace_candidates(&self, project: &str) -> Vec<Arc<Namespace>> {
        self.namespaces
            .lock()
            .unwrap()
            .values()
            .filter(|ns| ns.labels().get(DEVOPS_PROJECT_LABEL).map(String::as_str) == Some(project))
            .cloned()
            .map(Arc::new)
            .collect()
    }

    async fn create(&self, namespace: &Namespace) -> Result<Namespace, kube::Error> {
        let mut created = namespace.clone();
        if created.metadata.name.is_none() {
            let prefix = created.metadata.generate_name.clone().unwrap_or_default();
            let n = self.created.lock().unwrap().len();
            created.metadata.name = Some(format!("{prefix}{n:05}"));
        }
        self.insert(created.clone());
        self.created.lock().unwrap().push(created.clone());
        Ok(created)
    }
}

/// Fakes behind one reconciler
pub struct Harness<K: DevOpsResource> {
    pub objects: Arc<MemoryObjects<K>>,
    pub namespaces: Arc<MemoryNamespaces>,
    pub devops: Arc<MemoryDevOpsClient>,
    pub reconciler: Arc<Reconciler<K>>,
}

impl<K: DevOpsResource> Harness<K> {
    pub fn new() -> Self {
        let objects = MemoryObjects::<K>::new();
        let namespaces = MemoryNamespaces::new();
        let devops = MemoryDevOpsClient::new();
        let reconciler = Arc::new(Reconciler::new(
            objects.clone(),
            namespaces.clone(),
            devops.clone(),
            RateLimiter::new(Duration::from_millis(5), Duration::from_secs(1000)),
        ));
        Self {
            objects,
            namespaces,
            devops,
            reconciler,
        }
    }
}

/// Admin namespace labelled for and owned by `project`
pub fn devops_namespace(name: &str, project: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                DEVOPS_PROJECT_LABEL.to_string(),
                project.to_string(),
            )])),
            owner_references: Some(vec![OwnerReference {
                api_version: format!("{DEVOPS_GROUP}/{DEVOPS_VERSION}"),
                kind: "DevOpsProject".to_string(),
                name: project.to_string(),
                uid: format!("uid-{project}"),
                controller: Some(true),
                ..OwnerReference::default()
            }]),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}

pub fn plain_namespace(name: &str) -> Namespace {
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        ..Namespace::default()
    }
}

pub fn project(name: &str, admin_namespace: Option<&str>) -> DevOpsProject {
    let mut project = DevOpsProject::new(name, DevOpsProjectSpec::default());
    project.metadata.uid = Some(format!("uid-{name}"));
    project.status = admin_namespace.map(|ns| DevOpsProjectStatus {
        admin_namespace: Some(ns.to_string()),
    });
    project
}

pub fn pipeline(namespace: &str, name: &str, jenkinsfile: &str) -> Pipeline {
    let mut pipeline = Pipeline::new(
        name,
        PipelineSpec {
            pipeline_type: PipelineType::Pipeline,
            pipeline: Some(NoScmPipeline {
                name: name.to_string(),
                jenkinsfile: Some(jenkinsfile.to_string()),
                ..NoScmPipeline::default()
            }),
        },
    );
    pipeline.metadata.namespace = Some(namespace.to_string());
    pipeline
}

pub fn credential_secret(namespace: &str, name: &str, kind: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        type_: Some(format!("credential.devops.kubesphere.io/{kind}")),
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Secret::default()
    }
}

pub fn with_finalizer<K: DevOpsResource>(mut obj: K) -> K {
    obj.finalizers_mut().push(K::FINALIZER.to_string());
    obj
}

pub fn terminating<K: DevOpsResource>(mut obj: K) -> K {
    let now: Time = serde_json::from_value(serde_json::json!("2026-01-01T00:00:00Z")).unwrap();
    obj.meta_mut().deletion_timestamp = Some(now);
    obj
}
