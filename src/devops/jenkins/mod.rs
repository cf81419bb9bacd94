//! # Jenkins Client
//!
//! [`DevOpsClient`] over the Jenkins REST API.
//!
//! - A DevOps project is a folder job at `/job/{project}`
//! - A pipeline is a workflow job inside that folder, managed through its `config.xml`
//! - Credentials live in the folder's own credential store (domain `_`)
//!
//! Requests authenticate with a user API token, which Jenkins exempts from
//! CSRF crumbs. Jenkins answers most mutating calls with a redirect; those
//! are not followed and count as success.

pub mod config_xml;

use super::{Credential, CredentialPayload, DevOpsClient, DevOpsError, RemoteCredential};
use crate::config::JenkinsConfig;
use crate::crd::NoScmPipeline;
use async_trait::async_trait;
use reqwest::{redirect, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info_span, Instrument};
use zeroize::Zeroizing;

const FOLDER_MODE: &str = "com.cloudbees.hudson.plugins.folder.Folder";

/// Jenkins REST client
pub struct JenkinsClient {
    http_client: Client,
    base_url: String,
    user: String,
    token: String,
}

impl std::fmt::Debug for JenkinsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JenkinsClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct JobInfo {
    name: String,
}

impl JenkinsClient {
    /// Build a client from connection settings
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed (TLS setup)
    pub fn new(config: &JenkinsConfig) -> Result<Self, DevOpsError> {
        let http_client = Client::builder()
            .timeout(config.timeout())
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client
            .get(format!("{}{path}", self.base_url))
            .basic_auth(&self.user, Some(&self.token))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http_client
            .post(format!("{}{path}", self.base_url))
            .basic_auth(&self.user, Some(&self.token))
    }

    /// Send a request and turn any non-2xx/3xx answer into [`DevOpsError::Status`]
    async fn send(
        &self,
        request: RequestBuilder,
        operation: &'static str,
        target: &str,
    ) -> Result<Response, DevOpsError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(operation, resource = target, status = status.as_u16(), "Jenkins answered");
        if status.is_success() || status.is_redirection() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(DevOpsError::Status {
            operation,
            target: target.to_string(),
            code: status.as_u16(),
            message: first_line(&message),
        })
    }
}

fn folder_path(project_id: &str) -> String {
    format!("/job/{project_id}")
}

fn job_path(project_id: &str, pipeline_id: &str) -> String {
    format!("/job/{project_id}/job/{pipeline_id}")
}

fn credential_store_path(project_id: &str) -> String {
    format!("/job/{project_id}/credentials/store/folder/domain/_")
}

fn credential_path(project_id: &str, credential_id: &str) -> String {
    format!("{}/credential/{credential_id}", credential_store_path(project_id))
}

// Jenkins error pages are full HTML documents
fn first_line(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect()
}

/// Stapler JSON describing a credential, as the credentials plugin form expects it
fn credential_json(credential: &Credential) -> serde_json::Value {
    let mut body = match &credential.payload {
        CredentialPayload::BasicAuth { username, password } => json!({
            "username": username,
            "password": password,
            "$class": "com.cloudbees.plugins.credentials.impl.UsernamePasswordCredentialsImpl",
        }),
        CredentialPayload::SshAuth {
            username,
            private_key,
            passphrase,
        } => json!({
            "username": username,
            "passphrase": passphrase,
            "privateKeySource": {
                "stapler-class": "com.cloudbees.jenkins.plugins.sshcredentials.impl.BasicSSHUserPrivateKey$DirectEntryPrivateKeySource",
                "privateKey": private_key,
            },
            "$class": "com.cloudbees.jenkins.plugins.sshcredentials.impl.BasicSSHUserPrivateKey",
        }),
        CredentialPayload::SecretText { secret } => json!({
            "secret": secret,
            "$class": "org.jenkinsci.plugins.plaincredentials.impl.StringCredentialsImpl",
        }),
        CredentialPayload::Kubeconfig { content } => json!({
            "kubeconfigSource": {
                "stapler-class": "com.microsoft.jenkins.kubernetes.credentials.KubeconfigCredentials$DirectEntryKubeconfigSource",
                "content": content,
            },
            "$class": "com.microsoft.jenkins.kubernetes.credentials.KubeconfigCredentials",
        }),
    };
    body["scope"] = json!("GLOBAL");
    body["id"] = json!(credential.id);
    body["description"] = json!(credential.description);
    body
}

#[async_trait]
impl DevOpsClient for JenkinsClient {
    async fn create_devops_project(&self, project_id: &str) -> Result<String, DevOpsError> {
        let request = self
            .post("/createItem")
            .query(&[("name", project_id)])
            .form(&[("name", project_id), ("mode", FOLDER_MODE), ("from", "")]);
        self.send(request, "create project", project_id)
            .instrument(info_span!("jenkins.create_project", project = project_id))
            .await?;
        Ok(project_id.to_string())
    }

    async fn get_devops_project(&self, project_id: &str) -> Result<String, DevOpsError> {
        let request = self.get(&format!("{}/api/json", folder_path(project_id)));
        let info: JobInfo = self
            .send(request, "get project", project_id)
            .await?
            .json()
            .await?;
        Ok(info.name)
    }

    async fn delete_devops_project(&self, project_id: &str) -> Result<(), DevOpsError> {
        let request = self.post(&format!("{}/doDelete", folder_path(project_id)));
        self.send(request, "delete project", project_id)
            .instrument(info_span!("jenkins.delete_project", project = project_id))
            .await?;
        Ok(())
    }

    async fn create_project_pipeline(
        &self,
        project_id: &str,
        job: &NoScmPipeline,
    ) -> Result<String, DevOpsError> {
        let request = self
            .post(&format!("{}/createItem", folder_path(project_id)))
            .query(&[("name", job.name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(config_xml::render(job));
        self.send(request, "create pipeline", &job.name)
            .instrument(info_span!(
                "jenkins.create_pipeline",
                project = project_id,
                pipeline = %job.name,
            ))
            .await?;
        Ok(job.name.clone())
    }

    async fn get_project_pipeline_config(
        &self,
        project_id: &str,
        pipeline_id: &str,
    ) -> Result<NoScmPipeline, DevOpsError> {
        let request = self.get(&format!("{}/config.xml", job_path(project_id, pipeline_id)));
        let xml = self
            .send(request, "get pipeline", pipeline_id)
            .await?
            .text()
            .await?;
        config_xml::parse(pipeline_id, &xml)
    }

    async fn update_project_pipeline(
        &self,
        project_id: &str,
        job: &NoScmPipeline,
    ) -> Result<String, DevOpsError> {
        let request = self
            .post(&format!("{}/config.xml", job_path(project_id, &job.name)))
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(config_xml::render(job));
        self.send(request, "update pipeline", &job.name)
            .instrument(info_span!(
                "jenkins.update_pipeline",
                project = project_id,
                pipeline = %job.name,
            ))
            .await?;
        Ok(job.name.clone())
    }

    async fn delete_project_pipeline(
        &self,
        project_id: &str,
        pipeline_id: &str,
    ) -> Result<(), DevOpsError> {
        let request = self.post(&format!("{}/doDelete", job_path(project_id, pipeline_id)));
        self.send(request, "delete pipeline", pipeline_id)
            .instrument(info_span!(
                "jenkins.delete_pipeline",
                project = project_id,
                pipeline = pipeline_id,
            ))
            .await?;
        Ok(())
    }

    async fn create_credential_in_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<String, DevOpsError> {
        let form = Zeroizing::new(
            json!({ "": "0", "credentials": credential_json(credential) }).to_string(),
        );
        let request = self
            .post(&format!("{}/createCredentials", credential_store_path(project_id)))
            .form(&[("json", form.as_str())]);
        self.send(request, "create credential", &credential.id)
            .instrument(info_span!(
                "jenkins.create_credential",
                project = project_id,
                credential = %credential.id,
            ))
            .await?;
        Ok(credential.id.clone())
    }

    async fn get_credential_in_project(
        &self,
        project_id: &str,
        credential_id: &str,
    ) -> Result<RemoteCredential, DevOpsError> {
        let request = self.get(&format!(
            "{}/api/json",
            credential_path(project_id, credential_id)
        ));
        let remote = self
            .send(request, "get credential", credential_id)
            .await?
            .json()
            .await?;
        Ok(remote)
    }

    async fn update_credential_in_project(
        &self,
        project_id: &str,
        credential: &Credential,
    ) -> Result<String, DevOpsError> {
        let form = Zeroizing::new(credential_json(credential).to_string());
        let request = self
            .post(&format!(
                "{}/updateSubmit",
                credential_path(project_id, &credential.id)
            ))
            .form(&[("json", form.as_str())]);
        self.send(request, "update credential", &credential.id)
            .instrument(info_span!(
                "jenkins.update_credential",
                project = project_id,
                credential = %credential.id,
            ))
            .await?;
        Ok(credential.id.clone())
    }

    async fn delete_credential_in_project(
        &self,
        project_id: &str,
        credential_id: &str,
    ) -> Result<(), DevOpsError> {
        let request = self.post(&format!(
            "{}/doDelete",
            credential_path(project_id, credential_id)
        ));
        self.send(request, "delete credential", credential_id)
            .instrument(info_span!(
                "jenkins.delete_credential",
                project = project_id,
                credential = credential_id,
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(payload: CredentialPayload) -> Credential {
        Credential {
            id: "deploy-key".to_string(),
            description: "prod deploy".to_string(),
            payload,
        }
    }

    #[test]
    fn test_new_trims_base_url() {
        let config = JenkinsConfig {
            url: "http://jenkins.local/".to_string(),
            ..JenkinsConfig::default()
        };
        let client = JenkinsClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://jenkins.local");
    }

    #[test]
    fn test_paths() {
        assert_eq!(job_path("demo-x1", "build"), "/job/demo-x1/job/build");
        assert_eq!(
            credential_path("demo-x1", "git"),
            "/job/demo-x1/credentials/store/folder/domain/_/credential/git"
        );
    }

    #[test]
    fn test_ssh_credential_json() {
        let body = credential_json(&credential(CredentialPayload::SshAuth {
            username: "git".to_string(),
            private_key: "KEY".to_string(),
            passphrase: String::new(),
        }));
        assert_eq!(body["id"], "deploy-key");
        assert_eq!(body["scope"], "GLOBAL");
        assert_eq!(body["description"], "prod deploy");
        assert_eq!(body["privateKeySource"]["privateKey"], "KEY");
        assert_eq!(
            body["$class"],
            "com.cloudbees.jenkins.plugins.sshcredentials.impl.BasicSSHUserPrivateKey"
        );
    }

    #[test]
    fn test_secret_text_credential_json() {
        let body = credential_json(&credential(CredentialPayload::SecretText {
            secret: "s3cr3t".to_string(),
        }));
        assert_eq!(body["secret"], "s3cr3t");
        assert_eq!(
            body["$class"],
            "org.jenkinsci.plugins.plaincredentials.impl.StringCredentialsImpl"
        );
    }

    #[test]
    fn test_first_line_of_error_page() {
        assert_eq!(first_line("\n  <html>\n<body>oops</body>"), "<html>");
        assert_eq!(first_line(""), "");
    }
}
