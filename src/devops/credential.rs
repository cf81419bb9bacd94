//! Credential payloads pushed to the CI engine.
//!
//! Secret material only lives here for the duration of one request and is
//! wiped when the value is dropped.

use super::DevOpsError;
use crate::constants::CREDENTIAL_DESCRIPTION_ANNOTATION;
use crate::crd::{credential_type, CredentialType};
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use serde::Deserialize;
use zeroize::Zeroize;

#[derive(Clone, Zeroize)]
pub enum CredentialPayload {
    BasicAuth {
        username: String,
        password: String,
    },
    SshAuth {
        username: String,
        private_key: String,
        passphrase: String,
    },
    SecretText {
        secret: String,
    },
    Kubeconfig {
        content: String,
    },
}

impl std::fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

impl CredentialPayload {
    /// `typeName` Jenkins reports for this kind of credential
    pub fn type_name(&self) -> &'static str {
        match self {
            CredentialPayload::BasicAuth { .. } => "Username with password",
            CredentialPayload::SshAuth { .. } => "SSH Username with private key",
            CredentialPayload::SecretText { .. } => "Secret text",
            CredentialPayload::Kubeconfig { .. } => "Kubernetes configuration (kubeconfig)",
        }
    }
}

/// A DevOps credential, decoded from its `Secret`
#[derive(Clone)]
pub struct Credential {
    pub id: String,
    pub description: String,
    pub payload: CredentialPayload,
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.payload.zeroize();
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("type", &self.payload.type_name())
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Decode a credential secret. Missing optional fields become empty strings;
    /// missing required fields are an error.
    pub fn from_secret(secret: &Secret) -> Result<Self, DevOpsError> {
        let name = secret.name_any();
        let invalid = |reason: String| DevOpsError::InvalidCredential {
            name: name.clone(),
            reason,
        };
        let kind = credential_type(secret).ok_or_else(|| {
            invalid(format!(
                "unsupported secret type {}",
                secret.type_.as_deref().unwrap_or("<none>")
            ))
        })?;

        let field = |key: &str| -> Option<String> {
            secret
                .data
                .as_ref()
                .and_then(|d| d.get(key))
                .map(|v| String::from_utf8_lossy(&v.0).into_owned())
        };
        let required = |key: &str| {
            field(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| invalid(format!("missing field {key}")))
        };

        let payload = match kind {
            CredentialType::BasicAuth => CredentialPayload::BasicAuth {
                username: required("username")?,
                password: field("password").unwrap_or_default(),
            },
            CredentialType::SshAuth => CredentialPayload::SshAuth {
                username: required("username")?,
                private_key: required("private_key")?,
                passphrase: field("passphrase").unwrap_or_default(),
            },
            CredentialType::SecretText => CredentialPayload::SecretText {
                secret: required("secret")?,
            },
            CredentialType::Kubeconfig => CredentialPayload::Kubeconfig {
                content: required("content")?,
            },
        };

        Ok(Credential {
            id: name.clone(),
            description: secret
                .annotations()
                .get(CREDENTIAL_DESCRIPTION_ANNOTATION)
                .cloned()
                .unwrap_or_default(),
            payload,
        })
    }

    /// True when the remote view disagrees with this credential's public fields
    pub fn differs_from(&self, remote: &RemoteCredential) -> bool {
        remote.description != self.description
            || remote
                .type_name
                .as_deref()
                .is_some_and(|t| t != self.payload.type_name())
    }
}

/// What the CI engine reveals about a stored credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCredential {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub type_name: Option<String>,
}
