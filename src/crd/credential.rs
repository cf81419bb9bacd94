use crate::constants::{CREDENTIAL_AUTOSYNC_ANNOTATION, CREDENTIAL_TYPE_PREFIX};
use k8s_openapi::api::core::v1::Secret;

/// Kinds of credential a DevOps secret can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    BasicAuth,
    SshAuth,
    SecretText,
    Kubeconfig,
}

impl CredentialType {
    /// Secret type suffix after [`CREDENTIAL_TYPE_PREFIX`]
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialType::BasicAuth => "basic-auth",
            CredentialType::SshAuth => "ssh-auth",
            CredentialType::SecretText => "secret-text",
            CredentialType::Kubeconfig => "kubeconfig",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "basic-auth" => Some(CredentialType::BasicAuth),
            "ssh-auth" => Some(CredentialType::SshAuth),
            "secret-text" => Some(CredentialType::SecretText),
            "kubeconfig" => Some(CredentialType::Kubeconfig),
            _ => None,
        }
    }
}

/// True when the secret is managed by the credential controller
pub fn is_devops_credential(secret: &Secret) -> bool {
    secret
        .type_
        .as_deref()
        .is_some_and(|t| t.starts_with(CREDENTIAL_TYPE_PREFIX))
}

/// Parsed credential type; `None` for foreign or unknown types
pub fn credential_type(secret: &Secret) -> Option<CredentialType> {
    secret
        .type_
        .as_deref()
        .and_then(|t| t.strip_prefix(CREDENTIAL_TYPE_PREFIX))
        .and_then(CredentialType::from_suffix)
}

/// True when the secret asks to be pushed to Jenkins on every reconcile
pub fn wants_autosync(secret: &Secret) -> bool {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(CREDENTIAL_AUTOSYNC_ANNOTATION))
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn secret_of_type(t: &str) -> Secret {
        Secret {
            type_: Some(t.to_string()),
            ..Secret::default()
        }
    }

    #[test]
    fn test_is_devops_credential() {
        assert!(is_devops_credential(&secret_of_type(
            "credential.devops.kubesphere.io/basic-auth"
        )));
        assert!(!is_devops_credential(&secret_of_type("Opaque")));
        assert!(!is_devops_credential(&Secret::default()));
    }

    #[test]
    fn test_credential_type() {
        assert_eq!(
            credential_type(&secret_of_type("credential.devops.kubesphere.io/ssh-auth")),
            Some(CredentialType::SshAuth)
        );
        assert_eq!(
            credential_type(&secret_of_type("credential.devops.kubesphere.io/unknown")),
            None
        );
        assert_eq!(credential_type(&secret_of_type("kubernetes.io/tls")), None);
    }

    #[test]
    fn test_wants_autosync() {
        let mut secret = secret_of_type("credential.devops.kubesphere.io/secret-text");
        assert!(!wants_autosync(&secret));
        secret.metadata.annotations = Some(BTreeMap::from([(
            CREDENTIAL_AUTOSYNC_ANNOTATION.to_string(),
            "true".to_string(),
        )]));
        assert!(wants_autosync(&secret));
    }
}
