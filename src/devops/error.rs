use thiserror::Error;

#[derive(Debug, Error)]
pub enum DevOpsError {
    /// The CI engine answered with a non-success status
    #[error("{operation} {target}: HTTP {code}: {message}")]
    Status {
        operation: &'static str,
        target: String,
        code: u16,
        message: String,
    },
    /// The request never produced a response (connect, timeout, decode)
    #[error("request to CI engine failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The credential secret lacks a field its type requires
    #[error("invalid credential {name}: {reason}")]
    InvalidCredential { name: String, reason: String },
    /// The stored job configuration could not be read back
    #[error("unreadable config of pipeline {name}: {reason}")]
    MalformedConfig { name: String, reason: String },
}

impl DevOpsError {
    /// Shorthand for a 404 answer, used by adapters and fakes alike
    pub fn not_found(operation: &'static str, target: impl Into<String>) -> Self {
        DevOpsError::Status {
            operation,
            target: target.into(),
            code: 404,
            message: "not found".to_string(),
        }
    }

    /// HTTP status code, when the CI engine answered at all
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DevOpsError::Status { code, .. } => Some(*code),
            DevOpsError::Transport(e) => e.status().map(|s| s.as_u16()),
            DevOpsError::InvalidCredential { .. } | DevOpsError::MalformedConfig { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = DevOpsError::not_found("get project", "demo");
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "get project demo: HTTP 404: not found");
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        let err = DevOpsError::Status {
            operation: "create project",
            target: "demo".to_string(),
            code: 500,
            message: "boom".to_string(),
        };
        assert!(!err.is_not_found());
        let err = DevOpsError::InvalidCredential {
            name: "c".to_string(),
            reason: "missing username".to_string(),
        };
        assert_eq!(err.status_code(), None);
    }
}
