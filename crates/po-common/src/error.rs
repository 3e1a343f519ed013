//! Error types for the Prometheus-Operator provider
//!
//! Errors carry structured fields (resource kind, object coordinates, the
//! attribute path that failed to decode) so that diagnostics shown by
//! Terraform point at the offending piece of configuration.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for provider operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// The addressed object does not exist in the cluster
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Kind of the missing object (e.g. "Alertmanager")
        kind: String,
        /// Namespace that was searched
        namespace: String,
        /// Name that was searched
        name: String,
    },

    /// A configuration value did not have the expected shape
    #[error("unable to decode {path}: {message}")]
    Decode {
        /// Attribute path of the value (e.g. "spec.0.replicas")
        path: String,
        /// Description of the mismatch
        message: String,
    },

    /// Resource id is not of the form `namespace/name`
    #[error("unexpected ID format ({id:?}), expected \"namespace/name\"")]
    InvalidId {
        /// The id that was rejected
        id: String,
    },

    /// Configuration failed a schema validator
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid attribute path (e.g. "spec.0.toleration.0.effect")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Provider configuration error (kubeconfig, client construction)
    #[error("configuration error [{context}]: {message}")]
    Config {
        /// Description of what failed
        message: String,
        /// Step that failed (e.g. "create_client")
        context: String,
    },

    /// A CRUD step failed; wraps the underlying error with the action taken
    #[error("failed to {action} {kind}: {source}")]
    Operation {
        /// Verb of the failed step ("create", "update", "delete", ...)
        action: String,
        /// Resource kind the step was applied to
        kind: String,
        /// Underlying cause
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a not-found error for the given object coordinates
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a decode error at the given attribute path
    pub fn decode(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error attached to an attribute path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a configuration error without a specific context
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Wrap this error with the CRUD action and kind that produced it
    pub fn during(self, action: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::Operation {
            action: action.into(),
            kind: kind.into(),
            source: Box::new(self),
        }
    }

    /// Check if this error means the addressed object does not exist
    ///
    /// Recognizes the mapped [`Error::NotFound`] variant as well as a raw
    /// 404 from the API server, looking through [`Error::Operation`] wrappers.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube { source } => matches!(source, kube::Error::Api(ae) if ae.code == 404),
            Error::Operation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Get the attribute path this error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Decode { path, .. } => Some(path),
            Error::Validation { field, .. } => field.as_deref(),
            Error::Operation { source, .. } => source.field(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "NotFound".to_string(),
            code,
        })
    }

    #[test]
    fn not_found_is_recognized_in_every_shape() {
        assert!(Error::not_found("Alertmanager", "monitoring", "main").is_not_found());
        assert!(Error::from(api_error(404)).is_not_found());
        assert!(Error::not_found("Prometheus", "default", "k8s")
            .during("read", "Prometheus")
            .is_not_found());

        assert!(!Error::from(api_error(409)).is_not_found());
        assert!(!Error::validation("bad").is_not_found());
    }

    #[test]
    fn operation_errors_carry_action_and_kind() {
        let err = Error::from(api_error(422)).during("create", "Alertmanager");
        let msg = err.to_string();
        assert!(msg.starts_with("failed to create Alertmanager:"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn invalid_id_message_names_expected_format() {
        let err = Error::InvalidId {
            id: "just-a-name".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected ID format (\"just-a-name\"), expected \"namespace/name\""
        );
    }

    #[test]
    fn field_is_exposed_for_decode_and_validation() {
        let err = Error::decode("spec.0.replicas", "expected a number, got string");
        assert_eq!(err.field(), Some("spec.0.replicas"));

        let err = Error::validation_for_field("spec.0.toleration.0.effect", "bad effect")
            .during("validate", "Alertmanager");
        assert_eq!(err.field(), Some("spec.0.toleration.0.effect"));

        assert_eq!(Error::config("no kubeconfig").field(), None);
    }
}
