//! Error types for the GCP provider

use thiserror::Error;

/// Result type alias for provider operations
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur while reconciling managed resources
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    /// Error response returned by a Google Cloud API
    #[error("GCP API error {code}: {message}")]
    Gcp { code: u16, message: String },

    /// Transport level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credentials could not be loaded or exchanged for a token
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Configuration error (ProviderConfig, secrets, flags)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A cross-resource reference could not be resolved
    #[error("Reference resolution error: {0}")]
    Reference(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A reconcile step failed; wraps the underlying cause
    #[error("cannot {step}: {source}")]
    Reconcile {
        step: &'static str,
        #[source]
        source: Box<OperatorError>,
    },

    /// Invalid resource state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl OperatorError {
    /// Wrap an error with the reconcile step it happened in.
    pub fn during(step: &'static str) -> impl FnOnce(OperatorError) -> OperatorError {
        move |source| OperatorError::Reconcile {
            step,
            source: Box::new(source),
        }
    }

    /// True when the error is a GCP 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            OperatorError::Gcp { code, .. } => *code == 404,
            OperatorError::Reconcile { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// True when the error is a GCP 409, e.g. an insert racing an earlier one.
    pub fn is_already_exists(&self) -> bool {
        match self {
            OperatorError::Gcp { code, .. } => *code == 409,
            OperatorError::Reconcile { source, .. } => source.is_already_exists(),
            _ => false,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for OperatorError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        OperatorError::Auth(err.to_string())
    }
}

/// Drop a GCP 404 so deletes of already-gone resources succeed.
pub fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Drop a GCP 409 so an insert racing an earlier, still pending one
/// does not fail the reconcile.
pub fn ignore_already_exists(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_already_exists() => Ok(()),
        other => other,
    }
}

/// Turn a GCP 404 into `None`.
pub fn not_found_as_none<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OperatorError::Gcp {
            code: 403,
            message: "permission denied".to_string(),
        };
        assert_eq!(err.to_string(), "GCP API error 403: permission denied");
    }

    #[test]
    fn test_reconcile_wrapping() {
        let err = OperatorError::during("observe external resource")(OperatorError::Gcp {
            code: 404,
            message: "gone".to_string(),
        });
        assert!(err.to_string().starts_with("cannot observe external resource"));
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_ignore_not_found() {
        let gone = Err(OperatorError::Gcp {
            code: 404,
            message: "gone".to_string(),
        });
        assert!(ignore_not_found(gone).is_ok());

        let denied = Err(OperatorError::Gcp {
            code: 403,
            message: "denied".to_string(),
        });
        assert!(ignore_not_found(denied).is_err());
    }

    #[test]
    fn test_not_found_as_none() {
        let gone: Result<u32> = Err(OperatorError::Gcp {
            code: 404,
            message: "gone".to_string(),
        });
        assert!(matches!(not_found_as_none(gone), Ok(None)));
        assert!(matches!(not_found_as_none(Ok(7)), Ok(Some(7))));

        let conflict = Err(OperatorError::Gcp {
            code: 409,
            message: "exists".to_string(),
        });
        assert!(ignore_already_exists(conflict).is_ok());
    }
}
