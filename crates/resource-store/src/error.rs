//! Resource store errors

use thiserror::Error;

/// Errors that can occur when reading from or writing to the cluster
#[derive(Debug, Error)]
pub enum StoreError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because another writer holds the fields
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object rejected by validation (e.g. missing name or namespace)
    #[error("Invalid object: {0}")]
    Invalid(String),

    /// API server unreachable or timing out
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True when the error means the object is absent
    pub fn is_not_found(&self) -> bool {
        match self {
            StoreError::NotFound(_) => true,
            StoreError::Kube(kube::Error::Api(api_err)) => api_err.code == 404,
            _ => false,
        }
    }
}
