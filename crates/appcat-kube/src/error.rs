//! Error types for appcat-kube

use thiserror::Error;

/// Result type for appcat-kube operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while synchronizing catalogs with the cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Write rejected because the object changed since it was read
    #[error("ApplicationDefinition '{name}' was modified concurrently")]
    Conflict { name: String },

    /// Create raced with another writer
    #[error("ApplicationDefinition '{name}' already exists")]
    AlreadyExists { name: String },

    /// Object vanished between read and write
    #[error("ApplicationDefinition '{name}' not found")]
    NotFound { name: String },

    /// Several independent operations failed in one pass
    #[error("{} error(s) during reconciliation: {}", .0.len(), join_errors(.0))]
    Aggregate(Vec<SyncError>),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Timeout
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Leader election error
    #[error("leader election failed: {0}")]
    LeaderElection(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

impl From<appcat_core::CoreError> for SyncError {
    fn from(e: appcat_core::CoreError) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

fn join_errors(errors: &[SyncError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SyncError {
    /// Collapse a list of errors: none is success, one is itself, more aggregate
    pub fn aggregate(mut errors: Vec<SyncError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(SyncError::Aggregate(errors)),
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
            || matches!(self, SyncError::Api(kube::Error::Api(resp)) if resp.code == 404)
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict { .. } | SyncError::AlreadyExists { .. })
            || matches!(self, SyncError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }
}
