//! CLI error types

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced to the user as miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Catalog manifest could not be read or is not an ApplicationCatalog
    #[error("Manifest error: {message}")]
    #[diagnostic(code(appcat::cli::manifest))]
    Manifest {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Invalid flag combination or value
    #[error("Configuration error: {message}")]
    #[diagnostic(code(appcat::cli::config))]
    Config { message: String },

    /// Cluster access or controller failure
    #[error("Kubernetes error: {message}")]
    #[diagnostic(code(appcat::cli::kube))]
    Kube { message: String },

    /// Output could not be rendered
    #[error("Serialization error: {message}")]
    #[diagnostic(code(appcat::cli::serialization))]
    Serialization { message: String },
}

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn serialization(err: impl ToString) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<appcat_core::CoreError> for CliError {
    fn from(err: appcat_core::CoreError) -> Self {
        let help = match &err {
            appcat_core::CoreError::InvalidCatalog { .. } => Some(
                "expected apiVersion applicationcatalog.k8c.io/v1alpha1 and kind ApplicationCatalog".to_string(),
            ),
            _ => None,
        };
        CliError::Manifest {
            message: err.to_string(),
            help,
        }
    }
}

impl From<appcat_kube::SyncError> for CliError {
    fn from(err: appcat_kube::SyncError) -> Self {
        match err {
            appcat_kube::SyncError::InvalidConfig(message) => CliError::Config { message },
            other => CliError::Kube {
                message: other.to_string(),
            },
        }
    }
}

impl From<kube::Error> for CliError {
    fn from(err: kube::Error) -> Self {
        CliError::Kube {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
