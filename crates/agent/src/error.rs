//! Error types for the certificate control loop.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use certsync_config::ConfigError;

use crate::acme::IssuerOutput;

/// Result type for control loop operations.
pub type CertResult<T> = Result<T, CertError>;

/// Errors raised by the control loop components.
#[derive(Debug, Error)]
pub enum CertError {
    /// Missing or invalid environment or orchestrator metadata.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No certificate directory exists for the domain.
    #[error("no certificate directory for {domain} under {}", root.display())]
    NotFound { domain: String, root: PathBuf },

    /// The ACME client exited unsuccessfully.
    #[error("obtaining certificates failed: {0}")]
    ClientFailure(IssuerOutput),

    /// The orchestrator rejected or mangled an app update.
    #[error("could not update app: {0}")]
    Update(String),

    /// A submitted deployment did not leave the active list in time.
    #[error("deployment {deployment_id} did not complete within {waited:?}")]
    DeploymentTimeout {
        deployment_id: String,
        waited: Duration,
    },

    /// The orchestrator has no app with this id.
    #[error("app {0} not found in marathon")]
    AppNotFound(String),

    /// The orchestrator answered with a non-success status.
    #[error("marathon returned {status}: {body}")]
    Orchestrator { status: u16, body: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CertError {
    /// Whether the backoff orchestrator may absorb this error and retry.
    ///
    /// Configuration problems need an operator to fix the input.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, CertError::Configuration(_))
    }
}

impl From<ConfigError> for CertError {
    fn from(err: ConfigError) -> Self {
        CertError::Configuration(err.to_string())
    }
}
