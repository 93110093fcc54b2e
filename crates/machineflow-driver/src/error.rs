//! Machine driver error types

use thiserror::Error;

/// Errors surfaced by any machine driver to its host.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("API error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Instance failed: {0}")]
    InstanceFailed(String),

    #[error("Machine store error: {0}")]
    Store(String),

    /// Credentials missing or unusable, or the API client could not be built
    #[error("{0}")]
    Credentials(String),

    /// Transport failure talking to the provider
    #[error("{0}")]
    Http(String),

    /// Local SSH key generation or encoding failure
    #[error("{0}")]
    SshKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriverError {
    /// Whether the error is a remote "404 Not Found" response.
    pub fn is_remote_not_found(&self) -> bool {
        matches!(self, DriverError::Remote { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
