//! OVH driver error types

use machineflow_driver::DriverError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OvhError {
    #[error("OVH API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("Timed out waiting for instance: {0}")]
    Timeout(String),

    #[error("Instance creation failed: {0}")]
    InstanceFailed(String),

    #[error("No IP found for instance {0}")]
    NoPublicIp(String),

    #[error("Missing OVH credentials: {0}")]
    MissingCredentials(String),

    #[error("Unknown OVH endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error(
        "Could not create a connection to OVH API. You may want to visit: {url}. The original error was: {source}"
    )]
    ClientSetup {
        url: &'static str,
        #[source]
        source: Box<OvhError>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config file error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("SSH key error: {0}")]
    SshKey(#[from] ssh_key::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Driver error: {0}")]
    Driver(DriverError),
}

impl OvhError {
    /// Whether the API answered "404 Not Found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, OvhError::Api { status: 404, .. })
    }
}

impl From<DriverError> for OvhError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Timeout(msg) => OvhError::Timeout(msg),
            other => OvhError::Driver(other),
        }
    }
}

impl From<OvhError> for DriverError {
    fn from(err: OvhError) -> Self {
        match err {
            OvhError::Api { status, message } => DriverError::Remote { status, message },
            OvhError::NotFound(msg) => DriverError::NotFound(msg),
            OvhError::Validation(msg) => DriverError::Validation(msg),
            OvhError::Unsupported(msg) => DriverError::Unsupported(msg),
            OvhError::Timeout(msg) => DriverError::Timeout(msg),
            OvhError::InstanceFailed(msg) => DriverError::InstanceFailed(msg),
            OvhError::IoError(e) => DriverError::Io(e),
            OvhError::JsonError(e) => DriverError::Json(e),
            OvhError::Driver(e) => e,
            e @ OvhError::NoPublicIp(_) => DriverError::InstanceFailed(e.to_string()),
            e @ (OvhError::MissingCredentials(_)
            | OvhError::InvalidEndpoint(_)
            | OvhError::ClientSetup { .. }
            | OvhError::Config(_)) => DriverError::Credentials(e.to_string()),
            e @ OvhError::Http(_) => DriverError::Http(e.to_string()),
            e @ OvhError::SshKey(_) => DriverError::SshKey(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OvhError>;
