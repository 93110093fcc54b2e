//! OVH API endpoint and credential resolution
//!
//! Every value is taken from the first place that defines it:
//! 1. the explicit driver option
//! 2. the environment (`OVH_ENDPOINT`, `OVH_APPLICATION_KEY`, ...)
//! 3. `ovh.conf` files: `/etc/ovh.conf`, `~/.ovh.conf`, `./ovh.conf`
//!    (later files override earlier ones)
//!
//! ```ini
//! [default]
//! endpoint=ovh-eu
//!
//! [ovh-eu]
//! application_key=...
//! application_secret=...
//! consumer_key=...
//! ```

use crate::error::{OvhError, Result};
use config::{Config, File, FileFormat};
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "ovh-eu";

/// Where API credentials are created
pub const USAGE_DOC: &str = "https://eu.api.ovh.com/createToken/";

const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Resolve an endpoint alias or URL to the API base URL
pub fn endpoint_url(endpoint: &str) -> Result<String> {
    if let Some((_, url)) = ENDPOINTS.iter().find(|(name, _)| *name == endpoint) {
        return Ok(url.to_string());
    }

    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        return Ok(endpoint.trim_end_matches('/').to_string());
    }

    Err(OvhError::InvalidEndpoint(endpoint.to_string()))
}

/// Default `ovh.conf` locations, lowest priority first
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/ovh.conf")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".ovh.conf"));
    }
    paths.push(PathBuf::from("ovh.conf"));
    paths
}

/// Fully resolved API credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API base URL
    pub endpoint: String,
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("application_key", &self.application_key)
            .field("application_secret", &"***")
            .field("consumer_key", &"***")
            .finish()
    }
}

impl Credentials {
    /// Resolve credentials using the default `ovh.conf` locations
    pub fn resolve(
        endpoint: &str,
        application_key: &str,
        application_secret: &str,
        consumer_key: &str,
    ) -> Result<Self> {
        Self::resolve_with(
            &default_config_paths(),
            endpoint,
            application_key,
            application_secret,
            consumer_key,
        )
    }

    /// Resolve credentials from explicit values, the environment and `paths`
    pub fn resolve_with(
        paths: &[PathBuf],
        endpoint: &str,
        application_key: &str,
        application_secret: &str,
        consumer_key: &str,
    ) -> Result<Self> {
        let mut builder = Config::builder();
        for path in paths {
            builder = builder.add_source(File::from(path.clone()).format(FileFormat::Ini).required(false));
        }
        let file = builder.build()?;

        let lookup = |explicit: &str, env: &str, key: &str| -> Option<String> {
            non_empty(explicit)
                .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
                .or_else(|| file.get_string(key).ok().filter(|v| !v.is_empty()))
        };

        let endpoint_name = lookup(endpoint, "OVH_ENDPOINT", "default.endpoint")
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let section = endpoint_name.to_lowercase();

        let application_key = lookup(
            application_key,
            "OVH_APPLICATION_KEY",
            &format!("{}.application_key", section),
        );
        let application_secret = lookup(
            application_secret,
            "OVH_APPLICATION_SECRET",
            &format!("{}.application_secret", section),
        );
        let consumer_key = lookup(
            consumer_key,
            "OVH_CONSUMER_KEY",
            &format!("{}.consumer_key", section),
        );

        let application_key = application_key.ok_or_else(|| {
            OvhError::MissingCredentials(format!(
                "application key is not set for endpoint {}",
                endpoint_name
            ))
        })?;
        let application_secret = application_secret.ok_or_else(|| {
            OvhError::MissingCredentials(format!(
                "application secret is not set for endpoint {}",
                endpoint_name
            ))
        })?;

        tracing::debug!("Using OVH endpoint {}", endpoint_name);

        Ok(Self {
            endpoint: endpoint_url(&endpoint_name)?,
            application_key,
            application_secret,
            consumer_key: consumer_key.unwrap_or_default(),
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
