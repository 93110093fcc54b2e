//! Machine driver trait definition

use crate::base::BaseDriver;
use crate::error::Result;
use crate::options::{CreateFlag, DriverOptions};
use crate::state::MachineState;
use async_trait::async_trait;
use std::path::PathBuf;

/// Port the container daemon listens on inside provisioned machines
pub const DAEMON_PORT: u16 = 2376;

/// Lifecycle contract between the host and a machine driver
///
/// The host calls at most one method at a time on a given driver. Methods
/// that talk to the provider take `&mut self` so drivers can memoize their
/// API client and record resolved identifiers.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Returns the driver name (e.g., "ovh")
    fn driver_name(&self) -> &str;

    /// Options recognized by `set_config_from_flags`
    fn create_flags(&self) -> Vec<CreateFlag>;

    /// Shared machine fields
    fn base(&self) -> &BaseDriver;

    /// Store the user's options as-is
    fn set_config_from_flags(&mut self, flags: &DriverOptions) -> Result<()>;

    /// Validate options against the provider before anything is created
    async fn pre_create_check(&mut self) -> Result<()>;

    /// Create the machine and wait until it is reachable
    async fn create(&mut self) -> Result<()>;

    /// Current state as reported by the provider
    async fn get_state(&mut self) -> Result<MachineState>;

    /// Daemon URL, empty until an address is known
    fn get_url(&self) -> Result<String> {
        let ip = &self.base().ip_address;
        if ip.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("tcp://{}", join_host_port(ip, DAEMON_PORT)))
    }

    /// Host name to use for SSH
    fn get_ssh_hostname(&self) -> Result<String> {
        Ok(self.base().ip_address.clone())
    }

    /// Private key path to use for SSH
    fn get_ssh_key_path(&self) -> PathBuf {
        self.base().ssh_key_path()
    }

    /// Destroy the machine and the resources created for it
    async fn remove(&mut self) -> Result<()>;

    async fn restart(&mut self) -> Result<()>;

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    async fn kill(&mut self) -> Result<()>;
}

/// Join host and port, bracketing IPv6 literals
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}
