//! Fields shared by every machine driver

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_SSH_USER: &str = "root";
const DEFAULT_SSH_KEY_FILE: &str = "id_rsa";

/// Common machine configuration and results
///
/// A driver embeds this record (flattened when serialized) and fills
/// `ip_address` and `ssh_key_path` while provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseDriver {
    /// Machine name chosen by the user
    pub machine_name: String,

    /// Root of the machine store (machine records live under `machines/`)
    pub store_path: PathBuf,

    /// Address recorded once the machine is up
    #[serde(rename = "IPAddress", default)]
    pub ip_address: String,

    #[serde(rename = "SSHUser")]
    pub ssh_user: String,

    #[serde(rename = "SSHPort")]
    pub ssh_port: u16,

    /// Private key path, empty until a key is chosen
    #[serde(rename = "SSHKeyPath", default)]
    pub ssh_key_path: PathBuf,
}

impl BaseDriver {
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            machine_name: machine_name.into(),
            store_path: store_path.into(),
            ip_address: String::new(),
            ssh_user: DEFAULT_SSH_USER.to_string(),
            ssh_port: DEFAULT_SSH_PORT,
            ssh_key_path: PathBuf::new(),
        }
    }

    /// Directory holding this machine's files
    pub fn machine_dir(&self) -> PathBuf {
        self.store_path.join("machines").join(&self.machine_name)
    }

    /// Resolve a file name inside the machine directory
    pub fn resolve_store_path(&self, file: &str) -> PathBuf {
        self.machine_dir().join(file)
    }

    /// Private key path, defaulting to `id_rsa` in the machine directory
    pub fn ssh_key_path(&self) -> PathBuf {
        if self.ssh_key_path.as_os_str().is_empty() {
            return self.resolve_store_path(DEFAULT_SSH_KEY_FILE);
        }
        self.ssh_key_path.clone()
    }

    /// Public half of the private key (`<key>.pub`)
    pub fn public_ssh_key_path(&self) -> PathBuf {
        let mut path = self.ssh_key_path().into_os_string();
        path.push(".pub");
        PathBuf::from(path)
    }
}
