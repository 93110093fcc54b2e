//! Local machine store
//!
//! Each machine lives in `<root>/machines/<name>/` next to its key pair. The
//! driver record is kept in `config.json` so later commands (state, url, rm)
//! can pick up the remote identifiers resolved at creation time.

use crate::error::{DriverError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const RECORD_VERSION: u32 = 1;
const MACHINES_DIR: &str = "machines";
const RECORD_FILE: &str = "config.json";
const RECORD_BACKUP: &str = "config.json.backup";

/// Persisted driver record of a single machine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRecord {
    /// Record format version
    pub version: u32,

    /// Name of the driver that owns the record (e.g. "ovh")
    pub driver_name: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Driver-specific fields
    pub driver: serde_json::Value,
}

impl MachineRecord {
    /// Decode the driver-specific fields
    pub fn driver<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.driver.clone())?)
    }
}

/// Reads and writes machine records under a store root
pub struct MachineStore {
    root: PathBuf,
}

impl MachineStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a machine
    pub fn machine_dir(&self, name: &str) -> PathBuf {
        self.root.join(MACHINES_DIR).join(name)
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.machine_dir(name).join(RECORD_FILE)
    }

    fn backup_path(&self, name: &str) -> PathBuf {
        self.machine_dir(name).join(RECORD_BACKUP)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.record_path(name).exists()
    }

    /// Load a machine record
    pub async fn load(&self, name: &str) -> Result<MachineRecord> {
        let path = self.record_path(name);
        if !path.exists() {
            return Err(DriverError::Store(format!(
                "machine '{}' does not exist in {}",
                name,
                self.root.display()
            )));
        }

        let content = fs::read_to_string(&path).await?;
        let record: MachineRecord = serde_json::from_str(&content)?;

        if record.version > RECORD_VERSION {
            return Err(DriverError::Store(format!(
                "record version {} of machine '{}' is newer than supported version {}",
                record.version, name, RECORD_VERSION
            )));
        }

        tracing::debug!("Loaded machine record {}", path.display());
        Ok(record)
    }

    /// Save a driver record, keeping the previous one as a backup
    pub async fn save<T: Serialize>(&self, name: &str, driver_name: &str, driver: &T) -> Result<()> {
        let dir = self.machine_dir(name);
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created machine directory: {}", dir.display());
        }

        let path = self.record_path(name);
        let backup = self.backup_path(name);

        let now = Utc::now();
        let created_at = if path.exists() {
            let previous = fs::read_to_string(&path).await?;
            let created_at = serde_json::from_str::<MachineRecord>(&previous)
                .map(|r| r.created_at)
                .unwrap_or(now);
            fs::rename(&path, &backup).await?;
            created_at
        } else {
            now
        };

        let record = MachineRecord {
            version: RECORD_VERSION,
            driver_name: driver_name.to_string(),
            created_at,
            updated_at: now,
            driver: serde_json::to_value(driver)?,
        };

        let content = serde_json::to_string_pretty(&record)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved machine record {}", path.display());
        Ok(())
    }

    /// Names of all stored machines, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let dir = self.root.join(MACHINES_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().join(RECORD_FILE).exists() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Remove a machine directory and everything in it
    pub async fn remove(&self, name: &str) -> Result<()> {
        let dir = self.machine_dir(name);
        if dir.exists() {
            fs::remove_dir_all(&dir).await?;
            tracing::debug!("Removed machine directory: {}", dir.display());
        }
        Ok(())
    }
}
