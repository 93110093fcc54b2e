//! OVH Public Cloud resources and the API contract
//!
//! [`CloudApi`] has one method per resource-and-verb pair. Each issues a
//! single HTTP call; the name lookups built on top of them are provided
//! methods, so every implementation (the real client or a test double)
//! resolves names the same way.

use crate::error::{OvhError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// Customer console, referenced by user-facing errors
pub const CUSTOMER_INTERFACE: &str = "https://www.ovh.com/manager/cloud/index.html";

pub const OS_LINUX: &str = "linux";

/// Decode an explicit `null` as the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A Cloud project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "project_id")]
    pub id: String,

    /// Human readable project name
    #[serde(rename = "description", default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub unleash: bool,

    #[serde(rename = "creationDate", default)]
    pub creation_date: Option<String>,
}

/// A VM template size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flavor {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    #[serde(rename = "osType", default, deserialize_with = "null_as_default")]
    pub os_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vcpus: u32,
    /// Memory in GB
    #[serde(rename = "ram", default, deserialize_with = "null_as_default")]
    pub memory: u32,
    /// Disk in GB
    #[serde(default, deserialize_with = "null_as_default")]
    pub disk: u32,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub flavor_type: String,
}

/// A VM image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub os_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_disk: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub visibility: String,
    #[serde(default)]
    pub creation_date: Option<String>,
}

/// A public or private network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "vlanId", alias = "vlanid", default)]
    pub vlan_id: Option<u32>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub network_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// An SSH public key registered in a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKey {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub public_key: String,
    #[serde(rename = "fingerPrint", default, deserialize_with = "null_as_default")]
    pub fingerprint: String,
    #[serde(alias = "region", default, deserialize_with = "null_as_default")]
    pub regions: Vec<String>,
}

/// An address attached to an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub ip: String,
    #[serde(rename = "type")]
    pub ip_type: String,
    #[serde(default)]
    pub version: Option<u8>,
}

/// Monthly billing details of an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBilling {
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// A Cloud instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub region: String,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub flavor: Option<Flavor>,
    #[serde(default)]
    pub ssh_key: Option<SshKey>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ip_addresses: Vec<IpAddress>,
    #[serde(default)]
    pub monthly_billing: Option<MonthlyBilling>,
}

impl Instance {
    /// First public address of the instance
    pub fn public_ip(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| ip.ip_type == "public")
            .map(|ip| ip.ip.as_str())
    }
}

/// Network attachment of a new instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkParam {
    #[serde(rename = "networkId")]
    pub id: String,
}

/// Instance creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRequest {
    pub name: String,
    pub flavor_id: String,
    pub image_id: String,
    pub region: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkParam>,
    pub ssh_key_id: String,
    pub monthly_billing: bool,
}

/// SSH key upload request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SshKeyRequest<'a> {
    pub name: &'a str,
    pub public_key: &'a str,
}

/// Instance reboot request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RebootRequest {
    #[serde(rename = "type")]
    pub reboot_type: &'static str,
}

impl RebootRequest {
    pub fn new(hard: bool) -> Self {
        Self {
            reboot_type: if hard { "hard" } else { "soft" },
        }
    }
}

/// OVH Public Cloud API contract
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Ids of every project visible to the credentials
    async fn list_projects(&self) -> Result<Vec<String>>;

    async fn get_project(&self, project_id: &str) -> Result<Project>;

    /// Region names available to a project
    async fn list_regions(&self, project_id: &str) -> Result<Vec<String>>;

    async fn list_flavors(&self, project_id: &str, region: &str) -> Result<Vec<Flavor>>;

    async fn list_images(&self, project_id: &str, region: &str) -> Result<Vec<Image>>;

    async fn list_ssh_keys(&self, project_id: &str, region: &str) -> Result<Vec<SshKey>>;

    /// Private networks when `private` is true, public ones otherwise
    async fn list_networks(&self, project_id: &str, private: bool) -> Result<Vec<Network>>;

    async fn create_ssh_key(&self, project_id: &str, name: &str, public_key: &str)
    -> Result<SshKey>;

    /// Delete a key; an already absent key is not an error
    async fn delete_ssh_key(&self, project_id: &str, key_id: &str) -> Result<()>;

    async fn create_instance(&self, project_id: &str, request: &InstanceRequest)
    -> Result<Instance>;

    async fn get_instance(&self, project_id: &str, instance_id: &str) -> Result<Instance>;

    async fn reboot_instance(&self, project_id: &str, instance_id: &str, hard: bool)
    -> Result<()>;

    /// Delete an instance; an already absent instance is not an error
    async fn delete_instance(&self, project_id: &str, instance_id: &str) -> Result<()>;

    /// Find a project by id or by name
    ///
    /// An id is recognized from the project list and fetched directly; names
    /// require fetching every project.
    async fn get_project_by_name(&self, name: &str) -> Result<Project> {
        let project_ids = self.list_projects().await?;

        if project_ids.iter().any(|id| id == name) {
            return self.get_project(name).await;
        }

        let mut names = Vec::new();
        for project_id in &project_ids {
            let project = self.get_project(project_id).await?;
            if project.name == name {
                return Ok(project);
            }
            names.push(project.name);
        }

        Err(OvhError::NotFound(format!(
            "Project '{}' does not exist on OVH cloud.{} To create or rename a project, please visit {}",
            name,
            alternatives("projects", &names),
            CUSTOMER_INTERFACE
        )))
    }

    /// Find a Linux flavor by id or name in a region
    async fn get_flavor_by_name(&self, project_id: &str, region: &str, name: &str) -> Result<Flavor> {
        let flavors = self.list_flavors(project_id, region).await?;
        select_flavor(flavors, name)
    }

    /// Find a Linux image by id or name in a region
    async fn get_image_by_name(&self, project_id: &str, region: &str, name: &str) -> Result<Image> {
        let images = self.list_images(project_id, region).await?;
        select_image(images, name)
    }

    /// Find an SSH key by id or name in a region
    async fn get_ssh_key_by_name(&self, project_id: &str, region: &str, name: &str) -> Result<SshKey> {
        let keys = self.list_ssh_keys(project_id, region).await?;
        select_ssh_key(keys, name)
    }

    /// Find a private network by VLAN id or name
    async fn get_private_network_by_name(&self, project_id: &str, name: &str) -> Result<Network> {
        let networks = self.list_networks(project_id, true).await?;
        select_private_network(networks, name)
    }

    /// Id of the project's public network
    async fn get_public_network_id(&self, project_id: &str) -> Result<String> {
        self.list_networks(project_id, false)
            .await?
            .into_iter()
            .next()
            .map(|n| n.id)
            .ok_or_else(|| {
                OvhError::NotFound(format!(
                    "No public network found in project {}. Please visit {}",
                    project_id, CUSTOMER_INTERFACE
                ))
            })
    }
}

fn alternatives(kind: &str, names: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }
    format!(" Available {}: {}.", kind, names.join(", "))
}

/// Pick by id first, then by name
fn select_by_id_or_name<T>(
    mut items: Vec<T>,
    wanted: &str,
    id: impl Fn(&T) -> &str,
    name: impl Fn(&T) -> &str,
) -> std::result::Result<T, Vec<String>> {
    if let Some(pos) = items.iter().position(|i| id(i) == wanted) {
        return Ok(items.swap_remove(pos));
    }
    if let Some(pos) = items.iter().position(|i| name(i) == wanted) {
        return Ok(items.swap_remove(pos));
    }

    let names: BTreeSet<String> = items.iter().map(|i| name(i).to_string()).collect();
    Err(names.into_iter().collect())
}

pub fn select_flavor(flavors: Vec<Flavor>, name: &str) -> Result<Flavor> {
    let linux: Vec<Flavor> = flavors.into_iter().filter(|f| f.os_type == OS_LINUX).collect();

    select_by_id_or_name(linux, name, |f| &f.id, |f| &f.name).map_err(|names| {
        OvhError::NotFound(format!(
            "Flavor '{}' does not exist on OVH cloud.{} To find a list of available flavors, please visit {}",
            name,
            alternatives("flavors", &names),
            CUSTOMER_INTERFACE
        ))
    })
}

pub fn select_image(images: Vec<Image>, name: &str) -> Result<Image> {
    let linux: Vec<Image> = images.into_iter().filter(|i| i.os_type == OS_LINUX).collect();

    select_by_id_or_name(linux, name, |i| &i.id, |i| &i.name).map_err(|names| {
        OvhError::NotFound(format!(
            "Image '{}' does not exist on OVH cloud.{} To find a list of available images, please visit {}",
            name,
            alternatives("images", &names),
            CUSTOMER_INTERFACE
        ))
    })
}

pub fn select_ssh_key(keys: Vec<SshKey>, name: &str) -> Result<SshKey> {
    select_by_id_or_name(keys, name, |k| &k.id, |k| &k.name).map_err(|names| {
        OvhError::NotFound(format!(
            "SSH key '{}' does not exist on OVH cloud.{} To find a list of available ssh keys, please visit {}",
            name,
            alternatives("ssh keys", &names),
            CUSTOMER_INTERFACE
        ))
    })
}

pub fn select_private_network(mut networks: Vec<Network>, name: &str) -> Result<Network> {
    let matches = |n: &Network| {
        n.vlan_id.map(|v| v.to_string()).as_deref() == Some(name) || n.name == name
    };

    if let Some(pos) = networks.iter().position(matches) {
        return Ok(networks.swap_remove(pos));
    }

    let names: Vec<&str> = networks.iter().map(|n| n.name.as_str()).collect();
    Err(OvhError::NotFound(format!(
        "Invalid private network {}. List of valid private networks include {}",
        name,
        names.join(", ")
    )))
}
