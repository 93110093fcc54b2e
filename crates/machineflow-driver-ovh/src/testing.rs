//! In-memory `CloudApi` double for unit tests

use crate::api::{
    CloudApi, Flavor, Image, Instance, InstanceRequest, IpAddress, Network, Project, SshKey,
};
use crate::error::{OvhError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    projects: Vec<Project>,
    regions: Vec<String>,
    flavors: Vec<Flavor>,
    images: Vec<Image>,
    private_networks: Vec<Network>,
    public_networks: Vec<Network>,
    ssh_keys: Vec<SshKey>,
    keys_created: u32,
    instances: HashMap<String, Instance>,
    instance_ips: Vec<IpAddress>,
    statuses: VecDeque<String>,
    requests: Vec<InstanceRequest>,
    project_fetches: u32,
    instance_polls: u32,
    reboots: Vec<(String, bool)>,
}

pub struct FakeCloud {
    inner: Mutex<Inner>,
}

fn not_found(what: &str) -> OvhError {
    OvhError::Api {
        status: 404,
        message: format!("{} not found", what),
    }
}

impl FakeCloud {
    pub fn empty() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// One project "acme" (pr-1) in GRA1 with the b2-7 flavor, an Ubuntu
    /// image, a private network and instances that boot after one poll
    pub fn scenario() -> Self {
        let cloud = Self::empty();
        cloud.add_project("pr-1", "acme");
        {
            let mut inner = cloud.inner.lock().unwrap();
            inner.regions = vec!["GRA1".to_string(), "BHS5".to_string()];
            inner.flavors = vec![
                flavor("f-w", "b2-7", "windows"),
                flavor("f-9", "b2-7", "linux"),
                flavor("f-2", "s1-2", "linux"),
            ];
            inner.images = vec![
                image("im-9", "Windows Server 2022", "windows"),
                image("im-4", "Ubuntu 20.04", "linux"),
            ];
            inner.private_networks = vec![Network {
                id: "pn-1".to_string(),
                name: "backend".to_string(),
                vlan_id: Some(12),
                network_type: "private".to_string(),
                status: "ACTIVE".to_string(),
            }];
            inner.public_networks = vec![Network {
                id: "pub-1".to_string(),
                name: "Ext-Net".to_string(),
                vlan_id: Some(0),
                network_type: "public".to_string(),
                status: "ACTIVE".to_string(),
            }];
            inner.ssh_keys = vec![SshKey {
                id: "k-1".to_string(),
                name: "shared-key".to_string(),
                public_key: "ssh-ed25519 AAAAshared".to_string(),
                fingerprint: String::new(),
                regions: vec!["GRA1".to_string()],
            }];
            inner.instance_ips = vec![
                IpAddress {
                    ip: "10.0.0.4".to_string(),
                    ip_type: "private".to_string(),
                    version: Some(4),
                },
                IpAddress {
                    ip: "203.0.113.5".to_string(),
                    ip_type: "public".to_string(),
                    version: Some(4),
                },
            ];
            inner.statuses = ["BUILDING", "ACTIVE"].iter().map(|s| s.to_string()).collect();
        }
        cloud
    }

    pub fn add_project(&self, id: &str, name: &str) {
        self.inner.lock().unwrap().projects.push(Project {
            id: id.to_string(),
            name: name.to_string(),
            status: "ok".to_string(),
            unleash: false,
            creation_date: None,
        });
    }

    pub fn clear_projects(&self) {
        self.inner.lock().unwrap().projects.clear();
    }

    pub fn clear_public_networks(&self) {
        self.inner.lock().unwrap().public_networks.clear();
    }

    pub fn set_instance_ips(&self, ips: Vec<IpAddress>) {
        self.inner.lock().unwrap().instance_ips = ips;
    }

    /// Statuses returned by successive `get_instance` calls; the last one repeats
    pub fn script_statuses(&self, statuses: &[&str]) {
        self.inner.lock().unwrap().statuses = statuses.iter().map(|s| s.to_string()).collect();
    }

    pub fn project_fetches(&self) -> u32 {
        self.inner.lock().unwrap().project_fetches
    }

    pub fn instance_polls(&self) -> u32 {
        self.inner.lock().unwrap().instance_polls
    }

    pub fn requests(&self) -> Vec<InstanceRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn reboots(&self) -> Vec<(String, bool)> {
        self.inner.lock().unwrap().reboots.clone()
    }

    pub fn has_instance(&self, id: &str) -> bool {
        self.inner.lock().unwrap().instances.contains_key(id)
    }

    pub fn ssh_key(&self, name: &str) -> Option<SshKey> {
        self.inner
            .lock()
            .unwrap()
            .ssh_keys
            .iter()
            .find(|k| k.name == name)
            .cloned()
    }
}

fn flavor(id: &str, name: &str, os: &str) -> Flavor {
    Flavor {
        id: id.to_string(),
        name: name.to_string(),
        region: "GRA1".to_string(),
        os_type: os.to_string(),
        vcpus: 2,
        memory: 7,
        disk: 50,
        flavor_type: "ovh.ssd.eg".to_string(),
    }
}

fn image(id: &str, name: &str, os: &str) -> Image {
    Image {
        id: id.to_string(),
        name: name.to_string(),
        region: "GRA1".to_string(),
        os_type: os.to_string(),
        min_disk: 10,
        status: "active".to_string(),
        visibility: "public".to_string(),
        creation_date: None,
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_projects(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.projects.iter().map(|p| p.id.clone()).collect())
    }

    async fn get_project(&self, project_id: &str) -> Result<Project> {
        let mut inner = self.inner.lock().unwrap();
        inner.project_fetches += 1;
        inner
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .cloned()
            .ok_or_else(|| not_found("project"))
    }

    async fn list_regions(&self, _project_id: &str) -> Result<Vec<String>> {
        Ok(self.inner.lock().unwrap().regions.clone())
    }

    async fn list_flavors(&self, _project_id: &str, region: &str) -> Result<Vec<Flavor>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.flavors.iter().filter(|f| f.region == region).cloned().collect())
    }

    async fn list_images(&self, _project_id: &str, region: &str) -> Result<Vec<Image>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.images.iter().filter(|i| i.region == region).cloned().collect())
    }

    async fn list_ssh_keys(&self, _project_id: &str, _region: &str) -> Result<Vec<SshKey>> {
        Ok(self.inner.lock().unwrap().ssh_keys.clone())
    }

    async fn list_networks(&self, _project_id: &str, private: bool) -> Result<Vec<Network>> {
        let inner = self.inner.lock().unwrap();
        Ok(if private {
            inner.private_networks.clone()
        } else {
            inner.public_networks.clone()
        })
    }

    async fn create_ssh_key(&self, _project_id: &str, name: &str, public_key: &str) -> Result<SshKey> {
        let mut inner = self.inner.lock().unwrap();
        let key = SshKey {
            id: format!("k-{}", 7 + inner.keys_created),
            name: name.to_string(),
            public_key: public_key.to_string(),
            fingerprint: String::new(),
            regions: Vec::new(),
        };
        inner.keys_created += 1;
        inner.ssh_keys.push(key.clone());
        Ok(key)
    }

    async fn delete_ssh_key(&self, _project_id: &str, key_id: &str) -> Result<()> {
        self.inner.lock().unwrap().ssh_keys.retain(|k| k.id != key_id);
        Ok(())
    }

    async fn create_instance(&self, _project_id: &str, request: &InstanceRequest) -> Result<Instance> {
        let mut inner = self.inner.lock().unwrap();
        let instance = Instance {
            id: format!("i-{}", inner.requests.len() + 1),
            name: request.name.clone(),
            status: "BUILDING".to_string(),
            created: None,
            region: request.region.clone(),
            image: None,
            flavor: None,
            ssh_key: None,
            ip_addresses: Vec::new(),
            monthly_billing: None,
        };
        inner.requests.push(request.clone());
        inner.instances.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    async fn get_instance(&self, _project_id: &str, instance_id: &str) -> Result<Instance> {
        let mut inner = self.inner.lock().unwrap();
        inner.instance_polls += 1;

        let status = if inner.statuses.len() > 1 {
            inner.statuses.pop_front()
        } else {
            inner.statuses.front().cloned()
        };
        let ips = inner.instance_ips.clone();

        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| not_found("instance"))?;
        if let Some(status) = status {
            instance.status = status;
        }
        if instance.status == "ACTIVE" {
            instance.ip_addresses = ips;
        }
        Ok(instance.clone())
    }

    async fn reboot_instance(&self, _project_id: &str, instance_id: &str, hard: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.instances.contains_key(instance_id) {
            return Err(not_found("instance"));
        }
        inner.reboots.push((instance_id.to_string(), hard));
        Ok(())
    }

    async fn delete_instance(&self, _project_id: &str, instance_id: &str) -> Result<()> {
        self.inner.lock().unwrap().instances.remove(instance_id);
        Ok(())
    }
}
