//! OVH Public Cloud machine driver

use crate::api::{CUSTOMER_INTERFACE, CloudApi, Instance, InstanceRequest, NetworkParam};
use crate::client::OvhClient;
use crate::credentials::{Credentials, USAGE_DOC};
use crate::error::{OvhError, Result};
use crate::sshkey;
use async_trait::async_trait;
use machineflow_driver::{
    BaseDriver, Check, CreateFlag, Driver, DriverOptions, MachineState, PollPolicy, wait_for,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub const DRIVER_NAME: &str = "ovh";

pub const DEFAULT_REGION_NAME: &str = "GRA1";
pub const DEFAULT_FLAVOR_NAME: &str = "b2-7";
pub const DEFAULT_IMAGE_NAME: &str = "Ubuntu 20.04";
pub const DEFAULT_SSH_USER_NAME: &str = "ubuntu";
pub const DEFAULT_BILLING_PERIOD: &str = "hourly";

const BILLING_PERIODS: [&str; 2] = ["hourly", "monthly"];

const STATUS_ACTIVE: &str = "ACTIVE";
const STATUS_ERROR: &str = "ERROR";

/// Map a remote instance status onto the host's state vocabulary
pub fn map_status(status: &str) -> MachineState {
    match status {
        "ACTIVE" => MachineState::Running,
        "PAUSED" => MachineState::Paused,
        "SUSPENDED" => MachineState::Saved,
        "SHUTOFF" => MachineState::Stopped,
        "BUILDING" => MachineState::Starting,
        "ERROR" => MachineState::Error,
        _ => MachineState::None,
    }
}

/// Accept exactly "hourly" or "monthly"
pub fn validate_billing_period(period: &str) -> Result<()> {
    if BILLING_PERIODS.contains(&period) {
        return Ok(());
    }
    Err(OvhError::Validation(format!(
        "Invalid billing period '{}'. Please select one of 'hourly', 'monthly'",
        period
    )))
}

/// Options recognized by the OVH driver
pub fn create_flags() -> Vec<CreateFlag> {
    vec![
        CreateFlag::string(
            "ovh-application-key",
            Some("OVH_APPLICATION_KEY"),
            "OVH API application key. May be stored in ovh.conf",
            "",
        ),
        CreateFlag::string(
            "ovh-application-secret",
            Some("OVH_APPLICATION_SECRET"),
            "OVH API application secret. May be stored in ovh.conf",
            "",
        ),
        CreateFlag::string(
            "ovh-consumer-key",
            Some("OVH_CONSUMER_KEY"),
            "OVH API consumer key. May be stored in ovh.conf",
            "",
        ),
        CreateFlag::string(
            "ovh-endpoint",
            Some("OVH_ENDPOINT"),
            "OVH Cloud API endpoint. Default: ovh-eu",
            "",
        ),
        CreateFlag::string("ovh-project", None, "OVH Cloud project name or id", ""),
        CreateFlag::string(
            "ovh-region",
            None,
            "OVH Cloud region name",
            DEFAULT_REGION_NAME,
        ),
        CreateFlag::string(
            "ovh-flavor",
            None,
            "OVH Cloud flavor name or id. Default: b2-7",
            DEFAULT_FLAVOR_NAME,
        ),
        CreateFlag::string(
            "ovh-image",
            None,
            "OVH Cloud Image name or id. Default: Ubuntu 20.04",
            DEFAULT_IMAGE_NAME,
        ),
        CreateFlag::string(
            "ovh-private-network",
            None,
            "OVH Cloud (private) network name or vlan number. Default: public network",
            "",
        ),
        CreateFlag::string(
            "ovh-ssh-key",
            None,
            "OVH Cloud ssh key name or id to use. Default: generate a random name",
            "",
        ),
        CreateFlag::string(
            "ovh-ssh-user",
            None,
            "OVH Cloud ssh username to use. Default: ubuntu",
            DEFAULT_SSH_USER_NAME,
        ),
        CreateFlag::string(
            "ovh-billing-period",
            None,
            "OVH Cloud billing period (hourly or monthly). Default: hourly",
            DEFAULT_BILLING_PERIOD,
        ),
    ]
}

/// Machine driver for OVH Public Cloud
///
/// The record is persisted between host invocations; the API client and the
/// polling policy are rebuilt on load.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OvhDriver {
    #[serde(flatten)]
    pub base: BaseDriver,

    // Command line parameters
    pub project_name: String,
    pub flavor_name: String,
    pub region_name: String,
    pub image_name: String,
    pub private_network_name: String,
    pub billing_period: String,
    pub endpoint: String,

    // Remote identifiers resolved once
    #[serde(rename = "ProjectID")]
    pub project_id: String,
    #[serde(rename = "FlavorID")]
    pub flavor_id: String,
    #[serde(rename = "ImageID")]
    pub image_id: String,
    #[serde(rename = "InstanceID")]
    pub instance_id: String,
    pub key_pair_name: String,
    #[serde(rename = "KeyPairID")]
    pub key_pair_id: String,
    #[serde(rename = "NetworkIDs")]
    pub network_ids: Vec<String>,

    // Overloaded credentials
    pub application_key: String,
    pub application_secret: String,
    pub consumer_key: String,

    #[serde(skip)]
    poll: PollPolicy,

    #[serde(skip)]
    client: Option<Arc<dyn CloudApi>>,
}

impl OvhDriver {
    pub fn new(machine_name: impl Into<String>, store_path: impl Into<PathBuf>) -> Self {
        let mut base = BaseDriver::new(machine_name, store_path);
        base.ssh_user = DEFAULT_SSH_USER_NAME.to_string();

        Self {
            base,
            project_name: String::new(),
            flavor_name: DEFAULT_FLAVOR_NAME.to_string(),
            region_name: DEFAULT_REGION_NAME.to_string(),
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            private_network_name: String::new(),
            billing_period: DEFAULT_BILLING_PERIOD.to_string(),
            endpoint: String::new(),
            project_id: String::new(),
            flavor_id: String::new(),
            image_id: String::new(),
            instance_id: String::new(),
            key_pair_name: String::new(),
            key_pair_id: String::new(),
            network_ids: Vec::new(),
            application_key: String::new(),
            application_secret: String::new(),
            consumer_key: String::new(),
            poll: PollPolicy::default(),
            client: None,
        }
    }

    /// Use a prebuilt API client instead of building one from credentials
    pub fn with_client(mut self, client: Arc<dyn CloudApi>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// API client, built from the credentials on first use
    fn client(&mut self) -> Result<Arc<dyn CloudApi>> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let client = Credentials::resolve(
            &self.endpoint,
            &self.application_key,
            &self.application_secret,
            &self.consumer_key,
        )
        .and_then(OvhClient::new)
        .map_err(|e| OvhError::ClientSetup {
            url: USAGE_DOC,
            source: Box::new(e),
        })?;

        let client: Arc<dyn CloudApi> = Arc::new(client);
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Store the options as-is; nothing is checked remotely here
    pub fn apply_options(&mut self, flags: &DriverOptions) {
        // Credentials from the environment are read again when the client is
        // built and never stored in the record
        self.application_key = flags.explicit_string("ovh-application-key");
        self.application_secret = flags.explicit_string("ovh-application-secret");
        self.consumer_key = flags.explicit_string("ovh-consumer-key");

        self.endpoint = flags.string("ovh-endpoint");
        self.project_name = flags.string("ovh-project");
        self.region_name = flags.string("ovh-region");
        self.flavor_name = flags.string("ovh-flavor");
        self.image_name = flags.string("ovh-image");
        self.private_network_name = flags.string("ovh-private-network");
        self.key_pair_name = flags.string("ovh-ssh-key");
        self.billing_period = flags.string("ovh-billing-period");

        self.base.ssh_user = flags.string("ovh-ssh-user");
    }

    /// Network side validation, resolving every remote identifier
    pub async fn validate(&mut self) -> Result<()> {
        let client = self.client()?;

        tracing::debug!("Validating billing period");
        validate_billing_period(&self.billing_period)?;
        tracing::debug!("Selecting billing period {}", self.billing_period);

        tracing::debug!("Validating project");
        self.project_id = self.select_project(client.as_ref()).await?;
        tracing::debug!("Found project id {}", self.project_id);

        tracing::debug!("Validating region");
        let regions = client.list_regions(&self.project_id).await?;
        if !regions.iter().any(|r| *r == self.region_name) {
            return Err(OvhError::Validation(format!(
                "Invalid region {}. Available regions: {}. For a list of valid ovh regions, please visit {}",
                self.region_name,
                regions.join(", "),
                CUSTOMER_INTERFACE
            )));
        }

        tracing::debug!("Validating flavor");
        let flavor = client
            .get_flavor_by_name(&self.project_id, &self.region_name, &self.flavor_name)
            .await?;
        self.flavor_id = flavor.id;
        tracing::debug!("Found flavor id {}", self.flavor_id);

        tracing::debug!("Validating image");
        let image = client
            .get_image_by_name(&self.project_id, &self.region_name, &self.image_name)
            .await?;
        self.image_id = image.id;
        tracing::debug!("Found image id {}", self.image_id);

        tracing::debug!("Validating private network");
        self.network_ids = self.select_networks(client.as_ref()).await?;

        self.prepare_ssh_key();
        Ok(())
    }

    async fn select_project(&self, client: &dyn CloudApi) -> Result<String> {
        if !self.project_name.is_empty() {
            let project = client.get_project_by_name(&self.project_name).await?;
            return Ok(project.id);
        }

        let project_ids = client.list_projects().await?;
        match project_ids.as_slice() {
            [] => Err(OvhError::NotFound(format!(
                "No Cloud project could be found. To create a new one, please visit {}",
                CUSTOMER_INTERFACE
            ))),
            [only] => Ok(only.clone()),
            many => {
                // Name every candidate, falling back on the id when a project
                // cannot be fetched
                let mut names = Vec::new();
                for project_id in many {
                    match client.get_project(project_id).await {
                        Ok(project) => names.push(project.name),
                        Err(_) => names.push(project_id.clone()),
                    }
                }
                Err(OvhError::Validation(format!(
                    "Multiple Cloud project found ({}), to select one, use '--ovh-project' option",
                    names.join(", ")
                )))
            }
        }
    }

    async fn select_networks(&self, client: &dyn CloudApi) -> Result<Vec<String>> {
        if self.private_network_name.is_empty() {
            tracing::debug!("No private network requested. Using public network");
            return Ok(Vec::new());
        }

        let private = client
            .get_private_network_by_name(&self.project_id, &self.private_network_name)
            .await?;
        tracing::debug!("Found private network id {}", private.id);

        let public_id = client.get_public_network_id(&self.project_id).await?;
        tracing::debug!("Found public network id {}", public_id);

        Ok(vec![private.id, public_id])
    }

    /// Use a shared key from the store, or name a machine specific one
    fn prepare_ssh_key(&mut self) {
        if !self.key_pair_name.is_empty() {
            let key_path = self
                .base
                .store_path
                .join("sshkeys")
                .join(&self.key_pair_name);
            if key_path.exists() {
                self.base.ssh_key_path = key_path;
            } else {
                tracing::debug!(
                    "SSH key {} does not exist. Assuming the key ({}) is in '~/.ssh/' or in a SSH agent.",
                    key_path.display(),
                    self.key_pair_name
                );
            }
            return;
        }

        self.key_pair_name = sshkey::sanitize_key_pair_name(&format!(
            "{}-{}",
            self.base.machine_name,
            sshkey::random_id()
        ));
        self.base.ssh_key_path = self.base.resolve_store_path(&self.key_pair_name);
    }

    /// Make sure a key named `key_pair_name` exists remotely
    async fn ensure_ssh_key(&mut self, client: &dyn CloudApi) -> Result<()> {
        tracing::debug!("Checking key pair {}", self.key_pair_name);
        match client
            .get_ssh_key_by_name(&self.project_id, &self.region_name, &self.key_pair_name)
            .await
        {
            Ok(key) => {
                self.key_pair_id = key.id;
                tracing::debug!("Found key id {}", self.key_pair_id);
                return Ok(());
            }
            Err(OvhError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        tracing::debug!("Creating key pair {}", self.key_pair_name);
        let key_path = self.base.ssh_key_path();
        let public_path = sshkey::public_key_path(&key_path);
        if !(key_path.exists() && public_path.exists()) {
            sshkey::generate_key_pair(&key_path)?;
        }
        self.base.ssh_key_path = key_path;

        let public_key = tokio::fs::read_to_string(&public_path).await?;
        let key = client
            .create_ssh_key(&self.project_id, &self.key_pair_name, public_key.trim())
            .await?;
        self.key_pair_id = key.id;

        tracing::debug!("Created key id {}", self.key_pair_id);
        Ok(())
    }

    /// Poll the instance until it reaches `status`
    async fn wait_for_instance_status(
        &self,
        client: Arc<dyn CloudApi>,
        status: &str,
    ) -> Result<Instance> {
        let project_id = self.project_id.clone();
        let instance_id = self.instance_id.clone();

        wait_for(&self.poll, || {
            let client = client.clone();
            let project_id = project_id.clone();
            let instance_id = instance_id.clone();
            let status = status.to_string();
            async move {
                let instance = client.get_instance(&project_id, &instance_id).await?;
                tracing::debug!(machine = %instance_id, state = %instance.status, "Machine");

                if instance.status == STATUS_ERROR {
                    return Err(OvhError::InstanceFailed(format!(
                        "Instance {} is in ERROR state",
                        instance_id
                    )));
                }
                if instance.status == status {
                    return Ok(Check::Ready(instance));
                }
                Ok(Check::Pending)
            }
        })
        .await
    }

    /// Create the instance and wait for its public address
    pub async fn create_instance(&mut self) -> Result<()> {
        let client = self.client()?;

        self.ensure_ssh_key(client.as_ref()).await?;

        tracing::info!("Creating OVH instance {}", self.base.machine_name);
        let request = InstanceRequest {
            name: self.base.machine_name.clone(),
            flavor_id: self.flavor_id.clone(),
            image_id: self.image_id.clone(),
            region: self.region_name.clone(),
            networks: self
                .network_ids
                .iter()
                .map(|id| NetworkParam { id: id.clone() })
                .collect(),
            ssh_key_id: self.key_pair_id.clone(),
            monthly_billing: self.billing_period == "monthly",
        };
        let instance = client.create_instance(&self.project_id, &request).await?;
        self.instance_id = instance.id;

        tracing::debug!("Waiting for OVH instance {}", self.instance_id);
        let instance = self
            .wait_for_instance_status(client, STATUS_ACTIVE)
            .await?;

        self.base.ip_address = instance
            .public_ip()
            .map(str::to_string)
            .ok_or_else(|| OvhError::NoPublicIp(instance.id.clone()))?;

        tracing::info!(
            "OVH instance {} is up at {}",
            self.instance_id,
            self.base.ip_address
        );
        Ok(())
    }

    /// Current remote status, mapped onto the host's vocabulary
    pub async fn state(&mut self) -> Result<MachineState> {
        let client = self.client()?;
        let instance = client
            .get_instance(&self.project_id, &self.instance_id)
            .await?;
        tracing::debug!(machine = %self.instance_id, state = %instance.status, "OVH instance");
        Ok(map_status(&instance.status))
    }

    /// Delete the instance, and the key pair when it was generated for it
    pub async fn delete(&mut self) -> Result<()> {
        let client = self.client()?;

        if !self.instance_id.is_empty() {
            tracing::info!("Deleting OVH instance {}", self.instance_id);
            client
                .delete_instance(&self.project_id, &self.instance_id)
                .await?;
        }

        // A key whose name does not start with the machine name was not
        // generated for this machine
        if !self.key_pair_name.starts_with(&self.base.machine_name) {
            tracing::warn!("Keeping key pair {} (not generated for this machine)", self.key_pair_name);
            return Ok(());
        }

        if !self.key_pair_id.is_empty() {
            tracing::debug!("Deleting key pair {}", self.key_pair_id);
            client
                .delete_ssh_key(&self.project_id, &self.key_pair_id)
                .await?;
        }

        Ok(())
    }

    /// Soft reboot
    pub async fn reboot(&mut self) -> Result<()> {
        tracing::debug!("Restarting OVH instance {}", self.instance_id);
        let client = self.client()?;
        client
            .reboot_instance(&self.project_id, &self.instance_id, false)
            .await
    }
}

#[async_trait]
impl Driver for OvhDriver {
    fn driver_name(&self) -> &str {
        DRIVER_NAME
    }

    fn create_flags(&self) -> Vec<CreateFlag> {
        create_flags()
    }

    fn base(&self) -> &BaseDriver {
        &self.base
    }

    fn set_config_from_flags(&mut self, flags: &DriverOptions) -> machineflow_driver::Result<()> {
        self.apply_options(flags);
        Ok(())
    }

    async fn pre_create_check(&mut self) -> machineflow_driver::Result<()> {
        Ok(self.validate().await?)
    }

    async fn create(&mut self) -> machineflow_driver::Result<()> {
        Ok(self.create_instance().await?)
    }

    async fn get_state(&mut self) -> machineflow_driver::Result<MachineState> {
        Ok(self.state().await?)
    }

    async fn remove(&mut self) -> machineflow_driver::Result<()> {
        Ok(self.delete().await?)
    }

    async fn restart(&mut self) -> machineflow_driver::Result<()> {
        Ok(self.reboot().await?)
    }

    async fn start(&mut self) -> machineflow_driver::Result<()> {
        Err(OvhError::Unsupported("Starting machines is not possible on OVH Cloud".to_string()).into())
    }

    async fn stop(&mut self) -> machineflow_driver::Result<()> {
        Err(OvhError::Unsupported("Stopping machines is not possible on OVH Cloud".to_string()).into())
    }

    async fn kill(&mut self) -> machineflow_driver::Result<()> {
        Err(OvhError::Unsupported("Killing machines is not possible on OVH Cloud".to_string()).into())
    }
}
