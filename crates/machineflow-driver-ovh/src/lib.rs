//! OVH Public Cloud driver for MachineFlow
//!
//! This crate implements the `Driver` trait for OVH Public Cloud,
//! provisioning one instance per machine through the OVH REST API.
//!
//! # Features
//!
//! - Project, region, flavor, image and network resolution by name or id
//! - SSH key generation and upload
//! - Instance creation with status polling
//! - Removal of the instance and of the key pair generated for it
//!
//! # Requirements
//!
//! - OVH API credentials (application key, application secret, consumer key)
//!   given as options, environment variables or in `ovh.conf`
//!
//! # Example
//!
//! ```ignore
//! use machineflow_driver::Driver;
//! use machineflow_driver_ovh::OvhDriver;
//!
//! let mut driver = OvhDriver::new("web-01", "/home/me/.machineflow");
//! driver.project_name = "acme".to_string();
//!
//! driver.pre_create_check().await?;
//! driver.create().await?;
//! println!("{}", driver.get_url()?);
//! ```

pub mod api;
pub mod client;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod sshkey;

#[cfg(test)]
mod testing;

pub use api::{CUSTOMER_INTERFACE, CloudApi, Flavor, Image, Instance, InstanceRequest, Network, Project, SshKey};
pub use client::{OvhClient, sign_request};
pub use credentials::{Credentials, DEFAULT_ENDPOINT, endpoint_url};
pub use driver::{DRIVER_NAME, OvhDriver, create_flags, map_status, validate_billing_period};
pub use error::{OvhError, Result};
