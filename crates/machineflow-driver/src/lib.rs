//! MachineFlow machine drivers
//!
//! This crate defines the lifecycle contract every machine driver implements
//! and the pieces drivers share: base machine fields, typed options,
//! fixed-interval polling and the local machine store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 MachineFlow CLI                  │
//! │          (machineflow create / rm / ...)         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               machineflow-driver                 │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │           Lifecycle contract              │   │
//! │  │  trait Driver { ... }                     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │   Polling    │  │ Machine Store│            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │  ovh public   │
//! │ cloud driver  │
//! └───────────────┘
//! ```

pub mod base;
pub mod driver;
pub mod error;
pub mod options;
pub mod state;
pub mod store;
pub mod wait;

// Re-exports
pub use base::BaseDriver;
pub use driver::{DAEMON_PORT, Driver, join_host_port};
pub use error::{DriverError, Result};
pub use options::{CreateFlag, DriverOptions, FlagValue};
pub use state::MachineState;
pub use store::{MachineRecord, MachineStore};
pub use wait::{Check, PollPolicy, wait_for};
