#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # corral
//!
//! The machine configuration kernel for the corral VM provisioning tool.
//!
//! This library holds the configuration record a declarative machine
//! definition is collected into: forwarded ports, shared folders, network
//! declarations, provisioners, provider customizations, and named
//! sub-machine definitions. It knows how to merge configuration layers
//! (global defaults plus per-machine overrides) and how to upgrade a
//! legacy-schema configuration into the current schema.
//!
//! It deliberately knows nothing about machine lifecycle, hypervisors, box
//! images, or provisioning execution; those belong to the surrounding
//! runtime, which builds a [`MachineConfig`] through its accumulator
//! methods and reads the finalized result back out.
//!
//! ## Core Types
//!
//! - [`MachineConfig`]: the mutable configuration record
//! - [`ConfigMerger`]: layer merging with per-field precedence rules
//! - [`MachineName`] and [`SubMachineSpec`]: the sub-machine registry
//! - [`UpgradeTarget`]: the newer-schema object `upgrade` writes into
//! - [`Error`] and [`Result`]: error handling for deferred configuration
//!   blocks
//!
//! ## Examples
//!
//! ```
//! use corral::{ConfigMerger, MachineConfig};
//!
//! let mut base = MachineConfig::new();
//! base.box_id = Some("ubuntu".to_string());
//! base.forward_port(80, 8080, None);
//!
//! let mut overlay = MachineConfig::new();
//! overlay.forward_port(443, 8443, None);
//!
//! let mut merged = ConfigMerger::merge(&base, &overlay);
//! merged.finalize();
//!
//! assert_eq!(merged.box_id.as_deref(), Some("ubuntu"));
//! assert_eq!(merged.forwarded_ports().len(), 2);
//! assert_eq!(merged.machine_order().len(), 1);
//! ```

pub mod config;
pub mod error;

// Re-export key types at crate root for convenience
pub use config::{
    config_block, ConfigBlock, ConfigMerger, Customization, FolderOptions, ForwardedPort,
    MachineConfig, MachineName, Network, PortOptions, PortRange, Protocol, Provider,
    ProviderConfig, Provisioner, ProvisionerBlock, SharedFolder, SubMachineSpec, UpgradeTarget,
    VmSettings,
};
pub use error::{Error, Result};
