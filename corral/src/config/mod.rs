//! Machine configuration system for corral.
//!
//! This module provides the configuration record a declarative machine
//! definition accumulates into, with support for:
//! - Accumulator methods for ports, folders, networks, provisioners, and
//!   provider customizations
//! - A named sub-machine registry with deferred configuration blocks
//! - Layer merging with per-field precedence rules
//! - A one-way upgrade into the current configuration schema
//!
//! # Lifecycle
//!
//! A [`MachineConfig`] is created by the configuration loader, mutated only
//! through its accumulator methods while the declarative source is
//! evaluated, merged with sibling layers at resolution time, finalized once
//! before being handed to the runtime, and optionally upgraded once when a
//! legacy-schema source is encountered.
//!
//! # Examples
//!
//! A single-machine configuration, the way a declarative source builds one:
//!
//! ```
//! use corral::config::MachineConfig;
//!
//! let mut config = MachineConfig::new();
//! config.box_id = Some("ubuntu64".to_string());
//! config.forward_port(80, 8080, None);
//! config.share_folder("root", "/corral", ".", None);
//! config.finalize();
//!
//! assert!(config.machine_order()[0].is_default());
//! ```

pub mod merger;
pub mod provisioner;
pub mod schema;
pub mod submachine;
pub mod upgrade;

// Re-export key types at module root
pub use merger::ConfigMerger;
pub use provisioner::{Provisioner, ProvisionerBlock};
pub use schema::{
    Customization, FolderOptions, ForwardedPort, MachineConfig, Network, PortOptions, PortRange,
    Protocol, SharedFolder,
};
pub use submachine::{config_block, ConfigBlock, MachineName, SubMachineSpec};
pub use upgrade::{Provider, ProviderConfig, UpgradeTarget, VmSettings};
