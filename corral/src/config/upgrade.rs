//! Upgrade of a legacy-schema configuration into the current schema.
//!
//! The current schema nests machine settings under a `vm` section and
//! scopes hypervisor customizations to a provider section instead of the
//! legacy flat list. [`MachineConfig::upgrade`] copies every recognized
//! field across, translating the legacy constructs on the way; the legacy
//! configuration is never mutated, and the host constructs and owns the
//! target.
//!
//! Known limitations, carried over deliberately: provisioner declarations
//! are not migrated, and the legacy per-configuration `name` field is
//! dropped (the current schema's per-machine naming supersedes it).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::schema::{
    Customization, FolderOptions, ForwardedPort, MachineConfig, Network, PortOptions, PortRange,
    SharedFolder,
};

/// Hypervisor providers that can receive low-level customizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Oracle VirtualBox, the provider the legacy customization list
    /// always targeted.
    VirtualBox,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VirtualBox => write!(f, "virtualbox"),
        }
    }
}

/// Provider-scoped configuration section on the upgrade target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    customizations: Vec<Customization>,
}

impl ProviderConfig {
    /// Appends a customization directive, ignoring `None` exactly like the
    /// legacy accumulator.
    pub fn customize(&mut self, directive: Option<Customization>) {
        if let Some(directive) = directive {
            self.customizations.push(directive);
        }
    }

    /// Customization directives in declaration order.
    #[must_use]
    pub fn customizations(&self) -> &[Customization] {
        &self.customizations
    }
}

/// The `vm` section of the current configuration schema.
///
/// Carries the same scalar settings as the legacy record and the same
/// accumulators for ports, networks, and folders; the record constructors
/// are shared, so defaults and name derivation behave identically when
/// declarations are replayed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmSettings {
    /// Port range used to auto-correct colliding forwarded ports.
    pub auto_port_range: Option<PortRange>,
    /// Base MAC address of the primary adapter.
    pub base_mac: Option<String>,
    /// Boot mode, for example `"headless"` or `"gui"`.
    pub boot_mode: Option<String>,
    /// Box image identifier.
    #[serde(rename = "box")]
    pub box_id: Option<String>,
    /// URL the box image can be fetched from.
    pub box_url: Option<String>,
    /// Guest OS type hint.
    pub guest: Option<String>,
    /// Host name assigned inside the guest.
    pub host_name: Option<String>,

    #[serde(default)]
    forwarded_ports: Vec<ForwardedPort>,
    #[serde(default)]
    shared_folders: BTreeMap<String, SharedFolder>,
    #[serde(default)]
    networks: Vec<Network>,
}

impl VmSettings {
    /// Declares a forwarded port; same semantics as the legacy
    /// accumulator.
    pub fn forward_port(&mut self, guest_port: u16, host_port: u16, options: Option<PortOptions>) {
        self.forwarded_ports
            .push(ForwardedPort::new(guest_port, host_port, options));
    }

    /// Declares a shared folder; same semantics as the legacy accumulator.
    pub fn share_folder(
        &mut self,
        name: impl Into<String>,
        guest_path: impl Into<String>,
        host_path: impl Into<String>,
        options: Option<FolderOptions>,
    ) {
        self.shared_folders
            .insert(name.into(), SharedFolder::new(guest_path, host_path, options));
    }

    /// Declares a network, captured verbatim.
    pub fn network(&mut self, kind: impl Into<String>, args: Vec<Value>) {
        self.networks.push(Network {
            kind: kind.into(),
            args,
        });
    }

    /// Forwarded ports in declaration order.
    #[must_use]
    pub fn forwarded_ports(&self) -> &[ForwardedPort] {
        &self.forwarded_ports
    }

    /// Shared folders keyed by name.
    #[must_use]
    pub fn shared_folders(&self) -> &BTreeMap<String, SharedFolder> {
        &self.shared_folders
    }

    /// Network declarations in declaration order.
    #[must_use]
    pub fn networks(&self) -> &[Network] {
        &self.networks
    }
}

/// Current-schema configuration object an upgrade writes into.
///
/// The host constructs one, hands it to [`MachineConfig::upgrade`], and
/// owns the result.
///
/// # Examples
///
/// ```
/// use corral::{MachineConfig, UpgradeTarget};
///
/// let mut legacy = MachineConfig::new();
/// legacy.box_id = Some("ubuntu64".to_string());
///
/// let mut target = UpgradeTarget::new();
/// legacy.upgrade(&mut target);
/// assert_eq!(target.vm.box_id.as_deref(), Some("ubuntu64"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradeTarget {
    /// Machine settings section.
    pub vm: VmSettings,
    #[serde(default)]
    providers: BTreeMap<Provider, ProviderConfig>,
}

impl UpgradeTarget {
    /// Creates an empty target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration section for `provider`, created on first use.
    pub fn provider_mut(&mut self, provider: Provider) -> &mut ProviderConfig {
        self.providers.entry(provider).or_default()
    }

    /// The configuration section for `provider`, if any customization has
    /// been scoped to it.
    #[must_use]
    pub fn provider(&self, provider: Provider) -> Option<&ProviderConfig> {
        self.providers.get(&provider)
    }

    /// All provider sections.
    #[must_use]
    pub fn providers(&self) -> &BTreeMap<Provider, ProviderConfig> {
        &self.providers
    }
}

impl MachineConfig {
    /// Upgrades this legacy-schema configuration into `target`.
    ///
    /// Scalar fields are copied only when set: a `None` source never
    /// overwrites whatever the target already holds. Customizations are
    /// re-applied against the target's VirtualBox provider section, and
    /// forwarded ports, networks, and shared folders are replayed through
    /// the target's own accumulators. Provisioners are not migrated and
    /// the legacy `name` field is dropped.
    ///
    /// The source is not mutated; `upgrade` may be called against several
    /// targets.
    pub fn upgrade(&self, target: &mut UpgradeTarget) {
        if self.auto_port_range.is_some() {
            target.vm.auto_port_range = self.auto_port_range;
        }
        if self.base_mac.is_some() {
            target.vm.base_mac.clone_from(&self.base_mac);
        }
        if self.boot_mode.is_some() {
            target.vm.boot_mode.clone_from(&self.boot_mode);
        }
        if self.box_id.is_some() {
            target.vm.box_id.clone_from(&self.box_id);
        }
        if self.box_url.is_some() {
            target.vm.box_url.clone_from(&self.box_url);
        }
        if self.guest.is_some() {
            target.vm.guest.clone_from(&self.guest);
        }
        if self.host_name.is_some() {
            target.vm.host_name.clone_from(&self.host_name);
        }

        // The legacy flat customization list always meant VirtualBox;
        // scope it to that provider's section.
        for customization in &self.customizations {
            target
                .provider_mut(Provider::VirtualBox)
                .customize(Some(customization.clone()));
        }

        for port in self.forwarded_ports.iter().cloned() {
            let (guest_port, host_port, options) = port.into_parts();
            target.vm.forward_port(guest_port, host_port, Some(options));
        }

        for network in &self.networks {
            target.vm.network(network.kind.clone(), network.args.clone());
        }

        for (name, folder) in &self.shared_folders {
            let (guest_path, host_path, options) = folder.clone().into_parts();
            target
                .vm
                .share_folder(name.clone(), guest_path, host_path, Some(options));
        }

        log::debug!(
            "upgraded legacy configuration: {} port(s), {} network(s), {} folder(s), {} customization(s); {} provisioner(s) not migrated",
            self.forwarded_ports.len(),
            self.networks.len(),
            self.shared_folders.len(),
            self.customizations.len(),
            self.provisioners.len(),
        );
    }
}
