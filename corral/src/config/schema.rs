//! Configuration schema definitions.
//!
//! This module defines the machine configuration record and the entry types
//! it accumulates: forwarded ports, shared folders, network declarations,
//! and provider customizations. Nothing here is validated: the record
//! captures exactly what the declarative source said and leaves judgment to
//! the runtime.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::provisioner::{Provisioner, ProvisionerBlock};
use crate::config::submachine::{MachineName, SubMachineSpec};

/// An opaque, argv-style directive passed through to the hypervisor
/// provider's control interface (for example
/// `["modifyvm", "--memory", "512"]`).
pub type Customization = Vec<String>;

/// Inclusive port range used for automatic collision correction of
/// forwarded ports.
///
/// # Examples
///
/// ```
/// use corral::PortRange;
///
/// let range = PortRange::new(2200, 2250);
/// assert_eq!(range.min, 2200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    /// Lowest port in the range.
    pub min: u16,
    /// Highest port in the range.
    pub max: u16,
}

impl PortRange {
    /// Creates a new inclusive range. The bounds are stored as given.
    #[must_use]
    pub const fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }
}

/// Transport protocol of a forwarded port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// TCP forwarding (the default).
    #[default]
    Tcp,
    /// UDP forwarding.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Udp => write!(f, "udp"),
        }
    }
}

/// A single host-to-guest port forwarding declaration.
///
/// Forwarded ports are kept in declaration order and never deduplicated,
/// not even by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardedPort {
    /// Display name. Derived from the port pair unless overridden; a
    /// cosmetic uniqueness hint, not enforced unique.
    pub name: String,
    /// Port on the guest machine.
    pub guest_port: u16,
    /// Port on the host machine.
    pub host_port: u16,
    /// Transport protocol.
    pub protocol: Protocol,
    /// Network adapter index the forward is attached to.
    pub adapter: u8,
    /// Whether the port may be moved automatically on collision.
    pub auto: bool,
    /// Unrecognized option keys, carried through untouched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl ForwardedPort {
    /// Builds a forwarded-port record from the port pair and optional
    /// overrides.
    ///
    /// The default name formats both ports in base 32 joined with a hyphen
    /// (`80` and `8080` become `"2g-7sg"`). Options override any default
    /// field, including the name itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::ForwardedPort;
    ///
    /// let port = ForwardedPort::new(80, 8080, None);
    /// assert_eq!(port.name, "2g-7sg");
    /// assert_eq!(port.adapter, 1);
    /// assert!(!port.auto);
    /// ```
    #[must_use]
    pub fn new(guest_port: u16, host_port: u16, options: Option<PortOptions>) -> Self {
        let options = options.unwrap_or_default();
        Self {
            name: options
                .name
                .unwrap_or_else(|| format!("{}-{}", radix32(guest_port), radix32(host_port))),
            guest_port,
            host_port,
            protocol: options.protocol.unwrap_or_default(),
            adapter: options.adapter.unwrap_or(1),
            auto: options.auto.unwrap_or(false),
            extra: options.extra,
        }
    }

    /// Decomposes the record into its port pair and an options map holding
    /// every remaining field.
    ///
    /// Feeding the parts back through [`ForwardedPort::new`] reproduces the
    /// record exactly; the upgrader relies on this to replay declarations
    /// against a newer-schema target.
    #[must_use]
    pub fn into_parts(self) -> (u16, u16, PortOptions) {
        let options = PortOptions {
            name: Some(self.name),
            protocol: Some(self.protocol),
            adapter: Some(self.adapter),
            auto: Some(self.auto),
            extra: self.extra,
        };
        (self.guest_port, self.host_port, options)
    }
}

/// Optional overrides applied on top of forwarded-port defaults.
///
/// # Examples
///
/// ```
/// use corral::{ForwardedPort, PortOptions, Protocol};
///
/// let options = PortOptions::new()
///     .with_name("ssh")
///     .with_protocol(Protocol::Udp);
/// let port = ForwardedPort::new(22, 2222, Some(options));
/// assert_eq!(port.name, "ssh");
/// assert_eq!(port.protocol, Protocol::Udp);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortOptions {
    /// Overrides the derived name.
    pub name: Option<String>,
    /// Overrides the protocol (default TCP).
    pub protocol: Option<Protocol>,
    /// Overrides the adapter index (default 1).
    pub adapter: Option<u8>,
    /// Overrides the auto-correction flag (default false).
    pub auto: Option<bool>,
    /// Keys outside the known schema, passed through verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl PortOptions {
    /// Creates an empty options set (no overrides).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the record name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the protocol.
    #[must_use]
    pub const fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Overrides the adapter index.
    #[must_use]
    pub const fn with_adapter(mut self, adapter: u8) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Overrides the auto-correction flag.
    #[must_use]
    pub const fn with_auto(mut self, auto: bool) -> Self {
        self.auto = Some(auto);
        self
    }

    /// Attaches an unrecognized key to pass through verbatim.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// A host directory mounted into the guest machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedFolder {
    /// Mount point inside the guest.
    pub guest_path: String,
    /// Source directory on the host.
    pub host_path: String,
    /// Create the host directory if it does not exist.
    pub create: bool,
    /// Owner of the mounted folder inside the guest.
    pub owner: Option<String>,
    /// Group of the mounted folder inside the guest.
    pub group: Option<String>,
    /// Mount over NFS instead of the hypervisor's folder sharing.
    pub nfs: bool,
    /// Folder only exists for the duration of the up.
    pub transient: bool,
    /// Provider-specific extra mount data, passed through verbatim.
    pub extra: Option<Value>,
}

impl SharedFolder {
    /// Builds a shared-folder record from its paths and optional overrides.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::SharedFolder;
    ///
    /// let folder = SharedFolder::new("/corral", ".", None);
    /// assert!(!folder.create);
    /// assert!(folder.owner.is_none());
    /// ```
    #[must_use]
    pub fn new(
        guest_path: impl Into<String>,
        host_path: impl Into<String>,
        options: Option<FolderOptions>,
    ) -> Self {
        let options = options.unwrap_or_default();
        Self {
            guest_path: guest_path.into(),
            host_path: host_path.into(),
            create: options.create.unwrap_or(false),
            owner: options.owner,
            group: options.group,
            nfs: options.nfs.unwrap_or(false),
            transient: options.transient.unwrap_or(false),
            extra: options.extra,
        }
    }

    /// Decomposes the record into its paths and an options map holding
    /// every remaining field, mirroring [`ForwardedPort::into_parts`].
    #[must_use]
    pub fn into_parts(self) -> (String, String, FolderOptions) {
        let options = FolderOptions {
            create: Some(self.create),
            owner: self.owner,
            group: self.group,
            nfs: Some(self.nfs),
            transient: Some(self.transient),
            extra: self.extra,
        };
        (self.guest_path, self.host_path, options)
    }
}

/// Optional overrides applied on top of shared-folder defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderOptions {
    /// Overrides the create flag (default false).
    pub create: Option<bool>,
    /// Sets the in-guest owner (default none).
    pub owner: Option<String>,
    /// Sets the in-guest group (default none).
    pub group: Option<String>,
    /// Overrides the NFS flag (default false).
    pub nfs: Option<bool>,
    /// Overrides the transient flag (default false).
    pub transient: Option<bool>,
    /// Sets provider-specific extra mount data (default none).
    pub extra: Option<Value>,
}

impl FolderOptions {
    /// Creates an empty options set (no overrides).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the create flag.
    #[must_use]
    pub const fn with_create(mut self, create: bool) -> Self {
        self.create = Some(create);
        self
    }

    /// Sets the in-guest owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the in-guest group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Overrides the NFS flag.
    #[must_use]
    pub const fn with_nfs(mut self, nfs: bool) -> Self {
        self.nfs = Some(nfs);
        self
    }

    /// Overrides the transient flag.
    #[must_use]
    pub const fn with_transient(mut self, transient: bool) -> Self {
        self.transient = Some(transient);
        self
    }

    /// Sets provider-specific extra mount data.
    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// A network declaration captured verbatim from the configuration source.
///
/// The kind and arguments are opaque at this layer; no schema is enforced
/// on either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Network kind, for example `"hostonly"` or `"bridged"`.
    pub kind: String,
    /// Arguments exactly as declared.
    pub args: Vec<Value>,
}

/// A mutable machine configuration record.
///
/// Built incrementally by the declarative configuration source through the
/// accumulator methods, merged with sibling layers by
/// [`ConfigMerger`](crate::config::ConfigMerger), finalized once, and
/// optionally upgraded once into the current schema.
///
/// A freshly constructed instance has every scalar unset and every
/// collection empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Machine name. Superseded by per-machine naming in the current
    /// schema; not carried over by the upgrader.
    pub name: Option<String>,
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
    pub(crate) forwarded_ports: Vec<ForwardedPort>,
    #[serde(default)]
    pub(crate) shared_folders: BTreeMap<String, SharedFolder>,
    #[serde(default)]
    pub(crate) networks: Vec<Network>,
    #[serde(default)]
    pub(crate) provisioners: Vec<Provisioner>,
    #[serde(default)]
    pub(crate) customizations: Vec<Customization>,
    #[serde(default)]
    pub(crate) machines: BTreeMap<MachineName, SubMachineSpec>,
    #[serde(default)]
    pub(crate) machine_order: Vec<MachineName>,
}

impl MachineConfig {
    /// Creates an empty configuration record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a forwarded port.
    ///
    /// Appends to the declaration list; ports are never deduplicated and no
    /// range or protocol validation happens here.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::MachineConfig;
    ///
    /// let mut config = MachineConfig::new();
    /// config.forward_port(80, 8080, None);
    /// config.forward_port(80, 8080, None);
    /// assert_eq!(config.forwarded_ports().len(), 2);
    /// ```
    pub fn forward_port(&mut self, guest_port: u16, host_port: u16, options: Option<PortOptions>) {
        self.forwarded_ports
            .push(ForwardedPort::new(guest_port, host_port, options));
    }

    /// Declares a shared folder under `name`.
    ///
    /// Re-declaring an existing name overwrites its entry.
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

    /// Declares a provisioner with optional options and a deferred
    /// configuration block the provisioning subsystem runs later.
    pub fn provision(
        &mut self,
        name: impl Into<String>,
        options: Option<Value>,
        block: Option<ProvisionerBlock>,
    ) {
        self.provisioners
            .push(Provisioner::new(name, options, block));
    }

    /// Appends a provider customization directive.
    ///
    /// A `None` directive is silently ignored; the argument-less call
    /// pattern of the deprecated customization style is still accepted.
    pub fn customize(&mut self, directive: Option<Customization>) {
        if let Some(directive) = directive {
            self.customizations.push(directive);
        }
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

    /// Provisioner declarations in declaration order.
    #[must_use]
    pub fn provisioners(&self) -> &[Provisioner] {
        &self.provisioners
    }

    /// Provider customization directives in declaration order.
    #[must_use]
    pub fn customizations(&self) -> &[Customization] {
        &self.customizations
    }
}

/// Formats a value in base 32 using lowercase digits, the radix the
/// derived port names use.
#[allow(clippy::cast_possible_truncation)]
fn radix32(value: u16) -> String {
    const DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";
    if value == 0 {
        return "0".to_string();
    }
    let mut value = u32::from(value);
    let mut digits = [0u8; 4];
    let mut used = 0;
    while value > 0 {
        digits[used] = DIGITS[(value % 32) as usize];
        used += 1;
        value /= 32;
    }
    digits[..used].iter().rev().map(|&b| char::from(b)).collect()
}


// Property-based tests for accumulator behavior
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Declaration order and length are preserved for any sequence of
        // forward_port calls; nothing is deduplicated.
        #[test]
        fn prop_forward_port_preserves_order_and_length(
            pairs in prop::collection::vec((1u16..=65535, 1u16..=65535), 0..32),
        ) {
            let mut config = MachineConfig::new();
            for &(guest, host) in &pairs {
                config.forward_port(guest, host, None);
            }

            prop_assert_eq!(config.forwarded_ports().len(), pairs.len());
            for (port, &(guest, host)) in config.forwarded_ports().iter().zip(&pairs) {
                prop_assert_eq!(port.guest_port, guest);
                prop_assert_eq!(port.host_port, host);
            }
        }
    }

    proptest! {
        // Re-declaring a folder name always leaves exactly one entry,
        // holding the last call's values merged over defaults.
        #[test]
        fn prop_share_folder_last_declaration_wins(
            host_a in "[a-z/]{1,20}",
            host_b in "[a-z/]{1,20}",
            nfs in any::<bool>(),
        ) {
            let mut config = MachineConfig::new();
            config.share_folder("x", "/guest", host_a, None);
            config.share_folder(
                "x",
                "/guest",
                host_b.clone(),
                Some(FolderOptions::new().with_nfs(nfs)),
            );

            prop_assert_eq!(config.shared_folders().len(), 1);
            let folder = &config.shared_folders()["x"];
            prop_assert_eq!(&folder.host_path, &host_b);
            prop_assert_eq!(folder.nfs, nfs);
        }
    }

    proptest! {
        // The derived name is stable and only uses base-32 digits.
        #[test]
        fn prop_derived_name_shape(guest in any::<u16>(), host in any::<u16>()) {
            let port = ForwardedPort::new(guest, host, None);
            let mut parts = port.name.splitn(2, '-');
            let left = parts.next().unwrap();
            let right = parts.next().unwrap();
            prop_assert_eq!(u32::from_str_radix(left, 32).unwrap(), u32::from(guest));
            prop_assert_eq!(u32::from_str_radix(right, 32).unwrap(), u32::from(host));
        }
    }
}
