//! The sub-machine registry.
//!
//! Multi-machine configurations nest named machine definitions inside a
//! parent configuration. Each definition is a [`SubMachineSpec`]: an
//! options map plus an ordered list of deferred configuration blocks that
//! the runtime applies when it resolves that machine's own configuration.
//!
//! Definition order matters to the runtime (machines boot in the order
//! they were declared), so the parent keeps an explicit ordered key list
//! next to the name-to-spec map. The key list is literal: every `define`
//! call appends to it, including re-definitions of an existing name.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::schema::MachineConfig;
use crate::error::{Error, Result};

/// Symbolic name of a sub-machine.
///
/// Names are normalized to a canonical form on construction (surrounding
/// whitespace is stripped); anything else is accepted uncritically. The
/// reserved [`MachineName::DEFAULT`] name marks the implicit machine of a
/// single-machine configuration.
///
/// # Examples
///
/// ```
/// use corral::MachineName;
///
/// let name = MachineName::new("web");
/// assert_eq!(name.as_str(), "web");
/// assert!(!name.is_default());
/// assert!(MachineName::default().is_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineName(String);

impl MachineName {
    /// The reserved name of the implicit single-machine definition.
    pub const DEFAULT: &'static str = "default";

    /// Creates a name, normalizing it to canonical form.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the reserved default name.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }
}

impl Default for MachineName {
    /// The reserved default name, not an empty one.
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl fmt::Display for MachineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MachineName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MachineName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Deferred configuration callback for a sub-machine.
///
/// Blocks run against the machine's resolved configuration, in the order
/// they were registered.
pub type ConfigBlock = Rc<dyn Fn(&mut MachineConfig) -> Result<()>>;

/// Wraps a closure as a deferred configuration block.
///
/// # Examples
///
/// ```
/// use corral::{config_block, MachineConfig};
///
/// let mut config = MachineConfig::new();
/// config.define(
///     "web",
///     None,
///     Some(config_block(|machine| {
///         machine.host_name = Some("web".to_string());
///         Ok(())
///     })),
/// );
/// ```
pub fn config_block<F>(block: F) -> ConfigBlock
where
    F: Fn(&mut MachineConfig) -> Result<()> + 'static,
{
    Rc::new(block)
}

/// A named sub-machine definition: an options map plus the deferred
/// configuration blocks registered for it.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SubMachineSpec {
    options: BTreeMap<String, Value>,
    #[serde(skip)]
    blocks: Vec<ConfigBlock>,
}

impl SubMachineSpec {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The definition's options map.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Merges options into the map: new keys are added, existing keys are
    /// overwritten.
    pub fn merge_options(&mut self, options: BTreeMap<String, Value>) {
        self.options.extend(options);
    }

    /// Appends a deferred configuration block.
    pub fn push_block(&mut self, block: ConfigBlock) {
        self.blocks.push(block);
    }

    /// Number of registered blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Applies every registered block to `config`, in registration order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing block and returns it as
    /// [`Error::BlockFailed`] with its registration index.
    pub fn apply(&self, config: &mut MachineConfig) -> Result<()> {
        for (index, block) in self.blocks.iter().enumerate() {
            block(config).map_err(|source| Error::BlockFailed {
                index,
                message: source.to_string(),
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for SubMachineSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubMachineSpec")
            .field("options", &self.options)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}

impl MachineConfig {
    /// Defines a sub-machine under `name`.
    ///
    /// The name is appended to the ordered key list on every call, even
    /// when it was already defined; re-definition adds a duplicate key
    /// entry but reuses the same underlying spec. The first definition of
    /// a name registers a block that stamps the machine's own `name` field
    /// when the definition is applied. `options` are merged into the
    /// spec's options map; `block`, if given, is appended to its deferred
    /// blocks.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::MachineConfig;
    ///
    /// let mut config = MachineConfig::new();
    /// config.define("web", None, None);
    /// config.define("db", None, None);
    /// assert_eq!(config.machine_order().len(), 2);
    /// ```
    pub fn define(
        &mut self,
        name: impl Into<MachineName>,
        options: Option<BTreeMap<String, Value>>,
        block: Option<ConfigBlock>,
    ) {
        let name = name.into();
        log::debug!("defining machine '{name}'");

        // The key list preserves definition order independently of the
        // map's own iteration order; duplicates are intentional.
        self.machine_order.push(name.clone());

        let spec = self.machines.entry(name.clone()).or_insert_with(|| {
            let mut spec = SubMachineSpec::new();
            let machine = name.clone();
            spec.push_block(Rc::new(move |config: &mut MachineConfig| {
                config.name = Some(machine.as_str().to_string());
                Ok(())
            }));
            spec
        });

        if let Some(options) = options {
            spec.merge_options(options);
        }
        if let Some(block) = block {
            spec.push_block(block);
        }
    }

    /// Ensures at least one sub-machine definition exists.
    ///
    /// If nothing was ever defined, the reserved default machine is
    /// defined implicitly and the whole parent configuration applies as a
    /// single unnamed machine. Called once after all layers are merged.
    pub fn finalize(&mut self) {
        if self.machine_order.is_empty() {
            log::debug!(
                "no machines defined, defining implicit '{}' machine",
                MachineName::DEFAULT
            );
            self.define(MachineName::default(), None, None);
        }
    }

    /// Sub-machine names in definition order, duplicates included.
    #[must_use]
    pub fn machine_order(&self) -> &[MachineName] {
        &self.machine_order
    }

    /// Sub-machine definitions keyed by name.
    #[must_use]
    pub fn defined_machines(&self) -> &BTreeMap<MachineName, SubMachineSpec> {
        &self.machines
    }

    /// Looks up a single sub-machine definition.
    #[must_use]
    pub fn machine(&self, name: &MachineName) -> Option<&SubMachineSpec> {
        self.machines.get(name)
    }
}
