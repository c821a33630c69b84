//! Provisioner declarations.
//!
//! A provisioner declaration names a provisioning backend, carries its
//! options verbatim, and may hold a deferred configuration block the
//! provisioning subsystem invokes once it has built the backend's own
//! configuration object. Running provisioners is entirely outside this
//! crate.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Deferred configuration callback for a provisioner.
///
/// Invoked later by the provisioning subsystem against the provisioner's
/// own configuration value, in the order blocks were registered.
pub type ProvisionerBlock = Rc<dyn Fn(&mut Value) -> Result<()>>;

/// A single provisioner declaration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Provisioner {
    /// Name of the provisioning backend, for example `"shell"` or
    /// `"chef_solo"`.
    pub name: String,
    /// Options exactly as declared; opaque at this layer.
    pub options: Option<Value>,
    #[serde(skip)]
    block: Option<ProvisionerBlock>,
}

impl Provisioner {
    /// Creates a provisioner declaration.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::Provisioner;
    /// use serde_json::json;
    ///
    /// let provisioner = Provisioner::new("shell", Some(json!({"path": "boot.sh"})), None);
    /// assert_eq!(provisioner.name, "shell");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, options: Option<Value>, block: Option<ProvisionerBlock>) -> Self {
        Self {
            name: name.into(),
            options,
            block,
        }
    }

    /// The deferred configuration block, if one was declared.
    #[must_use]
    pub fn block(&self) -> Option<&ProvisionerBlock> {
        self.block.as_ref()
    }

    /// Runs the deferred block against the backend's configuration value.
    ///
    /// A declaration without a block is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates whatever the block returns.
    pub fn configure(&self, target: &mut Value) -> Result<()> {
        if let Some(block) = &self.block {
            block(target)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("block", &self.block.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_new_without_block() {
        let provisioner = Provisioner::new("shell", None, None);
        assert_eq!(provisioner.name, "shell");
        assert!(provisioner.options.is_none());
        assert!(provisioner.block().is_none());
    }

    #[test]
    fn test_configure_without_block_is_noop() {
        let provisioner = Provisioner::new("shell", None, None);
        let mut value = json!({});
        provisioner.configure(&mut value).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_configure_runs_block() {
        let provisioner = Provisioner::new(
            "chef_solo",
            Some(json!({"run_list": []})),
            Some(Rc::new(|value: &mut Value| {
                value["cookbooks_path"] = json!("cookbooks");
                Ok(())
            })),
        );

        let mut value = json!({});
        provisioner.configure(&mut value).unwrap();
        assert_eq!(value["cookbooks_path"], json!("cookbooks"));
    }

    #[test]
    fn test_configure_propagates_block_failure() {
        let provisioner = Provisioner::new(
            "shell",
            None,
            Some(Rc::new(|_: &mut Value| {
                Err(Error::rejected("path missing"))
            })),
        );

        let mut value = json!({});
        let err = provisioner.configure(&mut value).unwrap_err();
        assert!(err.to_string().contains("path missing"));
    }

    #[test]
    fn test_clone_shares_block() {
        let calls = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&calls);
        let provisioner = Provisioner::new(
            "shell",
            None,
            Some(Rc::new(move |_: &mut Value| {
                seen.set(seen.get() + 1);
                Ok(())
            })),
        );

        let copy = provisioner.clone();
        let mut value = json!({});
        provisioner.configure(&mut value).unwrap();
        copy.configure(&mut value).unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_debug_hides_block_body() {
        let provisioner = Provisioner::new("shell", None, Some(Rc::new(|_: &mut Value| Ok(()))));
        let debug = format!("{provisioner:?}");
        assert!(debug.contains("shell"));
        assert!(debug.contains("block: true"));
    }

    #[test]
    fn test_serde_skips_block() {
        let provisioner = Provisioner::new(
            "shell",
            Some(json!({"path": "boot.sh"})),
            Some(Rc::new(|_: &mut Value| Ok(()))),
        );

        let yaml = serde_yaml::to_string(&provisioner).unwrap();
        let parsed: Provisioner = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.name, "shell");
        assert_eq!(parsed.options, Some(json!({"path": "boot.sh"})));
        assert!(parsed.block().is_none());
    }
}
