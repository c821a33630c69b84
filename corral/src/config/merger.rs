//! Configuration layer merging and precedence handling.
//!
//! A machine configuration is resolved from several layers (built-in
//! defaults, the global configuration, per-machine overrides). Scalar
//! fields follow an overlay-wins-if-set policy; the accumulated
//! collections are concatenated or unioned instead, so every layer's
//! declarations survive.

use crate::config::schema::MachineConfig;

/// Merges machine configuration layers according to precedence rules.
///
/// # Examples
///
/// ```
/// use corral::{ConfigMerger, MachineConfig};
///
/// let mut base = MachineConfig::new();
/// base.box_id = Some("base".to_string());
///
/// let mut overlay = MachineConfig::new();
/// overlay.box_id = Some("overlay".to_string());
///
/// let merged = ConfigMerger::merge(&base, &overlay);
/// assert_eq!(merged.box_id.as_deref(), Some("overlay"));
/// ```
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merges two layers into a new configuration, `overlay` taking
    /// precedence over `base`.
    ///
    /// Neither input is mutated.
    #[must_use]
    pub fn merge(base: &MachineConfig, overlay: &MachineConfig) -> MachineConfig {
        let mut result = base.clone();
        Self::merge_into(&mut result, overlay);
        result
    }

    /// Merges an ordered sequence of layers, lowest to highest precedence.
    ///
    /// # Examples
    ///
    /// ```
    /// use corral::{ConfigMerger, MachineConfig};
    ///
    /// let mut defaults = MachineConfig::new();
    /// defaults.boot_mode = Some("headless".to_string());
    ///
    /// let mut machine = MachineConfig::new();
    /// machine.box_id = Some("ubuntu64".to_string());
    ///
    /// let merged = ConfigMerger::merge_all([&defaults, &machine]);
    /// assert_eq!(merged.boot_mode.as_deref(), Some("headless"));
    /// assert_eq!(merged.box_id.as_deref(), Some("ubuntu64"));
    /// ```
    #[must_use]
    pub fn merge_all<'a, I>(layers: I) -> MachineConfig
    where
        I: IntoIterator<Item = &'a MachineConfig>,
    {
        let mut result = MachineConfig::new();
        for layer in layers {
            Self::merge_into(&mut result, layer);
        }
        result
    }

    /// Merges `overlay` into `target` in place.
    ///
    /// # Merging Rules
    ///
    /// - Scalar fields: overlay overwrites if set, unset falls back to the
    ///   target
    /// - Forwarded ports, networks, provisioners, customizations:
    ///   concatenated, target's entries first
    /// - Shared folders: unioned, overlay entries overwrite same-named ones
    /// - Sub-machine registry: replaced as a unit when the overlay defines
    ///   any machine, kept otherwise (the map and its ordered key list
    ///   always travel together)
    pub fn merge_into(target: &mut MachineConfig, overlay: &MachineConfig) {
        Self::merge_scalars(target, overlay);

        target
            .forwarded_ports
            .extend(overlay.forwarded_ports.iter().cloned());

        for (name, folder) in &overlay.shared_folders {
            target.shared_folders.insert(name.clone(), folder.clone());
        }

        target.networks.extend(overlay.networks.iter().cloned());
        target
            .provisioners
            .extend(overlay.provisioners.iter().cloned());
        target
            .customizations
            .extend(overlay.customizations.iter().cloned());

        log::debug!(
            "merged overlay: {} port(s), {} folder(s), {} network(s), {} provisioner(s), {} customization(s)",
            overlay.forwarded_ports.len(),
            overlay.shared_folders.len(),
            overlay.networks.len(),
            overlay.provisioners.len(),
            overlay.customizations.len(),
        );
    }

    /// Applies the overlay-wins-if-set policy to every scalar field.
    fn merge_scalars(target: &mut MachineConfig, overlay: &MachineConfig) {
        if overlay.name.is_some() {
            target.name.clone_from(&overlay.name);
        }

        if overlay.auto_port_range.is_some() {
            target.auto_port_range = overlay.auto_port_range;
        }

        if overlay.base_mac.is_some() {
            target.base_mac.clone_from(&overlay.base_mac);
        }

        if overlay.boot_mode.is_some() {
            target.boot_mode.clone_from(&overlay.boot_mode);
        }

        if overlay.box_id.is_some() {
            target.box_id.clone_from(&overlay.box_id);
        }

        if overlay.box_url.is_some() {
            target.box_url.clone_from(&overlay.box_url);
        }

        if overlay.guest.is_some() {
            target.guest.clone_from(&overlay.guest);
        }

        if overlay.host_name.is_some() {
            target.host_name.clone_from(&overlay.host_name);
        }

        // The registry is one invariant-linked value (map + ordered keys),
        // so the set-wins policy applies to it as a whole.
        if !overlay.machine_order.is_empty() {
            target.machines = overlay.machines.clone();
            target.machine_order = overlay.machine_order.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{FolderOptions, PortRange};
    use crate::config::submachine::MachineName;

    #[test]
    fn test_merge_scalar_overlay_wins() {
        let mut base = MachineConfig::new();
        base.box_id = Some("old".to_string());
        base.boot_mode = Some("gui".to_string());

        let mut overlay = MachineConfig::new();
        overlay.box_id = Some("new".to_string());

        let merged = ConfigMerger::merge(&base, &overlay);
        assert_eq!(merged.box_id.as_deref(), Some("new"));
        // Unset overlay fields fall back to the base
        assert_eq!(merged.boot_mode.as_deref(), Some("gui"));
    }

    #[test]
    fn test_merge_none_does_not_overwrite() {
        let mut base = MachineConfig::new();
        base.host_name = Some("web-1".to_string());
        base.auto_port_range = Some(PortRange::new(2200, 2250));

        let overlay = MachineConfig::new();

        let merged = ConfigMerger::merge(&base, &overlay);
        assert_eq!(merged.host_name.as_deref(), Some("web-1"));
        assert_eq!(merged.auto_port_range, Some(PortRange::new(2200, 2250)));
    }

    #[test]
    fn test_merge_concatenates_forwarded_ports() {
        let mut base = MachineConfig::new();
        base.forward_port(80, 8080, None);

        let mut overlay = MachineConfig::new();
        overlay.forward_port(443, 8443, None);
        overlay.forward_port(80, 8080, None);

        let merged = ConfigMerger::merge(&base, &overlay);
        let guests: Vec<u16> = merged
            .forwarded_ports()
            .iter()
            .map(|p| p.guest_port)
            .collect();
        // Base entries first, duplicates preserved
        assert_eq!(guests, vec![80, 443, 80]);
    }

    #[test]
    fn test_merge_unions_shared_folders_overlay_wins() {
        let mut base = MachineConfig::new();
        base.share_folder("root", "/corral", ".", None);
        base.share_folder("data", "/data", "/srv/a", None);

        let mut overlay = MachineConfig::new();
        overlay.share_folder("data", "/data", "/srv/b", Some(FolderOptions::new().with_nfs(true)));
        overlay.share_folder("logs", "/logs", "./logs", None);

        let merged = ConfigMerger::merge(&base, &overlay);
        assert_eq!(merged.shared_folders().len(), 3);
        assert_eq!(merged.shared_folders()["root"].host_path, ".");
        assert_eq!(merged.shared_folders()["data"].host_path, "/srv/b");
        assert!(merged.shared_folders()["data"].nfs);
        assert_eq!(merged.shared_folders()["logs"].guest_path, "/logs");
    }

    #[test]
    fn test_merge_concatenates_networks_provisioners_customizations() {
        let mut base = MachineConfig::new();
        base.network("hostonly", vec![serde_json::json!("10.0.0.2")]);
        base.provision("shell", None, None);
        base.customize(Some(vec!["modifyvm".to_string(), "--memory".to_string()]));

        let mut overlay = MachineConfig::new();
        overlay.network("bridged", vec![]);
        overlay.provision("chef_solo", None, None);
        overlay.customize(Some(vec!["modifyvm".to_string(), "--cpus".to_string()]));

        let merged = ConfigMerger::merge(&base, &overlay);
        assert_eq!(merged.networks().len(), 2);
        assert_eq!(merged.networks()[0].kind, "hostonly");
        assert_eq!(merged.networks()[1].kind, "bridged");
        assert_eq!(merged.provisioners().len(), 2);
        assert_eq!(merged.provisioners()[0].name, "shell");
        assert_eq!(merged.provisioners()[1].name, "chef_solo");
        assert_eq!(merged.customizations().len(), 2);
    }

    #[test]
    fn test_merge_registry_replaced_when_overlay_defines() {
        let mut base = MachineConfig::new();
        base.define("web", None, None);

        let mut overlay = MachineConfig::new();
        overlay.define("db", None, None);

        let merged = ConfigMerger::merge(&base, &overlay);
        let order: Vec<&str> = merged.machine_order().iter().map(MachineName::as_str).collect();
        assert_eq!(order, vec!["db"]);
        assert!(merged.machine(&MachineName::new("web")).is_none());
    }

    #[test]
    fn test_merge_registry_kept_when_overlay_empty() {
        let mut base = MachineConfig::new();
        base.define("web", None, None);

        let overlay = MachineConfig::new();

        let merged = ConfigMerger::merge(&base, &overlay);
        let order: Vec<&str> = merged.machine_order().iter().map(MachineName::as_str).collect();
        assert_eq!(order, vec!["web"]);
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let mut base = MachineConfig::new();
        base.forward_port(80, 8080, None);

        let mut overlay = MachineConfig::new();
        overlay.forward_port(443, 8443, None);

        let _ = ConfigMerger::merge(&base, &overlay);
        assert_eq!(base.forwarded_ports().len(), 1);
        assert_eq!(overlay.forwarded_ports().len(), 1);
    }

    #[test]
    fn test_merge_all_layers_in_order() {
        let mut defaults = MachineConfig::new();
        defaults.box_id = Some("defaults".to_string());
        defaults.boot_mode = Some("headless".to_string());

        let mut global = MachineConfig::new();
        global.box_id = Some("global".to_string());
        global.forward_port(80, 8080, None);

        let mut machine = MachineConfig::new();
        machine.box_id = Some("machine".to_string());
        machine.forward_port(443, 8443, None);

        let merged = ConfigMerger::merge_all([&defaults, &global, &machine]);
        assert_eq!(merged.box_id.as_deref(), Some("machine"));
        assert_eq!(merged.boot_mode.as_deref(), Some("headless"));
        assert_eq!(merged.forwarded_ports().len(), 2);
        assert_eq!(merged.forwarded_ports()[0].guest_port, 80);
    }
}
