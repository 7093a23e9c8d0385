//! Settings discovery
//!
//! Turns the host's plugins into one flat, discovery-ordered list of entries.
//! A plugin that fails while describing its settings is logged and skipped;
//! it never stops the remaining plugins from being discovered.

use crate::model::{Plugin, PluginHost, PluginInfo, SettingEntry, SettingValue, ValueType};
use crate::store::ConfigFile;
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

pub const FRAME_SWITCH_NAME: &str = "!Allow plugin to run on every frame";
pub const FRAME_SWITCH_DESCRIPTION: &str = "Disabling this will disable some or all of the plugin's functionality.\n\
Hooks and event-based functionality will not be disabled.\n\
This setting will be lost after game restart.";

/// A plugin could not enumerate its settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryError {
    pub owner: String,
    pub message: String,
}

impl DiscoveryError {
    pub fn new(owner: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to collect settings of the following plugin: {}: {}",
            self.owner, self.message
        )
    }
}

impl std::error::Error for DiscoveryError {}

/// Result of a discovery pass
#[derive(Debug, Default)]
pub struct DiscoveredSettings {
    /// Entries in discovery order (core settings first)
    pub entries: Vec<SettingEntry>,
    /// Owners that contributed nothing, display names, sorted
    pub owners_without_settings: BTreeSet<String>,
}

impl DiscoveredSettings {
    /// Owners without settings as one comma-separated line
    pub fn owners_without_settings_text(&self) -> String {
        self.owners_without_settings
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Collect every browsable setting the host exposes
pub fn collect_settings(host: &dyn PluginHost, include_debug_entries: bool) -> DiscoveredSettings {
    let mut result = DiscoveredSettings::default();

    if let Some((core_info, core_file)) = host.core_settings() {
        match ConfigFile::setting_entries(&core_file, &core_info) {
            Ok(core) => {
                tracing::debug!("Collected {} core settings from {}", core.len(), core_info);
                result.entries.extend(core.into_iter().map(|mut entry| {
                    entry.is_advanced = Some(true);
                    entry
                }));
            }
            Err(e) => tracing::error!("Failed to collect core settings: {}", e),
        }
    }

    for plugin in host.plugins() {
        let name = plugin.info().display_name().to_string();

        if !plugin.browsable() {
            result.owners_without_settings.insert(name);
            continue;
        }

        match collect_plugin(&plugin, include_debug_entries) {
            Ok((detected, has_own_settings)) => {
                if !has_own_settings {
                    result.owners_without_settings.insert(name);
                }
                result.entries.extend(detected);
            }
            Err(e) => {
                tracing::error!(owner = %plugin.info(), "{}", e);
                result.owners_without_settings.insert(name);
            }
        }
    }

    tracing::debug!(
        "Discovered {} settings, {} owners without settings",
        result.entries.len(),
        result.owners_without_settings.len()
    );
    result
}

fn collect_plugin(
    plugin: &Rc<dyn Plugin>,
    include_debug_entries: bool,
) -> Result<(Vec<SettingEntry>, bool), DiscoveryError> {
    let info = plugin.info().clone();
    let described = catch_unwind(AssertUnwindSafe(|| plugin.describe_settings())).map_err(|_| {
        DiscoveryError::new(info.display_name(), "plugin panicked while describing settings")
    })??;

    let mut detected: Vec<SettingEntry> = described.into_iter().filter(|e| e.browsable).collect();

    // The enable switch alone does not count as the plugin having settings
    let has_own_settings = !detected.is_empty();

    if include_debug_entries {
        if let Some(switch) = plugin.frame_switch() {
            detected.push(frame_switch_entry(info, switch));
        }
    }

    Ok((detected, has_own_settings))
}

fn frame_switch_entry(owner: PluginInfo, switch: crate::model::FrameSwitch) -> SettingEntry {
    let read = switch.clone();
    SettingEntry::property(
        owner,
        FRAME_SWITCH_NAME,
        ValueType::Bool,
        move || Ok(SettingValue::Bool(read.get())),
        move |value| match value {
            SettingValue::Bool(enabled) => {
                switch.set(enabled);
                Ok(())
            }
            other => Err(format!("expected a boolean, got {other}")),
        },
    )
    .with_description(FRAME_SWITCH_DESCRIPTION)
    .with_advanced(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FrameSwitch, PluginRegistry};
    use crate::store::ConfigBinding;
    use std::cell::Cell;

    struct TestPlugin {
        info: PluginInfo,
        browsable: bool,
        settings: Vec<(&'static str, bool)>,
        fail: bool,
        switch: Option<FrameSwitch>,
    }

    impl TestPlugin {
        fn new(name: &str) -> Self {
            Self {
                info: PluginInfo::new(name, format!("com.test.{}", name.to_lowercase()), "1.0"),
                browsable: true,
                settings: Vec::new(),
                fail: false,
                switch: None,
            }
        }

        fn with_setting(mut self, name: &'static str, browsable: bool) -> Self {
            self.settings.push((name, browsable));
            self
        }
    }

    impl Plugin for TestPlugin {
        fn info(&self) -> &PluginInfo {
            &self.info
        }

        fn browsable(&self) -> bool {
            self.browsable
        }

        fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
            if self.fail {
                return Err(DiscoveryError::new(&self.info.name, "config file corrupt"));
            }
            Ok(self
                .settings
                .iter()
                .map(|(name, browsable)| {
                    SettingEntry::property(
                        self.info.clone(),
                        *name,
                        ValueType::Bool,
                        || Ok(SettingValue::Bool(true)),
                        |_| Ok(()),
                    )
                    .with_browsable(*browsable)
                })
                .collect())
        }

        fn frame_switch(&self) -> Option<FrameSwitch> {
            self.switch.clone()
        }
    }

    struct PanickingPlugin(PluginInfo);

    impl Plugin for PanickingPlugin {
        fn info(&self) -> &PluginInfo {
            &self.0
        }

        fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
            panic!("enumeration blew up")
        }
    }

    fn names(result: &DiscoveredSettings) -> Vec<&str> {
        result
            .entries
            .iter()
            .map(|e| e.display_name.as_str())
            .collect()
    }

    #[test]
    fn test_non_browsable_entries_are_dropped() {
        let mut registry = PluginRegistry::new();
        registry.register(Rc::new(
            TestPlugin::new("Alpha")
                .with_setting("Visible", true)
                .with_setting("Hidden", false),
        ));

        let result = collect_settings(&registry, false);
        assert_eq!(names(&result), vec!["Visible"]);
        assert!(result.owners_without_settings.is_empty());
    }

    #[test]
    fn test_hidden_and_empty_plugins_have_no_settings() {
        let mut hidden = TestPlugin::new("Hidden").with_setting("A", true);
        hidden.browsable = false;

        let mut registry = PluginRegistry::new();
        registry.register(Rc::new(hidden));
        registry.register(Rc::new(TestPlugin::new("!Empty").with_setting("B", false)));

        let result = collect_settings(&registry, false);
        assert!(result.entries.is_empty());
        assert_eq!(result.owners_without_settings_text(), "Empty, Hidden");
    }

    #[test]
    fn test_failing_plugins_do_not_abort_discovery() {
        let mut broken = TestPlugin::new("Broken").with_setting("A", true);
        broken.fail = true;

        let mut registry = PluginRegistry::new();
        registry.register(Rc::new(broken));
        registry.register(Rc::new(PanickingPlugin(PluginInfo::new(
            "Panics", "com.test.panics", "0.1",
        ))));
        registry.register(Rc::new(TestPlugin::new("Healthy").with_setting("B", true)));

        let result = collect_settings(&registry, false);
        assert_eq!(names(&result), vec!["B"]);
        assert!(result.owners_without_settings.contains("Broken"));
        assert!(result.owners_without_settings.contains("Panics"));
    }

    #[test]
    fn test_frame_switch_only_in_debug_mode() {
        let switch: FrameSwitch = Rc::new(Cell::new(true));
        let mut plugin = TestPlugin::new("Ticker").with_setting("Rate", true);
        plugin.switch = Some(switch.clone());

        let mut registry = PluginRegistry::new();
        registry.register(Rc::new(plugin));

        assert_eq!(names(&collect_settings(&registry, false)), vec!["Rate"]);

        let result = collect_settings(&registry, true);
        assert_eq!(names(&result), vec!["Rate", FRAME_SWITCH_NAME]);
        let toggle = &result.entries[1];
        assert_eq!(toggle.is_advanced, Some(true));
        toggle.set(SettingValue::Bool(false)).unwrap();
        assert!(!switch.get());
    }

    #[test]
    fn test_switch_only_plugin_still_counts_as_without_settings() {
        let mut plugin = TestPlugin::new("Bare");
        plugin.switch = Some(Rc::new(Cell::new(true)));

        let mut registry = PluginRegistry::new();
        registry.register(Rc::new(plugin));

        let result = collect_settings(&registry, true);
        assert_eq!(names(&result), vec![FRAME_SWITCH_NAME]);
        assert!(result.owners_without_settings.contains("Bare"));
    }

    #[test]
    fn test_core_settings_come_first_and_are_advanced() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = ConfigFile::new(dir.path().join("core.json"));
        core.bind(ConfigBinding::new(
            "Logging",
            "Console",
            ValueType::Bool,
            SettingValue::Bool(false),
        ));
        let core_info = PluginInfo::new("Host", "host.core", "5.4");

        let mut registry = PluginRegistry::new().with_core(core_info.clone(), core.into_shared());
        registry.register(Rc::new(TestPlugin::new("Alpha").with_setting("A", true)));

        let result = collect_settings(&registry, false);
        assert_eq!(names(&result), vec!["Console", "A"]);
        assert_eq!(result.entries[0].owner, core_info);
        assert!(result.entries[0].is_advanced());
    }

    #[test]
    fn test_busy_core_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut core = ConfigFile::new(dir.path().join("core.json"));
        core.bind(ConfigBinding::new(
            "Logging",
            "Console",
            ValueType::Bool,
            SettingValue::Bool(false),
        ));
        let core = core.into_shared();
        let core_info = PluginInfo::new("Host", "host.core", "5.4");

        let mut registry = PluginRegistry::new().with_core(core_info, core.clone());
        registry.register(Rc::new(TestPlugin::new("Alpha").with_setting("A", true)));

        let _guard = core.borrow_mut();
        let result = collect_settings(&registry, false);
        assert_eq!(names(&result), vec!["A"]);
    }
}
