//! Plugin-side contracts consumed by discovery
//!
//! Plugins describe their settings up front through `describe_settings`;
//! nothing is discovered by inspecting their internals.

use super::entry::SettingEntry;
use crate::discovery::DiscoveryError;
use crate::store::SharedConfigFile;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Stable identity of a settings owner
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginInfo {
    pub name: String,
    pub guid: String,
    pub version: String,
}

impl PluginInfo {
    pub fn new(
        name: impl Into<String>,
        guid: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            guid: guid.into(),
            version: version.into(),
        }
    }

    /// Name without the leading `!` sort hint
    pub fn display_name(&self) -> &str {
        self.name.trim_start_matches('!')
    }
}

impl fmt::Display for PluginInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.display_name(), self.version, self.guid)
    }
}

/// Whether a plugin's per-frame update runs. Shared with the plugin itself.
pub type FrameSwitch = Rc<Cell<bool>>;

/// A live plugin instance registered with the host
pub trait Plugin {
    fn info(&self) -> &PluginInfo;

    /// `false` hides the whole plugin from the settings UI
    fn browsable(&self) -> bool {
        true
    }

    /// Every setting this plugin exposes, in declaration order
    fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError>;

    /// Present when the plugin runs an update on every frame
    fn frame_switch(&self) -> Option<FrameSwitch> {
        None
    }

    fn website(&self) -> Option<String> {
        None
    }

    /// Backing storage, used for the reload and open-location actions
    fn config_file(&self) -> Option<SharedConfigFile> {
        None
    }
}

/// The host's plugin registry
pub trait PluginHost {
    /// Live plugins in load order
    fn plugins(&self) -> Vec<Rc<dyn Plugin>>;

    /// System-level settings owned by the host itself
    fn core_settings(&self) -> Option<(PluginInfo, SharedConfigFile)> {
        None
    }
}

/// In-memory plugin registry
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Rc<dyn Plugin>>,
    core: Option<(PluginInfo, SharedConfigFile)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core(mut self, info: PluginInfo, file: SharedConfigFile) -> Self {
        self.core = Some((info, file));
        self
    }

    pub fn register(&mut self, plugin: Rc<dyn Plugin>) {
        tracing::debug!("Registered plugin {}", plugin.info());
        self.plugins.push(plugin);
    }
}

impl PluginHost for PluginRegistry {
    fn plugins(&self) -> Vec<Rc<dyn Plugin>> {
        self.plugins.clone()
    }

    fn core_settings(&self) -> Option<(PluginInfo, SharedConfigFile)> {
        self.core.clone()
    }
}
