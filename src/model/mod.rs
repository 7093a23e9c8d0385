//! Setting entry model
//!
//! The data/behavior contract for one editable value, the value types that
//! drive renderer dispatch, and the plugin-side traits the discovery engine
//! consumes.

pub mod entry;
pub mod plugin;
pub mod shortcut;
pub mod value;

pub use entry::{EntryError, EntrySource, SettingEntry};
pub use plugin::{FrameSwitch, Plugin, PluginHost, PluginInfo, PluginRegistry};
pub use shortcut::KeyboardShortcut;
pub use value::{EnumType, SettingValue, TypeKey, ValueType};
