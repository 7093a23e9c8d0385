//! A single editable setting
//!
//! Both variants expose the same metadata and `get`/`set` contract; they only
//! differ in where the value lives. Callers never match on the source.

use super::plugin::PluginInfo;
use super::value::{SettingValue, ValueType};
use crate::store::SharedConfigFile;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// Reads a live value
pub type Getter = Rc<dyn Fn() -> Result<SettingValue, String>>;
/// Writes a live value
pub type Setter = Rc<dyn Fn(SettingValue) -> Result<(), String>>;

/// Where an entry's value lives
#[derive(Clone)]
pub enum EntrySource {
    /// Durable key/value storage; identity is the (section, key) pair
    Config {
        file: SharedConfigFile,
        section: String,
        key: String,
    },
    /// A running object instance; identity is the accessor pair
    Property { getter: Getter, setter: Setter },
}

impl fmt::Debug for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySource::Config { section, key, .. } => f
                .debug_struct("Config")
                .field("section", section)
                .field("key", key)
                .finish(),
            EntrySource::Property { .. } => f.write_str("Property"),
        }
    }
}

/// Accessor failure, carrying the entry's display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    Read { name: String, reason: String },
    Write { name: String, reason: String },
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryError::Read { name, reason } => write!(f, "Failed to read {name}: {reason}"),
            EntryError::Write { name, reason } => write!(f, "Failed to write {name}: {reason}"),
        }
    }
}

impl std::error::Error for EntryError {}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "accessor panicked".to_string())
}

/// One editable setting exposed by an owner
#[derive(Debug, Clone)]
pub struct SettingEntry {
    pub display_name: String,
    pub description: String,
    pub category: String,
    /// Higher sorts earlier within a category
    pub order: i32,
    /// `None` is neutral: matched by neither the advanced nor the plain filter
    pub is_advanced: Option<bool>,
    pub value_type: ValueType,
    pub default_value: Option<SettingValue>,
    pub owner: PluginInfo,
    pub browsable: bool,
    pub hide_name: bool,
    pub hide_reset_button: bool,
    source: EntrySource,
}

impl SettingEntry {
    fn with_source(
        owner: PluginInfo,
        display_name: impl Into<String>,
        value_type: ValueType,
        source: EntrySource,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            description: String::new(),
            category: String::new(),
            order: 0,
            is_advanced: None,
            value_type,
            default_value: None,
            owner,
            browsable: true,
            hide_name: false,
            hide_reset_button: false,
            source,
        }
    }

    /// Entry backed by persisted storage
    pub fn config(
        owner: PluginInfo,
        file: SharedConfigFile,
        section: impl Into<String>,
        key: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        let section = section.into();
        let key = key.into();
        let name = key.clone();
        let category = section.clone();
        let mut entry = Self::with_source(
            owner,
            name,
            value_type,
            EntrySource::Config { file, section, key },
        );
        entry.category = category;
        entry
    }

    /// Entry backed by a live accessor pair
    pub fn property(
        owner: PluginInfo,
        display_name: impl Into<String>,
        value_type: ValueType,
        getter: impl Fn() -> Result<SettingValue, String> + 'static,
        setter: impl Fn(SettingValue) -> Result<(), String> + 'static,
    ) -> Self {
        Self::with_source(
            owner,
            display_name,
            value_type,
            EntrySource::Property {
                getter: Rc::new(getter),
                setter: Rc::new(setter),
            },
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn with_advanced(mut self, advanced: bool) -> Self {
        self.is_advanced = Some(advanced);
        self
    }

    pub fn with_default(mut self, default: SettingValue) -> Self {
        self.default_value = Some(default);
        self
    }

    pub fn with_browsable(mut self, browsable: bool) -> Self {
        self.browsable = browsable;
        self
    }

    pub fn with_hide_name(mut self, hide: bool) -> Self {
        self.hide_name = hide;
        self
    }

    pub fn with_hide_reset_button(mut self, hide: bool) -> Self {
        self.hide_reset_button = hide;
        self
    }

    /// True only for an exact keyboard-shortcut type
    pub fn is_keyboard_shortcut(&self) -> bool {
        self.value_type == ValueType::Shortcut
    }

    pub fn is_advanced(&self) -> bool {
        self.is_advanced == Some(true)
    }

    /// Name shown in the UI (a leading `!` only affects sorting)
    pub fn shown_name(&self) -> &str {
        self.display_name.trim_start_matches('!')
    }

    pub fn source(&self) -> &EntrySource {
        &self.source
    }

    fn read_error(&self, reason: impl Into<String>) -> EntryError {
        EntryError::Read {
            name: self.display_name.clone(),
            reason: reason.into(),
        }
    }

    fn write_error(&self, reason: impl Into<String>) -> EntryError {
        EntryError::Write {
            name: self.display_name.clone(),
            reason: reason.into(),
        }
    }

    /// Current value
    pub fn get(&self) -> Result<SettingValue, EntryError> {
        match &self.source {
            EntrySource::Config { file, section, key } => {
                let file = file
                    .try_borrow()
                    .map_err(|_| self.read_error("config file is busy"))?;
                file.get(section, key)
                    .ok_or_else(|| self.read_error(format!("no setting bound at [{section}] {key}")))
            }
            EntrySource::Property { getter, .. } => catch_unwind(AssertUnwindSafe(|| getter()))
                .map_err(|payload| self.read_error(panic_reason(payload)))?
                .map_err(|reason| self.read_error(reason)),
        }
    }

    /// Apply a value; on success a subsequent `get` observes it
    pub fn set(&self, value: SettingValue) -> Result<(), EntryError> {
        if !self.value_type.accepts(&value) {
            return Err(self.write_error(format!(
                "value {value} is not valid for type {}",
                self.value_type.type_key()
            )));
        }
        match &self.source {
            EntrySource::Config { file, section, key } => file
                .try_borrow_mut()
                .map_err(|_| self.write_error("config file is busy"))?
                .set(section, key, value)
                .map_err(|e| self.write_error(e.to_string())),
            EntrySource::Property { setter, .. } => {
                catch_unwind(AssertUnwindSafe(|| setter(value)))
                    .map_err(|payload| self.write_error(panic_reason(payload)))?
                    .map_err(|reason| self.write_error(reason))
            }
        }
    }

    /// Restore the default value, if the entry has one
    pub fn reset(&self) -> Result<bool, EntryError> {
        match &self.default_value {
            Some(default) => self.set(default.clone()).map(|_| true),
            None => Ok(false),
        }
    }
}
