//! Persisted key/value settings storage
//!
//! One JSON file per owner, one value per (section, key):
//!
//! ```json
//! { "General": { "Enabled": true, "Speed": 1.5 } }
//! ```
//!
//! Settings are declared with `bind` before the file is loaded, so decoding
//! always has the declared type at hand.

use crate::model::{PluginInfo, SettingEntry, SettingValue, ValueType};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Config files are shared between the owning plugin and its entries
pub type SharedConfigFile = Rc<RefCell<ConfigFile>>;

type FileContents = BTreeMap<String, BTreeMap<String, serde_json::Value>>;

/// Storage error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
    NotBound { section: String, key: String },
    /// The file is mutably borrowed elsewhere
    Busy { owner: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io { path, message } => {
                write!(f, "IO error on {}: {message}", path.display())
            }
            StoreError::Parse { path, message } => {
                write!(f, "Parse error in {}: {message}", path.display())
            }
            StoreError::NotBound { section, key } => {
                write!(f, "No setting bound at [{section}] {key}")
            }
            StoreError::Busy { owner } => write!(f, "Config file of {owner} is busy"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Declaration of one persisted setting
#[derive(Debug, Clone)]
pub struct ConfigBinding {
    pub section: String,
    pub key: String,
    pub value_type: ValueType,
    pub default: SettingValue,
    pub description: String,
    pub order: i32,
    pub advanced: Option<bool>,
    pub browsable: bool,
    pub hide_name: bool,
    pub hide_reset_button: bool,
}

impl ConfigBinding {
    pub fn new(
        section: impl Into<String>,
        key: impl Into<String>,
        value_type: ValueType,
        default: SettingValue,
    ) -> Self {
        Self {
            section: section.into(),
            key: key.into(),
            value_type,
            default,
            description: String::new(),
            order: 0,
            advanced: None,
            browsable: true,
            hide_name: false,
            hide_reset_button: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn advanced(mut self, advanced: bool) -> Self {
        self.advanced = Some(advanced);
        self
    }

    pub fn browsable(mut self, browsable: bool) -> Self {
        self.browsable = browsable;
        self
    }

    pub fn hide_name(mut self, hide: bool) -> Self {
        self.hide_name = hide;
        self
    }

    pub fn hide_reset_button(mut self, hide: bool) -> Self {
        self.hide_reset_button = hide;
        self
    }
}

#[derive(Debug)]
struct BoundSetting {
    binding: ConfigBinding,
    value: SettingValue,
}

/// A JSON-backed settings file
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    settings: Vec<BoundSetting>,
    /// Write the file after every successful `set`
    pub save_on_set: bool,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Vec::new(),
            save_on_set: true,
        }
    }

    pub fn into_shared(self) -> SharedConfigFile {
        Rc::new(RefCell::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn find(&self, section: &str, key: &str) -> Option<&BoundSetting> {
        self.settings
            .iter()
            .find(|s| s.binding.section == section && s.binding.key == key)
    }

    fn find_mut(&mut self, section: &str, key: &str) -> Option<&mut BoundSetting> {
        self.settings
            .iter_mut()
            .find(|s| s.binding.section == section && s.binding.key == key)
    }

    /// Declare a setting. Binding the same (section, key) twice keeps the first.
    pub fn bind(&mut self, binding: ConfigBinding) {
        if self.find(&binding.section, &binding.key).is_some() {
            tracing::warn!(
                "Setting [{}] {} is already bound in {}",
                binding.section,
                binding.key,
                self.path.display()
            );
            return;
        }
        let value = binding.default.clone();
        self.settings.push(BoundSetting { binding, value });
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn get(&self, section: &str, key: &str) -> Option<SettingValue> {
        self.find(section, key).map(|s| s.value.clone())
    }

    /// Store a value in memory, then persist it if `save_on_set` is enabled.
    ///
    /// A failed save is logged and does not undo the in-memory change.
    pub fn set(&mut self, section: &str, key: &str, value: SettingValue) -> Result<(), StoreError> {
        let setting = self
            .find_mut(section, key)
            .ok_or_else(|| StoreError::NotBound {
                section: section.to_string(),
                key: key.to_string(),
            })?;
        setting.value = value;

        if self.save_on_set {
            if let Err(e) = self.save() {
                tracing::warn!("Failed to save settings, keeping in-memory value: {}", e);
            }
        }
        Ok(())
    }

    /// Apply values from disk. A missing file leaves current values alone.
    pub fn load(&mut self) -> Result<(), StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    message: e.to_string(),
                })
            }
        };
        let contents: FileContents =
            serde_json::from_str(&text).map_err(|e| StoreError::Parse {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        for setting in &mut self.settings {
            let Some(json) = contents
                .get(&setting.binding.section)
                .and_then(|section| section.get(&setting.binding.key))
            else {
                continue;
            };
            match setting.binding.value_type.decode(json) {
                Some(value) => setting.value = value,
                None => tracing::warn!(
                    "Ignoring invalid value {} for [{}] {} in {}",
                    json,
                    setting.binding.section,
                    setting.binding.key,
                    self.path.display()
                ),
            }
        }
        Ok(())
    }

    /// Re-read values from disk, discarding unsaved in-memory changes
    pub fn reload(&mut self) -> Result<(), StoreError> {
        tracing::info!("Reloading settings from {}", self.path.display());
        self.load()
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let mut contents = FileContents::new();
        for setting in &self.settings {
            contents
                .entry(setting.binding.section.clone())
                .or_default()
                .insert(
                    setting.binding.key.clone(),
                    setting.value.to_json(&setting.binding.value_type),
                );
        }
        let io_err = |e: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&contents).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, text).map_err(io_err)
    }

    /// Enumerate bound settings as config-backed entries, in bind order
    pub fn setting_entries(
        file: &SharedConfigFile,
        owner: &PluginInfo,
    ) -> Result<Vec<SettingEntry>, StoreError> {
        let bindings: Vec<ConfigBinding> = file
            .try_borrow()
            .map_err(|_| StoreError::Busy {
                owner: owner.to_string(),
            })?
            .settings
            .iter()
            .map(|s| s.binding.clone())
            .collect();

        Ok(bindings
            .into_iter()
            .map(|b| {
                let mut entry = SettingEntry::config(
                    owner.clone(),
                    file.clone(),
                    b.section,
                    b.key,
                    b.value_type,
                )
                .with_description(b.description)
                .with_order(b.order)
                .with_default(b.default)
                .with_browsable(b.browsable)
                .with_hide_name(b.hide_name)
                .with_hide_reset_button(b.hide_reset_button);
                entry.is_advanced = b.advanced;
                entry
            })
            .collect())
    }
}
