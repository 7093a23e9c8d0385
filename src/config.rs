use crate::model::KeyboardShortcut;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of the settings editor itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSettings {
    /// Show settings marked as advanced
    #[serde(default = "default_false")]
    pub show_advanced: bool,

    /// Show keyboard shortcut settings
    #[serde(default = "default_true")]
    pub show_keybinds: bool,

    /// Show settings that are neither advanced nor shortcuts
    #[serde(default = "default_true")]
    pub show_settings: bool,

    /// Hide the category header of plugins with a single category
    #[serde(default = "default_false")]
    pub hide_single_section: bool,

    /// Plugins start collapsed when the editor opens
    #[serde(default = "default_true")]
    pub plugin_collapsed_default: bool,

    /// Shortcut that toggles the editor on and off
    #[serde(default = "default_toggle_shortcut")]
    pub toggle_shortcut: String,

    /// Share of the row width given to the setting name column
    #[serde(default = "default_column_left_ratio")]
    pub column_left_ratio: f32,

    /// RGB colour of advanced setting names
    #[serde(default = "default_advanced_setting_color")]
    pub advanced_setting_color: [u8; 3],

    /// Run filtered rebuilds on a worker thread
    #[serde(default = "default_false")]
    pub background_rebuild: bool,

    /// Debug mode: plugin GUIDs, frame switches and owners without settings.
    /// Not persisted.
    #[serde(skip)]
    pub show_debug: bool,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_toggle_shortcut() -> String {
    "F1".to_string()
}

fn default_column_left_ratio() -> f32 {
    0.40
}

fn default_advanced_setting_color() -> [u8; 3] {
    [255, 242, 171]
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            show_advanced: default_false(),
            show_keybinds: default_true(),
            show_settings: default_true(),
            hide_single_section: default_false(),
            plugin_collapsed_default: default_true(),
            toggle_shortcut: default_toggle_shortcut(),
            column_left_ratio: default_column_left_ratio(),
            advanced_setting_color: default_advanced_setting_color(),
            background_rebuild: default_false(),
            show_debug: false,
        }
    }
}

impl ManagerSettings {
    /// Load settings from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let settings: ManagerSettings =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        std::fs::write(path.as_ref(), contents).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Parsed toggle shortcut
    pub fn toggle_shortcut(&self) -> Result<KeyboardShortcut, ConfigError> {
        self.toggle_shortcut
            .parse()
            .map_err(|e: crate::model::shortcut::ParseShortcutError| {
                ConfigError::ValidationError(e.to_string())
            })
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.column_left_ratio) {
            return Err(ConfigError::ValidationError(
                "column_left_ratio must be between 0 and 1".to_string(),
            ));
        }

        self.toggle_shortcut()?;

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
            ConfigError::SerializeError(msg) => write!(f, "Serialize error: {msg}"),
            ConfigError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
