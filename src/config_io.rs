//! Runtime configuration I/O operations.
//!
//! System directory detection plus loading and saving of the editor's own
//! settings. Plugin settings live in per-plugin files under `plugins/`.

use crate::config::{ConfigError, ManagerSettings};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "confman";
const SETTINGS_FILE: &str = "settings.json";

/// Directories used for configuration, plugin settings and logs
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    /// Data directory for logs
    /// e.g., ~/.local/share/confman on Linux
    pub data_dir: PathBuf,

    /// Config directory for the editor and plugin settings
    /// e.g., ~/.config/confman on Linux
    pub config_dir: PathBuf,
}

impl DirectoryContext {
    /// Create a DirectoryContext from the system directories
    /// This should ONLY be called from main()
    pub fn from_system() -> std::io::Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine data directory",
                )
            })?
            .join(APP_DIR);

        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Could not determine config directory",
                )
            })?
            .join(APP_DIR);

        Ok(Self {
            data_dir,
            config_dir,
        })
    }

    /// Create a DirectoryContext for testing with a temp directory
    pub fn for_testing(temp_dir: &Path) -> Self {
        Self {
            data_dir: temp_dir.join("data"),
            config_dir: temp_dir.join("config"),
        }
    }

    /// Path of the editor's own settings file
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// Directory holding one settings file per plugin
    pub fn plugin_config_dir(&self) -> PathBuf {
        self.config_dir.join("plugins")
    }

    /// Settings file of one plugin
    pub fn plugin_config_path(&self, guid: &str) -> PathBuf {
        self.plugin_config_dir().join(format!("{guid}.json"))
    }

    /// Get the log file path
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("logs").join("confman.log")
    }
}

/// Load the editor settings, falling back to defaults when the file is
/// missing or unusable
pub fn load_settings(dir_context: &DirectoryContext) -> ManagerSettings {
    let path = dir_context.settings_path();
    if !path.exists() {
        tracing::debug!("No settings at {}, using defaults", path.display());
        return ManagerSettings::default();
    }

    match ManagerSettings::load_from_file(&path) {
        Ok(settings) => {
            tracing::info!("Loaded settings from {}", path.display());
            settings
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load settings from {}: {}, using defaults",
                path.display(),
                e
            );
            ManagerSettings::default()
        }
    }
}

/// Save the editor settings
pub fn save_settings(
    dir_context: &DirectoryContext,
    settings: &ManagerSettings,
) -> Result<(), ConfigError> {
    let path = dir_context.settings_path();
    settings.save_to_file(&path)?;
    tracing::debug!("Saved settings to {}", path.display());
    Ok(())
}

/// Save the editor settings, logging a warning on failure
pub fn save_settings_or_warn(dir_context: &DirectoryContext, settings: &ManagerSettings) {
    if let Err(e) = save_settings(dir_context, settings) {
        tracing::warn!(
            "Failed to save settings to {}, changes are kept for this session only: {}",
            dir_context.settings_path().display(),
            e
        );
    }
}

/// Check at startup that the config directory accepts writes.
///
/// Returns `false` and logs a warning when it does not; the editor keeps
/// working with in-memory values.
pub fn probe_writable(dir_context: &DirectoryContext) -> bool {
    let probe = dir_context.config_dir.join(".write_probe");
    let result = std::fs::create_dir_all(&dir_context.config_dir)
        .and_then(|_| std::fs::write(&probe, b""))
        .and_then(|_| std::fs::remove_file(&probe));

    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                "Config directory {} is not writable, settings will not be saved: {}",
                dir_context.config_dir.display(),
                e
            );
            false
        }
    }
}
