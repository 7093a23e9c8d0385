//! Settings editor for plugin hosts
//!
//! Plugins describe their settings as [`model::SettingEntry`] values. The
//! editor collects them ([`discovery`]), filters and groups them per owner
//! ([`pipeline`]) and draws a virtualized, type-dispatched list into a
//! `ratatui` buffer ([`render`]). [`app::ConfigManager`] is the entry point
//! for hosts.

pub mod app;
pub mod config;
pub mod config_io;
pub mod discovery;
pub mod model;
pub mod pipeline;
pub mod render;
#[cfg(feature = "runtime")]
pub mod services;
pub mod store;

pub use app::{ConfigManager, Focus};
pub use config::ManagerSettings;
