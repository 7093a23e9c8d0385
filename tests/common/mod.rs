//! Shared fixtures for the integration tests

#![allow(dead_code)]

use confman::discovery::DiscoveryError;
use confman::model::{Plugin, PluginInfo, PluginRegistry, SettingEntry, SettingValue, ValueType};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Once;

/// Initialize a stdout subscriber once (used by tests that run with `RUST_LOG`)
pub fn init_tracing_from_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stdout);
        let _ = subscriber.try_init();
    });
}

type Describe = Box<dyn Fn(&PluginInfo) -> Result<Vec<SettingEntry>, DiscoveryError>>;

/// Plugin whose settings come from a closure
pub struct TestPlugin {
    info: PluginInfo,
    describe: Describe,
    browsable: bool,
}

impl TestPlugin {
    pub fn new(name: &str, entries: impl Fn(&PluginInfo) -> Vec<SettingEntry> + 'static) -> Self {
        let guid = format!("com.test.{}", name.to_lowercase().replace(' ', "."));
        Self {
            info: PluginInfo::new(name, guid, "1.0"),
            describe: Box::new(move |info| Ok(entries(info))),
            browsable: true,
        }
    }

    pub fn failing(name: &str, message: &'static str) -> Self {
        let mut plugin = Self::new(name, |_| Vec::new());
        plugin.describe = Box::new(move |info| Err(DiscoveryError::new(info.to_string(), message)));
        plugin
    }

    pub fn panicking(name: &str) -> Self {
        let mut plugin = Self::new(name, |_| Vec::new());
        plugin.describe = Box::new(|_| panic!("settings table missing"));
        plugin
    }

    pub fn hidden(mut self) -> Self {
        self.browsable = false;
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
        (self.describe)(&self.info)
    }
}

/// Boolean property entry; `reads` counts accessor calls
pub fn bool_entry(owner: &PluginInfo, name: &str, reads: Rc<Cell<usize>>) -> SettingEntry {
    let value = Rc::new(Cell::new(false));
    let write = value.clone();
    SettingEntry::property(
        owner.clone(),
        name,
        ValueType::Bool,
        move || {
            reads.set(reads.get() + 1);
            Ok(SettingValue::Bool(value.get()))
        },
        move |v| match v {
            SettingValue::Bool(b) => {
                write.set(b);
                Ok(())
            }
            _ => Err("expected bool".to_string()),
        },
    )
}

pub fn int_entry(owner: &PluginInfo, name: &str, value: i64) -> SettingEntry {
    let value = Rc::new(Cell::new(value));
    let write = value.clone();
    SettingEntry::property(
        owner.clone(),
        name,
        ValueType::int(),
        move || Ok(SettingValue::Int(value.get())),
        move |v| match v {
            SettingValue::Int(i) => {
                write.set(i);
                Ok(())
            }
            _ => Err("expected int".to_string()),
        },
    )
}

/// "Alpha" with one plain entry, "Beta" with one entry in "X" and an
/// advanced one in "Y". Registered out of order.
pub fn alpha_beta() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.register(Rc::new(TestPlugin::new("Beta", |owner| {
        vec![
            int_entry(owner, "Speed", 5)
                .with_category("X")
                .with_advanced(false),
            bool_entry(owner, "Debug overlay", Rc::default())
                .with_category("Y")
                .with_advanced(true),
        ]
    })));
    registry.register(Rc::new(TestPlugin::new("Alpha", |owner| {
        vec![bool_entry(owner, "Enabled", Rc::default()).with_advanced(false)]
    })));
    registry
}
