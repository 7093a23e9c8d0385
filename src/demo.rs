//! Sample plugins hosted by the demo binary

use confman::config_io::DirectoryContext;
use confman::discovery::DiscoveryError;
use confman::model::{
    EntryError, EnumType, FrameSwitch, KeyboardShortcut, Plugin, PluginInfo, PluginRegistry,
    SettingEntry, SettingValue, ValueType,
};
use confman::render::{RenderContext, RowSlot, TypeRenderer};
use confman::store::{ConfigBinding, ConfigFile, SharedConfigFile};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::buffer::Buffer;
use ratatui::style::{Color, Style};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Type name of the marker colour setting
pub const COLOR_TYPE: &str = "Color";

const COLOR_PRESETS: [&str; 5] = ["#ff8800", "#33cc66", "#3388ff", "#dd3344", "#ffffff"];

/// Open a plugin's config file, keeping defaults when it cannot be read
fn open_config(path: std::path::PathBuf, bindings: Vec<ConfigBinding>) -> SharedConfigFile {
    let mut file = ConfigFile::new(path);
    for binding in bindings {
        file.bind(binding);
    }
    if let Err(e) = file.load() {
        tracing::warn!("Using default settings: {}", e);
    }
    file.into_shared()
}

/// A plugin whose settings all live in its config file
struct FileBackedPlugin {
    info: PluginInfo,
    file: SharedConfigFile,
    website: Option<String>,
}

impl Plugin for FileBackedPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
        ConfigFile::setting_entries(&self.file, &self.info)
            .map_err(|e| DiscoveryError::new(self.info.to_string(), e.to_string()))
    }

    fn website(&self) -> Option<String> {
        self.website.clone()
    }

    fn config_file(&self) -> Option<SharedConfigFile> {
        Some(self.file.clone())
    }
}

fn graphics_tweaks(dir_context: &DirectoryContext) -> FileBackedPlugin {
    let info = PluginInfo::new("Graphics Tweaks", "org.demo.graphics", "1.4.0");
    let quality = EnumType::new("Quality", &["Low", "Medium", "High", "Ultra"]);
    let layers = EnumType::flags("OverlayLayers", &["Minimap", "Compass", "Markers"]);
    let bindings = vec![
        ConfigBinding::new(
            "Rendering",
            "Quality",
            ValueType::Enum(quality),
            SettingValue::Enum("High".to_string()),
        )
        .description("Preset applied to shadows, textures and draw distance")
        .order(10),
        ConfigBinding::new(
            "Rendering",
            "Render scale",
            ValueType::float_range(0.5, 2.0),
            SettingValue::Float(1.0),
        )
        .description("Resolution multiplier of the 3D view"),
        ConfigBinding::new(
            "Rendering",
            "FPS limit",
            ValueType::int_range(30, 240),
            SettingValue::Int(60),
        )
        .description("Frames per second cap, PageUp/PageDown steps by ten"),
        ConfigBinding::new("Overlay", "Show FPS", ValueType::Bool, SettingValue::Bool(false))
            .description("Draw the frame counter in the top left corner"),
        ConfigBinding::new(
            "Overlay",
            "Toggle overlay",
            ValueType::Shortcut,
            SettingValue::Shortcut(KeyboardShortcut::key(KeyCode::F(2))),
        )
        .description("Shows or hides every overlay layer"),
        ConfigBinding::new(
            "Overlay",
            "Layers",
            ValueType::Enum(layers),
            SettingValue::Flags(0b011),
        )
        .description("Overlay layers to draw, number keys toggle them"),
        ConfigBinding::new("Debug", "Wireframe", ValueType::Bool, SettingValue::Bool(false))
            .description("Render geometry as wireframe")
            .advanced(true),
        ConfigBinding::new(
            "Debug",
            "Shader cache path",
            ValueType::Text,
            SettingValue::Text("cache/shaders".to_string()),
        )
        .advanced(true)
        .hide_reset_button(true),
    ];
    FileBackedPlugin {
        file: open_config(dir_context.plugin_config_path(&info.guid), bindings),
        info,
        website: Some("https://example.org/graphics-tweaks".to_string()),
    }
}

fn map_markers(dir_context: &DirectoryContext) -> FileBackedPlugin {
    let info = PluginInfo::new("Map Markers", "org.demo.markers", "0.9.2");
    let bindings = vec![
        ConfigBinding::new(
            "Markers",
            "Marker color",
            ValueType::Custom(COLOR_TYPE.to_string()),
            SettingValue::Custom(serde_json::json!(COLOR_PRESETS[0])),
        )
        .description("Colour of new map markers, Left/Right cycles presets"),
        ConfigBinding::new(
            "Markers",
            "Max markers",
            ValueType::int_range(1, 500),
            SettingValue::Int(100),
        ),
        ConfigBinding::new(
            "Sync",
            "Share with party",
            ValueType::Bool,
            SettingValue::Bool(true),
        )
        .description("Send placed markers to party members"),
    ];
    FileBackedPlugin {
        file: open_config(dir_context.plugin_config_path(&info.guid), bindings),
        info,
        website: None,
    }
}

/// Live-property settings plus a per-frame update
struct ChatFilter {
    info: PluginInfo,
    blocked: Rc<RefCell<String>>,
    mask: Rc<Cell<bool>>,
    frame_switch: FrameSwitch,
}

impl ChatFilter {
    fn new() -> Self {
        Self {
            info: PluginInfo::new("Chat Filter", "org.demo.chatfilter", "2.1.0"),
            blocked: Rc::new(RefCell::new("spoiler".to_string())),
            mask: Rc::new(Cell::new(true)),
            frame_switch: Rc::new(Cell::new(true)),
        }
    }
}

impl Plugin for ChatFilter {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
        let read = self.blocked.clone();
        let write = self.blocked.clone();
        let blocked = SettingEntry::property(
            self.info.clone(),
            "Blocked words",
            ValueType::Text,
            move || Ok(SettingValue::Text(read.borrow().clone())),
            move |value| match value {
                SettingValue::Text(text) => {
                    *write.borrow_mut() = text;
                    Ok(())
                }
                other => Err(format!("expected text, got {other}")),
            },
        )
        .with_description("Space separated words hidden from chat");

        let read = self.mask.clone();
        let write = self.mask.clone();
        let mask = SettingEntry::property(
            self.info.clone(),
            "Mask with asterisks",
            ValueType::Bool,
            move || Ok(SettingValue::Bool(read.get())),
            move |value| match value {
                SettingValue::Bool(b) => {
                    write.set(b);
                    Ok(())
                }
                other => Err(format!("expected bool, got {other}")),
            },
        )
        .with_default(SettingValue::Bool(true));

        Ok(vec![blocked, mask])
    }

    fn frame_switch(&self) -> Option<FrameSwitch> {
        Some(self.frame_switch.clone())
    }
}

/// Hidden from the editor entirely
struct HiddenHelper(PluginInfo);

impl Plugin for HiddenHelper {
    fn info(&self) -> &PluginInfo {
        &self.0
    }

    fn browsable(&self) -> bool {
        false
    }

    fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
        Ok(Vec::new())
    }
}

/// Has no settings; listed in the debug footer
struct AssetLoader(PluginInfo);

impl Plugin for AssetLoader {
    fn info(&self) -> &PluginInfo {
        &self.0
    }

    fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
        Ok(Vec::new())
    }
}

/// Fails to describe its settings; the rest of the editor keeps working
struct BrokenPlugin(PluginInfo);

impl Plugin for BrokenPlugin {
    fn info(&self) -> &PluginInfo {
        &self.0
    }

    fn describe_settings(&self) -> Result<Vec<SettingEntry>, DiscoveryError> {
        Err(DiscoveryError::new(
            self.0.to_string(),
            "settings table is corrupt",
        ))
    }
}

fn host_settings(dir_context: &DirectoryContext) -> (PluginInfo, SharedConfigFile) {
    let info = PluginInfo::new("!Host", "host.core", env!("CARGO_PKG_VERSION"));
    let log_level = EnumType::new("LogLevel", &["Error", "Warning", "Info", "Debug"]);
    let bindings = vec![
        ConfigBinding::new(
            "Logging",
            "Console log level",
            ValueType::Enum(log_level),
            SettingValue::Enum("Info".to_string()),
        )
        .description("Lowest level written to the host console"),
        ConfigBinding::new(
            "General",
            "Pause on focus loss",
            ValueType::Bool,
            SettingValue::Bool(true),
        ),
    ];
    let file = open_config(dir_context.config_dir.join("host.json"), bindings);
    (info, file)
}

/// Registry with every sample plugin
pub fn build_host(dir_context: &DirectoryContext) -> PluginRegistry {
    let (core_info, core_file) = host_settings(dir_context);
    let mut registry = PluginRegistry::new().with_core(core_info, core_file);
    registry.register(Rc::new(graphics_tweaks(dir_context)));
    registry.register(Rc::new(map_markers(dir_context)));
    registry.register(Rc::new(ChatFilter::new()));
    registry.register(Rc::new(HiddenHelper(PluginInfo::new(
        "Hidden Helper",
        "org.demo.hidden",
        "1.0.0",
    ))));
    registry.register(Rc::new(AssetLoader(PluginInfo::new(
        "Asset Loader",
        "org.demo.assets",
        "3.0.1",
    ))));
    registry.register(Rc::new(BrokenPlugin(PluginInfo::new(
        "Broken Plugin",
        "org.demo.broken",
        "0.0.1",
    ))));
    registry
}

/// `██ #ff8800`, Left/Right cycle through presets
pub struct ColorRenderer;

impl ColorRenderer {
    fn parse(hex: &str) -> Option<Color> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    fn current(entry: &SettingEntry) -> Result<String, EntryError> {
        match entry.get()? {
            SettingValue::Custom(serde_json::Value::String(hex)) => Ok(hex),
            other => Ok(other.to_string()),
        }
    }
}

impl TypeRenderer for ColorRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let hex = Self::current(slot.entry)?;
        let area = slot.area;
        let swatch = Self::parse(&hex).map(|c| Style::default().fg(c));
        let (used, _) = buf.set_stringn(
            area.x,
            area.y,
            "██ ",
            area.width as usize,
            swatch.unwrap_or(ctx.styles.error),
        );
        let style = if slot.focused {
            ctx.styles.focused
        } else {
            ctx.styles.text
        };
        let rest = area.width.saturating_sub(used - area.x) as usize;
        buf.set_stringn(used, area.y, &hex, rest, style);
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        _index: usize,
        key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        let step = match key.code {
            KeyCode::Left => COLOR_PRESETS.len() - 1,
            KeyCode::Right => 1,
            _ => return Ok(false),
        };
        let current = Self::current(entry)?;
        let position = COLOR_PRESETS
            .iter()
            .position(|p| *p == current)
            .unwrap_or(0);
        let next = COLOR_PRESETS[(position + step) % COLOR_PRESETS.len()];
        entry.set(SettingValue::Custom(serde_json::json!(next)))?;
        Ok(true)
    }
}
