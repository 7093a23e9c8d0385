//! Type-keyed renderer dispatch
//!
//! Renderers are looked up by the exact [`TypeKey`] of an entry's declared
//! type. Enumerations without an exact renderer fall back to an option
//! picker (flags to a multi-toggle); anything else gets a read-only row.

use super::context::RenderContext;
use super::widgets::{
    BoolRenderer, FloatRenderer, IntRenderer, MultiToggleRenderer, OptionPickerRenderer,
    ShortcutRenderer, TextRenderer, UnsupportedRenderer,
};
use crate::model::{EntryError, SettingEntry, TypeKey, ValueType};
use crossterm::event::KeyEvent;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// The one-row slot a renderer draws a value into
#[derive(Debug, Clone, Copy)]
pub struct RowSlot<'a> {
    pub entry: &'a SettingEntry,
    /// Position of the entry in the flat entry list
    pub index: usize,
    pub area: Rect,
    pub focused: bool,
}

/// Draws and edits values of one type
pub trait TypeRenderer {
    /// Draw the value into `slot.area`, a single row
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError>;

    /// Handle a key while the entry is focused. Returns whether it was consumed.
    fn handle_key(
        &self,
        _entry: &SettingEntry,
        _index: usize,
        _key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        Ok(false)
    }
}

impl<F> TypeRenderer for F
where
    F: Fn(&RowSlot<'_>, &mut Buffer, &mut RenderContext) -> Result<(), EntryError>,
{
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        self(slot, buf, ctx)
    }
}

/// How an entry's value will be rendered
#[derive(Clone)]
pub enum Strategy {
    Exact(Rc<dyn TypeRenderer>),
    OptionPicker(Rc<dyn TypeRenderer>),
    MultiToggle(Rc<dyn TypeRenderer>),
    Unsupported(Rc<dyn TypeRenderer>),
}

impl Strategy {
    pub fn renderer(&self) -> &Rc<dyn TypeRenderer> {
        match self {
            Strategy::Exact(r)
            | Strategy::OptionPicker(r)
            | Strategy::MultiToggle(r)
            | Strategy::Unsupported(r) => r,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Exact(_) => "exact",
            Strategy::OptionPicker(_) => "option picker",
            Strategy::MultiToggle(_) => "multi-toggle",
            Strategy::Unsupported(_) => "unsupported",
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyRegistered(TypeKey),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(key) => {
                write!(f, "A renderer for type {key} is already registered")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Maps declared value types to renderers
pub struct RendererRegistry {
    renderers: HashMap<TypeKey, Rc<dyn TypeRenderer>>,
    option_picker: Rc<dyn TypeRenderer>,
    multi_toggle: Rc<dyn TypeRenderer>,
    unsupported: Rc<dyn TypeRenderer>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl RendererRegistry {
    /// Registry without exact renderers; only the fallbacks
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
            option_picker: Rc::new(OptionPickerRenderer),
            multi_toggle: Rc::new(MultiToggleRenderer),
            unsupported: Rc::new(UnsupportedRenderer),
        }
    }

    /// Registry with the primitive renderers installed
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        let builtins: [(TypeKey, Rc<dyn TypeRenderer>); 5] = [
            (TypeKey::BOOL, Rc::new(BoolRenderer)),
            (TypeKey::INT, Rc::new(IntRenderer)),
            (TypeKey::FLOAT, Rc::new(FloatRenderer)),
            (TypeKey::TEXT, Rc::new(TextRenderer)),
            (TypeKey::SHORTCUT, Rc::new(ShortcutRenderer)),
        ];
        for (key, renderer) in builtins {
            registry.renderers.insert(key, renderer);
        }
        registry
    }

    /// Add a renderer for a new type. An existing renderer is never replaced.
    pub fn register(
        &mut self,
        key: TypeKey,
        renderer: Rc<dyn TypeRenderer>,
    ) -> Result<(), RegistryError> {
        if self.renderers.contains_key(&key) {
            tracing::warn!("Tried to add a renderer for type {} which already has one", key);
            return Err(RegistryError::AlreadyRegistered(key));
        }
        tracing::debug!("Registered renderer for type {}", key);
        self.renderers.insert(key, renderer);
        Ok(())
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.renderers.contains_key(key)
    }

    /// Pick the strategy for a declared type
    pub fn dispatch(&self, value_type: &ValueType) -> Strategy {
        if let Some(renderer) = self.renderers.get(&value_type.type_key()) {
            return Strategy::Exact(renderer.clone());
        }
        match value_type {
            ValueType::Enum(e) if e.flags => Strategy::MultiToggle(self.multi_toggle.clone()),
            ValueType::Enum(_) => Strategy::OptionPicker(self.option_picker.clone()),
            _ => Strategy::Unsupported(self.unsupported.clone()),
        }
    }
}
