//! Built-in value renderers
//!
//! Every renderer draws into a single row. Values are read with
//! `SettingEntry::get` on each draw and written back with `set` as soon as
//! a key changes them.

use super::context::RenderContext;
use super::registry::{RowSlot, TypeRenderer};
use crate::model::{EntryError, KeyboardShortcut, SettingEntry, SettingValue, ValueType};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;

fn value_style(slot: &RowSlot<'_>, ctx: &RenderContext) -> Style {
    if slot.focused {
        ctx.styles.focused
    } else {
        ctx.styles.text
    }
}

/// Write `text` at the start of `area`, clipped to its width
pub(crate) fn put(buf: &mut Buffer, area: Rect, text: &str, style: Style) -> u16 {
    if area.width == 0 || area.height == 0 {
        return 0;
    }
    let (x, _) = buf.set_stringn(area.x, area.y, text, area.width as usize, style);
    x - area.x
}

/// Write `text` after `offset` columns of `area`
pub(crate) fn put_after(buf: &mut Buffer, area: Rect, offset: u16, text: &str, style: Style) -> u16 {
    if offset >= area.width {
        return offset;
    }
    let rest = Rect::new(area.x + offset, area.y, area.width - offset, area.height);
    offset + put(buf, rest, text, style)
}

fn plain_key(key: &KeyEvent) -> bool {
    !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

/// `[x] Enabled` / `[ ] Disabled`
pub struct BoolRenderer;

impl TypeRenderer for BoolRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let checked = matches!(slot.entry.get()?, SettingValue::Bool(true));
        let (checkbox, label) = if checked {
            ("[x]", "Enabled")
        } else {
            ("[ ]", "Disabled")
        };
        let style = value_style(slot, ctx);
        let box_style = if checked && !slot.focused {
            ctx.styles.checked
        } else {
            style
        };
        let used = put(buf, slot.area, checkbox, box_style);
        put_after(buf, slot.area, used, &format!(" {label}"), style);
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        _index: usize,
        key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => {
                let checked = matches!(entry.get()?, SettingValue::Bool(true));
                entry.set(SettingValue::Bool(!checked))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn range_hint<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("  ({min}..{max})"),
        (Some(min), None) => format!("  (>= {min})"),
        (None, Some(max)) => format!("  (<= {max})"),
        (None, None) => String::new(),
    }
}

fn draw_number(
    slot: &RowSlot<'_>,
    buf: &mut Buffer,
    ctx: &RenderContext,
    value: &str,
    hint: &str,
) {
    let used = put(buf, slot.area, &format!("< {value} >"), value_style(slot, ctx));
    put_after(buf, slot.area, used, hint, ctx.styles.hint);
}

/// `< 5 >`, Left/Right step by one, PageUp/PageDown by ten
pub struct IntRenderer;

impl TypeRenderer for IntRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let value = slot.entry.get()?;
        let hint = match slot.entry.value_type {
            ValueType::Int { min, max } => range_hint(min, max),
            _ => String::new(),
        };
        draw_number(slot, buf, ctx, &value.to_string(), &hint);
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        _index: usize,
        key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        let delta: i64 = match key.code {
            KeyCode::Left | KeyCode::Char('-') => -1,
            KeyCode::Right | KeyCode::Char('+') => 1,
            KeyCode::PageDown => -10,
            KeyCode::PageUp => 10,
            _ => return Ok(false),
        };
        let SettingValue::Int(current) = entry.get()? else {
            return Ok(false);
        };
        let mut next = current.saturating_add(delta);
        if let ValueType::Int { min, max } = entry.value_type {
            if let Some(min) = min {
                next = next.max(min);
            }
            if let Some(max) = max {
                next = next.min(max);
            }
        }
        if next != current {
            entry.set(SettingValue::Int(next))?;
        }
        Ok(true)
    }
}

/// `< 1.5 >`, steps by a hundredth of the range (0.1 when unbounded)
pub struct FloatRenderer;

impl FloatRenderer {
    fn step(value_type: &ValueType) -> f64 {
        match value_type {
            ValueType::Float {
                min: Some(min),
                max: Some(max),
            } if max > min => (max - min) / 100.0,
            _ => 0.1,
        }
    }
}

impl TypeRenderer for FloatRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let value = match slot.entry.get()? {
            SettingValue::Float(v) => format!("{v:.2}"),
            other => other.to_string(),
        };
        let hint = match slot.entry.value_type {
            ValueType::Float { min, max } => range_hint(min, max),
            _ => String::new(),
        };
        draw_number(slot, buf, ctx, &value, &hint);
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        _index: usize,
        key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        let steps = match key.code {
            KeyCode::Left | KeyCode::Char('-') => -1.0,
            KeyCode::Right | KeyCode::Char('+') => 1.0,
            KeyCode::PageDown => -10.0,
            KeyCode::PageUp => 10.0,
            _ => return Ok(false),
        };
        let SettingValue::Float(current) = entry.get()? else {
            return Ok(false);
        };
        let mut next = current + steps * Self::step(&entry.value_type);
        if let ValueType::Float { min, max } = entry.value_type {
            if let Some(min) = min {
                next = next.max(min);
            }
            if let Some(max) = max {
                next = next.min(max);
            }
        }
        entry.set(SettingValue::Float(next))?;
        Ok(true)
    }
}

/// Inline text field; typing edits the value directly
pub struct TextRenderer;

impl TypeRenderer for TextRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let value = slot.entry.get()?;
        let cursor = if slot.focused { "_" } else { "" };
        put(
            buf,
            slot.area,
            &format!("[{value}{cursor}]"),
            value_style(slot, ctx),
        );
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        _index: usize,
        key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        let SettingValue::Text(mut text) = entry.get()? else {
            return Ok(false);
        };
        match key.code {
            KeyCode::Char(c) if plain_key(&key) => text.push(c),
            KeyCode::Backspace => {
                if text.pop().is_none() {
                    return Ok(true);
                }
            }
            _ => return Ok(false),
        }
        entry.set(SettingValue::Text(text))?;
        Ok(true)
    }
}

/// Shows the bound shortcut; Enter captures the next key press
pub struct ShortcutRenderer;

impl TypeRenderer for ShortcutRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        if ctx.transient.is_capturing(slot.index) {
            put(
                buf,
                slot.area,
                "Press any key combination (Esc to cancel)",
                ctx.styles.focused,
            );
            return Ok(());
        }
        let value = slot.entry.get()?;
        let used = put(buf, slot.area, &format!("[{value}]"), value_style(slot, ctx));
        if slot.focused {
            put_after(buf, slot.area, used, "  Enter to change", ctx.styles.hint);
        }
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        index: usize,
        key: KeyEvent,
        ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        if ctx.transient.is_capturing(index) {
            ctx.transient.close();
            if key.code != KeyCode::Esc {
                entry.set(SettingValue::Shortcut(KeyboardShortcut::from(key)))?;
            }
            return Ok(true);
        }
        if key.code == KeyCode::Enter {
            ctx.transient.start_capture(index);
            return Ok(true);
        }
        Ok(false)
    }
}

/// Plain enumerations: `[Variant ▼]`, Enter opens the option list
pub struct OptionPickerRenderer;

impl OptionPickerRenderer {
    fn variants(entry: &SettingEntry) -> Vec<String> {
        match &entry.value_type {
            ValueType::Enum(e) => e.variants.clone(),
            _ => Vec::new(),
        }
    }

    fn current_index(entry: &SettingEntry, variants: &[String]) -> Result<usize, EntryError> {
        let current = entry.get()?.to_string();
        Ok(variants.iter().position(|v| *v == current).unwrap_or(0))
    }
}

impl TypeRenderer for OptionPickerRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let value = slot.entry.get()?;
        let arrow = if ctx.transient.picker_for(slot.index).is_some() {
            "▲"
        } else {
            "▼"
        };
        put(
            buf,
            slot.area,
            &format!("[{value} {arrow}]"),
            value_style(slot, ctx),
        );
        if let Some(picker) = ctx.transient.picker_for(slot.index) {
            picker.anchor = Some(slot.area);
        }
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        index: usize,
        key: KeyEvent,
        ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        if let Some(picker) = ctx.transient.picker_for(index) {
            match key.code {
                KeyCode::Up => picker.select_prev(),
                KeyCode::Down => picker.select_next(),
                KeyCode::Enter => {
                    let choice = picker.selected_option().map(str::to_string);
                    ctx.transient.close();
                    if let Some(choice) = choice {
                        entry.set(SettingValue::Enum(choice))?;
                    }
                }
                KeyCode::Esc => ctx.transient.close(),
                _ => return Ok(false),
            }
            return Ok(true);
        }

        let variants = Self::variants(entry);
        if variants.is_empty() {
            return Ok(false);
        }
        let current = Self::current_index(entry, &variants)?;
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                ctx.transient.open_picker(index, variants, current);
            }
            KeyCode::Left => {
                let prev = (current + variants.len() - 1) % variants.len();
                entry.set(SettingValue::Enum(variants[prev].clone()))?;
            }
            KeyCode::Right => {
                let next = (current + 1) % variants.len();
                entry.set(SettingValue::Enum(variants[next].clone()))?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Flags enumerations: one checkbox per variant, digit keys toggle them
pub struct MultiToggleRenderer;

impl TypeRenderer for MultiToggleRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let SettingValue::Flags(bits) = slot.entry.get()? else {
            return Err(EntryError::Read {
                name: slot.entry.display_name.clone(),
                reason: "flags value expected".to_string(),
            });
        };
        let ValueType::Enum(e) = &slot.entry.value_type else {
            return Ok(());
        };
        let style = value_style(slot, ctx);
        let mut used = 0;
        for (i, variant) in e.variants.iter().enumerate().take(64) {
            let set = bits & (1u64 << i) != 0;
            let checkbox = if set { "[x]" } else { "[ ]" };
            let label = if slot.focused && i < 9 {
                format!("{}{checkbox} {variant}  ", i + 1)
            } else {
                format!("{checkbox} {variant}  ")
            };
            used = put_after(buf, slot.area, used, &label, style);
        }
        Ok(())
    }

    fn handle_key(
        &self,
        entry: &SettingEntry,
        _index: usize,
        key: KeyEvent,
        _ctx: &mut RenderContext,
    ) -> Result<bool, EntryError> {
        let KeyCode::Char(c) = key.code else {
            return Ok(false);
        };
        let Some(digit) = c.to_digit(10).filter(|d| *d >= 1) else {
            return Ok(false);
        };
        let bit = digit as usize - 1;
        let ValueType::Enum(e) = &entry.value_type else {
            return Ok(false);
        };
        if bit >= e.variants.len() {
            return Ok(false);
        }
        let SettingValue::Flags(bits) = entry.get()? else {
            return Ok(false);
        };
        entry.set(SettingValue::Flags(bits ^ (1u64 << bit)))?;
        Ok(true)
    }
}

/// Read-only row for types without a renderer
pub struct UnsupportedRenderer;

impl TypeRenderer for UnsupportedRenderer {
    fn draw(
        &self,
        slot: &RowSlot<'_>,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
    ) -> Result<(), EntryError> {
        let value = slot.entry.get()?;
        let used = put(buf, slot.area, &value.to_string(), ctx.styles.disabled);
        put_after(
            buf,
            slot.area,
            used,
            &format!("  (no editor available for {})", slot.entry.value_type.type_key()),
            ctx.styles.hint,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnumType, PluginInfo};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn entry_with(value_type: ValueType, initial: SettingValue) -> (SettingEntry, Rc<RefCell<SettingValue>>) {
        let cell = Rc::new(RefCell::new(initial));
        let read = cell.clone();
        let write = cell.clone();
        let entry = SettingEntry::property(
            PluginInfo::new("Test", "com.test", "1.0"),
            "Value",
            value_type,
            move || Ok(read.borrow().clone()),
            move |v| {
                *write.borrow_mut() = v;
                Ok(())
            },
        );
        (entry, cell)
    }

    fn row_text(buf: &Buffer, width: u16) -> String {
        (0..width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn draw(renderer: &dyn TypeRenderer, entry: &SettingEntry, ctx: &mut RenderContext) -> String {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        let slot = RowSlot {
            entry,
            index: 0,
            area,
            focused: false,
        };
        renderer.draw(&slot, &mut buf, ctx).unwrap();
        row_text(&buf, 40)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_bool_toggle() {
        let (entry, cell) = entry_with(ValueType::Bool, SettingValue::Bool(false));
        let mut ctx = RenderContext::default();
        assert_eq!(draw(&BoolRenderer, &entry, &mut ctx), "[ ] Disabled");

        assert!(BoolRenderer
            .handle_key(&entry, 0, key(KeyCode::Char(' ')), &mut ctx)
            .unwrap());
        assert_eq!(*cell.borrow(), SettingValue::Bool(true));
        assert_eq!(draw(&BoolRenderer, &entry, &mut ctx), "[x] Enabled");
    }

    #[test]
    fn test_int_steps_are_clamped() {
        let (entry, cell) = entry_with(ValueType::int_range(0, 10), SettingValue::Int(9));
        let mut ctx = RenderContext::default();
        assert_eq!(draw(&IntRenderer, &entry, &mut ctx), "< 9 >  (0..10)");

        IntRenderer
            .handle_key(&entry, 0, key(KeyCode::PageUp), &mut ctx)
            .unwrap();
        assert_eq!(*cell.borrow(), SettingValue::Int(10));
        IntRenderer
            .handle_key(&entry, 0, key(KeyCode::Left), &mut ctx)
            .unwrap();
        assert_eq!(*cell.borrow(), SettingValue::Int(9));
    }

    #[test]
    fn test_float_step_follows_range() {
        let (entry, cell) = entry_with(ValueType::float_range(0.0, 10.0), SettingValue::Float(1.0));
        let mut ctx = RenderContext::default();
        FloatRenderer
            .handle_key(&entry, 0, key(KeyCode::Right), &mut ctx)
            .unwrap();
        assert_eq!(*cell.borrow(), SettingValue::Float(1.1));
        assert_eq!(draw(&FloatRenderer, &entry, &mut ctx), "< 1.10 >  (0..10)");
    }

    #[test]
    fn test_text_editing() {
        let (entry, cell) = entry_with(ValueType::Text, SettingValue::Text("ab".to_string()));
        let mut ctx = RenderContext::default();
        TextRenderer
            .handle_key(&entry, 0, key(KeyCode::Char('c')), &mut ctx)
            .unwrap();
        TextRenderer
            .handle_key(&entry, 0, key(KeyCode::Backspace), &mut ctx)
            .unwrap();
        TextRenderer
            .handle_key(&entry, 0, key(KeyCode::Backspace), &mut ctx)
            .unwrap();
        assert_eq!(*cell.borrow(), SettingValue::Text("a".to_string()));
        assert_eq!(draw(&TextRenderer, &entry, &mut ctx), "[a]");
    }

    #[test]
    fn test_shortcut_capture() {
        let (entry, cell) = entry_with(
            ValueType::Shortcut,
            SettingValue::Shortcut(KeyboardShortcut::key(KeyCode::F(1))),
        );
        let mut ctx = RenderContext::default();
        assert_eq!(draw(&ShortcutRenderer, &entry, &mut ctx), "[F1]");

        ShortcutRenderer
            .handle_key(&entry, 0, key(KeyCode::Enter), &mut ctx)
            .unwrap();
        assert!(ctx.transient.is_capturing(0));
        assert!(draw(&ShortcutRenderer, &entry, &mut ctx).starts_with("Press any key"));

        let ctrl_k = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        ShortcutRenderer
            .handle_key(&entry, 0, ctrl_k, &mut ctx)
            .unwrap();
        assert!(!ctx.transient.is_open());
        assert_eq!(cell.borrow().to_string(), "Ctrl+K");
    }

    #[test]
    fn test_option_picker() {
        let mode = ValueType::Enum(EnumType::new("Mode", &["Fast", "Safe", "Off"]));
        let (entry, cell) = entry_with(mode, SettingValue::Enum("Fast".to_string()));
        let mut ctx = RenderContext::default();

        OptionPickerRenderer
            .handle_key(&entry, 0, key(KeyCode::Enter), &mut ctx)
            .unwrap();
        assert_eq!(ctx.transient.picker().map(|p| p.selected), Some(0));
        assert_eq!(draw(&OptionPickerRenderer, &entry, &mut ctx), "[Fast ▲]");
        assert!(ctx.transient.picker().and_then(|p| p.anchor).is_some());

        OptionPickerRenderer
            .handle_key(&entry, 0, key(KeyCode::Down), &mut ctx)
            .unwrap();
        OptionPickerRenderer
            .handle_key(&entry, 0, key(KeyCode::Enter), &mut ctx)
            .unwrap();
        assert!(!ctx.transient.is_open());
        assert_eq!(*cell.borrow(), SettingValue::Enum("Safe".to_string()));

        OptionPickerRenderer
            .handle_key(&entry, 0, key(KeyCode::Left), &mut ctx)
            .unwrap();
        assert_eq!(*cell.borrow(), SettingValue::Enum("Fast".to_string()));
    }

    #[test]
    fn test_multi_toggle() {
        let layers = ValueType::Enum(EnumType::flags("Layers", &["A", "B", "C"]));
        let (entry, cell) = entry_with(layers, SettingValue::Flags(0b001));
        let mut ctx = RenderContext::default();
        assert_eq!(
            draw(&MultiToggleRenderer, &entry, &mut ctx),
            "[x] A  [ ] B  [ ] C"
        );

        MultiToggleRenderer
            .handle_key(&entry, 0, key(KeyCode::Char('3')), &mut ctx)
            .unwrap();
        assert_eq!(*cell.borrow(), SettingValue::Flags(0b101));
        assert!(!MultiToggleRenderer
            .handle_key(&entry, 0, key(KeyCode::Char('4')), &mut ctx)
            .unwrap());
    }

    #[test]
    fn test_unsupported_is_read_only() {
        let (entry, _) = entry_with(
            ValueType::Custom("color".to_string()),
            SettingValue::Custom(serde_json::json!("#ff0000")),
        );
        let mut ctx = RenderContext::default();
        let text = draw(&UnsupportedRenderer, &entry, &mut ctx);
        assert!(text.contains("no editor available"));
        assert!(!UnsupportedRenderer
            .handle_key(&entry, 0, key(KeyCode::Enter), &mut ctx)
            .unwrap());
    }
}
