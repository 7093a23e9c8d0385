//! Virtualized settings list
//!
//! Owners are walked in presentation order with a running content row. An
//! owner is drawn in full when it intersects the viewport or has never been
//! measured; otherwise only its cached height is added, with no renderer or
//! accessor calls for its entries. Every full draw refreshes the cached
//! height.

use super::canvas::Canvas;
use super::context::RenderContext;
use super::registry::{RendererRegistry, RowSlot};
use super::widgets::put;
use crate::config::ManagerSettings;
use crate::model::SettingEntry;
use crate::pipeline::PluginSettingsData;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use std::panic::{catch_unwind, AssertUnwindSafe};
use unicode_width::UnicodeWidthStr;

pub const TIPS_TEXT: &str = "Tip: Enter on a plugin name expands it. Settings show their description when focused.";
pub const FAULT_TEXT: &str = "Failed to draw this field, check log for details.";
pub const NO_SETTINGS_PREFIX: &str = "Plugins with no options available: ";
const HEADER_ACTIONS: &str = "[r] Reload  [o] Open file";
const RESET_HINT: &str = "  [Del] Reset";

/// What currently has keyboard focus in the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    /// Owner header, by owner name
    Plugin(String),
    /// Entry, by index in the flat entry list
    Entry(usize),
}

/// One content row of an owner block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRow {
    Header,
    /// Category header, by group position
    Category(usize),
    /// Entry, by index in the flat entry list
    Entry(usize),
}

/// Rows of one owner block. Structural only: no accessor is called.
pub fn owner_rows(
    plugin: &PluginSettingsData,
    searching: bool,
    hide_single_section: bool,
) -> Vec<ListRow> {
    let mut rows = vec![ListRow::Header];
    if !searching && plugin.collapsed() {
        return rows;
    }
    let single = plugin.groups.len() == 1;
    for (position, group) in plugin.groups.iter().enumerate() {
        if !group.name.is_empty() && !(single && hide_single_section) {
            rows.push(ListRow::Category(position));
        }
        rows.extend(group.entries.iter().map(|&i| ListRow::Entry(i)));
    }
    rows
}

/// Per-frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Owners drawn in full
    pub drawn: usize,
    /// Owners replaced by a spacer
    pub spaced: usize,
    /// Entry rows handed to a renderer
    pub entries_drawn: usize,
    /// Entry rows replaced by the failure placeholder
    pub faults: usize,
    /// Total content height in rows
    pub content_height: u16,
    /// Content row and height of the focused row
    pub focus_row: Option<(u16, u16)>,
}

/// Inputs of one list frame
pub struct ListView<'a> {
    pub registry: &'a RendererRegistry,
    pub settings: &'a ManagerSettings,
    pub searching: bool,
    pub owners_without_settings: &'a str,
    pub focus: Option<&'a FocusTarget>,
}

impl<'a> ListView<'a> {
    /// Rows above the first owner
    pub fn tips_height(&self) -> u16 {
        if self.searching {
            0
        } else {
            1
        }
    }

    pub fn render(
        &self,
        entries: &[SettingEntry],
        plugins: &mut [PluginSettingsData],
        canvas: &mut Canvas<'_>,
        ctx: &mut RenderContext,
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        let scroll = canvas.offset();
        let viewport = canvas.viewport_height();

        if !self.searching {
            if let Some(area) = canvas.row(0) {
                put(canvas.buffer_mut(), area, TIPS_TEXT, ctx.styles.hint);
            }
        }

        let mut cursor = self.tips_height();
        for plugin in plugins.iter_mut() {
            let cached = plugin.cached_height();
            let visible = cached == 0
                || (cursor < scroll.saturating_add(viewport)
                    && cursor.saturating_add(cached) >= scroll);

            let height = if visible {
                stats.drawn += 1;
                let measured = self.draw_plugin(entries, plugin, cursor, canvas, ctx, &mut stats);
                if measured != cached {
                    plugin.set_cached_height(measured);
                }
                measured
            } else {
                stats.spaced += 1;
                self.locate_focus(plugin, cursor, &mut stats);
                cached
            };
            cursor = cursor.saturating_add(height);
        }

        if self.settings.show_debug {
            cursor = cursor.saturating_add(1);
            if let Some(area) = canvas.row(cursor) {
                let text = format!("{NO_SETTINGS_PREFIX}{}", self.owners_without_settings);
                put(canvas.buffer_mut(), area, &text, ctx.styles.hint);
            }
            cursor = cursor.saturating_add(1);
        }

        stats.content_height = cursor;
        tracing::trace!(
            "List frame: {} owners drawn, {} spaced, {} entries",
            stats.drawn,
            stats.spaced,
            stats.entries_drawn
        );
        stats
    }

    fn is_focused(&self, row: ListRow, plugin: &PluginSettingsData) -> bool {
        match (self.focus, row) {
            (Some(FocusTarget::Plugin(name)), ListRow::Header) => *name == plugin.info.name,
            (Some(FocusTarget::Entry(focused)), ListRow::Entry(index)) => *focused == index,
            _ => false,
        }
    }

    fn rows(&self, plugin: &PluginSettingsData) -> Vec<ListRow> {
        owner_rows(plugin, self.searching, self.settings.hide_single_section)
    }

    /// Record the focused row of an owner drawn as a spacer
    fn locate_focus(&self, plugin: &PluginSettingsData, top: u16, stats: &mut FrameStats) {
        let owns_focus = match self.focus {
            Some(FocusTarget::Plugin(name)) => *name == plugin.info.name,
            Some(FocusTarget::Entry(index)) => plugin.entries().any(|i| i == *index),
            None => false,
        };
        if !owns_focus {
            return;
        }
        if let Some(offset) = self
            .rows(plugin)
            .into_iter()
            .position(|row| self.is_focused(row, plugin))
        {
            stats.focus_row = Some((top.saturating_add(offset as u16), 1));
        }
    }

    /// Draw one owner block starting at content row `top`; returns its height
    fn draw_plugin(
        &self,
        entries: &[SettingEntry],
        plugin: &PluginSettingsData,
        top: u16,
        canvas: &mut Canvas<'_>,
        ctx: &mut RenderContext,
        stats: &mut FrameStats,
    ) -> u16 {
        let rows = self.rows(plugin);
        for (offset, row) in rows.iter().enumerate() {
            let y = top.saturating_add(offset as u16);
            let focused = self.is_focused(*row, plugin);
            if focused {
                stats.focus_row = Some((y, 1));
            }
            let Some(area) = canvas.row(y) else {
                continue;
            };
            match *row {
                ListRow::Header => self.draw_header(plugin, area, canvas.buffer_mut(), ctx, focused),
                ListRow::Category(position) => {
                    let name = &plugin.groups[position].name;
                    put(
                        canvas.buffer_mut(),
                        indent(area, 2),
                        &format!("── {name} ──"),
                        ctx.styles.category_header,
                    );
                }
                ListRow::Entry(index) => {
                    if let Some(entry) = entries.get(index) {
                        stats.entries_drawn += 1;
                        if !self.draw_setting(entry, index, area, canvas.buffer_mut(), ctx, focused)
                        {
                            stats.faults += 1;
                        }
                    }
                }
            }
        }
        rows.len() as u16
    }

    fn draw_header(
        &self,
        plugin: &PluginSettingsData,
        area: Rect,
        buf: &mut Buffer,
        ctx: &RenderContext,
        focused: bool,
    ) {
        let showing = self.searching || !plugin.collapsed();
        let arrow = if showing { "▼" } else { "▶" };
        let mut title = format!(
            "{arrow} {} {}",
            plugin.info.display_name(),
            plugin.info.version
        );
        if self.settings.show_debug {
            title.push_str(&format!("  GUID: {}", plugin.info.guid));
        }
        let style = if focused {
            ctx.styles.focused
        } else {
            ctx.styles.plugin_header
        };
        let used = put(buf, area, &title, style);

        let actions_width = HEADER_ACTIONS.width() as u16;
        if area.width > used.saturating_add(actions_width).saturating_add(1) {
            let actions = Rect::new(
                area.x + area.width - actions_width,
                area.y,
                actions_width,
                1,
            );
            put(buf, actions, HEADER_ACTIONS, ctx.styles.hint);
        }
    }

    /// Draw one entry row. Returns `false` when the row failed.
    fn draw_setting(
        &self,
        entry: &SettingEntry,
        index: usize,
        area: Rect,
        buf: &mut Buffer,
        ctx: &mut RenderContext,
        focused: bool,
    ) -> bool {
        let area = indent(area, 2);
        let name_width = if entry.hide_name {
            0
        } else {
            (area.width as f32 * self.settings.column_left_ratio) as u16
        };

        if name_width > 0 {
            let style = if focused {
                ctx.styles.focused
            } else if entry.is_advanced() {
                ctx.styles.advanced_name
            } else {
                ctx.styles.text
            };
            let name_area = Rect::new(area.x, area.y, name_width.saturating_sub(1), 1);
            put(buf, name_area, entry.shown_name(), style);
        }

        let show_reset = entry.default_value.is_some() && !entry.hide_reset_button;
        let reset_width = if show_reset { RESET_HINT.width() as u16 } else { 0 };
        let value_width = area.width.saturating_sub(name_width).saturating_sub(reset_width);
        let value_area = Rect::new(area.x + name_width, area.y, value_width, 1);

        let strategy = self.registry.dispatch(&entry.value_type);
        let slot = RowSlot {
            entry,
            index,
            area: value_area,
            focused,
        };
        let result = catch_unwind(AssertUnwindSafe(|| {
            strategy.renderer().draw(&slot, buf, ctx)
        }));

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("renderer panicked".to_string()),
        };
        if let Some(reason) = failure {
            tracing::error!("Failed to draw setting {} - {}", entry.display_name, reason);
            clear(buf, area);
            put(buf, area, FAULT_TEXT, ctx.styles.error);
            return false;
        }

        if show_reset {
            let reset_area = Rect::new(value_area.x + value_width, area.y, reset_width, 1);
            put(buf, reset_area, RESET_HINT, ctx.styles.hint);
        }
        true
    }
}

fn indent(area: Rect, by: u16) -> Rect {
    let by = by.min(area.width);
    Rect::new(area.x + by, area.y, area.width - by, area.height)
}

fn clear(buf: &mut Buffer, area: Rect) {
    let blank = " ".repeat(area.width as usize);
    buf.set_stringn(area.x, area.y, blank, area.width as usize, Style::default());
}

/// Most options shown at once by the picker popup
const PICKER_ROWS: usize = 8;

/// Draw the open option picker over the list, below its entry when it fits
pub fn draw_picker_popup(buf: &mut Buffer, bounds: Rect, ctx: &RenderContext) {
    let Some(picker) = ctx.transient.picker() else {
        return;
    };
    let Some(anchor) = picker.anchor else {
        return;
    };
    if picker.options.is_empty() {
        return;
    }

    let visible = picker.options.len().min(PICKER_ROWS);
    let first = picker
        .selected
        .saturating_sub(visible - 1)
        .min(picker.options.len() - visible);
    let width = picker
        .options
        .iter()
        .map(|o| o.width())
        .max()
        .unwrap_or(0)
        .saturating_add(2)
        .min(anchor.width as usize) as u16;

    let below = anchor.y + 1;
    let bottom = bounds.y + bounds.height;
    let top = if below as usize + visible <= bottom as usize {
        below
    } else {
        anchor.y.saturating_sub(visible as u16).max(bounds.y)
    };

    for (row, (i, option)) in picker
        .options
        .iter()
        .enumerate()
        .skip(first)
        .take(visible)
        .enumerate()
    {
        let y = top + row as u16;
        if y >= bottom {
            break;
        }
        let style = if i == picker.selected {
            ctx.styles.popup_selected
        } else {
            ctx.styles.popup
        };
        let text = format!(" {:<w$}", option, w = width.saturating_sub(1) as usize);
        buf.set_stringn(anchor.x, y, text, width as usize, style);
    }
}
