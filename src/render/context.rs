//! Explicit render context
//!
//! Everything a renderer may need beyond the entry itself: precomputed styles
//! and the single transient affordance (an open option picker or a shortcut
//! capture) that persists across frames.

use crate::config::ManagerSettings;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};

/// Styles computed once from the editor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleCache {
    pub text: Style,
    pub advanced_name: Style,
    pub plugin_header: Style,
    pub category_header: Style,
    pub focused: Style,
    pub hint: Style,
    pub disabled: Style,
    pub error: Style,
    pub checked: Style,
    pub popup: Style,
    pub popup_selected: Style,
}

impl Default for StyleCache {
    fn default() -> Self {
        Self::from_settings(&ManagerSettings::default())
    }
}

impl StyleCache {
    pub fn from_settings(settings: &ManagerSettings) -> Self {
        let [r, g, b] = settings.advanced_setting_color;
        Self {
            text: Style::default().fg(Color::White),
            advanced_name: Style::default().fg(Color::Rgb(r, g, b)),
            plugin_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            category_header: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            focused: Style::default().fg(Color::Black).bg(Color::Cyan),
            hint: Style::default().fg(Color::DarkGray),
            disabled: Style::default().fg(Color::DarkGray),
            error: Style::default().fg(Color::Red),
            checked: Style::default().fg(Color::Green),
            popup: Style::default().fg(Color::White).bg(Color::DarkGray),
            popup_selected: Style::default().fg(Color::Black).bg(Color::Cyan),
        }
    }
}

/// An open option list for one entry
#[derive(Debug, Clone, PartialEq)]
pub struct PickerState {
    /// Index of the entry the picker edits
    pub entry: usize,
    pub options: Vec<String>,
    pub selected: usize,
    /// Screen row of the entry when last drawn
    pub anchor: Option<Rect>,
}

impl PickerState {
    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.options.len() {
            self.selected += 1;
        }
    }

    pub fn selected_option(&self) -> Option<&str> {
        self.options.get(self.selected).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Affordance {
    Picker(PickerState),
    ShortcutCapture { entry: usize },
}

/// At most one affordance is open at a time; opening one closes the other
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransientState {
    open: Option<Affordance>,
}

impl TransientState {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Entry owning the open affordance
    pub fn owner(&self) -> Option<usize> {
        match &self.open {
            Some(Affordance::Picker(p)) => Some(p.entry),
            Some(Affordance::ShortcutCapture { entry }) => Some(*entry),
            None => None,
        }
    }

    pub fn open_picker(&mut self, entry: usize, options: Vec<String>, selected: usize) {
        self.replace(Affordance::Picker(PickerState {
            entry,
            options,
            selected,
            anchor: None,
        }));
    }

    pub fn start_capture(&mut self, entry: usize) {
        self.replace(Affordance::ShortcutCapture { entry });
    }

    fn replace(&mut self, next: Affordance) {
        if let Some(previous) = self.owner() {
            tracing::debug!("Closing transient editor of entry {}", previous);
        }
        self.open = Some(next);
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    pub fn picker(&self) -> Option<&PickerState> {
        match &self.open {
            Some(Affordance::Picker(p)) => Some(p),
            _ => None,
        }
    }

    /// The open picker, if it belongs to `entry`
    pub fn picker_for(&mut self, entry: usize) -> Option<&mut PickerState> {
        match &mut self.open {
            Some(Affordance::Picker(p)) if p.entry == entry => Some(p),
            _ => None,
        }
    }

    pub fn is_capturing(&self, entry: usize) -> bool {
        matches!(self.open, Some(Affordance::ShortcutCapture { entry: e }) if e == entry)
    }
}

/// Passed explicitly to every draw and key handler
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub styles: StyleCache,
    pub transient: TransientState,
}

impl RenderContext {
    pub fn new(settings: &ManagerSettings) -> Self {
        Self {
            styles: StyleCache::from_settings(settings),
            transient: TransientState::default(),
        }
    }
}
